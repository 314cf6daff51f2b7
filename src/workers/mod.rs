pub mod catalog_refresher;
pub mod slip_processor;

pub use catalog_refresher::CatalogRefresherWorker;
pub use slip_processor::{SlipCommand, SlipProcessorWorker, SubmissionError};
