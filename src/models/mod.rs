pub mod booking;
pub mod catalog;
pub mod selection;

pub use booking::Booking;
pub use catalog::{Catalog, Market, Match, MatchStatus, Outcome, SharedCatalog};
pub use selection::{PriceChange, Selection, SelectionKey};
