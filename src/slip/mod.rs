pub mod bet_slip;
pub mod picker;

pub use bet_slip::{BetSlip, SlipState};
pub use picker::{filter_max_price, live_matches, pick, OutcomeRef, PickError, Quote};
