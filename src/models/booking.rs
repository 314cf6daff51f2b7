use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Selection;

/// A confirmed booking as recorded in the bet history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    /// Row id, set once stored
    pub id: Option<i64>,

    /// Booking reference returned by the backend
    pub reference: String,

    /// Total stake
    pub stake: f64,

    /// Product of all selection prices at submission
    pub combined_price: f64,

    /// stake * combined_price
    pub potential_payout: f64,

    /// Selections that made up the slip
    pub selections: Vec<Selection>,

    /// Backend status string (e.g. "booked")
    pub status: String,

    /// When the booking was confirmed
    pub created_at: DateTime<Utc>,
}
