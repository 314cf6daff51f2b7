use serde::{Deserialize, Serialize};

/// Key under which the bet slip holds at most one selection.
///
/// The market name is stored trimmed and lowercased, so the derived
/// equality and hash treat "1x2", "1X2" and " 1x2" as the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectionKey {
    match_id: String,
    market: String,
}

impl SelectionKey {
    pub fn new(match_id: impl Into<String>, market: impl AsRef<str>) -> Self {
        Self {
            match_id: match_id.into().trim().to_string(),
            market: market.as_ref().trim().to_ascii_lowercase(),
        }
    }

    pub fn match_id(&self) -> &str {
        &self.match_id
    }

    /// Canonical (lowercased) market name
    pub fn market(&self) -> &str {
        &self.market
    }

    /// Whether this key addresses the given match/market pair
    pub fn matches(&self, match_id: &str, market: &str) -> bool {
        *self == SelectionKey::new(match_id, market)
    }
}

/// A chosen outcome, locked at the price observed when it was picked
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Selection {
    /// Match this selection belongs to
    pub match_id: String,

    /// Market name (e.g. "1x2")
    pub market: String,

    /// Outcome label within the market
    #[serde(rename = "outcome")]
    pub outcome_label: String,

    /// Decimal price at pick time
    pub price: f64,

    /// Event description (e.g. "Arsenal vs Chelsea")
    pub event: String,
}

impl Selection {
    pub fn new(
        match_id: impl Into<String>,
        market: impl Into<String>,
        outcome_label: impl Into<String>,
        price: f64,
    ) -> Self {
        Self {
            match_id: match_id.into().trim().to_string(),
            market: market.into().trim().to_string(),
            outcome_label: outcome_label.into().trim().to_string(),
            price,
            event: String::new(),
        }
    }

    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = event.into();
        self
    }

    pub fn key(&self) -> SelectionKey {
        SelectionKey::new(self.match_id.as_str(), &self.market)
    }

    pub fn has_key(&self, key: &SelectionKey) -> bool {
        self.key() == *key
    }
}

/// A selection whose locked price no longer matches the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceChange {
    pub match_id: String,
    pub market: String,
    #[serde(rename = "outcome")]
    pub outcome_label: String,

    /// Price locked into the slip
    pub locked: f64,

    /// Price currently quoted, `None` if the outcome is no longer offered
    pub current: Option<f64>,
}
