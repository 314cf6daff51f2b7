use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a match
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Scheduled,
    Live,
    Finished,
}

impl MatchStatus {
    /// Parse a status string, falling back to `Scheduled` for unknown values
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "live" | "in_play" | "inplay" => MatchStatus::Live,
            "finished" | "ended" | "closed" => MatchStatus::Finished,
            _ => MatchStatus::Scheduled,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::Live => "live",
            MatchStatus::Finished => "finished",
        }
    }
}

/// One possible result within a market, quoted at a decimal price
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Outcome {
    /// Outcome label (e.g. "1", "X", "Over")
    pub label: String,

    /// Decimal price, always >= 1.0
    pub price: f64,
}

/// A named betting category for a match.
///
/// Outcome order is significant: for "1x2" the positions are home, draw, away.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Market {
    /// Market name (e.g. "1x2", "Over/Under 2.5")
    pub name: String,

    /// Ordered outcomes
    pub outcomes: Vec<Outcome>,
}

impl Market {
    /// Find an outcome by label (case-insensitive)
    pub fn outcome(&self, label: &str) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .find(|o| o.label.eq_ignore_ascii_case(label.trim()))
    }
}

/// A match with its quoted markets
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Match {
    /// Match identifier
    pub id: String,

    /// Home participant name
    pub home: String,

    /// Away participant name
    pub away: String,

    /// Scheduled kickoff time
    pub kickoff: Option<DateTime<Utc>>,

    /// Live clock label (e.g. "67'"), only meaningful while live
    pub clock: Option<String>,

    /// Current status
    pub status: MatchStatus,

    /// Markets keyed by name, in catalog order
    pub markets: Vec<Market>,
}

impl Match {
    /// Find a market by name (case-insensitive)
    pub fn market(&self, name: &str) -> Option<&Market> {
        self.markets
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Human-readable event title
    pub fn title(&self) -> String {
        format!("{} vs {}", self.home, self.away)
    }

    pub fn is_live(&self) -> bool {
        self.status == MatchStatus::Live
    }
}

/// Immutable snapshot of the odds catalog from a single fetch.
///
/// Refreshes replace the whole snapshot; nothing patches a snapshot in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub matches: Vec<Match>,

    /// When this snapshot was fetched
    pub fetched_at: DateTime<Utc>,
}

impl Catalog {
    pub fn new(matches: Vec<Match>) -> Self {
        Self {
            matches,
            fetched_at: Utc::now(),
        }
    }

    /// Find a match by id
    pub fn get(&self, match_id: &str) -> Option<&Match> {
        self.matches.iter().find(|m| m.id == match_id)
    }

    /// Current quote for an outcome, if the catalog still offers it
    pub fn quote(&self, match_id: &str, market: &str, label: &str) -> Option<f64> {
        self.get(match_id)?.market(market)?.outcome(label).map(|o| o.price)
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Shared handle to the current catalog snapshot
pub type SharedCatalog = std::sync::Arc<tokio::sync::RwLock<Catalog>>;
