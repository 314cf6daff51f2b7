use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::models::{Catalog, Market, Match, MatchStatus, Outcome, Selection};

/// How the user referred to an outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeRef {
    /// By label, case-insensitive
    Label(String),
    /// By 1-based position in the market (e.g. 1 / 2 / 3 for home / draw / away)
    Position(usize),
}

impl OutcomeRef {
    /// Read user input as a label. A numeric label that no outcome carries
    /// falls back to a position at resolve time, so "1" and "2" in a 1x2
    /// market still mean home and away.
    pub fn parse(input: &str) -> Self {
        OutcomeRef::Label(input.trim().to_string())
    }
}

impl fmt::Display for OutcomeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeRef::Label(label) => write!(f, "{}", label),
            OutcomeRef::Position(pos) => write!(f, "#{}", pos),
        }
    }
}

/// Reasons a pick cannot become a selection
#[derive(Debug, Error, PartialEq)]
pub enum PickError {
    #[error("unknown match: {0}")]
    UnknownMatch(String),

    #[error("match {match_id} has no market named '{market}'")]
    UnknownMarket { match_id: String, market: String },

    #[error("market '{market}' on match {match_id} has no outcome {outcome}")]
    UnknownOutcome {
        match_id: String,
        market: String,
        outcome: String,
    },

    #[error("match {0} is finished")]
    MatchFinished(String),
}

/// Resolve a user pick against the catalog into a selection at the current price
pub fn pick(
    catalog: &Catalog,
    match_id: &str,
    market: &str,
    outcome: &OutcomeRef,
) -> Result<Selection, PickError> {
    let m = catalog
        .get(match_id)
        .ok_or_else(|| PickError::UnknownMatch(match_id.to_string()))?;

    if m.status == MatchStatus::Finished {
        return Err(PickError::MatchFinished(m.id.clone()));
    }

    let mkt = m.market(market).ok_or_else(|| PickError::UnknownMarket {
        match_id: m.id.clone(),
        market: market.to_string(),
    })?;

    let chosen = resolve_outcome(mkt, outcome).ok_or_else(|| PickError::UnknownOutcome {
        match_id: m.id.clone(),
        market: mkt.name.clone(),
        outcome: outcome.to_string(),
    })?;

    debug!(
        "Picked {} @ {:.2} on {} ({})",
        chosen.label,
        chosen.price,
        m.title(),
        mkt.name
    );

    Ok(Selection::new(&m.id, &mkt.name, &chosen.label, chosen.price).with_event(m.title()))
}

fn resolve_outcome<'a>(market: &'a Market, outcome: &OutcomeRef) -> Option<&'a Outcome> {
    match outcome {
        OutcomeRef::Label(label) => market.outcome(label).or_else(|| {
            let pos: usize = label.parse().ok()?;
            position(market, pos)
        }),
        OutcomeRef::Position(pos) => position(market, *pos),
    }
}

fn position(market: &Market, pos: usize) -> Option<&Outcome> {
    pos.checked_sub(1).and_then(|idx| market.outcomes.get(idx))
}

/// A quoted outcome together with where it lives in the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct Quote<'a> {
    pub event: &'a Match,
    pub market: &'a Market,
    pub outcome: &'a Outcome,
}

/// All open outcomes priced at or below `max_price`, in catalog order
pub fn filter_max_price(catalog: &Catalog, max_price: f64) -> Vec<Quote<'_>> {
    catalog
        .matches
        .iter()
        .filter(|m| m.status != MatchStatus::Finished)
        .flat_map(|m| {
            m.markets.iter().flat_map(move |mkt| {
                mkt.outcomes
                    .iter()
                    .filter(move |o| o.price <= max_price)
                    .map(move |o| Quote {
                        event: m,
                        market: mkt,
                        outcome: o,
                    })
            })
        })
        .collect()
}

/// Matches currently in play
pub fn live_matches(catalog: &Catalog) -> Vec<&Match> {
    catalog.matches.iter().filter(|m| m.is_live()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(label: &str, price: f64) -> Outcome {
        Outcome {
            label: label.to_string(),
            price,
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(vec![
            Match {
                id: "1".to_string(),
                home: "Arsenal".to_string(),
                away: "Chelsea".to_string(),
                kickoff: None,
                clock: None,
                status: MatchStatus::Scheduled,
                markets: vec![
                    Market {
                        name: "1x2".to_string(),
                        outcomes: vec![outcome("1", 2.5), outcome("X", 3.2), outcome("2", 2.9)],
                    },
                    Market {
                        name: "Over/Under 2.5".to_string(),
                        outcomes: vec![outcome("Over", 1.8), outcome("Under", 2.0)],
                    },
                ],
            },
            Match {
                id: "2".to_string(),
                home: "Milan".to_string(),
                away: "Inter".to_string(),
                kickoff: None,
                clock: Some("55'".to_string()),
                status: MatchStatus::Live,
                markets: vec![Market {
                    name: "1x2".to_string(),
                    outcomes: vec![outcome("1", 1.2), outcome("X", 5.5), outcome("2", 9.0)],
                }],
            },
            Match {
                id: "3".to_string(),
                home: "Ajax".to_string(),
                away: "PSV".to_string(),
                kickoff: None,
                clock: None,
                status: MatchStatus::Finished,
                markets: vec![Market {
                    name: "1x2".to_string(),
                    outcomes: vec![outcome("1", 1.1)],
                }],
            },
        ])
    }

    #[test]
    fn test_pick_by_label() {
        let s = pick(&catalog(), "1", "over/under 2.5", &OutcomeRef::parse("over")).unwrap();

        assert_eq!(s.market, "Over/Under 2.5");
        assert_eq!(s.outcome_label, "Over");
        assert_eq!(s.price, 1.8);
        assert_eq!(s.event, "Arsenal vs Chelsea");
    }

    #[test]
    fn test_pick_label_wins_over_position() {
        // "2" is the away label, not the second position (draw)
        let s = pick(&catalog(), "1", "1x2", &OutcomeRef::parse("2")).unwrap();
        assert_eq!(s.outcome_label, "2");
        assert_eq!(s.price, 2.9);
    }

    #[test]
    fn test_pick_by_position() {
        let s = pick(&catalog(), "1", "1x2", &OutcomeRef::Position(2)).unwrap();
        assert_eq!(s.outcome_label, "X");

        let s = pick(&catalog(), "1", "Over/Under 2.5", &OutcomeRef::parse("2")).unwrap();
        assert_eq!(s.outcome_label, "Under");
    }

    #[test]
    fn test_pick_errors() {
        let c = catalog();

        assert_eq!(
            pick(&c, "9", "1x2", &OutcomeRef::Position(1)),
            Err(PickError::UnknownMatch("9".to_string()))
        );
        assert!(matches!(
            pick(&c, "1", "BTTS", &OutcomeRef::Position(1)),
            Err(PickError::UnknownMarket { .. })
        ));
        assert!(matches!(
            pick(&c, "1", "1x2", &OutcomeRef::Position(0)),
            Err(PickError::UnknownOutcome { .. })
        ));
        assert!(matches!(
            pick(&c, "1", "1x2", &OutcomeRef::parse("Draw")),
            Err(PickError::UnknownOutcome { .. })
        ));
        assert_eq!(
            pick(&c, "3", "1x2", &OutcomeRef::Position(1)),
            Err(PickError::MatchFinished("3".to_string()))
        );
    }

    #[test]
    fn test_filter_max_price() {
        let c = catalog();
        let quotes = filter_max_price(&c, 1.8);

        let labels: Vec<(&str, &str)> = quotes
            .iter()
            .map(|q| (q.event.id.as_str(), q.outcome.label.as_str()))
            .collect();

        // Finished match 3 is excluded
        assert_eq!(labels, vec![("1", "Over"), ("2", "1")]);
    }

    #[test]
    fn test_live_matches() {
        let c = catalog();
        let live = live_matches(&c);

        assert_eq!(live.len(), 1);
        assert_eq!(live[0].id, "2");
    }
}
