use serde::Serialize;
use tracing::debug;

use crate::models::{Catalog, PriceChange, Selection, SelectionKey};

/// Whether the slip currently holds anything
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlipState {
    Empty,
    Populated,
}

/// The user's pending selections.
///
/// Holds at most one selection per (match id, market name). Adding a selection
/// for a key that is already present replaces the old one in its original
/// position; all other adds append. The slip performs no I/O and has no
/// failure modes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BetSlip {
    selections: Vec<Selection>,
}

impl BetSlip {
    /// Create an empty slip
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a selection, replacing any existing one for the same match/market
    pub fn add(&mut self, selection: Selection) {
        let key = selection.key();

        match self.position(&key) {
            Some(idx) => {
                debug!(
                    "Replacing {} @ {:.2} with {} @ {:.2} on {}/{}",
                    self.selections[idx].outcome_label,
                    self.selections[idx].price,
                    selection.outcome_label,
                    selection.price,
                    key.match_id(),
                    key.market()
                );
                self.selections[idx] = selection;
            }
            None => {
                debug!(
                    "Adding {} @ {:.2} on {}/{}",
                    selection.outcome_label,
                    selection.price,
                    key.match_id(),
                    key.market()
                );
                self.selections.push(selection);
            }
        }
    }

    /// Remove the selection for a match/market, if any
    pub fn remove(&mut self, match_id: &str, market: &str) -> Option<Selection> {
        let key = SelectionKey::new(match_id, market);
        let idx = self.position(&key)?;
        Some(self.selections.remove(idx))
    }

    /// Drop every selection
    pub fn clear(&mut self) {
        self.selections.clear();
    }

    /// Product of all selection prices, `None` for an empty slip
    pub fn combined_price(&self) -> Option<f64> {
        if self.selections.is_empty() {
            return None;
        }

        Some(self.selections.iter().map(|s| s.price).product())
    }

    /// Stake multiplied by the combined price
    pub fn potential_payout(&self, stake: f64) -> Option<f64> {
        self.combined_price().map(|price| price * stake)
    }

    /// Current selections in insertion order
    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }

    pub fn get(&self, key: &SelectionKey) -> Option<&Selection> {
        self.position(key).map(|idx| &self.selections[idx])
    }

    pub fn contains(&self, key: &SelectionKey) -> bool {
        self.position(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.selections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    pub fn state(&self) -> SlipState {
        if self.selections.is_empty() {
            SlipState::Empty
        } else {
            SlipState::Populated
        }
    }

    /// Compare locked prices against a catalog snapshot.
    ///
    /// Never modifies the slip; a locked price only changes through an
    /// explicit remove and re-add.
    pub fn price_changes(&self, catalog: &Catalog) -> Vec<PriceChange> {
        self.selections
            .iter()
            .filter_map(|s| {
                let current = catalog.quote(&s.match_id, &s.market, &s.outcome_label);
                let unchanged = current.map(|p| p == s.price).unwrap_or(false);

                if unchanged {
                    return None;
                }

                Some(PriceChange {
                    match_id: s.match_id.clone(),
                    market: s.market.clone(),
                    outcome_label: s.outcome_label.clone(),
                    locked: s.price,
                    current,
                })
            })
            .collect()
    }

    fn position(&self, key: &SelectionKey) -> Option<usize> {
        self.selections.iter().position(|s| s.has_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Market, Match, MatchStatus, Outcome};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn sel(match_id: &str, market: &str, label: &str, price: f64) -> Selection {
        Selection::new(match_id, market, label, price)
    }

    #[test]
    fn test_empty_slip() {
        let slip = BetSlip::new();

        assert_eq!(slip.state(), SlipState::Empty);
        assert_eq!(slip.combined_price(), None);
        assert_eq!(slip.potential_payout(10.0), None);
        assert!(slip.selections().is_empty());
    }

    #[test]
    fn test_replace_and_accumulate_scenario() {
        let mut slip = BetSlip::new();

        slip.add(sel("1", "1x2", "1", 2.50));
        assert_eq!(slip.len(), 1);
        assert!(approx(slip.combined_price().unwrap(), 2.50));

        // Same key: B replaces A
        slip.add(sel("1", "1x2", "2", 1.80));
        assert_eq!(slip.len(), 1);
        assert_eq!(slip.selections()[0].outcome_label, "2");
        assert!(approx(slip.combined_price().unwrap(), 1.80));

        slip.add(sel("2", "1x2", "X", 3.00));
        assert_eq!(slip.len(), 2);
        assert!(approx(slip.combined_price().unwrap(), 5.40));

        slip.remove("1", "1x2");
        assert_eq!(slip.len(), 1);
        assert_eq!(slip.selections()[0].match_id, "2");
        assert!(approx(slip.combined_price().unwrap(), 3.00));

        slip.clear();
        assert_eq!(slip.state(), SlipState::Empty);
        assert_eq!(slip.combined_price(), None);
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut slip = BetSlip::new();
        slip.add(sel("1", "1x2", "1", 2.0));
        slip.add(sel("2", "1x2", "1", 1.5));
        slip.add(sel("1", "1x2", "X", 3.1));

        let ids: Vec<&str> = slip.selections().iter().map(|s| s.match_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(slip.selections()[0].outcome_label, "X");
    }

    #[test]
    fn test_different_markets_same_match_coexist() {
        let mut slip = BetSlip::new();
        slip.add(sel("1", "1x2", "1", 2.0));
        slip.add(sel("1", "Over/Under 2.5", "Over", 1.9));

        assert_eq!(slip.len(), 2);
        assert!(approx(slip.combined_price().unwrap(), 3.8));
    }

    #[test]
    fn test_never_holds_duplicate_keys() {
        let mut slip = BetSlip::new();
        let markets = [
            "1x2",
            "1X2",
            " 1x2",
            "Over/Under 2.5",
            "over/under 2.5 ",
            "BTTS",
            "btts",
        ];

        for i in 0..84u32 {
            let match_id = (i % 4).to_string();
            let market = markets[(i % 7) as usize];
            slip.add(sel(&match_id, market, "1", 1.0 + f64::from(i) / 10.0));
        }

        // 4 matches x 3 distinct markets, whatever the spelling
        assert_eq!(slip.len(), 12);

        let selections = slip.selections();
        for (i, a) in selections.iter().enumerate() {
            for b in &selections[i + 1..] {
                assert!(!a.has_key(&b.key()), "duplicate key {:?}", a.key());
            }
        }

        for market in markets {
            assert!(slip.contains(&SelectionKey::new("3", market)));
        }
    }

    #[test]
    fn test_padded_market_round_trip() {
        let mut slip = BetSlip::new();
        slip.add(sel("1", " 1x2", "1", 2.5));
        slip.add(sel("1", " 1x2", "2", 1.8));

        assert_eq!(slip.len(), 1);
        assert_eq!(slip.combined_price(), Some(1.8));

        assert!(slip.remove("1", " 1x2").is_some());
        assert!(slip.is_empty());
    }

    #[test]
    fn test_add_then_remove_restores_prior_state() {
        let mut slip = BetSlip::new();
        slip.add(sel("1", "1x2", "1", 2.0));
        slip.add(sel("2", "1x2", "2", 4.0));
        let before = slip.selections().to_vec();

        slip.add(sel("3", "1x2", "X", 3.3));
        let removed = slip.remove("3", "1x2");

        assert_eq!(removed.map(|s| s.price), Some(3.3));
        assert_eq!(slip.selections(), before.as_slice());
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut slip = BetSlip::new();
        slip.add(sel("1", "1x2", "1", 2.0));

        assert!(slip.remove("9", "1x2").is_none());
        assert!(slip.remove("1", "BTTS").is_none());
        assert_eq!(slip.len(), 1);

        let mut empty = BetSlip::new();
        assert!(empty.remove("1", "1x2").is_none());
        assert_eq!(empty.state(), SlipState::Empty);
    }

    #[test]
    fn test_market_key_is_case_insensitive() {
        let mut slip = BetSlip::new();
        slip.add(sel("1", "1x2", "1", 2.0));
        slip.add(sel("1", "1X2", "2", 3.0));

        assert_eq!(slip.len(), 1);
        assert!(slip.contains(&SelectionKey::new("1", "1x2")));
        assert!(slip.remove("1", "1X2").is_some());
        assert!(slip.is_empty());
    }

    #[test]
    fn test_combined_price_is_product() {
        let mut slip = BetSlip::new();
        let prices = [1.25, 2.0, 1.6, 3.75];
        for (i, price) in prices.iter().enumerate() {
            slip.add(sel(&i.to_string(), "1x2", "1", *price));
        }

        let expected: f64 = prices.iter().product();
        assert!(approx(slip.combined_price().unwrap(), expected));
        assert!(approx(slip.potential_payout(10.0).unwrap(), expected * 10.0));
    }

    #[test]
    fn test_price_changes_do_not_mutate() {
        let catalog = Catalog::new(vec![Match {
            id: "1".to_string(),
            home: "Arsenal".to_string(),
            away: "Chelsea".to_string(),
            kickoff: None,
            clock: Some("67'".to_string()),
            status: MatchStatus::Live,
            markets: vec![Market {
                name: "1x2".to_string(),
                outcomes: vec![
                    Outcome { label: "1".to_string(), price: 1.9 },
                    Outcome { label: "X".to_string(), price: 3.4 },
                ],
            }],
        }]);

        let mut slip = BetSlip::new();
        slip.add(sel("1", "1x2", "1", 2.5));
        slip.add(sel("1", "BTTS", "Yes", 1.7));
        slip.add(sel("2", "1x2", "1", 1.4));

        let changes = slip.price_changes(&catalog);

        assert_eq!(changes.len(), 3);
        assert_eq!(changes[0].current, Some(1.9));
        assert_eq!(changes[0].locked, 2.5);
        assert_eq!(changes[1].current, None);
        assert_eq!(slip.selections()[0].price, 2.5);

        slip.remove("1", "BTTS");
        slip.remove("2", "1x2");
        slip.add(sel("1", "1x2", "1", 1.9));
        assert!(slip.price_changes(&catalog).is_empty());
    }
}
