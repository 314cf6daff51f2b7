use std::collections::HashSet;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::api::id_string;
use crate::models::{Catalog, Market, Match, MatchStatus, Outcome};

/// Client for the odds catalog endpoints
pub struct CatalogClient {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

/// Catalog document as served by the backend
#[derive(Debug, Deserialize)]
pub(crate) struct CatalogResponse {
    #[serde(default)]
    matches: Vec<MatchResponse>,
}

#[derive(Debug, Deserialize)]
struct MatchResponse {
    id: serde_json::Value,
    home: String,
    away: String,
    kickoff: Option<String>,
    clock: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    markets: Vec<MarketResponse>,
}

#[derive(Debug, Deserialize)]
struct MarketResponse {
    name: String,
    #[serde(default)]
    outcomes: Vec<OutcomeResponse>,
}

#[derive(Debug, Deserialize)]
struct OutcomeResponse {
    label: String,
    price: f64,
}

impl CatalogClient {
    /// Create a new catalog client
    pub fn new(base_url: &str, auth_token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
        }
    }

    /// Fetch the full catalog snapshot
    pub async fn fetch(&self) -> Result<Catalog> {
        self.fetch_from("matches").await
    }

    /// Fetch only matches currently in play
    pub async fn fetch_live(&self) -> Result<Catalog> {
        let mut catalog = self.fetch_from("matches/live").await?;
        retain_live(&mut catalog);
        Ok(catalog)
    }

    async fn fetch_from(&self, path: &str) -> Result<Catalog> {
        let url = format!("{}/{}", self.base_url, path);
        debug!("Fetching catalog from: {}", url);

        let mut request = self
            .client
            .get(&url)
            .header("Accept", "application/json");

        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .context("Failed to fetch odds catalog")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Catalog API error: {} - {}", status, text);
        }

        let body: CatalogResponse = response
            .json()
            .await
            .context("Failed to parse catalog response")?;

        let catalog = convert_catalog(body);
        info!("Catalog fetched: {} matches", catalog.len());

        Ok(catalog)
    }
}

/// Normalise the wire document into a catalog snapshot
pub(crate) fn convert_catalog(body: CatalogResponse) -> Catalog {
    let mut seen = HashSet::new();
    let mut matches = Vec::with_capacity(body.matches.len());

    for raw in body.matches {
        let converted = convert_match(raw);
        if !seen.insert(converted.id.clone()) {
            warn!("Duplicate match id {} in catalog, keeping first", converted.id);
            continue;
        }
        matches.push(converted);
    }

    Catalog::new(matches)
}

/// Drop anything the live endpoint returned that is not in play
pub(crate) fn retain_live(catalog: &mut Catalog) {
    let before = catalog.len();
    catalog.matches.retain(|m| m.is_live());

    if catalog.len() < before {
        debug!("Live feed: dropped {} matches not in play", before - catalog.len());
    }
}

fn convert_match(raw: MatchResponse) -> Match {
    let id = id_string(raw.id);

    let kickoff = raw.kickoff.as_ref().and_then(|k| {
        chrono::DateTime::parse_from_rfc3339(k)
            .ok()
            .map(|dt| dt.with_timezone(&chrono::Utc))
    });

    let status = raw
        .status
        .as_deref()
        .map(MatchStatus::parse)
        .unwrap_or(MatchStatus::Scheduled);

    let mut markets: Vec<Market> = Vec::new();
    for market in raw.markets {
        if markets
            .iter()
            .any(|m| m.name.eq_ignore_ascii_case(market.name.trim()))
        {
            warn!("Match {}: duplicate market '{}', keeping first", id, market.name);
            continue;
        }

        if let Some(m) = convert_market(&id, market) {
            markets.push(m);
        }
    }

    Match {
        id,
        home: raw.home.trim().to_string(),
        away: raw.away.trim().to_string(),
        kickoff,
        clock: raw.clock.filter(|c| !c.is_empty()),
        status,
        markets,
    }
}

fn convert_market(match_id: &str, market: MarketResponse) -> Option<Market> {
    let outcomes: Vec<Outcome> = market
        .outcomes
        .into_iter()
        .filter_map(|o| {
            if !o.price.is_finite() || o.price < 1.0 {
                warn!(
                    "Match {}: dropping outcome '{}' in '{}' with invalid price {}",
                    match_id, o.label, market.name, o.price
                );
                return None;
            }
            Some(Outcome {
                label: o.label.trim().to_string(),
                price: o.price,
            })
        })
        .collect();

    if outcomes.is_empty() {
        debug!("Match {}: market '{}' has no valid outcomes", match_id, market.name);
        return None;
    }

    Some(Market {
        name: market.name.trim().to_string(),
        outcomes,
    })
}
