use std::env;

use anyhow::{ensure, Context, Result};

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Betting backend REST API base URL
    pub api_url: String,

    /// Interval in seconds between catalog refreshes
    pub catalog_refresh_interval: u64,

    /// SQLite database path for the booking history
    pub database_url: String,

    /// Bearer token attached to API requests, if logged in
    pub auth_token: Option<String>,

    /// Stake used until the user sets one
    pub default_stake: f64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            api_url: env::var("BETSLIP_API_URL")
                .unwrap_or_else(|_| "http://localhost:8000/api".to_string()),

            catalog_refresh_interval: parse_refresh_interval(
                &env::var("CATALOG_REFRESH_INTERVAL").unwrap_or_else(|_| "30".to_string()),
            )?,

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:data/bookings.db".to_string()),

            auth_token: env::var("BETSLIP_AUTH_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),

            default_stake: parse_stake(
                &env::var("DEFAULT_STAKE").unwrap_or_else(|_| "10.0".to_string()),
            )?,
        })
    }
}

/// Refresh interval in seconds; tokio intervals require a non-zero period
fn parse_refresh_interval(value: &str) -> Result<u64> {
    let secs: u64 = value
        .trim()
        .parse()
        .context("CATALOG_REFRESH_INTERVAL must be a valid number")?;
    ensure!(secs > 0, "CATALOG_REFRESH_INTERVAL must be at least 1 second");
    Ok(secs)
}

fn parse_stake(value: &str) -> Result<f64> {
    let stake: f64 = value
        .trim()
        .parse()
        .context("DEFAULT_STAKE must be a valid number")?;
    ensure!(
        stake.is_finite() && stake > 0.0,
        "DEFAULT_STAKE must be a positive amount"
    );
    Ok(stake)
}
