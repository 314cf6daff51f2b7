use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};
use tracing::{info, warn};

use crate::models::{Booking, Selection};

/// SQLite store for confirmed bookings (bet history)
pub struct BookingStore {
    pool: Pool<Sqlite>,
}

impl BookingStore {
    /// Create a new booking store and initialize the database
    pub async fn new(database_url: &str) -> Result<Self> {
        // Create data directory if needed
        if let Some(path) = database_url.strip_prefix("sqlite:") {
            if !path.contains(":memory:") {
                if let Some(parent) = std::path::Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)
                            .context("Failed to create database directory")?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)
            .context("Invalid database URL")?
            .create_if_missing(true);

        // Every in-memory connection is its own database
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        let store = Self { pool };
        store.init_schema().await?;

        info!("Booking store initialized");
        Ok(store)
    }

    /// Initialize database schema
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bookings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                reference TEXT NOT NULL UNIQUE,
                stake REAL NOT NULL,
                combined_price REAL NOT NULL,
                potential_payout REAL NOT NULL,
                selection_count INTEGER NOT NULL,
                selections TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create bookings table")?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_bookings_created
            ON bookings (created_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a confirmed booking
    pub async fn insert_booking(&self, booking: &Booking) -> Result<i64> {
        let selections =
            serde_json::to_string(&booking.selections).context("Failed to encode selections")?;

        let result = sqlx::query(
            r#"
            INSERT INTO bookings (
                reference,
                stake,
                combined_price,
                potential_payout,
                selection_count,
                selections,
                status,
                created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&booking.reference)
        .bind(booking.stake)
        .bind(booking.combined_price)
        .bind(booking.potential_payout)
        .bind(booking.selections.len() as i64)
        .bind(selections)
        .bind(&booking.status)
        .bind(booking.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to insert booking")?;

        Ok(result.last_insert_rowid())
    }

    /// Most recent bookings first
    pub async fn recent_bookings(&self, limit: i64) -> Result<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(
            r#"
            SELECT * FROM bookings
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch bookings")?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    /// Look up a booking by its reference
    pub async fn get_booking(&self, reference: &str) -> Result<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>("SELECT * FROM bookings WHERE reference = ?")
            .bind(reference)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch booking")?;

        Ok(row.map(|r| r.into()))
    }

    /// Get count of bookings
    pub async fn booking_count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bookings")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count bookings")?;

        Ok(row.0)
    }
}

/// Database row representation
#[derive(sqlx::FromRow)]
struct BookingRow {
    id: i64,
    reference: String,
    stake: f64,
    combined_price: f64,
    potential_payout: f64,
    #[allow(dead_code)]
    selection_count: i64,
    selections: String,
    status: String,
    created_at: String,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        let selections: Vec<Selection> = serde_json::from_str(&row.selections)
            .unwrap_or_else(|e| {
                warn!("Booking {} has unreadable selections: {}", row.reference, e);
                Vec::new()
            });

        Booking {
            id: Some(row.id),
            reference: row.reference,
            stake: row.stake,
            combined_price: row.combined_price,
            potential_payout: row.potential_payout,
            selections,
            status: row.status,
            created_at: chrono::DateTime::parse_from_rfc3339(&row.created_at)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .unwrap_or_else(|_| chrono::Utc::now()),
        }
    }
}
