use std::env;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bet_slip::config::Config;
use bet_slip::db::BookingStore;
use bet_slip::models::Booking;

const DEFAULT_LIMIT: i64 = 20;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bet_history=info,bet_slip=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = env::args().collect();

    let config = Config::from_env()?;
    let store = BookingStore::new(&config.database_url).await?;

    if let Some(reference) = flag_value(&args, &["--reference", "-r"]) {
        match store.get_booking(reference).await? {
            Some(booking) => print_booking(&booking, true),
            None => info!("No booking with reference {}", reference),
        }
        return Ok(());
    }

    let limit = flag_value(&args, &["--limit", "-n"])
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_LIMIT);

    let total = store.booking_count().await?;
    let bookings = store.recent_bookings(limit).await?;

    info!("Showing {} of {} bookings", bookings.len(), total);
    for booking in &bookings {
        print_booking(booking, false);
    }

    let staked: f64 = bookings.iter().map(|b| b.stake).sum();
    let potential: f64 = bookings.iter().map(|b| b.potential_payout).sum();
    info!("Total staked: {:.2} | potential payout: {:.2}", staked, potential);

    Ok(())
}

/// Value following any of the given flags
fn flag_value<'a>(args: &'a [String], flags: &[&str]) -> Option<&'a str> {
    args.iter()
        .position(|a| flags.contains(&a.as_str()))
        .and_then(|i| args.get(i + 1))
        .map(|v| v.as_str())
}

fn print_booking(booking: &Booking, with_selections: bool) {
    info!(
        "{} | {} | {} selections @ {:.2} | stake {:.2} | payout {:.2} | {}",
        booking.created_at.format("%Y-%m-%d %H:%M"),
        booking.reference,
        booking.selections.len(),
        booking.combined_price,
        booking.stake,
        booking.potential_payout,
        booking.status
    );

    if with_selections {
        for s in &booking.selections {
            info!("    {} | {} {} @ {:.2}", s.event, s.market, s.outcome_label, s.price);
        }
    }
}
