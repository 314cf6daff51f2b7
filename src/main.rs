use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bet_slip::api::{CatalogClient, HttpBookingGateway, SubmissionGateway};
use bet_slip::cli::{parse_line, spawn_line_reader, Input, HELP};
use bet_slip::config::Config;
use bet_slip::db::BookingStore;
use bet_slip::models::{Catalog, Match, SharedCatalog};
use bet_slip::slip::{filter_max_price, live_matches};
use bet_slip::workers::{CatalogRefresherWorker, SlipCommand, SlipProcessorWorker};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bet_slip=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting bet-slip");

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded (api: {})", config.api_url);

    // Initialize database
    let booking_store = Arc::new(BookingStore::new(&config.database_url).await?);
    info!("Database initialized");

    // Initialize API clients
    let catalog_client = CatalogClient::new(&config.api_url, config.auth_token.clone());
    let live_client = CatalogClient::new(&config.api_url, config.auth_token.clone());
    let gateway: Arc<dyn SubmissionGateway> = Arc::new(HttpBookingGateway::new(
        &config.api_url,
        config.auth_token.clone(),
    ));
    if config.auth_token.is_none() {
        warn!("BETSLIP_AUTH_TOKEN not set, bookings will likely be rejected");
    }

    // Shared state
    let catalog: SharedCatalog = Arc::new(RwLock::new(Catalog::default()));

    // Channel for slip commands
    let (command_tx, command_rx) = mpsc::channel(32);

    // Create workers
    let refresher = CatalogRefresherWorker::new(
        catalog_client,
        Arc::clone(&catalog),
        config.catalog_refresh_interval,
    );

    let processor = SlipProcessorWorker::new(
        Arc::clone(&catalog),
        gateway,
        Arc::clone(&booking_store),
        command_rx,
        config.default_stake,
    );

    // Spawn workers
    let refresher_handle = tokio::spawn(async move {
        refresher.run().await;
    });

    let processor_handle = tokio::spawn(processor.run());

    info!("Workers started, type 'help' for commands");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        result = read_commands(command_tx, Arc::clone(&catalog), live_client) => {
            if let Err(e) = result {
                error!("Input loop failed: {}", e);
            }
        }
        result = refresher_handle => {
            error!("Catalog refresher exited unexpectedly: {:?}", result);
        }
    }

    // Dropping the sender lets the processor drain and stop
    if let Err(e) = processor_handle.await {
        error!("Slip processor failed: {:?}", e);
    }

    info!("Shutting down bet-slip");
    Ok(())
}

/// Read commands from stdin until EOF or `quit`
async fn read_commands(
    command_tx: mpsc::Sender<SlipCommand>,
    catalog: SharedCatalog,
    live_client: CatalogClient,
) -> Result<()> {
    let mut lines = spawn_line_reader(std::io::BufReader::new(std::io::stdin()));

    while let Some(line) = lines.recv().await {
        if line.trim().is_empty() {
            continue;
        }

        let input = match parse_line(&line) {
            Ok(input) => input,
            Err(e) => {
                warn!("{}", e);
                continue;
            }
        };

        match input {
            Input::Slip(SlipCommand::Submit { .. }) => {
                // Wait for the outcome before reading more input
                let (reply_tx, reply_rx) = oneshot::channel();
                command_tx
                    .send(SlipCommand::Submit {
                        reply: Some(reply_tx),
                    })
                    .await?;

                match reply_rx.await? {
                    Ok(confirmation) => info!(
                        "Bet booked: {} ({})",
                        confirmation.booking_reference, confirmation.status
                    ),
                    Err(e) => warn!("Bet not booked: {}", e),
                }
            }
            Input::Slip(command) => command_tx.send(command).await?,
            Input::Live => match live_client.fetch_live().await {
                Ok(live) => print_live(live.matches.iter()),
                Err(e) => {
                    warn!("Live feed unavailable, using last snapshot: {}", e);
                    let catalog = catalog.read().await;
                    print_live(live_matches(&catalog).into_iter());
                }
            },
            Input::MaxPrice(max) => {
                let catalog = catalog.read().await;
                for q in filter_max_price(&catalog, max) {
                    info!(
                        "[{}] {} | {} {} @ {:.2}",
                        q.event.id,
                        q.event.title(),
                        q.market.name,
                        q.outcome.label,
                        q.outcome.price
                    );
                }
            }
            Input::Help => info!("\n{}", HELP),
            Input::Quit => break,
        }
    }

    Ok(())
}

fn print_live<'a>(matches: impl Iterator<Item = &'a Match>) {
    for m in matches {
        info!(
            "[{}] {} {}",
            m.id,
            m.title(),
            m.clock.as_deref().unwrap_or("")
        );
    }
}
