use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use crate::api::{BookingConfirmation, BookingRequest, GatewayError, SubmissionGateway, SubmitError};
use crate::db::BookingStore;
use crate::models::{Booking, SharedCatalog};
use crate::slip::{pick, BetSlip, OutcomeRef};

/// User intents routed to the slip processor
#[derive(Debug)]
pub enum SlipCommand {
    /// Add the outcome at its current catalog price
    Pick {
        match_id: String,
        market: String,
        outcome: OutcomeRef,
    },
    Remove {
        match_id: String,
        market: String,
    },
    Clear,
    SetStake(f64),
    /// Log the slip and any drift from current prices
    Show,
    /// Re-add the selections of a stored booking at current prices
    Load {
        reference: String,
    },
    Submit {
        reply: Option<oneshot::Sender<Result<BookingConfirmation, SubmissionError>>>,
    },
}

/// Why a submission did not produce a booking
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Slip(#[from] SubmitError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Sole owner and writer of the bet slip.
///
/// Commands are applied in arrival order. A submission is awaited before the
/// next command is read, so the slip cannot change or be re-submitted while a
/// booking is in flight.
pub struct SlipProcessorWorker {
    slip: BetSlip,
    stake: f64,
    catalog: SharedCatalog,
    gateway: Arc<dyn SubmissionGateway>,
    booking_store: Arc<BookingStore>,
    command_rx: mpsc::Receiver<SlipCommand>,
}

impl SlipProcessorWorker {
    /// Create a new slip processor worker
    pub fn new(
        catalog: SharedCatalog,
        gateway: Arc<dyn SubmissionGateway>,
        booking_store: Arc<BookingStore>,
        command_rx: mpsc::Receiver<SlipCommand>,
        default_stake: f64,
    ) -> Self {
        Self {
            slip: BetSlip::new(),
            stake: default_stake,
            catalog,
            gateway,
            booking_store,
            command_rx,
        }
    }

    /// Run the worker loop
    pub async fn run(mut self) {
        info!("Slip processor started");

        while let Some(command) = self.command_rx.recv().await {
            self.handle(command).await;
        }

        warn!("Slip processor channel closed");
    }

    pub fn slip(&self) -> &BetSlip {
        &self.slip
    }

    pub fn stake(&self) -> f64 {
        self.stake
    }

    /// Apply a single command
    pub async fn handle(&mut self, command: SlipCommand) {
        match command {
            SlipCommand::Pick {
                match_id,
                market,
                outcome,
            } => {
                let picked = {
                    let catalog = self.catalog.read().await;
                    pick(&catalog, &match_id, &market, &outcome)
                };

                match picked {
                    Ok(selection) => {
                        info!(
                            "Added {} | {} {} @ {:.2}",
                            selection.event, selection.market, selection.outcome_label, selection.price
                        );
                        self.slip.add(selection);
                        self.log_totals();
                    }
                    Err(e) => warn!("Pick rejected: {}", e),
                }
            }
            SlipCommand::Remove { match_id, market } => {
                match self.slip.remove(&match_id, &market) {
                    Some(removed) => {
                        info!("Removed {} {} from slip", removed.event, removed.market);
                        self.log_totals();
                    }
                    None => info!("Nothing on slip for match {} / {}", match_id, market),
                }
            }
            SlipCommand::Clear => {
                self.slip.clear();
                info!("Slip cleared");
            }
            SlipCommand::SetStake(stake) => {
                if stake.is_finite() && stake > 0.0 {
                    self.stake = stake;
                    info!("Stake set to {:.2}", stake);
                } else {
                    warn!("Ignoring invalid stake {}", stake);
                }
            }
            SlipCommand::Show => self.show().await,
            SlipCommand::Load { reference } => self.load(&reference).await,
            SlipCommand::Submit { reply } => {
                let result = self.submit().await;

                if let Some(reply) = reply {
                    // Receiver may have gone away; the outcome is already logged
                    let _ = reply.send(result);
                }
            }
        }
    }

    /// Book the current slip; only a confirmed booking clears it
    async fn submit(&mut self) -> Result<BookingConfirmation, SubmissionError> {
        let request = match BookingRequest::from_slip(&self.slip, self.stake) {
            Ok(request) => request,
            Err(e) => {
                warn!("Cannot submit: {}", e);
                return Err(e.into());
            }
        };

        info!(
            "Submitting {} selections | stake {:.2} | price {:.2} | payout {:.2}",
            request.selections.len(),
            request.stake,
            request.combined_price,
            request.potential_payout
        );

        let confirmation = match self.gateway.submit(&request).await {
            Ok(confirmation) => confirmation,
            Err(e) => {
                error!("Submission failed, slip kept for retry: {}", e);
                return Err(e.into());
            }
        };

        let booking = Booking {
            id: None,
            reference: confirmation.booking_reference.clone(),
            stake: request.stake,
            combined_price: request.combined_price,
            potential_payout: request.potential_payout,
            selections: request.selections,
            status: confirmation.status.clone(),
            created_at: Utc::now(),
        };

        match self.booking_store.insert_booking(&booking).await {
            Ok(id) => info!("Stored booking {} (id: {})", booking.reference, id),
            Err(e) => error!("Failed to store booking {}: {}", booking.reference, e),
        }

        self.slip.clear();
        info!("Booked {}", confirmation.booking_reference);

        Ok(confirmation)
    }

    /// Rebuild picks from a booking code; each selection goes back through
    /// the picker so it is locked at today's price, not the booked one
    async fn load(&mut self, reference: &str) {
        let booking = match self.booking_store.get_booking(reference).await {
            Ok(Some(booking)) => booking,
            Ok(None) => {
                warn!("No booking with code {}", reference);
                return;
            }
            Err(e) => {
                error!("Failed to look up booking {}: {}", reference, e);
                return;
            }
        };

        let picks = {
            let catalog = self.catalog.read().await;
            booking
                .selections
                .iter()
                .map(|s| {
                    let outcome = OutcomeRef::Label(s.outcome_label.clone());
                    (s, pick(&catalog, &s.match_id, &s.market, &outcome))
                })
                .collect::<Vec<_>>()
        };

        let mut loaded = 0;
        for (booked, picked) in picks {
            match picked {
                Ok(selection) => {
                    if selection.price != booked.price {
                        info!(
                            "{} {} {} now @ {:.2} (booked @ {:.2})",
                            selection.event,
                            selection.market,
                            selection.outcome_label,
                            selection.price,
                            booked.price
                        );
                    }
                    self.slip.add(selection);
                    loaded += 1;
                }
                Err(e) => warn!("Skipping {} from booking {}: {}", booked.event, reference, e),
            }
        }

        info!(
            "Loaded {} of {} selections from booking {}",
            loaded,
            booking.selections.len(),
            reference
        );
        self.log_totals();
    }

    async fn show(&self) {
        if self.slip.is_empty() {
            info!("Slip is empty");
            return;
        }

        for (i, s) in self.slip.selections().iter().enumerate() {
            info!(
                "{}. {} | {} {} @ {:.2}",
                i + 1,
                s.event,
                s.market,
                s.outcome_label,
                s.price
            );
        }
        self.log_totals();

        let catalog = self.catalog.read().await;
        for change in self.slip.price_changes(&catalog) {
            match change.current {
                Some(current) => warn!(
                    "Price moved on {} {} {}: locked {:.2}, now {:.2}",
                    change.match_id, change.market, change.outcome_label, change.locked, current
                ),
                None => warn!(
                    "{} {} {} is no longer offered",
                    change.match_id, change.market, change.outcome_label
                ),
            }
        }
    }

    fn log_totals(&self) {
        match self.slip.combined_price() {
            Some(price) => info!(
                "Slip: {} selections | price {:.2} | stake {:.2} | payout {:.2}",
                self.slip.len(),
                price,
                self.stake,
                price * self.stake
            ),
            None => info!("Slip is empty"),
        }
    }
}
