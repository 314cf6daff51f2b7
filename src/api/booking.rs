use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::id_string;
use crate::models::{PriceChange, Selection, SelectionKey};
use crate::slip::BetSlip;

/// Reasons a slip cannot be turned into a booking request
#[derive(Debug, Error, PartialEq)]
pub enum SubmitError {
    #[error("bet slip is empty")]
    EmptySlip,

    #[error("invalid stake: {0}")]
    InvalidStake(f64),
}

/// Failures reported by the booking endpoint
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("not authorized, log in again")]
    Unauthorized,

    #[error("booking rejected: {0}")]
    Validation(String),

    #[error("prices changed: {message}")]
    PriceChanged {
        message: String,
        changes: Vec<PriceChange>,
    },

    #[error("booking service error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("unreadable booking response: {0}")]
    Decode(String),
}

/// Body posted to the booking endpoint
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BookingRequest {
    pub selections: Vec<Selection>,
    pub stake: f64,
    pub combined_price: f64,
    pub potential_payout: f64,
}

impl BookingRequest {
    /// Snapshot the slip into a request. Does not modify the slip.
    pub fn from_slip(slip: &BetSlip, stake: f64) -> Result<Self, SubmitError> {
        if !stake.is_finite() || stake <= 0.0 {
            return Err(SubmitError::InvalidStake(stake));
        }

        let combined_price = slip.combined_price().ok_or(SubmitError::EmptySlip)?;

        Ok(Self {
            selections: slip.selections().to_vec(),
            stake,
            combined_price,
            potential_payout: combined_price * stake,
        })
    }
}

/// Successful booking
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BookingConfirmation {
    #[serde(alias = "id", alias = "booking_code")]
    pub booking_reference: String,

    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    "booked".to_string()
}

/// Error body returned by the booking endpoint
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    detail: Option<serde_json::Value>,
    #[serde(default)]
    changes: Vec<ChangedPrice>,
}

#[derive(Debug, Deserialize)]
struct ChangedPrice {
    match_id: serde_json::Value,
    market: String,
    outcome: String,
    price: Option<f64>,
}

/// Sends a finalized slip to the booking backend
#[async_trait]
pub trait SubmissionGateway: Send + Sync {
    async fn submit(&self, request: &BookingRequest) -> Result<BookingConfirmation, GatewayError>;
}

/// Booking gateway over the REST API
pub struct HttpBookingGateway {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpBookingGateway {
    /// Create a new booking gateway
    pub fn new(base_url: &str, auth_token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
        }
    }
}

#[async_trait]
impl SubmissionGateway for HttpBookingGateway {
    async fn submit(&self, request: &BookingRequest) -> Result<BookingConfirmation, GatewayError> {
        let url = format!("{}/bets/book", self.base_url);
        debug!(
            "Posting booking with {} selections to {}",
            request.selections.len(),
            url
        );

        let mut builder = self.client.post(&url).json(request);
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!("Booking API error: {} - {}", status, text);
            return Err(classify_failure(status, &text, request));
        }

        let confirmation: BookingConfirmation =
            serde_json::from_str(&text).map_err(|e| GatewayError::Decode(e.to_string()))?;

        info!("Booking confirmed: {}", confirmation.booking_reference);
        Ok(confirmation)
    }
}

/// Map a non-success response onto a gateway error
pub(crate) fn classify_failure(
    status: StatusCode,
    body: &str,
    request: &BookingRequest,
) -> GatewayError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .message
        .clone()
        .or_else(|| parsed.detail.as_ref().map(detail_text))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        });

    match status {
        StatusCode::UNAUTHORIZED => GatewayError::Unauthorized,
        StatusCode::CONFLICT => GatewayError::PriceChanged {
            message,
            changes: price_changes(parsed.changes, request),
        },
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            GatewayError::Validation(message)
        }
        _ => GatewayError::Server {
            status: status.as_u16(),
            message,
        },
    }
}

// FastAPI-style detail is either a string or a list of {msg} objects
fn detail_text(detail: &serde_json::Value) -> String {
    match detail {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|i| i.get("msg").and_then(|m| m.as_str()))
            .collect::<Vec<_>>()
            .join("; "),
        other => other.to_string(),
    }
}

fn price_changes(changed: Vec<ChangedPrice>, request: &BookingRequest) -> Vec<PriceChange> {
    changed
        .into_iter()
        .map(|c| {
            let match_id = id_string(c.match_id);
            let key = SelectionKey::new(match_id.as_str(), &c.market);
            let locked = request
                .selections
                .iter()
                .find(|s| {
                    s.has_key(&key) && s.outcome_label.eq_ignore_ascii_case(c.outcome.trim())
                })
                .map(|s| s.price)
                .unwrap_or(0.0);

            PriceChange {
                match_id,
                market: c.market,
                outcome_label: c.outcome,
                locked,
                current: c.price,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> BookingRequest {
        let mut slip = BetSlip::new();
        slip.add(Selection::new("1", "1x2", "1", 2.5));
        slip.add(Selection::new("2", "1x2", "X", 3.0));
        BookingRequest::from_slip(&slip, 10.0).unwrap()
    }

    #[test]
    fn test_request_from_slip() {
        let req = request();

        assert_eq!(req.selections.len(), 2);
        assert!((req.combined_price - 7.5).abs() < 1e-9);
        assert!((req.potential_payout - 75.0).abs() < 1e-9);

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["selections"][0]["outcome"], "1");
        assert_eq!(json["stake"], 10.0);
    }

    #[test]
    fn test_request_rejects_empty_and_bad_stake() {
        let mut slip = BetSlip::new();
        assert_eq!(
            BookingRequest::from_slip(&slip, 5.0),
            Err(SubmitError::EmptySlip)
        );

        slip.add(Selection::new("1", "1x2", "1", 2.5));
        assert_eq!(
            BookingRequest::from_slip(&slip, 0.0),
            Err(SubmitError::InvalidStake(0.0))
        );
        assert!(BookingRequest::from_slip(&slip, f64::NAN).is_err());
        assert_eq!(slip.len(), 1);
    }

    #[test]
    fn test_classify_unauthorized() {
        let err = classify_failure(StatusCode::UNAUTHORIZED, "", &request());
        assert!(matches!(err, GatewayError::Unauthorized));
    }

    #[test]
    fn test_classify_validation() {
        let err = classify_failure(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"detail": [{"msg": "stake too low"}, {"msg": "limit exceeded"}]}"#,
            &request(),
        );

        match err {
            GatewayError::Validation(msg) => assert_eq!(msg, "stake too low; limit exceeded"),
            other => panic!("unexpected error: {:?}", other),
        }

        let err = classify_failure(StatusCode::BAD_REQUEST, r#"{"detail": "bad slip"}"#, &request());
        assert!(matches!(err, GatewayError::Validation(msg) if msg == "bad slip"));
    }

    #[test]
    fn test_classify_price_changed() {
        let err = classify_failure(
            StatusCode::CONFLICT,
            r#"{
                "message": "odds moved",
                "changes": [{"match_id": "2", "market": "1x2", "outcome": "X", "price": 2.6}]
            }"#,
            &request(),
        );

        match err {
            GatewayError::PriceChanged { message, changes } => {
                assert_eq!(message, "odds moved");
                assert_eq!(changes.len(), 1);
                assert_eq!(changes[0].locked, 3.0);
                assert_eq!(changes[0].current, Some(2.6));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_classify_price_changed_numeric_ids() {
        let err = classify_failure(
            StatusCode::CONFLICT,
            r#"{
                "detail": "odds moved",
                "changes": [{"match_id": 1, "market": "1X2", "outcome": "1", "price": 2.2}]
            }"#,
            &request(),
        );

        match err {
            GatewayError::PriceChanged { message, changes } => {
                assert_eq!(message, "odds moved");
                assert_eq!(changes.len(), 1);
                assert_eq!(changes[0].match_id, "1");
                assert_eq!(changes[0].locked, 2.5);
                assert_eq!(changes[0].current, Some(2.2));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_classify_server_error_without_body() {
        let err = classify_failure(StatusCode::BAD_GATEWAY, "<html>", &request());

        match err {
            GatewayError::Server { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_confirmation_aliases() {
        let c: BookingConfirmation = serde_json::from_str(r#"{"id": "ABC123"}"#).unwrap();
        assert_eq!(c.booking_reference, "ABC123");
        assert_eq!(c.status, "booked");
    }
}
