pub mod booking;
pub mod catalog;

pub use booking::{
    BookingConfirmation, BookingRequest, GatewayError, HttpBookingGateway, SubmissionGateway,
    SubmitError,
};
pub use catalog::CatalogClient;

/// Ids arrive as either strings or numbers
pub(crate) fn id_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}
