// Error types shared by the search cycle and start-up validation

use thiserror::Error;

// Failures inside a single poll cycle. All of these are recoverable at the
// loop boundary: the cycle is abandoned and the next one runs after the delay.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("{label} failed: {reason}")]
    RequestFailure { label: String, reason: String },

    #[error("Reservation not found. Are your acknowledgement number and surname correct?")]
    ReservationNotFound,

    #[error("Hash missing from reservation data")]
    HashMissing,

    #[error("Failed to find search results")]
    ResultsNotFound,

    #[error("Failed to decode {context}: {reason}")]
    DecodeFailure { context: String, reason: String },
}

impl WatchError {
    pub fn request(label: &str, reason: impl ToString) -> Self {
        WatchError::RequestFailure {
            label: label.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn decode(context: &str, reason: impl ToString) -> Self {
        WatchError::DecodeFailure {
            context: context.to_string(),
            reason: reason.to_string(),
        }
    }
}

// Start-up failures. These abort the process before the loop begins.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} is not a date in the form YYYY-MM-DD")]
    InvalidDate(String),

    #[error("{0} is outside the housing block window")]
    OutsideBlockWindow(String),

    #[error("check-out {check_out} must be after check-in {check_in}")]
    InvertedStay { check_in: String, check_out: String },

    #[error("invalid float value: '{0}'")]
    InvalidDistance(String),

    #[error("invalid regex '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid passkey url: '{0}'")]
    InvalidBookingUrl(String),

    #[error("one of --key or --url is required")]
    MissingCredential,

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}
