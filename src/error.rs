use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, AutofillError>;

/// Coarse classification of a failure, used by operator-facing surfaces to pick a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Nothing usable was found in the imported grid
    NoSourceTable,
    /// A rendered variant row had no spreadsheet price
    NoMatchingPrice,
    /// Every credential was tried and none succeeded
    CredentialsExhausted,
    /// The generative API answered with something that is not `{title, tags}`
    MalformedContent,
    /// Missing or invalid operator input (mapping, pricing, keys, image)
    Configuration,
    /// A single network call failed
    Network,
    /// The browser or the host page could not be driven
    Browser,
}

/// Errors that can occur while importing data, pricing, generating or driving the host page
#[derive(Error, Debug)]
pub enum AutofillError {
    #[error("No table found in data")]
    NoSourceTable,

    #[error("No matching price for row {row} ({label})")]
    NoMatchingPrice { row: usize, label: String },

    #[error("Invalid column mapping: {0}")]
    InvalidMapping(String),

    #[error("Invalid pricing configuration: {0}")]
    InvalidPricing(String),

    #[error("No API keys provided")]
    NoCredentials,

    #[error("No image data available")]
    NoImageData,

    #[error("All {attempts} keys failed. Last error: {last_error}")]
    CredentialsExhausted { attempts: usize, last_error: String },

    #[error("Rate Limit Exceeded (429)")]
    RateLimited,

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Generated content malformed: {0}")]
    MalformedContent(String),

    #[error("Exchange rate unavailable: {0}")]
    RateUnavailable(String),

    #[error("Failed to load settings: {0}")]
    Settings(String),

    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Failed to connect to browser: {0}")]
    ConnectionFailed(String),

    #[error("Tab operation failed: {0}")]
    TabOperationFailed(String),

    #[error("Script evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("Unexpected script result: {0}")]
    ScriptResult(String),
}

impl AutofillError {
    /// Classify the error into one of the operator-visible outcomes
    pub fn kind(&self) -> FailureKind {
        match self {
            AutofillError::NoSourceTable => FailureKind::NoSourceTable,
            AutofillError::NoMatchingPrice { .. } => FailureKind::NoMatchingPrice,
            AutofillError::CredentialsExhausted { .. } => FailureKind::CredentialsExhausted,
            AutofillError::MalformedContent(_) => FailureKind::MalformedContent,
            AutofillError::InvalidMapping(_)
            | AutofillError::InvalidPricing(_)
            | AutofillError::NoCredentials
            | AutofillError::NoImageData
            | AutofillError::Settings(_) => FailureKind::Configuration,
            AutofillError::RateLimited
            | AutofillError::Api { .. }
            | AutofillError::Network(_)
            | AutofillError::RateUnavailable(_) => FailureKind::Network,
            AutofillError::LaunchFailed(_)
            | AutofillError::ConnectionFailed(_)
            | AutofillError::TabOperationFailed(_)
            | AutofillError::EvaluationFailed(_)
            | AutofillError::ScriptResult(_) => FailureKind::Browser,
        }
    }

    /// Whether this error is the explicit rate-limit signal of the generative API
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, AutofillError::RateLimited)
    }
}

impl From<reqwest::Error> for AutofillError {
    fn from(e: reqwest::Error) -> Self {
        // the URL may carry credentials
        AutofillError::Network(e.without_url().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_message_reports_attempts() {
        let err = AutofillError::CredentialsExhausted { attempts: 3, last_error: "boom".to_string() };
        assert_eq!(err.to_string(), "All 3 keys failed. Last error: boom");
        assert_eq!(err.kind(), FailureKind::CredentialsExhausted);
    }

    #[test]
    fn test_configuration_kinds() {
        assert_eq!(AutofillError::NoCredentials.kind(), FailureKind::Configuration);
        assert_eq!(AutofillError::NoImageData.kind(), FailureKind::Configuration);
        assert_eq!(AutofillError::InvalidMapping("x".into()).kind(), FailureKind::Configuration);
    }

    #[test]
    fn test_rate_limit_is_network_failure() {
        let err = AutofillError::RateLimited;
        assert!(err.is_rate_limit());
        assert_eq!(err.kind(), FailureKind::Network);
        assert!(!AutofillError::Network("reset".into()).is_rate_limit());
    }
}
