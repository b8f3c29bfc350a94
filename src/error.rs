use thiserror::Error;

/// Crate error types
#[derive(Debug, Error)]
pub enum SejtoError {
    /// Filter or sort configuration rejected before any data is scanned
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Requested region does not exist in the snapshot
    #[error("region '{0}' not found in data")]
    UnknownRegion(String),
    /// Requested OS is not available in the requested region
    #[error("OS '{os}' is not available in region '{region}'")]
    UnknownOs { region: String, os: String },
    /// Snapshot is missing expected keys, has wrong types or violates
    /// the interrupt range invariant
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),
    /// Dataset endpoint answered with something other than 200 or 304
    #[error("unexpected HTTP status code '{0}'")]
    UnexpectedStatus(reqwest::StatusCode),
    /// HTTP request error while fetching the dataset
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    /// Reading or writing the local dataset copy failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// CSV serialization error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Rendered output could not be assembled
    #[error("render error: {0}")]
    Render(String),
}
