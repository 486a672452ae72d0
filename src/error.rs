//! Error types for scitex.

use std::time::Duration;

/// Errors that can occur while resolving and writing bibliographies.
#[derive(Debug, thiserror::Error)]
pub enum ScitexError {
    /// HTTP request failed (network, timeout, etc.)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The ADS API returned an error status code.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// No API token provided.
    #[error("Authentication required: set ADS_API_TOKEN (or SCIX_API_TOKEN) environment variable")]
    AuthRequired,

    /// Rate limited by the ADS API (HTTP 429).
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Failed to parse an API response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Failed to parse or serialize a BibTeX file.
    #[error("BibTeX error: {0}")]
    Bib(String),

    /// File I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid command-line usage.
    #[error("{0}")]
    Usage(String),

    /// Interactive input was interrupted or the terminal went away.
    #[error("interrupted")]
    Interrupted,

    /// A concurrent triage task failed.
    #[error("worker task failed: {0}")]
    Task(String),
}

/// Convenience alias for Results using [`ScitexError`].
pub type Result<T> = std::result::Result<T, ScitexError>;
