use std::fmt;

use thiserror::Error;

/// Number of failed URLs spelled out in a [`FetchError`] message.
const MAX_REPORTED_FAILURES: usize = 5;

#[derive(Error, Debug)]
pub enum ProxySubError {
    /// Malformed document syntax
    #[error("Format error: {0}")]
    Format(String),

    /// Wrong document shape, e.g. a template that is not a mapping
    #[error("Schema error: {0}")]
    Schema(String),

    /// A required derived value is missing, e.g. no home proxy
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProxySubError {
    /// Whether the error was caused by the caller's input rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ProxySubError::Format(_) | ProxySubError::Schema(_) | ProxySubError::Validation(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ProxySubError>;

/// Every subscription URL failed and nothing was recovered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    /// `(url, reason)` in request order
    pub failures: Vec<(String, String)>,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "All subscription fetches failed:")?;
        for (url, reason) in self.failures.iter().take(MAX_REPORTED_FAILURES) {
            write!(f, "\n{}: {}", url, reason)?;
        }
        if self.failures.len() > MAX_REPORTED_FAILURES {
            write!(
                f,
                "\n... ({} more)",
                self.failures.len() - MAX_REPORTED_FAILURES
            )?;
        }
        Ok(())
    }
}
