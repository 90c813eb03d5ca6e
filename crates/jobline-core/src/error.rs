//! Error types for jobline.

use thiserror::Error;

use crate::JobId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("job {0} not found")]
    JobNotFound(JobId),

    #[error("{0}")]
    InvalidInput(String),

    #[error("unexpected action: {0}")]
    UnexpectedAction(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("job registry is not running")]
    Unavailable,

    #[error("no position left between {lower} and {upper}")]
    PositionExhausted { lower: String, upper: String },

    #[error("{0}")]
    Batch(BatchErrors),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Non-fatal errors collected while processing a batch.
///
/// Rendered as a single message so callers never have to unpack a list,
/// while the individual errors stay available through [`BatchErrors::errors`].
#[derive(Debug, Default)]
pub struct BatchErrors(Vec<Error>);

impl BatchErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, err: Error) {
        self.0.push(err);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn errors(&self) -> &[Error] {
        &self.0
    }

    /// Collapse into a result: no errors is success, a single error is
    /// returned as is, anything more becomes one combined [`Error::Batch`].
    pub fn into_result(mut self) -> Result<()> {
        match self.0.len() {
            0 => Ok(()),
            1 => Err(self.0.remove(0)),
            _ => Err(Error::Batch(self)),
        }
    }
}

impl std::fmt::Display for BatchErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(
            f,
            "encountered the following errors: {}",
            messages.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_batch_is_success() {
        assert!(BatchErrors::new().into_result().is_ok());
    }

    #[test]
    fn test_single_error_returned_verbatim() {
        let mut errors = BatchErrors::new();
        errors.push(Error::InvalidInput("weight must be greater than 0".to_string()));

        let err = errors.into_result().unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(err.to_string(), "weight must be greater than 0");
    }

    #[test]
    fn test_multiple_errors_joined() {
        let mut errors = BatchErrors::new();
        errors.push(Error::InvalidInput("priority must be between 1 and 99".to_string()));
        errors.push(Error::Transport("job actor stopped".to_string()));

        let err = errors.into_result().unwrap_err();
        assert_eq!(
            err.to_string(),
            "encountered the following errors: priority must be between 1 and 99, \
             transport error: job actor stopped"
        );
        match err {
            Error::Batch(batch) => assert_eq!(batch.len(), 2),
            other => panic!("expected batch error, got {other:?}"),
        }
    }
}
