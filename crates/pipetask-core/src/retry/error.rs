//! Errors produced by the retry engine

use std::error::Error;
use std::fmt;
use std::time::Duration;

/// Failure of a retried operation, generic over the operation's error `E`
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt failed; carries the final error
    Exhausted {
        attempts: u32,
        source: E,
        total_duration: Duration,
    },

    /// The predicate rejected the error, so no further attempts were made
    NonRetryable(E),
}

impl<E> RetryError<E> {
    /// The error from the last attempt
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Exhausted { source, .. } => source,
            RetryError::NonRetryable(source) => source,
        }
    }

    /// Borrow the error from the last attempt
    pub fn inner(&self) -> &E {
        match self {
            RetryError::Exhausted { source, .. } => source,
            RetryError::NonRetryable(source) => source,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Exhausted {
                attempts,
                source,
                total_duration,
            } => write!(
                f,
                "retry exhausted after {} attempts over {:.2}s: {}",
                attempts,
                total_duration.as_secs_f64(),
                source
            ),
            RetryError::NonRetryable(source) => write!(f, "non-retryable error: {}", source),
        }
    }
}

impl<E: Error + 'static> Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_exhausted_display() {
        let err = RetryError::Exhausted {
            attempts: 3,
            source: io::Error::other("connection reset"),
            total_duration: Duration::from_millis(1500),
        };
        let text = err.to_string();
        assert!(text.contains("3 attempts"));
        assert!(text.contains("1.50s"));
        assert!(text.contains("connection reset"));
        assert!(err.is_exhausted());
    }

    #[test]
    fn test_into_inner() {
        let err = RetryError::NonRetryable(io::Error::other("404"));
        assert!(!err.is_exhausted());
        assert_eq!(err.into_inner().to_string(), "404");
    }
}
