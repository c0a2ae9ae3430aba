//! Policy-based retry execution
//!
//! Network operations (manifest fetches, archive downloads) run through a
//! [`RetryExecutor`] configured from a [`RetryPolicy`](crate::types::RetryPolicy).
//! A [`RetryPredicate`] decides which failures are worth another attempt and
//! a [`RetryObserver`] receives attempt events, usually for logging.
//!
//! ```rust,no_run
//! use pipetask_core::retry::{retry_with_policy, RetryError};
//! use pipetask_core::types::RetryPolicy;
//!
//! async fn fetch() -> Result<String, RetryError<std::io::Error>> {
//!     retry_with_policy(&RetryPolicy::default(), || async {
//!         Ok("manifest".to_string())
//!     })
//!     .await
//! }
//! ```

mod error;
mod executor;
mod observer;
mod strategies;

pub use error::RetryError;
pub use executor::{retry_with_policy, RetryExecutor};
pub use observer::{NoOpObserver, RetryObserver, TracingObserver};
pub use strategies::{calculate_delay, AlwaysRetry, ClosurePredicate, RetryPredicate};
