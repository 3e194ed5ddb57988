//! Attempt-once helpers for calls whose failure does not matter.
//!
//! Nothing here retries. A failed attempt is logged at debug level and
//! turned into `None`.

use std::fmt::Display;
use std::future::Future;
use tracing::debug;

/// Await `operation` once and discard its error.
pub async fn attempt<T, E, Fut>(what: &'static str, operation: Fut) -> Option<T>
where
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    operation.await.best_effort(what)
}

/// Discard the error of an already finished operation.
pub trait BestEffort<T> {
    fn best_effort(self, what: &'static str) -> Option<T>;
}

impl<T, E: Display> BestEffort<T> for Result<T, E> {
    fn best_effort(self, what: &'static str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(operation = what, error = %e, "Best-effort operation failed");
                None
            }
        }
    }
}
