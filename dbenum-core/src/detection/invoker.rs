//! Deadline-guarded invocation of adapter calls.
//!
//! The guarded future is raced against a `tokio` timer. When the timer wins
//! the future is dropped, which cancels it at its next await point and
//! releases whatever connection it was holding. Drivers that block inside a
//! single poll are abandoned the same way from the caller's point of view.

use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

/// Result of one guarded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The call finished before the deadline
    Success(T),
    /// The call aborted before the deadline; carries the reason
    ConnectionFailed(String),
    /// The deadline elapsed first
    TimedOut,
}

/// Runs `future` with a hard wall-clock deadline.
///
/// A panic inside the future is caught and reported as
/// [`Outcome::ConnectionFailed`]; it never reaches the caller. A zero
/// timeout still polls the future once, so an already-complete call wins.
///
/// # Example
/// ```rust
/// use dbenum_core::detection::{Outcome, invoke};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let outcome = invoke(async { 42 }, Duration::from_secs(1)).await;
/// assert_eq!(outcome, Outcome::Success(42));
/// # }
/// ```
pub async fn invoke<F, T>(future: F, timeout: Duration) -> Outcome<T>
where
    F: Future<Output = T>,
{
    let guarded = AssertUnwindSafe(future).catch_unwind();
    match tokio::time::timeout(timeout, guarded).await {
        Ok(Ok(value)) => Outcome::Success(value),
        Ok(Err(payload)) => Outcome::ConnectionFailed(panic_reason(payload.as_ref())),
        Err(_elapsed) => Outcome::TimedOut,
    }
}

fn panic_reason(payload: &(dyn std::any::Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    format!("adapter panicked: {detail}")
}
