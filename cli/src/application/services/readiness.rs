//! The single polling helper behind every readiness check.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;

use crate::application::ports::Clock;
use crate::domain::PollPolicy;

/// Outcome of [`poll_until`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness<T> {
    /// The probe produced a value.
    Ready(T),
    /// The budget ran out; `waited` is the total time slept.
    TimedOut { waited: Duration },
}

/// Run `probe` immediately and then after every `policy.interval` until it
/// yields `Some`, or until `policy.timeout` has been slept away.
///
/// Callers turn `TimedOut` into their own fatal error.
///
/// # Errors
///
/// Propagates the first error returned by `probe`.
pub async fn poll_until<T, F, Fut>(
    clock: &impl Clock,
    policy: PollPolicy,
    mut probe: F,
) -> Result<Readiness<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let mut waited = Duration::ZERO;
    loop {
        if let Some(value) = probe().await? {
            return Ok(Readiness::Ready(value));
        }
        if policy.interval.is_zero() || waited + policy.interval > policy.timeout {
            return Ok(Readiness::TimedOut { waited });
        }
        clock.sleep(policy.interval).await;
        waited += policy.interval;
    }
}
