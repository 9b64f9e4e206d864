//! Generic retry-with-exponential-backoff, shared by file I/O and watcher directory
//! registration.
//!
//! The policy is fixed: start at 100 ms, double on each attempt, cap at 1 s, give up after 5
//! attempts. Two thin entry points are exposed over one shared loop: [`retry_or_none`]
//! for call sites that treat exhaustion as "benign failure, return an absent value" (file reads,
//! attribute lookups), and [`retry_or_err`] for call sites that need the underlying error back
//! (watcher directory registration during `start()`).

use std::thread;
use std::time::Duration;

use tracing::{trace, warn};

const BASE_DELAY: Duration = Duration::from_millis(100);
const MAX_DELAY: Duration = Duration::from_secs(1);
const MAX_ATTEMPTS: u32 = 5;

fn backoff_delay(attempt: u32) -> Duration {
    let scale = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    BASE_DELAY.checked_mul(scale as u32).unwrap_or(MAX_DELAY).min(MAX_DELAY)
}

/// Retry `op` up to 5 times with 100ms→1s doubling backoff. Returns `None` if every attempt
/// fails; the last error is logged at `warn` but not returned.
pub fn retry_or_none<T, E, F>(label: &str, mut op: F) -> Option<T>
where
    F: FnMut() -> Result<T, E>,
    E: std::fmt::Display,
{
    for attempt in 0..MAX_ATTEMPTS {
        match op() {
            Ok(value) => return Some(value),
            Err(e) => {
                if attempt + 1 == MAX_ATTEMPTS {
                    warn!(%label, attempt = attempt + 1, error = %e, "retry exhausted");
                    return None;
                }
                let delay = backoff_delay(attempt);
                trace!(%label, attempt = attempt + 1, ?delay, error = %e, "retrying after failure");
                thread::sleep(delay);
            }
        }
    }
    None
}

/// Retry `op` up to 5 times with 100ms→1s doubling backoff. Returns the last error if every
/// attempt fails.
pub fn retry_or_err<T, E, F>(label: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: std::fmt::Display,
{
    let mut last_err = None;
    for attempt in 0..MAX_ATTEMPTS {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempt + 1 == MAX_ATTEMPTS {
                    warn!(%label, attempt = attempt + 1, error = %e, "retry exhausted");
                    last_err = Some(e);
                    break;
                }
                let delay = backoff_delay(attempt);
                trace!(%label, attempt = attempt + 1, ?delay, error = %e, "retrying after failure");
                thread::sleep(delay);
                last_err = Some(e);
            }
        }
    }
    Err(last_err.expect("loop always runs at least once"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(backoff_delay(0), Duration::from_millis(100));
        assert_eq!(backoff_delay(1), Duration::from_millis(200));
        assert_eq!(backoff_delay(2), Duration::from_millis(400));
        assert_eq!(backoff_delay(3), Duration::from_millis(800));
        assert_eq!(backoff_delay(4), Duration::from_secs(1));
        assert_eq!(backoff_delay(30), Duration::from_secs(1));
    }

    #[test]
    fn retry_or_none_returns_some_on_eventual_success() {
        let attempts = Cell::new(0);
        let result = retry_or_none::<_, &str, _>("test", || {
            attempts.set(attempts.get() + 1);
            if attempts.get() < 3 {
                Err("not yet")
            } else {
                Ok(42)
            }
        });
        assert_eq!(result, Some(42));
        assert_eq!(attempts.get(), 3);
    }

    #[test]
    fn retry_or_none_returns_none_after_exhaustion() {
        let attempts = Cell::new(0);
        let result = retry_or_none::<(), &str, _>("test", || {
            attempts.set(attempts.get() + 1);
            Err("always fails")
        });
        assert_eq!(result, None);
        assert_eq!(attempts.get(), MAX_ATTEMPTS);
    }

    #[test]
    fn retry_or_err_returns_last_error_after_exhaustion() {
        let result = retry_or_err::<(), _, _>("test", || Err("boom"));
        assert_eq!(result.unwrap_err(), "boom");
    }

    #[test]
    fn retry_or_err_short_circuits_on_success() {
        let attempts = Cell::new(0);
        let result = retry_or_err::<_, &str, _>("test", || {
            attempts.set(attempts.get() + 1);
            Ok(7)
        });
        assert_eq!(result, Ok(7));
        assert_eq!(attempts.get(), 1);
    }
}
