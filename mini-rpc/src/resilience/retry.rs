use std::thread;
use std::time::Duration;

use crate::config::RetryStrategyKind;
use crate::error::RpcError;

const FIXED_INTERVAL_ATTEMPTS: u32 = 3;
const FIXED_INTERVAL_WAIT: Duration = Duration::from_secs(3);

/// Governs whether a failed call is re-issued, and how many times
/// (`spec.md` §4.6). `call` re-runs the whole send, from scratch, on each
/// attempt — there is no partial retry of a half-sent frame.
pub trait RetryStrategy: Send + Sync {
    fn call(&self, call: &mut dyn FnMut() -> Result<(), RpcError>) -> Result<(), RpcError>;
}

/// Issues the call exactly once; any failure is returned as-is.
pub struct NoRetry;

impl RetryStrategy for NoRetry {
    fn call(&self, call: &mut dyn FnMut() -> Result<(), RpcError>) -> Result<(), RpcError> {
        call()
    }
}

/// Retries up to `FIXED_INTERVAL_ATTEMPTS` times total, sleeping
/// `FIXED_INTERVAL_WAIT` between attempts. The last failure is wrapped in
/// `RpcError::RetryExhausted` so the caller can see how many attempts ran.
pub struct FixedInterval;

impl RetryStrategy for FixedInterval {
    fn call(&self, call: &mut dyn FnMut() -> Result<(), RpcError>) -> Result<(), RpcError> {
        let mut last_err = None;

        for attempt in 1..=FIXED_INTERVAL_ATTEMPTS {
            match call() {
                Ok(()) => return Ok(()),
                Err(e) => {
                    last_err = Some(e);
                    if attempt < FIXED_INTERVAL_ATTEMPTS {
                        thread::sleep(FIXED_INTERVAL_WAIT);
                    }
                }
            }
        }

        Err(RpcError::RetryExhausted {
            attempts: FIXED_INTERVAL_ATTEMPTS,
            last: Box::new(last_err.expect("loop runs at least once")),
        })
    }
}

pub fn for_kind(kind: RetryStrategyKind) -> &'static dyn RetryStrategy {
    match kind {
        RetryStrategyKind::No => &NoRetry,
        RetryStrategyKind::FixedInterval => &FixedInterval,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn no_retry_runs_the_call_exactly_once() {
        let calls = AtomicU32::new(0);
        let result = NoRetry.call(&mut || {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(RpcError::TransportTimeout)
        });

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn fixed_interval_stops_as_soon_as_the_call_succeeds() {
        let calls = AtomicU32::new(0);
        let result = FixedInterval.call(&mut || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 2 {
                Err(RpcError::TransportTimeout)
            } else {
                Ok(())
            }
        });

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
