use std::sync::mpsc::{self, Sender};
use std::thread;

use log::warn;

use crate::config::TolerantStrategyKind;
use crate::error::RpcError;

/// One more attempt at the call, packaged so a strategy that wants to defer
/// it (`FailBack`) can hand it to a background thread.
pub type Attempt = Box<dyn FnMut() -> Result<(), RpcError> + Send>;

/// Decides what a caller sees after retry has already been exhausted
/// (`spec.md` §4.7): propagate the failure, swallow it, fail over to a
/// different endpoint, or queue the call for a later replay.
pub trait ToleranceStrategy: Send + Sync {
    fn handle(&self, fail_err: RpcError, attempt: Attempt) -> Result<(), RpcError>;
}

/// Propagates the failure unchanged. Default strategy.
pub struct FailFast;

impl ToleranceStrategy for FailFast {
    fn handle(&self, fail_err: RpcError, _attempt: Attempt) -> Result<(), RpcError> {
        Err(fail_err)
    }
}

/// Logs the failure and reports success to the caller regardless. Intended
/// for best-effort, fire-and-forget calls (notifications, metrics pings).
pub struct FailSafe;

impl ToleranceStrategy for FailSafe {
    fn handle(&self, fail_err: RpcError, _attempt: Attempt) -> Result<(), RpcError> {
        warn!("fail-safe: suppressing call failure: {fail_err}");
        Ok(())
    }
}

/// Gives the call exactly one more try, typically against a different
/// endpoint selected by re-running load balancing (`spec.md` §4.5's "failed
/// endpoints MAY be excluded for the remainder of the call"); the caller is
/// responsible for making `attempt` pick a different candidate than the one
/// that just failed.
pub struct FailOver;

impl ToleranceStrategy for FailOver {
    fn handle(&self, fail_err: RpcError, mut attempt: Attempt) -> Result<(), RpcError> {
        attempt().map_err(|retry_err| RpcError::RetryExhausted {
            attempts: 2,
            last: Box::new(if matches!(retry_err, RpcError::TransportTimeout) { retry_err } else { fail_err }),
        })
    }
}

/// Accepts the failure immediately but hands the call off to a background
/// worker thread for a single best-effort replay, so the original caller
/// isn't blocked waiting for it (`spec.md` §4.7). A second failure on the
/// worker thread is logged and dropped, not re-queued again, to avoid an
/// unbounded retry storm.
pub struct FailBack {
    sender: Sender<Attempt>,
}

impl FailBack {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel::<Attempt>();

        thread::spawn(move || {
            for mut call in receiver {
                if let Err(e) = call() {
                    warn!("fail-back: queued replay failed, dropping: {e}");
                }
            }
        });

        Self { sender }
    }
}

impl Default for FailBack {
    fn default() -> Self {
        Self::new()
    }
}

impl ToleranceStrategy for FailBack {
    fn handle(&self, fail_err: RpcError, attempt: Attempt) -> Result<(), RpcError> {
        warn!("fail-back: call failed, queuing for background replay: {fail_err}");

        if self.sender.send(attempt).is_err() {
            warn!("fail-back: worker thread is gone, dropping queued call");
        }

        Ok(())
    }
}

pub fn for_kind(kind: TolerantStrategyKind) -> Box<dyn ToleranceStrategy> {
    match kind {
        TolerantStrategyKind::FailFast => Box::new(FailFast),
        TolerantStrategyKind::FailSafe => Box::new(FailSafe),
        TolerantStrategyKind::FailOver => Box::new(FailOver),
        TolerantStrategyKind::FailBack => Box::new(FailBack::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn fail_fast_propagates_the_failure() {
        let result = FailFast.handle(RpcError::TransportTimeout, Box::new(|| Ok(())));
        assert!(result.is_err());
    }

    #[test]
    fn fail_safe_reports_success_despite_the_failure() {
        let result = FailSafe.handle(RpcError::TransportTimeout, Box::new(|| Ok(())));
        assert!(result.is_ok());
    }

    #[test]
    fn fail_over_succeeds_when_the_second_attempt_does() {
        let result = FailOver.handle(RpcError::TransportTimeout, Box::new(|| Ok(())));
        assert!(result.is_ok());
    }

    #[test]
    fn fail_over_reports_exhaustion_when_the_second_attempt_also_fails() {
        let result = FailOver.handle(RpcError::TransportTimeout, Box::new(|| Err(RpcError::TransportTimeout)));
        assert!(matches!(result, Err(RpcError::RetryExhausted { attempts: 2, .. })));
    }

    #[test]
    fn fail_back_reports_success_immediately_and_replays_in_the_background() {
        let strategy = FailBack::new();
        let replayed = Arc::new(AtomicBool::new(false));
        let replayed_in_worker = replayed.clone();

        let result = strategy.handle(
            RpcError::TransportTimeout,
            Box::new(move || {
                replayed_in_worker.store(true, Ordering::SeqCst);
                Ok(())
            }),
        );
        assert!(result.is_ok());

        for _ in 0..50 {
            if replayed.load(Ordering::SeqCst) {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert!(replayed.load(Ordering::SeqCst));
    }
}
