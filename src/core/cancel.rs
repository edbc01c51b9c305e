use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};

pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Shared flag flipped when the user interrupts the command.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn check(&self, stage: &'static str) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled { stage })
        } else {
            Ok(())
        }
    }

    /// Run a blocking call on a worker thread and stop waiting once the token is cancelled.
    ///
    /// The worker is detached on cancellation; its result is dropped when it finishes.
    pub fn run_blocking<T, F>(&self, stage: &'static str, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        self.check(stage)?;
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(work());
        });

        loop {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(value) => return Ok(value),
                Err(RecvTimeoutError::Timeout) => self.check(stage)?,
                Err(RecvTimeoutError::Disconnected) => return Err(Error::WorkerPanicked { stage }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(
            token.check("starting"),
            Err(Error::Cancelled { stage: "starting" })
        ));
    }

    #[test]
    fn run_blocking_returns_worker_value() {
        let token = CancelToken::new();
        let value = token.run_blocking("testing", || 41 + 1).expect("value");
        assert_eq!(value, 42);
    }

    #[test]
    fn run_blocking_stops_waiting_when_cancelled() {
        let token = CancelToken::new();
        let canceller = token.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(150));
            canceller.cancel();
        });

        let started = Instant::now();
        let result = token.run_blocking("querying", || {
            thread::sleep(Duration::from_secs(10));
        });
        assert!(matches!(result, Err(Error::Cancelled { stage: "querying" })));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn run_blocking_refuses_to_start_when_already_cancelled() {
        let token = CancelToken::new();
        token.cancel();
        let result = token.run_blocking("querying", || 1);
        assert!(result.is_err());
    }
}
