use shared::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Single-flight latch for one user action
///
/// While an `InFlightGuard` is alive, further `begin` calls fail with
/// `OperationInProgress`. Dropping the guard releases the latch.
#[derive(Debug, Clone)]
pub struct InFlight {
    action: &'static str,
    busy: Arc<AtomicBool>,
}

#[derive(Debug)]
pub struct InFlightGuard {
    action: &'static str,
    busy: Arc<AtomicBool>,
}

impl InFlight {
    pub fn new(action: &'static str) -> Self {
        Self {
            action,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn begin(&self) -> Result<InFlightGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::OperationInProgress(self.action.to_string()))?;

        debug!("{} started", self.action);
        Ok(InFlightGuard {
            action: self.action,
            busy: self.busy.clone(),
        })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
        debug!("{} finished", self.action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_begin_is_rejected_until_drop() {
        let latch = InFlight::new("send");

        let guard = latch.begin().unwrap();
        assert!(latch.is_busy());
        assert_eq!(
            latch.begin().unwrap_err(),
            Error::OperationInProgress("send".to_string())
        );

        drop(guard);
        assert!(!latch.is_busy());
        assert!(latch.begin().is_ok());
    }

    #[test]
    fn test_latches_are_independent() {
        let send = InFlight::new("send");
        let airdrop = InFlight::new("airdrop");

        let _sending = send.begin().unwrap();
        assert!(airdrop.begin().is_ok());
    }
}
