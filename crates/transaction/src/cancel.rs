//! Cancellation shared between the job controller and the worker
//!
//! The controller owns an `Arc<CancelBridge>`; the worker registers the
//! engine's interrupt handle with it. A cancel request flips the token and
//! fires the interrupt at most once per transaction.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use pkbridge_errors::TransactionError;

use crate::engine::Interrupt;

/// State of the one in-flight transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancellationToken {
    pub cancelled: bool,
    pub generation: u64,
}

struct Slot {
    token: CancellationToken,
    interrupt: Option<Arc<dyn Interrupt>>,
}

#[derive(Default)]
pub struct CancelBridge {
    slot: Mutex<Option<Slot>>,
    generations: AtomicU64,
}

impl std::fmt::Debug for CancelBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelBridge")
            .field("token", &self.token())
            .finish_non_exhaustive()
    }
}

impl CancelBridge {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Slot>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create the token for a new transaction, replacing a stale one
    pub fn begin_transaction(&self) -> CancellationToken {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let token = CancellationToken {
            cancelled: false,
            generation,
        };

        let mut slot = self.lock();
        if let Some(stale) = slot.as_ref() {
            tracing::warn!(
                stale = stale.token.generation,
                generation,
                "cancellation token was not cleared, replacing it"
            );
        }
        *slot = Some(Slot {
            token,
            interrupt: None,
        });
        token
    }

    /// Mark the transaction cancelled.
    ///
    /// Returns `true` when this call did the cancelling; the interrupt hook
    /// only fires then.
    ///
    /// # Errors
    ///
    /// Returns `TransactionError::NoActiveTransaction` when no transaction
    /// is running.
    pub fn request_cancel(&self) -> Result<bool, TransactionError> {
        let hook = {
            let mut slot = self.lock();
            let slot = slot.as_mut().ok_or(TransactionError::NoActiveTransaction)?;
            if slot.token.cancelled {
                return Ok(false);
            }
            slot.token.cancelled = true;
            slot.interrupt.clone()
        };

        if let Some(hook) = hook {
            hook.interrupt();
        }
        Ok(true)
    }

    /// Attach the engine interrupt for the running transaction; fires
    /// immediately if cancellation was already requested.
    ///
    /// # Errors
    ///
    /// Returns `TransactionError::NoActiveTransaction` when no transaction
    /// is running.
    pub fn register_interrupt(&self, hook: Arc<dyn Interrupt>) -> Result<(), TransactionError> {
        let fire = {
            let mut slot = self.lock();
            let slot = slot.as_mut().ok_or(TransactionError::NoActiveTransaction)?;
            slot.interrupt = Some(Arc::clone(&hook));
            slot.token.cancelled
        };

        if fire {
            hook.interrupt();
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `TransactionError::NoActiveTransaction` when no transaction
    /// is running.
    pub fn is_cancelled(&self) -> Result<bool, TransactionError> {
        self.lock()
            .as_ref()
            .map(|slot| slot.token.cancelled)
            .ok_or(TransactionError::NoActiveTransaction)
    }

    /// Drop the token and report whether it had been cancelled
    pub fn finish_transaction(&self) -> bool {
        self.lock().take().is_some_and(|slot| slot.token.cancelled)
    }

    #[must_use]
    pub fn token(&self) -> Option<CancellationToken> {
        self.lock().as_ref().map(|slot| slot.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_hook() -> (Arc<AtomicUsize>, Arc<dyn Interrupt>) {
        let count = Arc::new(AtomicUsize::new(0));
        let hook_count = Arc::clone(&count);
        let hook: Arc<dyn Interrupt> = Arc::new(move || {
            hook_count.fetch_add(1, Ordering::SeqCst);
        });
        (count, hook)
    }

    #[test]
    fn test_cancel_fires_interrupt_once() {
        let bridge = CancelBridge::new();
        let (count, hook) = counting_hook();

        bridge.begin_transaction();
        bridge.register_interrupt(hook).unwrap();
        assert!(!bridge.is_cancelled().unwrap());

        assert!(bridge.request_cancel().unwrap());
        assert!(!bridge.request_cancel().unwrap());
        assert!(bridge.is_cancelled().unwrap());
        assert_eq!(count.load(Ordering::SeqCst), 1);

        assert!(bridge.finish_transaction());
    }

    #[test]
    fn test_late_registration_fires_immediately() {
        let bridge = CancelBridge::new();
        let (count, hook) = counting_hook();

        bridge.begin_transaction();
        bridge.request_cancel().unwrap();
        bridge.register_interrupt(hook).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_no_token_is_a_usage_error() {
        let bridge = CancelBridge::new();
        assert!(matches!(
            bridge.is_cancelled(),
            Err(TransactionError::NoActiveTransaction)
        ));
        assert!(bridge.request_cancel().is_err());

        bridge.begin_transaction();
        assert!(!bridge.finish_transaction());
        assert!(bridge.is_cancelled().is_err());
        assert!(!bridge.finish_transaction());
    }

    #[test]
    fn test_stale_token_is_replaced() {
        let bridge = CancelBridge::new();
        let first = bridge.begin_transaction();
        bridge.request_cancel().unwrap();

        let second = bridge.begin_transaction();
        assert!(second.generation > first.generation);
        assert!(!bridge.is_cancelled().unwrap());
    }
}
