//! Cooperative cancellation for test runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use confgate_core::PipelineError;

/// A shared cancellation signal.
///
/// Clones observe the same flag. Evaluation polls it between documents and
/// between namespaces; once set it stays set.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// A flag that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// `Err(Cancelled)` once cancellation was requested.
    pub fn check(&self) -> Result<(), PipelineError> {
        if self.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// A guard that cancels this flag when dropped, unless disarmed.
    ///
    /// HTTP handlers hold one for the lifetime of the request future: if the
    /// client goes away the future is dropped and the blocking evaluation
    /// stops at its next check.
    pub fn guard(&self) -> CancelOnDrop {
        CancelOnDrop {
            flag: Some(self.clone()),
        }
    }
}

/// Cancels its [`CancelFlag`] on drop. See [`CancelFlag::guard`].
#[derive(Debug)]
pub struct CancelOnDrop {
    flag: Option<CancelFlag>,
}

impl CancelOnDrop {
    /// Drop without cancelling.
    pub fn disarm(mut self) {
        self.flag = None;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(flag) = self.flag.take() {
            flag.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let flag = CancelFlag::new();
        let other = flag.clone();
        assert!(flag.check().is_ok());
        other.cancel();
        assert!(flag.is_cancelled());
        assert!(matches!(flag.check(), Err(PipelineError::Cancelled)));
    }

    #[test]
    fn guard_cancels_on_drop() {
        let flag = CancelFlag::new();
        drop(flag.guard());
        assert!(flag.is_cancelled());
    }

    #[test]
    fn disarmed_guard_leaves_flag_alone() {
        let flag = CancelFlag::new();
        flag.guard().disarm();
        assert!(!flag.is_cancelled());
    }
}
