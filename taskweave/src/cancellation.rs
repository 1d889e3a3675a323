//! Cooperative cancellation for workflow runs.
//!
//! A [`CancellationTokenSource`] owns the cancellation state and hands out
//! cheap [`CancellationToken`] clones. The workflow engine polls the token
//! between steps only; a sub-task that is already running always finishes
//! (or fails) on its own terms.
//!
//! # Example
//!
//! ```
//! use taskweave::cancellation::CancellationTokenSource;
//!
//! let source = CancellationTokenSource::new();
//! let token = source.token();
//!
//! assert!(!token.is_cancelled());
//! source.cancel();
//! assert!(token.is_cancelled());
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Thread-safe cancellation token.
///
/// Cloning a token creates a new reference to the same cancellation state.
#[derive(Clone, Debug)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns true if the token has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Owner of a cancellation token.
#[derive(Clone, Debug)]
pub struct CancellationTokenSource {
    token: CancellationToken,
}

impl CancellationTokenSource {
    /// Creates a new source with a fresh, non-cancelled token.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Returns a token observing this source.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Cancels every token handed out by this source. Idempotent.
    pub fn cancel(&self) {
        self.token.cancelled.store(true, Ordering::SeqCst);
    }
}

impl Default for CancellationTokenSource {
    fn default() -> Self {
        Self::new()
    }
}
