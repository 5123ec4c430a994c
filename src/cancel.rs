//! Cooperative cancellation for diagnostic queries
//!
//! Tokens are polled, never preemptive. The router checks at every partition
//! boundary at minimum; a cancelled query stops making further compiler calls
//! promptly but does not roll back work already done for processed files.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::QueryError;

/// Shared cancellation flag a host can trip while a query is in flight.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Queries observe it at their next poll point.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Poll point: surfaces the distinct cancelled outcome.
    pub fn check(&self) -> Result<(), QueryError> {
        if self.is_cancelled() {
            Err(QueryError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Poll an optional host-provided token.
pub(crate) fn check_opt(token: Option<&CancellationToken>) -> Result<(), QueryError> {
    match token {
        Some(token) => token.check(),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_live() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert!(token.check().is_ok());
        assert!(check_opt(None).is_ok());
    }

    #[test]
    fn cancelled_token_surfaces_the_cancelled_outcome() {
        let token = CancellationToken::new();
        let observer = token.clone();

        token.cancel();

        assert!(observer.is_cancelled());
        assert_eq!(observer.check(), Err(QueryError::Cancelled));
        assert_eq!(check_opt(Some(&observer)), Err(QueryError::Cancelled));
    }
}
