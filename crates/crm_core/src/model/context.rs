//! Per-call context: caller identity and cancellation.
//!
//! # Responsibility
//! - Carry the authenticated principal from transport into the service.
//! - Carry a cancellation/deadline signal down to every store round trip.
//!
//! # Invariants
//! - A `Principal` always holds a non-empty token.
//! - Once cancelled, a `Cancellation` never becomes live again.

use crate::model::validation::{require_non_empty, ValidationError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Opaque authenticated caller token.
///
/// Core code only relies on its presence and never inspects its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal(String);

impl Principal {
    pub fn new(token: impl Into<String>) -> Result<Self, ValidationError> {
        let token = token.into();
        require_non_empty("principal", &token)?;
        Ok(Self(token))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
}

/// Cloneable cancellation signal with an optional deadline.
///
/// Clones share state: cancelling one cancels all.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    state: Arc<CancelState>,
}

impl Cancellation {
    /// A signal that is only cancelled explicitly.
    pub fn new() -> Self {
        Self::default()
    }

    /// A signal that also fires once `timeout` has elapsed.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            state: Arc::new(CancelState {
                cancelled: AtomicBool::new(false),
                deadline: Some(deadline),
            }),
        }
    }

    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        if self.state.cancelled.load(Ordering::SeqCst) {
            return true;
        }
        match self.state.deadline {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.state.deadline
    }
}

/// What the service receives from transport for every call.
#[derive(Debug, Clone)]
pub struct CallContext {
    principal: Principal,
    cancellation: Cancellation,
}

impl CallContext {
    pub fn new(principal: Principal) -> Self {
        Self::with_cancellation(principal, Cancellation::new())
    }

    pub fn with_cancellation(principal: Principal, cancellation: Cancellation) -> Self {
        Self {
            principal,
            cancellation,
        }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn cancellation(&self) -> &Cancellation {
        &self.cancellation
    }
}

#[cfg(test)]
mod tests {
    use super::{Cancellation, Principal};
    use std::time::Duration;

    #[test]
    fn principal_requires_token() {
        assert!(Principal::new("").is_err());
        assert_eq!(Principal::new("svc-backoffice").unwrap().as_str(), "svc-backoffice");
    }

    #[test]
    fn cancel_is_shared_between_clones() {
        let token = Cancellation::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn elapsed_deadline_counts_as_cancelled() {
        let token = Cancellation::with_timeout(Duration::ZERO);
        assert!(token.is_cancelled());
        assert!(token.deadline().is_some());

        let live = Cancellation::with_timeout(Duration::from_secs(3600));
        assert!(!live.is_cancelled());
    }
}
