//! # Invocation Tracing
//!
//! Observability for interpreted programs without touching the engine:
//! [`Recorded`] wraps any capability implementation and appends each
//! operation name to a shared [`InvocationLog`] before delegating. Because
//! recording happens at the handler boundary, the log reflects the exact
//! order the execution context dispatched operations — which is what the
//! ordering guarantees are stated in terms of.
//!
//! Wrapping is per-capability and explicit; an uninstrumented run pays
//! nothing.

use std::sync::{Arc, Mutex};

use crate::capability::{Capability, Handles, Request};
use crate::error::OperationError;

/// Shared, append-only record of dispatched operation names.
#[derive(Clone, Default)]
pub struct InvocationLog {
    entries: Arc<Mutex<Vec<&'static str>>>,
}

impl InvocationLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one operation name.
    pub fn record(&self, operation: &'static str) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.push(operation);
    }

    /// Snapshot of recorded names, in dispatch order.
    pub fn names(&self) -> Vec<&'static str> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of recorded invocations.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A capability wrapper that records every invocation before delegating.
pub struct Recorded<C> {
    inner: Arc<C>,
    log: InvocationLog,
}

impl<C> Recorded<C> {
    /// Wrap a capability so its invocations land in `log`.
    pub fn new(inner: Arc<C>, log: InvocationLog) -> Self {
        Self { inner, log }
    }
}

impl<C: Capability> Capability for Recorded<C> {
    fn capability_name(&self) -> &'static str {
        self.inner.capability_name()
    }
}

impl<C, R> Handles<R> for Recorded<C>
where
    C: Handles<R>,
    R: Request,
{
    fn handle(&self, req: R) -> Result<R::Response, OperationError> {
        self.log.record(R::name());
        self.inner.handle(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ping;

    impl Request for Ping {
        type Response = String;
        fn name() -> &'static str {
            "Ping"
        }
    }

    struct Pong;

    impl Request for Pong {
        type Response = String;
        fn name() -> &'static str {
            "Pong"
        }
    }

    struct Service;

    impl Capability for Service {
        fn capability_name(&self) -> &'static str {
            "Service"
        }
    }

    impl Handles<Ping> for Service {
        fn handle(&self, _: Ping) -> Result<String, OperationError> {
            Ok("ping".to_string())
        }
    }

    impl Handles<Pong> for Service {
        fn handle(&self, _: Pong) -> Result<String, OperationError> {
            Ok("pong".to_string())
        }
    }

    #[test]
    fn test_recorded_delegates_and_logs_in_order() {
        let log = InvocationLog::new();
        let recorded = Recorded::new(Arc::new(Service), log.clone());

        assert_eq!(recorded.handle(Ping).unwrap(), "ping");
        assert_eq!(recorded.handle(Pong).unwrap(), "pong");
        assert_eq!(recorded.handle(Ping).unwrap(), "ping");

        assert_eq!(log.names(), vec!["Ping", "Pong", "Ping"]);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_log_clones_share_entries() {
        let log = InvocationLog::new();
        let alias = log.clone();
        log.record("Ping");
        assert_eq!(alias.names(), vec!["Ping"]);
        assert!(!alias.is_empty());
    }

    #[test]
    fn test_recorded_keeps_capability_name() {
        let recorded = Recorded::new(Arc::new(Service), InvocationLog::new());
        assert_eq!(recorded.capability_name(), "Service");
    }
}
