//! # Capabilities and Operations
//!
//! A capability is defined by the requests it can handle, not by a name.
//! Instead of asking "is this an image reader?", we ask "can this handle
//! `ReadImage`?". The pieces:
//!
//! - [`Request`]: one operation kind — its payload and its response type
//! - [`Capability`]: marker trait for implementations
//! - [`Handles<R>`]: "this capability handles requests of type R"
//! - [`Operation`]: a single request, type-erased so programs can carry
//!   operations from any number of capabilities in one structure
//!
//! Capability implementations own every external resource (files, contexts,
//! progress counters); the core never looks inside a request payload.
//!
//! ## Extensibility
//!
//! New operation kinds need no changes to this crate:
//!
//! ```rust
//! use effect_core::Request;
//!
//! struct Deskew { angle: f64, factor: f64 }
//!
//! impl Request for Deskew {
//!     type Response = Vec<f64>;
//!     fn name() -> &'static str { "Deskew" }
//! }
//! ```

use std::any::{Any, TypeId};
use std::fmt;

use crate::error::OperationError;

/// One operation kind belonging to a capability.
///
/// The `Default` bound on the response is what makes dry runs possible: a
/// halted operation yields `Response::default()` as its placeholder, so any
/// downstream continuation still receives a value of the type it expects.
pub trait Request: Send + 'static {
    /// The value produced when this request is handled.
    type Response: Send + Default + 'static;

    /// Stable operation name, used in coverage errors and traces.
    fn name() -> &'static str;
}

/// Marker trait for capability implementations.
///
/// One implementation may handle several request types by implementing
/// [`Handles<R>`] for each of them.
pub trait Capability: Send + Sync + 'static {
    /// Human-readable name for this implementation.
    fn capability_name(&self) -> &'static str;
}

/// A capability that can handle requests of type `R`.
///
/// This is the total mapping from one operation kind to its effect. Handlers
/// are synchronous on purpose: the execution context decides where and when
/// a handler runs, and an operation itself is never a suspension point.
///
/// # Example
///
/// ```rust
/// use effect_core::{Capability, Handles, OperationError, Request};
///
/// struct Ping;
/// impl Request for Ping {
///     type Response = String;
///     fn name() -> &'static str { "Ping" }
/// }
///
/// struct PingService;
/// impl Capability for PingService {
///     fn capability_name(&self) -> &'static str { "PingService" }
/// }
///
/// impl Handles<Ping> for PingService {
///     fn handle(&self, _req: Ping) -> Result<String, OperationError> {
///         Ok("pong".to_string())
///     }
/// }
/// ```
pub trait Handles<R: Request>: Capability {
    /// Handle a request and return its response.
    fn handle(&self, req: R) -> Result<R::Response, OperationError>;
}

/// A single capability operation, type-erased.
///
/// This is the leaf payload of a program. The request is opaque data until an
/// interpreter dispatches it; the tag identifies which handler that is. A
/// halted operation keeps its tag (so coverage is still checked) but is never
/// handed to the real handler.
pub struct Operation {
    request: Box<dyn Any + Send>,
    tag: TypeId,
    name: &'static str,
    halted: bool,
}

impl Operation {
    /// Wrap a typed request as an opaque operation.
    pub fn new<R: Request>(request: R) -> Self {
        Self {
            request: Box::new(request),
            tag: TypeId::of::<R>(),
            name: R::name(),
            halted: false,
        }
    }

    /// The request type tag interpreters dispatch on.
    pub fn tag(&self) -> TypeId {
        self.tag
    }

    /// The operation's stable name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether this operation has been stripped of its effect.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Mark this operation as effect-free. Dispatch will check coverage and
    /// yield the handler's placeholder instead of invoking it.
    pub(crate) fn halted(mut self) -> Self {
        self.halted = true;
        self
    }

    /// Surrender the erased request for dispatch.
    pub(crate) fn into_request(self) -> Box<dyn Any + Send> {
        self.request
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("halted", &self.halted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo(String);

    impl Request for Echo {
        type Response = String;
        fn name() -> &'static str {
            "Echo"
        }
    }

    #[test]
    fn test_operation_carries_name_and_tag() {
        let op = Operation::new(Echo("hello".to_string()));
        assert_eq!(op.name(), "Echo");
        assert_eq!(op.tag(), TypeId::of::<Echo>());
        assert!(!op.is_halted());
    }

    #[test]
    fn test_halted_keeps_tag() {
        let op = Operation::new(Echo("hello".to_string())).halted();
        assert!(op.is_halted());
        assert_eq!(op.tag(), TypeId::of::<Echo>());
    }

    #[test]
    fn test_request_survives_erasure() {
        let op = Operation::new(Echo("round trip".to_string()));
        let request = op
            .into_request()
            .downcast::<Echo>()
            .expect("erased request should downcast to its own type");
        assert_eq!(request.0, "round trip");
    }
}
