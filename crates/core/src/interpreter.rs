//! # Interpreter - Capability Coproduct Dispatch
//!
//! An [`Interpreter`] combines any number of per-capability handlers into one
//! function that covers every operation a program references. Dispatch is by
//! request type tag: the registry maps each operation kind to exactly one
//! handler.
//!
//! Coverage is a composition-time property, not a run-time discovery:
//!
//! - registering the same operation kind twice is rejected, so the order in
//!   which interpreters are combined can never change what a run does;
//! - [`Interpreter::check_coverage`] is called before the first operation of
//!   a run executes, and it walks chains through their continuations by
//!   probing them with placeholder responses, so a missing handler fails the
//!   run up front rather than halfway through a batch — even when the leaf
//!   only exists after a closure runs.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use effect_core::{Capability, Handles, Interpreter, OperationError, Request};
//!
//! struct Greet(String);
//! impl Request for Greet {
//!     type Response = String;
//!     fn name() -> &'static str { "Greet" }
//! }
//!
//! struct Greeter;
//! impl Capability for Greeter {
//!     fn capability_name(&self) -> &'static str { "Greeter" }
//! }
//! impl Handles<Greet> for Greeter {
//!     fn handle(&self, req: Greet) -> Result<String, OperationError> {
//!         Ok(format!("Hello, {}!", req.0))
//!     }
//! }
//!
//! let mut interpreter = Interpreter::new();
//! interpreter.register::<Greeter, Greet>(Arc::new(Greeter)).unwrap();
//! assert!(interpreter.covers::<Greet>());
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::capability::{Handles, Operation, Request};
use crate::error::{ComposeError, RunError};
use crate::program::{Output, Program};

/// Type-erased handler entry for dispatch.
trait ErasedHandler: Send + Sync {
    /// The operation kind this entry covers.
    fn operation(&self) -> &'static str;

    /// Invoke the real handler on an erased request.
    fn invoke(&self, request: Box<dyn Any + Send>) -> Result<Box<dyn Any + Send>, RunError>;

    /// The typed placeholder a halted operation yields instead of running.
    fn placeholder(&self) -> Box<dyn Any + Send>;
}

struct HandlerEntry<C, R> {
    capability: Arc<C>,
    _request: PhantomData<fn(R) -> R>,
}

impl<C, R> ErasedHandler for HandlerEntry<C, R>
where
    C: Handles<R>,
    R: Request,
{
    fn operation(&self) -> &'static str {
        R::name()
    }

    fn invoke(&self, request: Box<dyn Any + Send>) -> Result<Box<dyn Any + Send>, RunError> {
        let request = request
            .downcast::<R>()
            .map_err(|_| RunError::TypeMismatch {
                operation: R::name(),
            })?;
        let response = self
            .capability
            .handle(*request)
            .map_err(|source| RunError::operation(R::name(), source))?;
        Ok(Box::new(response))
    }

    fn placeholder(&self) -> Box<dyn Any + Send> {
        Box::new(R::Response::default())
    }
}

/// A combined interpreter covering the tagged union of all registered
/// capabilities.
#[derive(Default)]
pub struct Interpreter {
    handlers: HashMap<TypeId, Box<dyn ErasedHandler>>,
}

impl Interpreter {
    /// Create an interpreter covering nothing.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a capability for one operation kind.
    ///
    /// Fails with [`ComposeError::DuplicateHandler`] if the operation is
    /// already covered.
    pub fn register<C, R>(&mut self, capability: Arc<C>) -> Result<(), ComposeError>
    where
        C: Handles<R>,
        R: Request,
    {
        if self.handlers.contains_key(&TypeId::of::<R>()) {
            return Err(ComposeError::DuplicateHandler {
                operation: R::name(),
            });
        }
        let entry = HandlerEntry {
            capability,
            _request: PhantomData,
        };
        self.handlers.insert(TypeId::of::<R>(), Box::new(entry));
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<C, R>(mut self, capability: Arc<C>) -> Result<Self, ComposeError>
    where
        C: Handles<R>,
        R: Request,
    {
        self.register::<C, R>(capability)?;
        Ok(self)
    }

    /// Combine per-capability interpreters into one.
    ///
    /// Overlapping coverage is rejected, which keeps composition associative
    /// and commutative in constitution: any grouping or ordering of the same
    /// parts either fails identically or yields the same interpreter.
    pub fn compose<I>(parts: I) -> Result<Interpreter, ComposeError>
    where
        I: IntoIterator<Item = Interpreter>,
    {
        let mut combined = Interpreter::new();
        for part in parts {
            for (tag, entry) in part.handlers {
                if combined.handlers.contains_key(&tag) {
                    return Err(ComposeError::DuplicateHandler {
                        operation: entry.operation(),
                    });
                }
                combined.handlers.insert(tag, entry);
            }
        }
        Ok(combined)
    }

    /// Whether requests of type `R` are covered.
    pub fn covers<R: Request>(&self) -> bool {
        self.handlers.contains_key(&TypeId::of::<R>())
    }

    /// Verify that every operation `program` can dispatch is covered,
    /// including operations built later by continuations.
    ///
    /// Chains are walked by feeding each continuation its probe placeholder
    /// (the default response of the step it follows), so leaves hidden
    /// behind unexecuted closures are checked without invoking any handler.
    /// A continuation that builds different operations depending on the
    /// live value is checked along the placeholder path.
    pub fn check_coverage(&self, program: &Program) -> Result<(), ComposeError> {
        match program {
            Program::Pure(_) | Program::Fail(_) => Ok(()),
            Program::Op(op) => {
                if self.handlers.contains_key(&op.tag()) {
                    Ok(())
                } else {
                    Err(ComposeError::MissingHandler {
                        operation: op.name(),
                    })
                }
            }
            Program::Then(first, next, probe) => {
                self.check_coverage(first)?;
                self.check_coverage(&next(probe()))
            }
            Program::All(branches) => {
                for branch in branches {
                    self.check_coverage(branch)?;
                }
                Ok(())
            }
        }
    }

    /// Dispatch one operation to its handler.
    ///
    /// A halted operation still resolves its handler (so coverage errors
    /// surface) but yields the typed placeholder instead of invoking it.
    pub(crate) fn dispatch(&self, operation: Operation) -> Result<Output, RunError> {
        let handler =
            self.handlers
                .get(&operation.tag())
                .ok_or(ComposeError::MissingHandler {
                    operation: operation.name(),
                })?;
        if operation.is_halted() {
            return Ok(Output::Value(handler.placeholder()));
        }
        let response = handler.invoke(operation.into_request())?;
        Ok(Output::Value(response))
    }

    /// Number of covered operation kinds.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether nothing is covered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("operations", &self.handlers.len())
            .finish()
    }
}
