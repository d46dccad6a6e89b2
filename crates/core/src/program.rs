//! # Programs - Effect Composition as Data
//!
//! A program is a description of work, not the work itself. Instead of
//! imperative "read, then deskew, then write", we build a value that records
//! the composition and interpret it later — possibly several times, under
//! different interpreters and execution strategies.
//!
//! Two composition rules cover everything:
//!
//! - [`Program::then`]: dependent chaining — the next step may use the
//!   previous step's result, so the two always run in that order.
//! - [`Program::all`]: independent branches — no branch may observe another's
//!   result, so a context is free (but never required) to run them at once.
//!
//! Dependencies are only expressible through `then`. `all` declares
//! *opportunity* for parallelism; the execution context decides *policy*.
//!
//! ## Dual shapes
//!
//! "N independent pipelines, each internally ordered" and "one ordered
//! pipeline whose step is a batch" are two nestings of the same class of
//! programs. [`Program::into_branch`] embeds a chain as one element of a
//! group; [`Program::into_step`] embeds a group as one step of a chain,
//! which forces the whole group to resolve before the chain continues.

use std::any::Any;
use std::fmt;

use crate::capability::{Operation, Request};
use crate::error::RunError;

/// The type-erased result of running a program.
#[derive(Default)]
pub enum Output {
    /// No interesting value.
    #[default]
    Unit,
    /// A single capability response.
    Value(Box<dyn Any + Send>),
    /// Positional results of an independent group: slot `i` always belongs to
    /// the branch declared at position `i`, never to completion order.
    Group(Vec<Output>),
}

impl Output {
    /// Wrap a typed value.
    pub fn value<T: Send + 'static>(value: T) -> Self {
        Output::Value(Box::new(value))
    }

    /// Recover a typed value, or `None` if this output holds something else.
    pub fn downcast<T: Send + 'static>(self) -> Option<T> {
        match self {
            Output::Value(boxed) => boxed.downcast::<T>().ok().map(|b| *b),
            _ => None,
        }
    }

    /// Recover the positional results of a group.
    pub fn into_group(self) -> Option<Vec<Output>> {
        match self {
            Output::Group(outputs) => Some(outputs),
            _ => None,
        }
    }

    /// Collapse a one-element group to its only member. A group of any other
    /// size is already the single aggregate value of its step.
    pub(crate) fn flatten_singleton(self) -> Output {
        match self {
            Output::Group(mut outputs) if outputs.len() == 1 => {
                outputs.pop().unwrap_or(Output::Unit)
            }
            other => other,
        }
    }
}

// Manual Debug: the boxed value is opaque.
impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Unit => write!(f, "Unit"),
            Output::Value(_) => write!(f, "Value(<erased>)"),
            Output::Group(outputs) => f.debug_tuple("Group").field(outputs).finish(),
        }
    }
}

/// A dependent continuation: receives the previous step's output and builds
/// the rest of the program.
///
/// Continuations are pure builders and may be called more than once: a run
/// calls one with the live output, and coverage checking calls it with a
/// placeholder to discover the operations it builds before anything
/// executes. Closures that need owned captures clone them per call.
pub type Continuation = Box<dyn Fn(Output) -> Program + Send>;

/// Produces the placeholder a continuation is probed with during coverage
/// checking: the default response of the step it follows, or
/// [`Output::Unit`] for untyped chaining.
pub type Probe = Box<dyn Fn() -> Output + Send>;

/// An immutable description of composed capability operations.
///
/// Built once, interpreted zero or more times, and inert until a run folds it
/// against an [`Interpreter`](crate::Interpreter) inside an execution
/// context. A program owns no external resources; those belong to the
/// capability implementations reached through the interpreter.
pub enum Program {
    /// An already-resolved value. Performs no capability call.
    Pure(Output),
    /// An immediate failure. Performs no capability call.
    Fail(RunError),
    /// A single capability operation — the unit of work.
    Op(Operation),
    /// Dependent chaining: run the first program, feed its output to the
    /// continuation, run what it returns. Always left-to-right, never
    /// overlapped. The probe lets coverage checking look through the
    /// continuation without dispatching anything.
    Then(Box<Program>, Continuation, Probe),
    /// Independent branches with no data dependencies between them, results
    /// aggregated positionally.
    All(Vec<Program>),
}

impl Program {
    /// Lift a single request into the minimal program.
    pub fn invoke<R: Request>(request: R) -> Program {
        Program::Op(Operation::new(request))
    }

    /// A program that resolves to the given value without any effect.
    pub fn pure<T: Send + 'static>(value: T) -> Program {
        Program::Pure(Output::value(value))
    }

    /// A program that resolves to [`Output::Unit`].
    pub fn unit() -> Program {
        Program::Pure(Output::Unit)
    }

    /// A program that fails immediately with the given error.
    pub fn fail(error: RunError) -> Program {
        Program::Fail(error)
    }

    /// Dependent chaining on the raw, type-erased output.
    ///
    /// The continuation runs only after `self` has fully resolved; if `self`
    /// fails, the continuation is abandoned and the failure is the chain's
    /// result. Coverage checking probes the continuation with
    /// [`Output::Unit`]; use [`then_with`](Self::then_with) when the
    /// continuation expects the previous step's typed response.
    pub fn then<F>(self, next: F) -> Program
    where
        F: Fn(Output) -> Program + Send + 'static,
    {
        Program::Then(Box::new(self), Box::new(next), Box::new(|| Output::Unit))
    }

    /// Dependent chaining with a typed view of the previous response.
    ///
    /// Downcasts the prior output to `R::Response`; a mismatch fails the run
    /// with [`RunError::TypeMismatch`] instead of invoking the continuation.
    /// Coverage checking probes the continuation with `R::Response::default()`.
    pub fn then_with<R, F>(self, next: F) -> Program
    where
        R: Request,
        F: Fn(R::Response) -> Program + Send + 'static,
    {
        let step = move |output: Output| match output.downcast::<R::Response>() {
            Some(response) => next(response),
            None => Program::Fail(RunError::TypeMismatch {
                operation: R::name(),
            }),
        };
        Program::Then(
            Box::new(self),
            Box::new(step),
            Box::new(|| Output::value(R::Response::default())),
        )
    }

    /// Group independent programs. No branch may observe another's result;
    /// the group resolves to an [`Output::Group`] in declaration order.
    pub fn all(branches: Vec<Program>) -> Program {
        Program::All(branches)
    }

    /// Embed a dependent chain as the single element of an independent group,
    /// e.g. to make one file's whole pipeline a branch of a batch.
    pub fn into_branch(self) -> Program {
        Program::All(vec![self])
    }

    /// Embed an independent group as one step of a dependent chain.
    ///
    /// A chain step must resolve to a single value before the next
    /// continuation can run, so folding a group into a chain necessarily
    /// waits for every branch. A singleton group resolves to its element's
    /// own output, which makes `chain.into_branch().into_step()` equivalent
    /// to `chain`.
    pub fn into_step(self) -> Program {
        self.then(|output| Program::Pure(output.flatten_singleton()))
    }

    /// Visit every operation reachable without running continuations.
    pub fn visit_ops(&self, visit: &mut dyn FnMut(&Operation)) {
        match self {
            Program::Pure(_) | Program::Fail(_) => {}
            Program::Op(op) => visit(op),
            Program::Then(first, _, _) => first.visit_ops(visit),
            Program::All(branches) => {
                for branch in branches {
                    branch.visit_ops(visit);
                }
            }
        }
    }

    /// Number of operations reachable without running continuations.
    pub fn op_count(&self) -> usize {
        let mut count = 0;
        self.visit_ops(&mut |_| count += 1);
        count
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Program").field(&self.shape()).finish()
    }
}
