//! # effect-core - Effect Programs as Data
//!
//! This crate separates three decisions that imperative code fuses together:
//!
//! - **What work exists and what depends on what** — a [`Program`], built
//!   from capability operations with two composition rules: dependent
//!   chaining ([`Program::then`]) and independent grouping ([`Program::all`]).
//! - **What each operation means** — an [`Interpreter`], composed from
//!   per-capability handlers covering the tagged union of everything the
//!   program references.
//! - **How the fold actually runs** — an [`ExecutionContext`]:
//!   [`Immediate`] (single-threaded, declaration order) or [`Deferred`]
//!   (tokio workers per independent branch).
//!
//! A program fixes shape; a context picks policy. "May run in parallel" is
//! not "must run in parallel": the same batch interprets correctly under
//! either context, with positional results and deterministic failure
//! reporting either way. [`halt`] turns any program into an effect-free
//! twin for dry-run validation, and [`ProgramShape`] summarizes structure
//! for inspection.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use effect_core::{
//!     Capability, Handles, Immediate, Interpreter, OperationError, Program, Request,
//! };
//!
//! struct Double(i64);
//! impl Request for Double {
//!     type Response = i64;
//!     fn name() -> &'static str { "Double" }
//! }
//!
//! struct Math;
//! impl Capability for Math {
//!     fn capability_name(&self) -> &'static str { "Math" }
//! }
//! impl Handles<Double> for Math {
//!     fn handle(&self, req: Double) -> Result<i64, OperationError> {
//!         Ok(req.0 * 2)
//!     }
//! }
//!
//! let interpreter = Interpreter::new()
//!     .with::<Math, Double>(Arc::new(Math))
//!     .unwrap();
//!
//! let program = Program::invoke(Double(21))
//!     .then_with::<Double, _>(|n| Program::invoke(Double(n)));
//!
//! let out = Immediate::run_blocking(program, &interpreter).unwrap();
//! assert_eq!(out.downcast::<i64>(), Some(84));
//! ```

pub mod capability;
pub mod error;
pub mod exec;
pub mod halt;
pub mod interpreter;
pub mod program;
pub mod shape;
pub mod trace;

// Re-export key types at crate root for convenience
pub use capability::{Capability, Handles, Operation, Request};
pub use error::{ComposeError, OperationError, RunError};
pub use exec::{run, BoxFuture, Deferred, ExecutionContext, Immediate};
pub use halt::halt;
pub use interpreter::Interpreter;
pub use program::{Continuation, Output, Probe, Program};
pub use shape::ProgramShape;
pub use trace::{InvocationLog, Recorded};
