//! # Execution Contexts - Folding Programs into Results
//!
//! A program declares shape; an execution context decides policy. The same
//! program can be folded by [`Immediate`] (single-threaded, depth-first,
//! declaration order) or by [`Deferred`] (tokio workers, one task per
//! independent branch) without changing which operations run or how their
//! results aggregate.
//!
//! Guarantees shared by every context:
//!
//! - within a dependent chain, operations execute in program order, never
//!   reordered, never overlapped;
//! - independent branches aggregate positionally: result `i` belongs to the
//!   branch declared at position `i`, regardless of completion order;
//! - a failing chain abandons its continuation; a failing group reports the
//!   lowest-indexed failing branch, deterministically, under both contexts;
//! - suspension only happens between steps and at group aggregation, never
//!   inside an operation.
//!
//! Cancellation is the context's own affair: the core provides no token, and
//! siblings of a failed branch are not stopped — they complete and their
//! results are discarded.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::RunError;
use crate::interpreter::Interpreter;
use crate::program::{Output, Program};

/// A boxed future, used so context implementations can recurse.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A strategy for folding a program against an interpreter.
pub trait ExecutionContext: Send + Sync {
    /// Fold the whole program to a single output or the run's one error.
    fn execute(
        &self,
        program: Program,
        interpreter: Arc<Interpreter>,
    ) -> BoxFuture<'static, Result<Output, RunError>>;
}

/// Run a program: check coverage of every operation it can dispatch —
/// probing continuations with placeholders — then fold under the chosen
/// context. No operation executes if any leaf is uncovered.
///
/// This is the sole execution entry point. The same program value cannot be
/// rerun (it is consumed), but an equivalent one can be rebuilt and folded
/// against a different interpreter or context.
pub async fn run(
    program: Program,
    interpreter: Arc<Interpreter>,
    context: &dyn ExecutionContext,
) -> Result<Output, RunError> {
    interpreter.check_coverage(&program)?;
    context.execute(program, interpreter).await
}

// ============================================================================
// Immediate context
// ============================================================================

/// Single-threaded, exception-propagating context.
///
/// Group branches run to completion one after another in declaration order,
/// so the first failure encountered is also the lowest-indexed one.
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate;

impl Immediate {
    /// Fold synchronously, without any async runtime.
    ///
    /// Convenience for callers that never use [`Deferred`]; semantics are
    /// identical to `run(program, interpreter, &Immediate)`.
    pub fn run_blocking(program: Program, interpreter: &Interpreter) -> Result<Output, RunError> {
        interpreter.check_coverage(&program)?;
        fold_inline(program, interpreter)
    }
}

impl ExecutionContext for Immediate {
    fn execute(
        &self,
        program: Program,
        interpreter: Arc<Interpreter>,
    ) -> BoxFuture<'static, Result<Output, RunError>> {
        let result = fold_inline(program, &interpreter);
        Box::pin(std::future::ready(result))
    }
}

fn fold_inline(program: Program, interpreter: &Interpreter) -> Result<Output, RunError> {
    match program {
        Program::Pure(output) => Ok(output),
        Program::Fail(error) => Err(error),
        Program::Op(operation) => interpreter.dispatch(operation),
        Program::Then(first, next, _) => {
            let output = fold_inline(*first, interpreter)?;
            let rest = next(output);
            // A continuation whose structure depends on the live value may
            // diverge from the probed path; re-check before folding it.
            interpreter.check_coverage(&rest)?;
            fold_inline(rest, interpreter)
        }
        Program::All(branches) => {
            let mut outputs = Vec::with_capacity(branches.len());
            for branch in branches {
                outputs.push(fold_inline(branch, interpreter)?);
            }
            Ok(Output::Group(outputs))
        }
    }
}

// ============================================================================
// Deferred context
// ============================================================================

/// Multi-worker context backed by tokio.
///
/// Each group branch is dispatched as its own task and runs its full chain
/// independently. Join handles are awaited in declaration order, so
/// aggregation stays positional and the reported failure is the
/// lowest-indexed failing branch no matter which branch failed first in real
/// time.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deferred;

impl ExecutionContext for Deferred {
    fn execute(
        &self,
        program: Program,
        interpreter: Arc<Interpreter>,
    ) -> BoxFuture<'static, Result<Output, RunError>> {
        fold_deferred(program, interpreter)
    }
}

fn fold_deferred(
    program: Program,
    interpreter: Arc<Interpreter>,
) -> BoxFuture<'static, Result<Output, RunError>> {
    Box::pin(async move {
        match program {
            Program::Pure(output) => Ok(output),
            Program::Fail(error) => Err(error),
            Program::Op(operation) => interpreter.dispatch(operation),
            Program::Then(first, next, _) => {
                let output = fold_deferred(*first, interpreter.clone()).await?;
                let rest = next(output);
                interpreter.check_coverage(&rest)?;
                fold_deferred(rest, interpreter).await
            }
            Program::All(branches) => {
                let mut handles = Vec::with_capacity(branches.len());
                for branch in branches {
                    let interpreter = interpreter.clone();
                    handles.push(tokio::spawn(fold_deferred(branch, interpreter)));
                }

                // Declaration-order joins: the lowest-indexed failure wins
                // and later siblings still run to completion.
                let mut outputs = Vec::with_capacity(handles.len());
                let mut failure: Option<RunError> = None;
                for handle in handles {
                    match handle.await {
                        Ok(Ok(output)) => outputs.push(output),
                        Ok(Err(error)) => {
                            if failure.is_none() {
                                failure = Some(error);
                            }
                        }
                        Err(join_error) => {
                            if failure.is_none() {
                                failure = Some(RunError::Context {
                                    reason: join_error.to_string(),
                                });
                            }
                        }
                    }
                }
                match failure {
                    Some(error) => Err(error),
                    None => Ok(Output::Group(outputs)),
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Capability, Handles, Request};
    use crate::error::{ComposeError, OperationError};

    struct Add(i64);

    impl Request for Add {
        type Response = i64;
        fn name() -> &'static str {
            "Add"
        }
    }

    struct Boom;

    impl Request for Boom {
        type Response = ();
        fn name() -> &'static str {
            "Boom"
        }
    }

    struct Math;

    impl Capability for Math {
        fn capability_name(&self) -> &'static str {
            "Math"
        }
    }

    impl Handles<Add> for Math {
        fn handle(&self, req: Add) -> Result<i64, OperationError> {
            Ok(req.0 + 1)
        }
    }

    impl Handles<Boom> for Math {
        fn handle(&self, _: Boom) -> Result<(), OperationError> {
            Err(OperationError::new("boom"))
        }
    }

    fn math() -> Arc<Interpreter> {
        let interpreter = Interpreter::new()
            .with::<Math, Add>(Arc::new(Math))
            .and_then(|i| i.with::<Math, Boom>(Arc::new(Math)))
            .unwrap();
        Arc::new(interpreter)
    }

    #[test]
    fn test_immediate_chain_threads_results() {
        let program = Program::invoke(Add(0))
            .then_with::<Add, _>(|n| Program::invoke(Add(n * 10)))
            .then_with::<Add, _>(|n| Program::pure(n));

        let out = Immediate::run_blocking(program, &math()).unwrap();
        // 0+1 = 1, 10+1 = 11
        assert_eq!(out.downcast::<i64>(), Some(11));
    }

    #[test]
    fn test_immediate_group_is_positional() {
        let program = Program::all(vec![
            Program::invoke(Add(10)),
            Program::invoke(Add(20)),
            Program::invoke(Add(30)),
        ]);

        let outputs = Immediate::run_blocking(program, &math())
            .unwrap()
            .into_group()
            .unwrap();
        let values: Vec<i64> = outputs
            .into_iter()
            .map(|o| o.downcast::<i64>().unwrap())
            .collect();
        assert_eq!(values, vec![11, 21, 31]);
    }

    #[test]
    fn test_immediate_failure_abandons_continuation() {
        let program = Program::invoke(Boom).then(|_| Program::invoke(Add(1)));
        let err = Immediate::run_blocking(program, &math()).unwrap_err();
        assert_eq!(err, RunError::operation("Boom", OperationError::new("boom")));
    }

    #[test]
    fn test_run_blocking_checks_coverage_first() {
        let interpreter = Interpreter::new()
            .with::<Math, Add>(Arc::new(Math))
            .unwrap();
        let program = Program::invoke(Boom);
        let err = Immediate::run_blocking(program, &interpreter).unwrap_err();
        assert_eq!(
            err,
            RunError::Compose(ComposeError::MissingHandler { operation: "Boom" })
        );
    }

    #[test]
    fn test_uncovered_continuation_leaf_fails_before_any_operation_runs() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct Tally {
            calls: AtomicUsize,
        }
        impl Capability for Tally {
            fn capability_name(&self) -> &'static str {
                "Tally"
            }
        }
        impl Handles<Add> for Tally {
            fn handle(&self, req: Add) -> Result<i64, OperationError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Ok(req.0 + 1)
            }
        }

        let tally = Arc::new(Tally {
            calls: AtomicUsize::new(0),
        });
        let interpreter = Interpreter::new().with::<Tally, Add>(tally.clone()).unwrap();

        // Boom is uncovered and hidden behind the continuation; the run must
        // fail without executing the covered first step.
        let program = Program::invoke(Add(1)).then(|_| Program::invoke(Boom));
        let err = Immediate::run_blocking(program, &interpreter).unwrap_err();
        assert_eq!(
            err,
            RunError::Compose(ComposeError::MissingHandler { operation: "Boom" })
        );
        assert_eq!(tally.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_deferred_group_is_positional() {
        let program = Program::all(vec![
            Program::invoke(Add(10)),
            Program::invoke(Add(20)),
            Program::invoke(Add(30)),
        ]);

        let outputs = run(program, math(), &Deferred)
            .await
            .unwrap()
            .into_group()
            .unwrap();
        let values: Vec<i64> = outputs
            .into_iter()
            .map(|o| o.downcast::<i64>().unwrap())
            .collect();
        assert_eq!(values, vec![11, 21, 31]);
    }

    #[tokio::test]
    async fn test_deferred_matches_immediate_on_chains() {
        let build = || {
            Program::invoke(Add(0)).then_with::<Add, _>(|n| Program::invoke(Add(n * 100)))
        };

        let deferred = run(build(), math(), &Deferred).await.unwrap();
        let immediate = run(build(), math(), &Immediate).await.unwrap();
        assert_eq!(deferred.downcast::<i64>(), immediate.downcast::<i64>());
    }

    #[tokio::test]
    async fn test_group_failure_reports_lowest_index_under_both_contexts() {
        let build = || {
            Program::all(vec![
                Program::invoke(Add(1)),
                Program::fail(RunError::operation("B", OperationError::new("b failed"))),
                Program::fail(RunError::operation("C", OperationError::new("c failed"))),
            ])
        };
        let expected = RunError::operation("B", OperationError::new("b failed"));

        let immediate = run(build(), math(), &Immediate).await.unwrap_err();
        assert_eq!(immediate, expected);

        let deferred = run(build(), math(), &Deferred).await.unwrap_err();
        assert_eq!(deferred, expected);
    }

    #[tokio::test]
    async fn test_nested_groups_aggregate_recursively() {
        let program = Program::all(vec![
            Program::all(vec![Program::invoke(Add(1)), Program::invoke(Add(2))]),
            Program::invoke(Add(3)),
        ]);

        let outputs = run(program, math(), &Deferred)
            .await
            .unwrap()
            .into_group()
            .unwrap();
        assert_eq!(outputs.len(), 2);

        let mut outputs = outputs.into_iter();
        let inner = outputs.next().unwrap().into_group().unwrap();
        assert_eq!(inner.len(), 2);
        assert_eq!(outputs.next().unwrap().downcast::<i64>(), Some(4));
    }
}
