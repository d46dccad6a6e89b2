//! # Halt - Effect-Erasing Dry Runs
//!
//! [`halt`] maps a program to a structurally identical program whose leaves
//! perform no capability call. Running the halted program exercises every
//! composition decision — chaining, grouping, coverage — without touching
//! files, images, or any other external state.
//!
//! Each halted leaf still resolves its handler, so coverage errors surface
//! exactly as they would in a real run, but instead of invoking the handler
//! it yields the response type's `Default` value. Continuations therefore
//! receive a placeholder of the type they expect and keep building the rest
//! of the (equally halted) program.

use crate::program::Program;

/// Strip every capability effect from a program while preserving its shape.
///
/// Continuations are wrapped so that the programs they produce at run time
/// are halted too; the transformation covers the whole program, not just the
/// part visible before running.
pub fn halt(program: Program) -> Program {
    match program {
        Program::Pure(output) => Program::Pure(output),
        Program::Fail(error) => Program::Fail(error),
        Program::Op(operation) => Program::Op(operation.halted()),
        Program::Then(first, next, probe) => Program::Then(
            Box::new(halt(*first)),
            Box::new(move |output| halt(next(output))),
            probe,
        ),
        Program::All(branches) => Program::All(branches.into_iter().map(halt).collect()),
    }
}
