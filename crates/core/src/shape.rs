//! # Program Shapes
//!
//! A [`ProgramShape`] is a serializable summary of a program's structure:
//! which operations are reachable, how they chain, and how they group. Build
//! callers use it to check intent — "does this batch really have three
//! branches?" — before running anything, typically together with
//! [`halt`](crate::halt).
//!
//! Continuations are opaque until run time, so a `Then` shape records only
//! its first half. What a continuation builds shows up when it runs, not in
//! the shape of the unexecuted program.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::program::Program;

/// Structural summary of a [`Program`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgramShape {
    /// A resolved value or immediate failure; performs no operation.
    Value,
    /// A single capability operation.
    Op { name: String },
    /// A dependent chain; the continuation side is unknown until run.
    Then { first: Box<ProgramShape> },
    /// Independent branches in declaration order.
    All { branches: Vec<ProgramShape> },
}

impl ProgramShape {
    /// Number of operations in the summary.
    pub fn op_count(&self) -> usize {
        match self {
            ProgramShape::Value => 0,
            ProgramShape::Op { .. } => 1,
            ProgramShape::Then { first } => first.op_count(),
            ProgramShape::All { branches } => branches.iter().map(ProgramShape::op_count).sum(),
        }
    }

    /// Number of independent branches at the top level (1 for non-groups).
    pub fn branch_count(&self) -> usize {
        match self {
            ProgramShape::All { branches } => branches.len(),
            _ => 1,
        }
    }

    fn render(&self, indent: usize, out: &mut String) {
        let prefix = "  ".repeat(indent);
        match self {
            ProgramShape::Value => {
                out.push_str(&prefix);
                out.push_str("value\n");
            }
            ProgramShape::Op { name } => {
                out.push_str(&prefix);
                out.push_str("op ");
                out.push_str(name);
                out.push('\n');
            }
            ProgramShape::Then { first } => {
                out.push_str(&prefix);
                out.push_str("then\n");
                first.render(indent + 1, out);
            }
            ProgramShape::All { branches } => {
                out.push_str(&prefix);
                out.push_str("all\n");
                for branch in branches {
                    branch.render(indent + 1, out);
                }
            }
        }
    }
}

impl fmt::Display for ProgramShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.render(0, &mut out);
        f.write_str(out.trim_end())
    }
}

impl Program {
    /// Summarize this program's structure.
    pub fn shape(&self) -> ProgramShape {
        match self {
            Program::Pure(_) | Program::Fail(_) => ProgramShape::Value,
            Program::Op(op) => ProgramShape::Op {
                name: op.name().to_string(),
            },
            Program::Then(first, _, _) => ProgramShape::Then {
                first: Box::new(first.shape()),
            },
            Program::All(branches) => ProgramShape::All {
                branches: branches.iter().map(Program::shape).collect(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Request;

    struct Read;

    impl Request for Read {
        type Response = String;
        fn name() -> &'static str {
            "Read"
        }
    }

    struct Write(String);

    impl Request for Write {
        type Response = ();
        fn name() -> &'static str {
            "Write"
        }
    }

    fn batch() -> Program {
        Program::all(vec![
            Program::invoke(Read).then_with::<Read, _>(|s| Program::invoke(Write(s))),
            Program::invoke(Read).then_with::<Read, _>(|s| Program::invoke(Write(s))),
            Program::invoke(Read).then_with::<Read, _>(|s| Program::invoke(Write(s))),
        ])
    }

    #[test]
    fn test_shape_counts_branches_and_ops() {
        let shape = batch().shape();
        assert_eq!(shape.branch_count(), 3);
        // Continuations are opaque: only the Read half of each chain counts.
        assert_eq!(shape.op_count(), 3);
    }

    #[test]
    fn test_shape_display_renders_tree() {
        let shape = Program::all(vec![Program::invoke(Read), Program::unit()]).shape();
        assert_eq!(shape.to_string(), "all\n  op Read\n  value");
    }

    #[test]
    fn test_shape_serde_round_trip() {
        let shape = batch().shape();
        let json = serde_json::to_string(&shape).unwrap();
        let back: ProgramShape = serde_json::from_str(&json).unwrap();
        assert_eq!(shape, back);
    }
}
