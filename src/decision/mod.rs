// SPDX-License-Identifier: Apache-2.0

//! Decision procedures that answer whether an encoded problem is satisfiable.
//!
//! The search only ever sees a [`Verdict`]; how a backend reaches it (bit
//! blasting in process, or an external SMT solver over `easy-smt`) is its
//! own business.

use std::time::Duration;

use crate::error::SolverFailure;
use crate::problem::{Assignment, Problem};

pub mod smtlib_process;
pub mod varisat_backend;

pub use smtlib_process::{SmtBinaryConfig, SmtBinarySolver};
pub use varisat_backend::VarisatSolver;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    /// Satisfiable, with a value for every declared variable.
    Sat(Assignment),
    Unsat,
    /// The deadline passed or the procedure gave up; says nothing about
    /// satisfiability.
    Timeout,
    Error(SolverFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub outcome: SolveOutcome,
    pub wall_time: Duration,
}

/// Answers one problem at a time. Implementations hold no state between
/// calls, so a single instance may be shared by concurrent workers.
pub trait DecisionProcedure: Send + Sync {
    fn name(&self) -> String;

    /// Decides `problem`, giving up once `timeout` has elapsed.
    fn solve(&self, problem: &Problem, timeout: Duration) -> Verdict;
}

impl<T: DecisionProcedure + ?Sized> DecisionProcedure for Box<T> {
    fn name(&self) -> String {
        (**self).name()
    }

    fn solve(&self, problem: &Problem, timeout: Duration) -> Verdict {
        (**self).solve(problem, timeout)
    }
}
