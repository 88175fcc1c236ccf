// SPDX-License-Identifier: Apache-2.0

//! Drives an external SMT-LIB2 solver binary through `easy-smt`.
//!
//! Every candidate gets a fresh solver process that lives as long as the
//! context. The deadline is passed to the solver as its own per-query time
//! limit, so an exhausted query answers `unknown` instead of running on.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use easy_smt::{Context, ContextBuilder, SExpr};

use super::{DecisionProcedure, SolveOutcome, Verdict};
use crate::error::SolverFailure;
use crate::problem::{lower_formula, Assignment, BitString, Problem};

/// How a solver binary accepts a per-query time limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeLimitFlag {
    /// `<prefix><milliseconds>`.
    Millis(&'static str),
    /// `<prefix><seconds>`, rounded up.
    Seconds(&'static str),
    /// The solver has no such flag; queries run to completion.
    Unsupported,
}

impl TimeLimitFlag {
    pub fn render(self, timeout: Duration) -> Option<String> {
        match self {
            TimeLimitFlag::Millis(prefix) => Some(format!("{}{}", prefix, timeout.as_millis().max(1))),
            TimeLimitFlag::Seconds(prefix) => {
                let secs = timeout.as_millis().div_ceil(1000).max(1);
                Some(format!("{}{}", prefix, secs))
            }
            TimeLimitFlag::Unsupported => None,
        }
    }
}

/// How to launch a solver binary in interactive SMT-LIB2 mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtBinaryConfig {
    pub solver_path: PathBuf,
    pub solver_args: Vec<String>,
    pub time_limit: TimeLimitFlag,
}

impl SmtBinaryConfig {
    fn preset(binary: &str, args: &[&str], time_limit: TimeLimitFlag) -> Self {
        Self {
            solver_path: PathBuf::from(binary),
            solver_args: args.iter().map(|s| s.to_string()).collect(),
            time_limit,
        }
    }

    pub fn z3() -> Self {
        Self::preset(
            "z3",
            &[
                "-nw",   // No warnings
                "-smt2", // Use SMT2
                "-in",   // Read from stdin
            ],
            TimeLimitFlag::Millis("-t:"),
        )
    }

    pub fn bitwuzla() -> Self {
        Self::preset(
            "bitwuzla",
            &["--produce-models"],
            TimeLimitFlag::Millis("--time-limit-per="),
        )
    }

    pub fn boolector() -> Self {
        Self::preset(
            "boolector",
            &[
                "--smt2",               // Use SMT2
                "-m",                   // Produce models
                "--output-format=smt2", // Output in SMT2 format
                "--no-exit-codes",      // Don't exit with error code on failure
                "--incremental",        // Use incremental solving
            ],
            TimeLimitFlag::Seconds("--time="),
        )
    }

    pub fn cvc5() -> Self {
        Self::preset(
            "cvc5",
            &["--lang=smt2", "--produce-models", "--incremental"],
            TimeLimitFlag::Millis("--tlimit-per="),
        )
    }

    /// Replaces the binary, keeping the preset's arguments and time limit.
    pub fn with_path(self, solver_path: impl Into<PathBuf>) -> Self {
        Self {
            solver_path: solver_path.into(),
            ..self
        }
    }

    /// Command-line arguments for one session bounded by `timeout`.
    pub fn args_for(&self, timeout: Duration) -> Vec<String> {
        let mut args = self.solver_args.clone();
        args.extend(self.time_limit.render(timeout));
        args
    }
}

#[derive(Debug, Clone)]
pub struct SmtBinarySolver {
    config: SmtBinaryConfig,
}

impl SmtBinarySolver {
    pub fn new(config: SmtBinaryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SmtBinaryConfig {
        &self.config
    }

    fn launch(&self, timeout: Duration) -> Result<Context, SolverFailure> {
        if self.config.time_limit == TimeLimitFlag::Unsupported {
            log::debug!(
                "{} takes no time limit; the query may outlive its deadline",
                self.config.solver_path.display()
            );
        }
        let args = self.config.args_for(timeout);
        let mut builder = ContextBuilder::new();
        builder.solver(&self.config.solver_path);
        builder.solver_args(&args);
        builder.build().map_err(|e| SolverFailure::Spawn {
            program: self.config.solver_path.display().to_string(),
            message: e.to_string(),
        })
    }

    fn session(&self, problem: &Problem, timeout: Duration) -> Result<SolveOutcome, SolverFailure> {
        let mut ctx = self.launch(timeout)?;
        let vars = problem.declare_in(&mut ctx)?;
        for a in problem.assertions() {
            let term = lower_formula(&ctx, &vars, &a.formula);
            ctx.assert(term)?;
        }
        match ctx.check()? {
            easy_smt::Response::Unsat => Ok(SolveOutcome::Unsat),
            easy_smt::Response::Unknown => Ok(SolveOutcome::Timeout),
            easy_smt::Response::Sat => read_model(&mut ctx, problem, vars).map(SolveOutcome::Sat),
        }
    }
}

/// Decodes a `#b` or `#x` model value, least significant bit first.
fn literal_bits(atom: &str) -> Option<Vec<bool>> {
    if let Some(rest) = atom.strip_prefix("#b") {
        rest.chars()
            .rev()
            .map(|c| match c {
                '0' => Some(false),
                '1' => Some(true),
                _ => None,
            })
            .collect()
    } else if let Some(rest) = atom.strip_prefix("#x") {
        let nibbles = rest
            .chars()
            .rev()
            .map(|c| c.to_digit(16))
            .collect::<Option<Vec<u32>>>()?;
        Some(
            nibbles
                .into_iter()
                .flat_map(|n| (0..4).map(move |i| (n >> i) & 1 == 1))
                .collect(),
        )
    } else {
        None
    }
}

fn read_model(
    ctx: &mut Context,
    problem: &Problem,
    vars: Vec<SExpr>,
) -> Result<Assignment, SolverFailure> {
    if vars.is_empty() {
        return Ok(Assignment::new());
    }
    let values = ctx.get_value(vars)?;
    let mut assignment = Assignment::new();
    for (d, (_, value)) in problem.declarations().iter().zip(values) {
        let bits = ctx
            .get_atom(value)
            .and_then(literal_bits)
            .filter(|bits| bits.len() == d.width)
            .ok_or_else(|| {
                SolverFailure::MalformedResponse(format!(
                    "value `{}` for `{}` is not a {}-bit literal",
                    ctx.display(value),
                    d.name,
                    d.width
                ))
            })?;
        assignment.insert(d.name.clone(), BitString::from_lsb_bits(bits));
    }
    Ok(assignment)
}

impl DecisionProcedure for SmtBinarySolver {
    fn name(&self) -> String {
        self.config.solver_path.display().to_string()
    }

    fn solve(&self, problem: &Problem, timeout: Duration) -> Verdict {
        let start = Instant::now();
        let outcome = self
            .session(problem, timeout)
            .unwrap_or_else(SolveOutcome::Error);
        Verdict {
            outcome,
            wall_time: start.elapsed(),
        }
    }
}
