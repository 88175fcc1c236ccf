// SPDX-License-Identifier: Apache-2.0

//! In-process decision procedure: bit-blasts a [`Problem`] to CNF and hands
//! it to varisat.
//!
//! Every declared bit-vector becomes one fresh literal per bit; operators are
//! lowered with Tseitin definitions, folding constants where an operand is a
//! known literal so fixed truth vectors do not cost any clauses.
//!
//! Solving runs on the caller's thread. varisat has no interrupt call, but a
//! proof processor that returns an error stops the search at the next proof
//! step, which is how the deadline is enforced.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use varisat::checker::{CheckedProofStep, CheckerData, ProofProcessor};
use varisat::solver::SolverError;
use varisat::{CnfFormula, ExtendFormula, Lit};

use super::{DecisionProcedure, SolveOutcome, Verdict};
use crate::error::SolverFailure;
use crate::problem::{Assignment, BitString, Expr, Formula, Problem};

/// Clauses for `output <=> a AND b`:
/// (output | !a | !b), (!output | a), (!output | b)
fn add_tseitin_and(cnf: &mut impl ExtendFormula, a: Lit, b: Lit, output: Lit) {
    cnf.add_clause(&[!a, !b, output]);
    cnf.add_clause(&[a, !output]);
    cnf.add_clause(&[b, !output]);
}

/// Clauses for `output <=> a XOR b`.
fn add_tseitin_xor(cnf: &mut impl ExtendFormula, a: Lit, b: Lit, output: Lit) {
    cnf.add_clause(&[!a, !b, !output]);
    cnf.add_clause(&[a, b, !output]);
    cnf.add_clause(&[a, !b, output]);
    cnf.add_clause(&[!a, b, output]);
}

/// Clauses for `output <=> (s ? t : e)`.
fn add_tseitin_mux(cnf: &mut impl ExtendFormula, s: Lit, t: Lit, e: Lit, output: Lit) {
    cnf.add_clause(&[!s, !t, output]);
    cnf.add_clause(&[!s, t, !output]);
    cnf.add_clause(&[s, !e, output]);
    cnf.add_clause(&[s, e, !output]);
}

struct BitBlaster {
    cnf: CnfFormula,
    true_lit: Lit,
    vars: Vec<Vec<Lit>>,
}

impl BitBlaster {
    fn new(problem: &Problem) -> Self {
        let mut cnf = CnfFormula::new();
        let true_lit = cnf.new_lit();
        cnf.add_clause(&[true_lit]);
        let vars: Vec<Vec<Lit>> = problem
            .declarations()
            .iter()
            .map(|d| (0..d.width).map(|_| cnf.new_lit()).collect::<Vec<Lit>>())
            .collect();
        BitBlaster {
            cnf,
            true_lit,
            vars,
        }
    }

    fn t(&self) -> Lit {
        self.true_lit
    }

    fn f(&self) -> Lit {
        !self.true_lit
    }

    fn constant(&self, value: bool) -> Lit {
        if value {
            self.t()
        } else {
            self.f()
        }
    }

    fn and(&mut self, a: Lit, b: Lit) -> Lit {
        if a == self.f() || b == self.f() || a == !b {
            return self.f();
        }
        if a == self.t() || a == b {
            return b;
        }
        if b == self.t() {
            return a;
        }
        let out = self.cnf.new_lit();
        add_tseitin_and(&mut self.cnf, a, b, out);
        out
    }

    fn or(&mut self, a: Lit, b: Lit) -> Lit {
        !self.and(!a, !b)
    }

    fn xor(&mut self, a: Lit, b: Lit) -> Lit {
        if a == self.f() {
            return b;
        }
        if a == self.t() {
            return !b;
        }
        if b == self.f() {
            return a;
        }
        if b == self.t() {
            return !a;
        }
        if a == b {
            return self.f();
        }
        if a == !b {
            return self.t();
        }
        let out = self.cnf.new_lit();
        add_tseitin_xor(&mut self.cnf, a, b, out);
        out
    }

    fn mux(&mut self, s: Lit, t: Lit, e: Lit) -> Lit {
        if s == self.t() || t == e {
            return t;
        }
        if s == self.f() {
            return e;
        }
        if t == self.f() && e == self.t() {
            return !s;
        }
        if t == self.t() && e == self.f() {
            return s;
        }
        let out = self.cnf.new_lit();
        add_tseitin_mux(&mut self.cnf, s, t, e, out);
        out
    }

    fn expr(&mut self, e: &Expr) -> Vec<Lit> {
        match e {
            Expr::Var(v) => self.vars[v.index].clone(),
            Expr::Const(c) => c.iter_lsb().map(|b| self.constant(b)).collect(),
            Expr::Not(a) => self.expr(a).into_iter().map(|l| !l).collect(),
            Expr::And(a, b) => {
                let (a, b) = (self.expr(a), self.expr(b));
                a.into_iter().zip(b).map(|(x, y)| self.and(x, y)).collect()
            }
            Expr::Xor(a, b) => {
                let (a, b) = (self.expr(a), self.expr(b));
                a.into_iter().zip(b).map(|(x, y)| self.xor(x, y)).collect()
            }
            Expr::Add(a, b) => {
                let (a, b) = (self.expr(a), self.expr(b));
                let mut carry = self.f();
                let mut sum = Vec::with_capacity(a.len());
                for (x, y) in a.into_iter().zip(b) {
                    let half = self.xor(x, y);
                    sum.push(self.xor(half, carry));
                    let generate = self.and(x, y);
                    let propagate = self.and(half, carry);
                    carry = self.or(generate, propagate);
                }
                sum
            }
            Expr::Ite(c, t, e) => {
                let s = self.formula(c);
                let (t, e) = (self.expr(t), self.expr(e));
                t.into_iter().zip(e).map(|(x, y)| self.mux(s, x, y)).collect()
            }
            Expr::Extract { expr, high, low } => {
                let bits = self.expr(expr);
                bits[*low..=*high].to_vec()
            }
            Expr::ZeroExtend { expr, by } => {
                let mut bits = self.expr(expr);
                let zero = self.f();
                bits.extend(std::iter::repeat(zero).take(*by));
                bits
            }
        }
    }

    fn formula(&mut self, f: &Formula) -> Lit {
        match f {
            Formula::True => self.t(),
            Formula::False => self.f(),
            Formula::Eq(a, b) => {
                let (a, b) = (self.expr(a), self.expr(b));
                let mut all = self.t();
                for (x, y) in a.into_iter().zip(b) {
                    let same = !self.xor(x, y);
                    all = self.and(all, same);
                }
                all
            }
            Formula::Ult(a, b) => {
                // Borrow chain from the least significant bit up.
                let (a, b) = (self.expr(a), self.expr(b));
                let mut less = self.f();
                for (x, y) in a.into_iter().zip(b) {
                    let strictly = self.and(!x, y);
                    let same = !self.xor(x, y);
                    let carried = self.and(same, less);
                    less = self.or(strictly, carried);
                }
                less
            }
            Formula::Not(inner) => !self.formula(inner),
            Formula::And(items) => {
                let mut acc = self.t();
                for item in items {
                    let l = self.formula(item);
                    acc = self.and(acc, l);
                }
                acc
            }
            Formula::Or(items) => {
                let mut acc = self.f();
                for item in items {
                    let l = self.formula(item);
                    acc = self.or(acc, l);
                }
                acc
            }
        }
    }

    /// Adds `f` as a hard constraint, using direct clauses where the shape
    /// allows instead of a defining literal.
    fn assert(&mut self, f: &Formula) {
        match f {
            Formula::And(items) => items.iter().for_each(|item| self.assert(item)),
            Formula::Or(items) => {
                let clause: Vec<Lit> = items.iter().map(|item| self.formula(item)).collect();
                if clause.is_empty() {
                    let f = self.f();
                    self.cnf.add_clause(&[f]);
                } else {
                    self.cnf.add_clause(&clause);
                }
            }
            Formula::Eq(a, b) => {
                let (a, b) = (self.expr(a), self.expr(b));
                for (x, y) in a.into_iter().zip(b) {
                    self.cnf.add_clause(&[!x, y]);
                    self.cnf.add_clause(&[x, !y]);
                }
            }
            other => {
                let l = self.formula(other);
                self.cnf.add_clause(&[l]);
            }
        }
    }
}

/// Aborts solving once `deadline` has passed.
struct DeadlineWatch {
    deadline: Instant,
    steps: u64,
}

impl ProofProcessor for DeadlineWatch {
    fn process_step(&mut self, _step: &CheckedProofStep, _data: CheckerData) -> anyhow::Result<()> {
        self.steps += 1;
        if Instant::now() >= self.deadline {
            anyhow::bail!("deadline passed after {} proof steps", self.steps);
        }
        Ok(())
    }
}

/// Pure-Rust SAT backend; needs no external binaries.
#[derive(Debug, Clone, Default)]
pub struct VarisatSolver;

impl VarisatSolver {
    pub fn new() -> Self {
        VarisatSolver
    }
}

fn read_model(problem: &Problem, blaster_vars: &[Vec<Lit>], true_lit: Lit, model: &[Lit]) -> Assignment {
    let model_set: HashSet<Lit> = model.iter().cloned().collect();
    let value = |lit: Lit| {
        if lit == true_lit {
            true
        } else if lit == !true_lit {
            false
        } else {
            model_set.contains(&lit)
        }
    };
    problem
        .declarations()
        .iter()
        .zip(blaster_vars)
        .map(|(d, lits)| {
            (
                d.name.clone(),
                BitString::from_lsb_bits(lits.iter().map(|&l| value(l))),
            )
        })
        .collect()
}

impl DecisionProcedure for VarisatSolver {
    fn name(&self) -> String {
        "varisat".to_string()
    }

    fn solve(&self, problem: &Problem, timeout: Duration) -> Verdict {
        let start = Instant::now();
        let mut blaster = BitBlaster::new(problem);
        for a in problem.assertions() {
            blaster.assert(&a.formula);
        }
        let BitBlaster {
            cnf,
            true_lit,
            vars,
        } = blaster;
        log::trace!(
            "bit-blasted {} declarations into {} variables, {} clauses",
            problem.declarations().len(),
            cnf.var_count(),
            cnf.len()
        );

        let mut watch = DeadlineWatch {
            deadline: start + timeout,
            steps: 0,
        };
        let mut solver = varisat::Solver::new();
        solver.add_proof_processor(&mut watch);
        solver.add_formula(&cnf);
        let outcome = match solver.solve() {
            Ok(true) => match solver.model() {
                Some(model) => SolveOutcome::Sat(read_model(problem, &vars, true_lit, &model)),
                None => SolveOutcome::Error(SolverFailure::Backend(
                    "satisfiable but no model available".to_string(),
                )),
            },
            Ok(false) => SolveOutcome::Unsat,
            Err(SolverError::ProofProcessorError { .. }) | Err(SolverError::Interrupted) => {
                SolveOutcome::Timeout
            }
            Err(e) => SolveOutcome::Error(SolverFailure::Backend(e.to_string())),
        };
        drop(solver);
        log::trace!("varisat stopped after {} proof steps", watch.steps);
        Verdict {
            outcome,
            wall_time: start.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{encode, EncodeRequest};
    use crate::problem::ConstraintFamily;
    use crate::structure::DepthStructure;
    use crate::truth_table::TargetTable;
    use pretty_assertions::assert_eq;

    const TIMEOUT: Duration = Duration::from_secs(30);

    fn c(value: u64, width: usize) -> Expr {
        Expr::constant(BitString::from_u64(value, width))
    }

    #[test]
    fn solves_arithmetic_and_returns_checked_model() {
        let mut p = Problem::new();
        let x = p.declare("x", 6);
        let y = p.declare("y", 6);
        p.assert(
            ConstraintFamily::Evaluation,
            Formula::eq(Expr::var(x).add(Expr::var(y)), c(37, 6)),
        );
        p.assert(ConstraintFamily::Cost, Formula::ult(Expr::var(x), c(3, 6)));
        p.assert(
            ConstraintFamily::Connectivity,
            Formula::any(vec![
                Formula::eq(Expr::var(x), c(2, 6)),
                Formula::eq(Expr::var(x), c(5, 6)),
            ]),
        );
        let model = match VarisatSolver::new().solve(&p, TIMEOUT).outcome {
            SolveOutcome::Sat(model) => model,
            other => panic!("expected sat, got {:?}", other),
        };
        assert_eq!(p.check(&model), Ok(()));
        assert_eq!(model["x"].to_u64(), Some(2));
        assert_eq!(model["y"].to_u64(), Some(35));
    }

    #[test]
    fn detects_unsat() {
        let mut p = Problem::new();
        let x = p.declare("x", 4);
        p.assert(ConstraintFamily::Cost, Formula::ult(Expr::var(x), c(0, 4)));
        assert_eq!(VarisatSolver::new().solve(&p, TIMEOUT).outcome, SolveOutcome::Unsat);

        let mut empty_or = Problem::new();
        empty_or.declare("x", 1);
        empty_or.assert(ConstraintFamily::OutputSelection, Formula::any(vec![]));
        assert_eq!(
            VarisatSolver::new().solve(&empty_or, TIMEOUT).outcome,
            SolveOutcome::Unsat
        );
    }

    #[test]
    fn ite_and_extract_follow_selector_bits() {
        let mut p = Problem::new();
        let sel = p.declare("sel", 8);
        let out = p.declare("out", 4);
        let guarded = Expr::ite(
            Formula::eq(Expr::var(sel).extract(2, 2), Expr::ones(1)),
            c(0b1010, 4),
            Expr::zeros(4),
        )
        .xor(Expr::ite(
            Formula::eq(Expr::var(sel).extract(0, 0), Expr::ones(1)),
            Expr::ones(4),
            Expr::zeros(4),
        ));
        p.assert(ConstraintFamily::Evaluation, Formula::eq(Expr::var(out), guarded));
        p.assert(ConstraintFamily::Fixation, Formula::eq(Expr::var(out), c(0b0101, 4)));
        p.assert(
            ConstraintFamily::GateType,
            Formula::eq(Expr::var(sel).extract(7, 3).zero_extend(3), c(0, 8)),
        );
        p.assert(
            ConstraintFamily::GateType,
            Formula::eq(Expr::var(sel).extract(1, 1), Expr::zeros(1)),
        );
        let model = match VarisatSolver::new().solve(&p, TIMEOUT).outcome {
            SolveOutcome::Sat(model) => model,
            other => panic!("expected sat, got {:?}", other),
        };
        assert_eq!(model["sel"].to_u64(), Some(0b101));
    }

    #[test]
    fn deadline_stops_solving_before_returning() {
        let present = [
            0xC, 0x5, 0x6, 0xB, 0x9, 0x0, 0xA, 0xD, 0x3, 0xE, 0xF, 0x8, 0x4, 0x7, 0x1, 0x2,
        ];
        let target = TargetTable::from_sbox(&present).unwrap();
        let structure = DepthStructure::new(vec![4, 4, 2]).unwrap();
        let encoded = encode(&EncodeRequest {
            target: &target,
            gate_count: 10,
            structure: &structure,
            allowed_gates: None,
            cost: None,
            parallel: false,
        })
        .unwrap();
        // Back-to-back short budgets; each call must be finished with its
        // solver when it returns.
        let budget = Duration::from_millis(300);
        let started = Instant::now();
        for _ in 0..4 {
            let verdict = VarisatSolver::new().solve(&encoded.problem, budget);
            assert_eq!(verdict.outcome, SolveOutcome::Timeout);
            assert!(verdict.wall_time < Duration::from_secs(5), "{:?}", verdict.wall_time);
        }
        assert!(started.elapsed() < Duration::from_secs(20));
    }
}
