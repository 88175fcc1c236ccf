// SPDX-License-Identifier: Apache-2.0

//! In-memory quantifier-free bit-vector problems.
//!
//! A [`Problem`] is a list of declared bit-vector variables and a list of
//! assertions tagged with the constraint family that produced them. It can
//! be rendered as SMT-LIB2 for external solvers, bit-blasted by the
//! in-process backend, or evaluated directly against an assignment.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io;

use bitvec::vec::BitVec;
use easy_smt::{Context, ContextBuilder, SExpr};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::truth_table::TruthVector;

/// Fixed-width bit-vector value; index 0 is the least significant bit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BitString {
    bits: BitVec,
}

impl BitString {
    pub fn zeros(width: usize) -> Self {
        BitString {
            bits: BitVec::repeat(false, width),
        }
    }

    pub fn ones(width: usize) -> Self {
        BitString {
            bits: BitVec::repeat(true, width),
        }
    }

    /// Low `width` bits of `value`.
    pub fn from_u64(value: u64, width: usize) -> Self {
        BitString {
            bits: (0..width)
                .map(|i| i < 64 && (value >> i) & 1 == 1)
                .collect(),
        }
    }

    /// Bits listed least significant first.
    pub fn from_lsb_bits(bits: impl IntoIterator<Item = bool>) -> Self {
        BitString {
            bits: bits.into_iter().collect(),
        }
    }

    /// Places domain point `i` of the truth vector at bit `len - 1 - i`, so
    /// the SMT-LIB literal lists domain point 0 first.
    pub fn from_truth_vector(tv: &TruthVector) -> Self {
        BitString::from_lsb_bits(tv.to_bits().into_iter().rev())
    }

    pub fn width(&self) -> usize {
        self.bits.len()
    }

    pub fn bit(&self, i: usize) -> bool {
        self.bits.get(i).map(|b| *b).unwrap_or(false)
    }

    pub fn iter_lsb(&self) -> impl Iterator<Item = bool> + '_ {
        self.bits.iter().map(|b| *b)
    }

    /// Numeric value, if it fits in 64 bits.
    pub fn to_u64(&self) -> Option<u64> {
        if self.bits.iter().skip(64).any(|b| *b) {
            return None;
        }
        Some(
            self.bits
                .iter()
                .take(64)
                .enumerate()
                .fold(0u64, |acc, (i, b)| acc | (u64::from(*b) << i)),
        )
    }

    pub fn to_smtlib(&self) -> String {
        let mut s = String::with_capacity(self.width() + 2);
        s.push_str("#b");
        for bit in self.bits.iter().rev() {
            s.push(if *bit { '1' } else { '0' });
        }
        s
    }
}

impl fmt::Display for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_smtlib())
    }
}

/// Values keyed by declared variable name.
pub type Assignment = BTreeMap<String, BitString>;

/// Handle to a declared variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Var {
    pub index: usize,
    pub width: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Var(Var),
    Const(BitString),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Xor(Box<Expr>, Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Ite(Box<Formula>, Box<Expr>, Box<Expr>),
    Extract {
        expr: Box<Expr>,
        high: usize,
        low: usize,
    },
    ZeroExtend {
        expr: Box<Expr>,
        by: usize,
    },
}

impl Expr {
    pub fn var(v: Var) -> Self {
        Expr::Var(v)
    }

    pub fn constant(value: BitString) -> Self {
        Expr::Const(value)
    }

    pub fn zeros(width: usize) -> Self {
        Expr::Const(BitString::zeros(width))
    }

    pub fn ones(width: usize) -> Self {
        Expr::Const(BitString::ones(width))
    }

    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    pub fn and(self, rhs: Expr) -> Self {
        Expr::And(Box::new(self), Box::new(rhs))
    }

    pub fn xor(self, rhs: Expr) -> Self {
        Expr::Xor(Box::new(self), Box::new(rhs))
    }

    pub fn add(self, rhs: Expr) -> Self {
        Expr::Add(Box::new(self), Box::new(rhs))
    }

    pub fn ite(cond: Formula, then: Expr, otherwise: Expr) -> Self {
        Expr::Ite(Box::new(cond), Box::new(then), Box::new(otherwise))
    }

    pub fn extract(self, high: usize, low: usize) -> Self {
        Expr::Extract {
            expr: Box::new(self),
            high,
            low,
        }
    }

    pub fn zero_extend(self, by: usize) -> Self {
        if by == 0 {
            return self;
        }
        Expr::ZeroExtend {
            expr: Box::new(self),
            by,
        }
    }

    pub fn width(&self) -> usize {
        match self {
            Expr::Var(v) => v.width,
            Expr::Const(c) => c.width(),
            Expr::Not(e) => e.width(),
            Expr::And(a, _) | Expr::Xor(a, _) | Expr::Add(a, _) => a.width(),
            Expr::Ite(_, t, _) => t.width(),
            Expr::Extract { high, low, .. } => high - low + 1,
            Expr::ZeroExtend { expr, by } => expr.width() + by,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Formula {
    True,
    False,
    Eq(Expr, Expr),
    /// Unsigned less-than.
    Ult(Expr, Expr),
    Not(Box<Formula>),
    And(Vec<Formula>),
    /// An empty disjunction is false.
    Or(Vec<Formula>),
}

impl Formula {
    pub fn eq(lhs: Expr, rhs: Expr) -> Self {
        Formula::Eq(lhs, rhs)
    }

    pub fn ult(lhs: Expr, rhs: Expr) -> Self {
        Formula::Ult(lhs, rhs)
    }

    pub fn any(disjuncts: Vec<Formula>) -> Self {
        Formula::Or(disjuncts)
    }
}

/// Which part of the circuit encoding an assertion belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConstraintFamily {
    Fixation,
    Connectivity,
    GateType,
    Evaluation,
    OutputSelection,
    Cost,
}

impl ConstraintFamily {
    pub fn describe(self) -> &'static str {
        match self {
            ConstraintFamily::Fixation => "input/output fixation",
            ConstraintFamily::Connectivity => "gate input connectivity",
            ConstraintFamily::GateType => "gate type selection",
            ConstraintFamily::Evaluation => "gate evaluation",
            ConstraintFamily::OutputSelection => "output selection",
            ConstraintFamily::Cost => "cost",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub width: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assertion {
    pub family: ConstraintFamily,
    pub formula: Formula,
}

/// Why an assignment does not satisfy a problem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    #[error("no value for `{0}`")]
    Missing(String),
    #[error("`{name}` has width {actual}; declared {expected}")]
    Width {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("assertion {index} ({}) is violated", family.describe())]
    Violated {
        index: usize,
        family: ConstraintFamily,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Problem {
    declarations: Vec<Declaration>,
    by_name: HashMap<String, Var>,
    assertions: Vec<Assertion>,
}

impl Problem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a fresh variable. Redeclaring a name returns the existing
    /// handle.
    pub fn declare(&mut self, name: impl Into<String>, width: usize) -> Var {
        let name = name.into();
        if let Some(v) = self.by_name.get(&name) {
            return *v;
        }
        let v = Var {
            index: self.declarations.len(),
            width,
        };
        self.declarations.push(Declaration {
            name: name.clone(),
            width,
        });
        self.by_name.insert(name, v);
        v
    }

    pub fn assert(&mut self, family: ConstraintFamily, formula: Formula) {
        self.assertions.push(Assertion { family, formula });
    }

    pub fn lookup(&self, name: &str) -> Option<Var> {
        self.by_name.get(name).copied()
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn name_of(&self, v: Var) -> &str {
        &self.declarations[v.index].name
    }

    pub fn assertions(&self) -> &[Assertion] {
        &self.assertions
    }

    pub fn count(&self, family: ConstraintFamily) -> usize {
        self.assertions
            .iter()
            .filter(|a| a.family == family)
            .count()
    }

    /// Declares every variable in `ctx`, in declaration order.
    pub fn declare_in(&self, ctx: &mut Context) -> io::Result<Vec<SExpr>> {
        self.declarations
            .iter()
            .map(|d| {
                let sort = ctx.bit_vec_sort(ctx.numeral(d.width));
                ctx.declare_const(d.name.clone(), sort)
            })
            .collect()
    }

    /// SMT-LIB2 script asserting every constraint and asking for a model of
    /// all declared variables.
    pub fn to_smtlib(&self) -> io::Result<String> {
        let ctx = ContextBuilder::new().build()?;
        let command = |head: &str, args: Vec<SExpr>| {
            let mut items = vec![ctx.atom(head)];
            items.extend(args);
            ctx.list(items)
        };
        let vars: Vec<SExpr> = self.declarations.iter().map(|d| ctx.atom(&d.name)).collect();

        let mut out = String::new();
        let mut emit = |line: String| {
            out.push_str(&line);
            out.push('\n');
        };
        let show = |cmd: SExpr| ctx.display(cmd).to_string();
        emit(show(command(
            "set-option",
            vec![ctx.atom(":produce-models"), ctx.atom("true")],
        )));
        emit(show(command("set-logic", vec![ctx.atom("QF_BV")])));
        for (d, var) in self.declarations.iter().zip(&vars) {
            let sort = ctx.bit_vec_sort(ctx.numeral(d.width));
            emit(show(command("declare-const", vec![*var, sort])));
        }
        let mut family = None;
        for a in &self.assertions {
            if family != Some(a.family) {
                emit(format!("; {}", a.family.describe()));
                family = Some(a.family);
            }
            let term = lower_formula(&ctx, &vars, &a.formula);
            emit(show(command("assert", vec![term])));
        }
        emit(show(command("check-sat", vec![])));
        if !vars.is_empty() {
            emit(show(command("get-value", vec![ctx.list(vars.clone())])));
        }
        emit(show(command("exit", vec![])));
        Ok(out)
    }

    /// Evaluates every assertion under `assignment`.
    pub fn check(&self, assignment: &Assignment) -> Result<(), CheckError> {
        let mut values = Vec::with_capacity(self.declarations.len());
        for d in &self.declarations {
            let value = assignment
                .get(&d.name)
                .ok_or_else(|| CheckError::Missing(d.name.clone()))?;
            if value.width() != d.width {
                return Err(CheckError::Width {
                    name: d.name.clone(),
                    expected: d.width,
                    actual: value.width(),
                });
            }
            values.push(value);
        }
        for (index, a) in self.assertions.iter().enumerate() {
            if !eval_formula(&a.formula, &values) {
                return Err(CheckError::Violated {
                    index,
                    family: a.family,
                });
            }
        }
        Ok(())
    }
}

/// Builds the SMT-LIB term for `e`; `vars` holds one term per declaration.
pub fn lower_expr(ctx: &Context, vars: &[SExpr], e: &Expr) -> SExpr {
    match e {
        Expr::Var(v) => vars[v.index],
        Expr::Const(c) => ctx.atom(c.to_smtlib()),
        Expr::Not(a) => ctx.bvnot(lower_expr(ctx, vars, a)),
        Expr::And(a, b) => ctx.bvand(lower_expr(ctx, vars, a), lower_expr(ctx, vars, b)),
        Expr::Xor(a, b) => ctx.bvxor(lower_expr(ctx, vars, a), lower_expr(ctx, vars, b)),
        Expr::Add(a, b) => ctx.bvadd(lower_expr(ctx, vars, a), lower_expr(ctx, vars, b)),
        Expr::Ite(c, t, f) => ctx.ite(
            lower_formula(ctx, vars, c),
            lower_expr(ctx, vars, t),
            lower_expr(ctx, vars, f),
        ),
        Expr::Extract { expr, high, low } => {
            ctx.extract(*high as i32, *low as i32, lower_expr(ctx, vars, expr))
        }
        Expr::ZeroExtend { expr, by } => ctx.list(vec![
            ctx.list(vec![ctx.atoms().und, ctx.atom("zero_extend"), ctx.numeral(*by)]),
            lower_expr(ctx, vars, expr),
        ]),
    }
}

pub fn lower_formula(ctx: &Context, vars: &[SExpr], f: &Formula) -> SExpr {
    match f {
        Formula::True => ctx.atom("true"),
        Formula::False => ctx.atom("false"),
        Formula::Eq(a, b) => ctx.eq(lower_expr(ctx, vars, a), lower_expr(ctx, vars, b)),
        Formula::Ult(a, b) => ctx.bvult(lower_expr(ctx, vars, a), lower_expr(ctx, vars, b)),
        Formula::Not(inner) => ctx.not(lower_formula(ctx, vars, inner)),
        Formula::And(items) | Formula::Or(items) => {
            let (op, empty) = match f {
                Formula::And(_) => ("and", "true"),
                _ => ("or", "false"),
            };
            match items.as_slice() {
                [] => ctx.atom(empty),
                [only] => lower_formula(ctx, vars, only),
                _ => {
                    let mut terms = vec![ctx.atom(op)];
                    terms.extend(items.iter().map(|i| lower_formula(ctx, vars, i)));
                    ctx.list(terms)
                }
            }
        }
    }
}

fn zip_bits(a: &BitString, b: &BitString, op: impl Fn(bool, bool) -> bool) -> BitString {
    BitString::from_lsb_bits(a.iter_lsb().zip(b.iter_lsb()).map(|(x, y)| op(x, y)))
}

fn eval_expr(e: &Expr, values: &[&BitString]) -> BitString {
    match e {
        Expr::Var(v) => values[v.index].clone(),
        Expr::Const(c) => c.clone(),
        Expr::Not(a) => BitString::from_lsb_bits(eval_expr(a, values).iter_lsb().map(|b| !b)),
        Expr::And(a, b) => zip_bits(&eval_expr(a, values), &eval_expr(b, values), |x, y| x & y),
        Expr::Xor(a, b) => zip_bits(&eval_expr(a, values), &eval_expr(b, values), |x, y| x ^ y),
        Expr::Add(a, b) => {
            let (a, b) = (eval_expr(a, values), eval_expr(b, values));
            let mut carry = false;
            let sum: Vec<bool> = a
                .iter_lsb()
                .zip(b.iter_lsb())
                .map(|(x, y)| {
                    let s = x ^ y ^ carry;
                    carry = (x & y) | (carry & (x ^ y));
                    s
                })
                .collect();
            BitString::from_lsb_bits(sum)
        }
        Expr::Ite(c, t, f) => {
            if eval_formula(c, values) {
                eval_expr(t, values)
            } else {
                eval_expr(f, values)
            }
        }
        Expr::Extract { expr, high, low } => {
            let inner = eval_expr(expr, values);
            BitString::from_lsb_bits((*low..=*high).map(|i| inner.bit(i)))
        }
        Expr::ZeroExtend { expr, by } => {
            let inner = eval_expr(expr, values);
            BitString::from_lsb_bits(inner.iter_lsb().chain(std::iter::repeat(false).take(*by)))
        }
    }
}

fn eval_formula(f: &Formula, values: &[&BitString]) -> bool {
    match f {
        Formula::True => true,
        Formula::False => false,
        Formula::Eq(a, b) => eval_expr(a, values) == eval_expr(b, values),
        Formula::Ult(a, b) => {
            let (a, b) = (eval_expr(a, values), eval_expr(b, values));
            for i in (0..a.width()).rev() {
                if a.bit(i) != b.bit(i) {
                    return b.bit(i);
                }
            }
            false
        }
        Formula::Not(inner) => !eval_formula(inner, values),
        Formula::And(items) => items.iter().all(|i| eval_formula(i, values)),
        Formula::Or(items) => items.iter().any(|i| eval_formula(i, values)),
    }
}
