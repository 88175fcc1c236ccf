// SPDX-License-Identifier: Apache-2.0

//! Encodes "is there a circuit of this shape implementing the target table"
//! as one bit-vector problem.
//!
//! Every signal is a bit-vector as wide as the domain, so one assignment
//! evaluates the circuit on all inputs at once. Gate inputs are bound to
//! existing signals by disjunctions of equalities, gate functions are picked
//! by an 8-bit type selector, and the target outputs are required to equal
//! some gate output.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::gate_library::{GateSet, SelectorTerm, Technology, COST_WIDTH, SELECTOR_WIDTH};
use crate::problem::{BitString, ConstraintFamily, Expr, Formula, Problem, Var};
use crate::structure::DepthStructure;
use crate::truth_table::TargetTable;

pub const TOTAL_COST: &str = "total_cost";

/// Technology whose costs are summed, and the strict upper bound on the sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostBound {
    pub technology: Technology,
    pub ceiling: i64,
}

/// Everything one candidate encoding depends on.
#[derive(Debug, Clone, Copy)]
pub struct EncodeRequest<'a> {
    pub target: &'a TargetTable,
    pub gate_count: usize,
    pub structure: &'a DepthStructure,
    /// `None` admits the full catalogue.
    pub allowed_gates: Option<&'a [String]>,
    pub cost: Option<CostBound>,
    /// Above the first level, only the first input slot may read primary
    /// inputs; the others read gate outputs from lower levels.
    pub parallel: bool,
}

/// Shape and naming of the variables in an encoded problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitLayout {
    pub bit_width: usize,
    pub gate_count: usize,
    pub slots_per_gate: usize,
    pub structure: DepthStructure,
    pub cost: Option<CostBound>,
    pub total_cost_width: usize,
    pub parallel: bool,
}

impl CircuitLayout {
    pub fn domain_size(&self) -> usize {
        1 << self.bit_width
    }

    pub fn input_name(j: usize) -> String {
        format!("x{}", j)
    }

    pub fn output_name(j: usize) -> String {
        format!("y{}", j)
    }

    pub fn gate_output_name(gate: usize) -> String {
        format!("g{}_out", gate)
    }

    pub fn slot_name(gate: usize, slot: usize) -> String {
        format!("g{}_in{}", gate, slot)
    }

    pub fn selector_name(gate: usize) -> String {
        format!("g{}_sel", gate)
    }

    pub fn cost_name(gate: usize) -> String {
        format!("g{}_cost", gate)
    }

    /// Number of signals a gate on `level` may select from.
    pub fn visible_signals(&self, level: usize) -> usize {
        self.bit_width + self.structure.level_starts().get(level).copied().unwrap_or(0)
    }

    /// Whether input slot `slot` of a gate on `level` may read primary inputs.
    pub fn slot_reads_inputs(&self, level: usize, slot: usize) -> bool {
        !(self.parallel && level > 0 && slot > 0)
    }
}

#[derive(Debug, Clone)]
pub struct EncodedProblem {
    pub problem: Problem,
    pub layout: CircuitLayout,
}

fn bits_needed(value: u64) -> usize {
    (64 - value.leading_zeros() as usize).max(1)
}

fn term_expr(term: SelectorTerm, slots: &[Expr], domain: usize) -> Expr {
    let slot = |k: usize| slots[k].clone();
    match term {
        SelectorTerm::One => Expr::ones(domain),
        SelectorTerm::XorAB => slot(0).xor(slot(1)),
        SelectorTerm::AndAB => slot(0).and(slot(1)),
        SelectorTerm::B => slot(1),
        SelectorTerm::C => slot(2),
        SelectorTerm::AndABC => slot(0).and(slot(1)).and(slot(2)),
        SelectorTerm::CAndXorAB => slot(2).and(slot(0).xor(slot(1))),
        SelectorTerm::NandABAndNotCAndD => slot(0)
            .and(slot(1))
            .not()
            .and(slot(2).not())
            .and(slot(3)),
    }
}

pub fn encode(request: &EncodeRequest<'_>) -> Result<EncodedProblem, ConfigError> {
    let target = request.target;
    let structure = request.structure;
    if structure.gate_count() != request.gate_count {
        return Err(ConfigError::StructureMismatch {
            structure: structure.to_string(),
            expected: request.gate_count,
            actual: structure.gate_count(),
        });
    }
    if structure.levels().contains(&0) {
        return Err(ConfigError::EmptyLevel(structure.to_string()));
    }
    let gate_set = GateSet::resolve(request.allowed_gates)?;
    if let Some(cost) = request.cost {
        if cost.ceiling <= 0 {
            return Err(ConfigError::NonPositiveCeiling(cost.ceiling));
        }
    }

    let n = target.bit_width();
    let domain = target.domain_size();
    let gates = request.gate_count;
    let slots_per_gate = gate_set.slot_span();
    let total_cost_width = match request.cost {
        Some(cost) => {
            let worst = gates as u64 * u64::from(gate_set.max_cost(cost.technology));
            bits_needed(worst)
                .max(bits_needed(cost.ceiling as u64))
                .max(COST_WIDTH)
        }
        None => 0,
    };
    let layout = CircuitLayout {
        bit_width: n,
        gate_count: gates,
        slots_per_gate,
        structure: structure.clone(),
        cost: request.cost,
        total_cost_width,
        parallel: request.parallel,
    };
    log::trace!(
        "encoding {} gates as {} with {} slots per gate",
        gates,
        structure,
        slots_per_gate
    );

    let mut p = Problem::new();

    // Declarations.
    let inputs: Vec<Var> = (0..n)
        .map(|j| p.declare(CircuitLayout::input_name(j), domain))
        .collect();
    let outputs: Vec<Var> = (0..n)
        .map(|j| p.declare(CircuitLayout::output_name(j), domain))
        .collect();
    let mut gate_outs = Vec::with_capacity(gates);
    let mut slots: Vec<Vec<Var>> = Vec::with_capacity(gates);
    let mut selectors = Vec::with_capacity(gates);
    for g in 0..gates {
        gate_outs.push(p.declare(CircuitLayout::gate_output_name(g), domain));
        slots.push(
            (0..slots_per_gate)
                .map(|k| p.declare(CircuitLayout::slot_name(g, k), domain))
                .collect(),
        );
        selectors.push(p.declare(CircuitLayout::selector_name(g), SELECTOR_WIDTH));
    }
    let costs: Vec<Var> = match request.cost {
        Some(_) => (0..gates)
            .map(|g| p.declare(CircuitLayout::cost_name(g), COST_WIDTH))
            .collect(),
        None => Vec::new(),
    };
    let total = request
        .cost
        .map(|_| p.declare(TOTAL_COST, total_cost_width));

    // Fixation.
    for (j, v) in inputs.iter().enumerate() {
        let value = BitString::from_truth_vector(&target.inputs()[j]);
        p.assert(
            ConstraintFamily::Fixation,
            Formula::eq(Expr::var(*v), Expr::constant(value)),
        );
    }
    for (j, v) in outputs.iter().enumerate() {
        let value = BitString::from_truth_vector(&target.outputs()[j]);
        p.assert(
            ConstraintFamily::Fixation,
            Formula::eq(Expr::var(*v), Expr::constant(value)),
        );
    }

    // Connectivity: level L sees the inputs and every gate below level L.
    let starts = structure.level_starts();
    for (level, (&start, &count)) in starts.iter().zip(structure.levels()).enumerate() {
        for g in start..start + count {
            for (k, &slot) in slots[g].iter().enumerate() {
                let primary: &[Var] = if layout.slot_reads_inputs(level, k) {
                    &inputs
                } else {
                    &[]
                };
                let offered: Vec<Formula> = primary
                    .iter()
                    .chain(gate_outs[..start].iter())
                    .map(|src| Formula::eq(Expr::var(slot), Expr::var(*src)))
                    .collect();
                debug_assert!(offered.len() <= layout.visible_signals(level));
                p.assert(ConstraintFamily::Connectivity, Formula::any(offered));
            }
        }
    }

    // Gate types.
    let encodings = gate_set.encodings();
    for &sel in &selectors {
        let allowed = encodings
            .iter()
            .map(|&e| {
                Formula::eq(
                    Expr::var(sel),
                    Expr::constant(BitString::from_u64(u64::from(e), SELECTOR_WIDTH)),
                )
            })
            .collect();
        p.assert(ConstraintFamily::GateType, Formula::any(allowed));
    }

    // Evaluation: XOR of the selector-guarded terms.
    let live = gate_set.live_bits();
    for g in 0..gates {
        let slot_exprs: Vec<Expr> = slots[g].iter().map(|v| Expr::var(*v)).collect();
        let guarded = SelectorTerm::BY_BIT
            .iter()
            .enumerate()
            .filter(|(bit, _)| live >> bit & 1 == 1)
            .map(|(bit, &term)| {
                Expr::ite(
                    Formula::eq(Expr::var(selectors[g]).extract(bit, bit), Expr::ones(1)),
                    term_expr(term, &slot_exprs, domain),
                    Expr::zeros(domain),
                )
            });
        let value = guarded
            .reduce(|acc, term| acc.xor(term))
            .unwrap_or_else(|| Expr::zeros(domain));
        p.assert(
            ConstraintFamily::Evaluation,
            Formula::eq(Expr::var(gate_outs[g]), value),
        );
    }

    // Output selection: outputs bind to gate outputs only.
    for &y in &outputs {
        let choices = gate_outs
            .iter()
            .map(|g| Formula::eq(Expr::var(y), Expr::var(*g)))
            .collect();
        p.assert(ConstraintFamily::OutputSelection, Formula::any(choices));
    }

    // Cost lookup, sum and ceiling.
    if let (Some(bound), Some(total)) = (request.cost, total) {
        let table: Vec<(u8, u8)> = gate_set
            .gates()
            .iter()
            .map(|gate| (gate.encoding, gate.cost(bound.technology)))
            .collect();
        for g in 0..gates {
            let lookup = table.iter().rev().skip(1).fold(
                cost_const(table.last().map(|&(_, c)| c).unwrap_or(0)),
                |otherwise, &(encoding, cost)| {
                    Expr::ite(
                        Formula::eq(
                            Expr::var(selectors[g]),
                            Expr::constant(BitString::from_u64(u64::from(encoding), SELECTOR_WIDTH)),
                        ),
                        cost_const(cost),
                        otherwise,
                    )
                },
            );
            p.assert(
                ConstraintFamily::Cost,
                Formula::eq(Expr::var(costs[g]), lookup),
            );
        }
        let widen = total_cost_width - COST_WIDTH;
        let sum = costs
            .iter()
            .map(|c| Expr::var(*c).zero_extend(widen))
            .reduce(|acc, c| acc.add(c))
            .unwrap_or_else(|| Expr::zeros(total_cost_width));
        p.assert(ConstraintFamily::Cost, Formula::eq(Expr::var(total), sum));
        p.assert(
            ConstraintFamily::Cost,
            Formula::ult(
                Expr::var(total),
                Expr::constant(BitString::from_u64(bound.ceiling as u64, total_cost_width)),
            ),
        );
    }

    Ok(EncodedProblem { problem: p, layout })
}

fn cost_const(cost: u8) -> Expr {
    Expr::constant(BitString::from_u64(u64::from(cost), COST_WIDTH))
}
