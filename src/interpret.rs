// SPDX-License-Identifier: Apache-2.0

//! Reads a satisfying assignment back as a gate list.

use crate::circuit::{Circuit, GateInstance, Signal};
use crate::encoder::{CircuitLayout, TOTAL_COST};
use crate::error::InterpretError;
use crate::gate_library::{GateLibrary, COST_WIDTH, SELECTOR_WIDTH};
use crate::problem::{Assignment, BitString};

fn read<'a>(
    assignment: &'a Assignment,
    name: &str,
    width: usize,
) -> Result<&'a BitString, InterpretError> {
    let value = assignment
        .get(name)
        .ok_or_else(|| InterpretError::MissingVariable(name.to_string()))?;
    if value.width() != width {
        return Err(InterpretError::WidthMismatch {
            name: name.to_string(),
            expected: width,
            actual: value.width(),
        });
    }
    Ok(value)
}

fn read_number(assignment: &Assignment, name: &str, width: usize) -> Result<u64, InterpretError> {
    read(assignment, name, width)?
        .to_u64()
        .ok_or_else(|| InterpretError::WidthMismatch {
            name: name.to_string(),
            expected: 64,
            actual: width,
        })
}

/// Decodes every gate's function and wiring. Where several signals carry the
/// same value the earliest one wins: inputs before gates, lower indices
/// first.
pub fn interpret(assignment: &Assignment, layout: &CircuitLayout) -> Result<Circuit, InterpretError> {
    let library = GateLibrary::standard();
    let domain = layout.domain_size();
    let n = layout.bit_width;

    let inputs: Vec<&BitString> = (0..n)
        .map(|j| read(assignment, &CircuitLayout::input_name(j), domain))
        .collect::<Result<_, _>>()?;
    let gate_outs: Vec<&BitString> = (0..layout.gate_count)
        .map(|g| read(assignment, &CircuitLayout::gate_output_name(g), domain))
        .collect::<Result<_, _>>()?;

    let starts = layout.structure.level_starts();
    let mut gates = Vec::with_capacity(layout.gate_count);
    for g in 0..layout.gate_count {
        let level = layout.structure.level_of_gate(g).unwrap_or(0);
        let visible_gates = starts.get(level).copied().unwrap_or(0);

        let selector = read_number(assignment, &CircuitLayout::selector_name(g), SELECTOR_WIDTH)?;
        let gate_type = u8::try_from(selector)
            .ok()
            .and_then(|e| library.decode(e))
            .ok_or(InterpretError::UnknownSelector {
                gate: g,
                value: selector,
            })?;

        let mut slots = Vec::with_capacity(layout.slots_per_gate);
        for k in 0..layout.slots_per_gate {
            let value = read(assignment, &CircuitLayout::slot_name(g, k), domain)?;
            let signal = inputs
                .iter()
                .position(|x| *x == value)
                .map(Signal::Input)
                .or_else(|| {
                    gate_outs[..visible_gates]
                        .iter()
                        .position(|o| *o == value)
                        .map(Signal::Gate)
                })
                .ok_or(InterpretError::UnresolvedInput { gate: g, slot: k })?;
            slots.push(signal);
        }

        let cost = match layout.cost {
            Some(_) => Some(read_number(
                assignment,
                &CircuitLayout::cost_name(g),
                COST_WIDTH,
            )?),
            None => None,
        };

        gates.push(GateInstance {
            index: g,
            level,
            kind: gate_type.name.to_string(),
            encoding: gate_type.encoding,
            slots,
            cost,
        });
    }

    let mut outputs = Vec::with_capacity(n);
    for j in 0..n {
        let value = read(assignment, &CircuitLayout::output_name(j), domain)?;
        let gate = gate_outs
            .iter()
            .position(|o| *o == value)
            .ok_or(InterpretError::UnresolvedOutput { output: j })?;
        outputs.push(gate);
    }

    let total_cost = match layout.cost {
        Some(_) => Some(read_number(assignment, TOTAL_COST, layout.total_cost_width)?),
        None => None,
    };

    Ok(Circuit {
        bit_width: n,
        structure: layout.structure.clone(),
        gates,
        outputs,
        total_cost,
    })
}
