// SPDX-License-Identifier: Apache-2.0

//! Gate-list representation of a synthesized circuit.

use std::fmt;

use serde::Serialize;

use crate::gate_library::{eval_selector, GateLibrary, Technology, MAX_INPUT_SLOTS};
use crate::structure::DepthStructure;

/// A wire a gate input or output can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Signal {
    /// Primary input bit `j`; `x0` is the most significant.
    Input(usize),
    Gate(usize),
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Input(j) => write!(f, "x{}", j),
            Signal::Gate(i) => write!(f, "g{}", i),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateInstance {
    pub index: usize,
    pub level: usize,
    pub kind: String,
    pub encoding: u8,
    /// One entry per input slot, including slots the gate function ignores.
    pub slots: Vec<Signal>,
    pub cost: Option<u64>,
}

impl GateInstance {
    /// Slots the gate function actually reads.
    pub fn used_slots(&self) -> Vec<usize> {
        match GateLibrary::standard().decode(self.encoding) {
            Some(gate) => gate
                .input_slots()
                .into_iter()
                .filter(|&s| s < self.slots.len())
                .collect(),
            None => (0..self.slots.len()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Circuit {
    pub bit_width: usize,
    pub structure: DepthStructure,
    pub gates: Vec<GateInstance>,
    /// Gate driving each output bit, `y0` first.
    pub outputs: Vec<usize>,
    pub total_cost: Option<u64>,
}

impl Circuit {
    pub fn gate_count(&self) -> usize {
        self.gates.len()
    }

    /// Output word for one input word.
    pub fn evaluate(&self, input: u64) -> u64 {
        let n = self.bit_width;
        let mut values: Vec<bool> = Vec::with_capacity(self.gates.len());
        for gate in &self.gates {
            let mut slots = [false; MAX_INPUT_SLOTS];
            for (k, signal) in gate.slots.iter().enumerate().take(MAX_INPUT_SLOTS) {
                slots[k] = match *signal {
                    Signal::Input(j) => (input >> (n - 1 - j)) & 1 == 1,
                    Signal::Gate(i) => values.get(i).copied().unwrap_or(false),
                };
            }
            values.push(eval_selector(gate.encoding, slots));
        }
        self.outputs
            .iter()
            .enumerate()
            .fold(0u64, |acc, (j, &g)| {
                let bit = values.get(g).copied().unwrap_or(false);
                acc | (u64::from(bit) << (n - 1 - j))
            })
    }

    /// The mapping this circuit computes over the whole domain.
    pub fn truth_table(&self) -> Vec<u64> {
        (0..1u64 << self.bit_width).map(|x| self.evaluate(x)).collect()
    }

    /// First input on which the circuit disagrees with `mapping`.
    pub fn first_mismatch(&self, mapping: &[u64]) -> Option<(u64, u64, u64)> {
        mapping
            .iter()
            .enumerate()
            .map(|(x, &want)| (x as u64, want, self.evaluate(x as u64)))
            .find(|&(_, want, got)| want != got)
    }

    pub fn implements(&self, mapping: &[u64]) -> bool {
        mapping.len() == 1 << self.bit_width && self.first_mismatch(mapping).is_none()
    }

    /// Area recomputed from the catalogue, independent of any solver value.
    pub fn cost(&self, technology: Technology) -> u64 {
        let library = GateLibrary::standard();
        self.gates
            .iter()
            .filter_map(|g| library.decode(g.encoding))
            .map(|g| u64::from(g.cost(technology)))
            .sum()
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for gate in &self.gates {
            let args: Vec<String> = gate
                .used_slots()
                .into_iter()
                .map(|s| gate.slots[s].to_string())
                .collect();
            write!(f, "g{} = {}({})", gate.index, gate.kind, args.join(", "))?;
            if let Some(cost) = gate.cost {
                write!(f, "  ; cost {}", cost)?;
            }
            writeln!(f)?;
        }
        for (j, g) in self.outputs.iter().enumerate() {
            writeln!(f, "y{} = g{}", j, g)?;
        }
        if let Some(total) = self.total_cost {
            writeln!(f, "total cost = {}", total)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn gate(index: usize, kind: &str, encoding: u8, slots: Vec<Signal>) -> GateInstance {
        GateInstance {
            index,
            level: 0,
            kind: kind.to_string(),
            encoding,
            slots,
            cost: None,
        }
    }

    /// y0 = x0, y1 = x0 ^ x1.
    fn two_bit_circuit() -> Circuit {
        Circuit {
            bit_width: 2,
            structure: DepthStructure::new(vec![2]).unwrap(),
            gates: vec![
                gate(0, "AND", 0x04, vec![Signal::Input(0), Signal::Input(0), Signal::Input(1)]),
                gate(1, "XOR", 0x02, vec![Signal::Input(0), Signal::Input(1), Signal::Input(0)]),
            ],
            outputs: vec![0, 1],
            total_cost: Some(12),
        }
    }

    #[test]
    fn evaluates_every_input() {
        let c = two_bit_circuit();
        assert_eq!(c.truth_table(), vec![0, 1, 3, 2]);
        assert!(c.implements(&[0, 1, 3, 2]));
        assert!(!c.implements(&[0, 1, 2, 3]));
        assert_eq!(c.first_mismatch(&[0, 1, 2, 3]), Some((2, 2, 3)));
        assert_eq!(c.cost(Technology::Umc180), 12);
        assert_eq!(c.cost(Technology::Smic130), 13);
    }

    #[test]
    fn chained_gates_read_earlier_outputs() {
        let c = Circuit {
            bit_width: 1,
            structure: DepthStructure::new(vec![1, 1]).unwrap(),
            gates: vec![
                gate(0, "NOT", 0x0B, vec![Signal::Input(0), Signal::Input(0)]),
                gate(1, "NOT", 0x0B, vec![Signal::Gate(0), Signal::Input(0)]),
            ],
            outputs: vec![1],
            total_cost: None,
        };
        assert_eq!(c.truth_table(), vec![0, 1]);
    }

    #[test]
    fn display_lists_used_inputs_only() {
        let text = two_bit_circuit().to_string();
        assert_eq!(
            text,
            "g0 = AND(x0, x0)\ng1 = XOR(x0, x1)\ny0 = g0\ny1 = g1\ntotal cost = 12\n"
        );
    }
}
