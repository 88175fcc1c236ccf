// SPDX-License-Identifier: Apache-2.0

//! Depth structures: how many gates sit on each level of a candidate circuit.
//!
//! A gate on level `L` may read primary inputs and the outputs of gates on
//! levels `< L`, which is what makes every encoded circuit acyclic.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Input slots assumed per gate when pruning structures, unless told otherwise.
pub const DEFAULT_FAN_IN: usize = 2;

/// Gate count per level, level 0 first. Every entry is positive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepthStructure(Vec<usize>);

impl DepthStructure {
    pub fn new(levels: Vec<usize>) -> Result<Self, ConfigError> {
        if levels.is_empty() || levels.contains(&0) {
            return Err(ConfigError::EmptyLevel(format_levels(&levels)));
        }
        Ok(DepthStructure(levels))
    }

    /// One gate per level.
    pub fn serial(gate_count: usize) -> Self {
        DepthStructure(vec![1; gate_count])
    }

    pub fn levels(&self) -> &[usize] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn gate_count(&self) -> usize {
        self.0.iter().sum()
    }

    /// Index of the first gate on each level.
    pub fn level_starts(&self) -> Vec<usize> {
        self.0
            .iter()
            .scan(0, |next, &count| {
                let start = *next;
                *next += count;
                Some(start)
            })
            .collect()
    }

    pub fn level_of_gate(&self, gate: usize) -> Option<usize> {
        let mut end = 0;
        for (level, &count) in self.0.iter().enumerate() {
            end += count;
            if gate < end {
                return Some(level);
            }
        }
        None
    }

    /// Walks levels from the outputs back toward the inputs, checking that no
    /// level holds more gates than there are consumers for their outputs.
    /// The last level feeds the `bit_width` outputs; every other level feeds
    /// `fan_in` slots per gate of the level after it, plus whatever the levels
    /// further out left unconsumed.
    pub fn is_feasible(&self, bit_width: usize, fan_in: usize) -> bool {
        let mut available = bit_width;
        let mut spare = 0;
        for &gates in self.0.iter().rev() {
            if gates > available + spare {
                return false;
            }
            spare = available + spare - gates;
            available = fan_in * gates;
        }
        true
    }

    /// Compact tag such as `1-2-1`, used in artifact names.
    pub fn tag(&self) -> String {
        self.0
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join("-")
    }
}

fn format_levels(levels: &[usize]) -> String {
    format!("{:?}", levels)
}

impl fmt::Display for DepthStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_levels(&self.0))
    }
}

/// Compositions of `total` into exactly `parts` positive parts, in
/// lexicographic order.
#[derive(Debug, Clone)]
pub struct Compositions {
    total: usize,
    current: Option<Vec<usize>>,
}

impl Compositions {
    pub fn new(total: usize, parts: usize) -> Self {
        let current = if parts == 0 || parts > total {
            None
        } else {
            let mut first = vec![1; parts];
            first[parts - 1] = total - (parts - 1);
            Some(first)
        };
        Compositions { total, current }
    }

    fn successor(&self, parts: &[usize]) -> Option<Vec<usize>> {
        let d = parts.len();
        let mut prefix = 0;
        let mut pivot = None;
        for i in 0..d.saturating_sub(1) {
            prefix += parts[i];
            // Incrementing parts[i] must leave at least one for each later part.
            if prefix + 1 + (d - 1 - i) <= self.total {
                pivot = Some((i, prefix));
            }
        }
        let (i, prefix) = pivot?;
        let mut next = parts.to_vec();
        next[i] += 1;
        for part in next.iter_mut().take(d - 1).skip(i + 1) {
            *part = 1;
        }
        next[d - 1] = self.total - (prefix + 1) - (d - 2 - i);
        Some(next)
    }
}

impl Iterator for Compositions {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let current = self.current.take()?;
        self.current = self.successor(&current);
        Some(current)
    }
}

/// Produces the admissible depth structures for a gate count.
#[derive(Debug, Clone, Copy)]
pub struct StructureEnumerator {
    bit_width: usize,
    fan_in: usize,
}

impl StructureEnumerator {
    pub fn new(bit_width: usize) -> Self {
        StructureEnumerator {
            bit_width,
            fan_in: DEFAULT_FAN_IN,
        }
    }

    pub fn with_fan_in(self, fan_in: usize) -> Self {
        StructureEnumerator {
            fan_in: fan_in.max(1),
            ..self
        }
    }

    /// Lazily yields feasible structures of `gate_count` gates, shallowest
    /// first and lexicographically within a depth. `max_depth` of `None`
    /// allows up to one gate per level.
    pub fn iter(
        &self,
        gate_count: usize,
        max_depth: Option<usize>,
    ) -> impl Iterator<Item = DepthStructure> {
        let deepest = max_depth.unwrap_or(gate_count).min(gate_count);
        let StructureEnumerator { bit_width, fan_in } = *self;
        (1..=deepest)
            .flat_map(move |depth| Compositions::new(gate_count, depth))
            .map(DepthStructure)
            .filter(move |s| s.is_feasible(bit_width, fan_in))
    }

    pub fn enumerate(&self, gate_count: usize, max_depth: Option<usize>) -> Vec<DepthStructure> {
        self.iter(gate_count, max_depth).collect()
    }

    /// The single one-gate-per-level structure, if it passes the feasibility
    /// check.
    pub fn serial(&self, gate_count: usize) -> Vec<DepthStructure> {
        let s = DepthStructure::serial(gate_count);
        if gate_count > 0 && s.is_feasible(self.bit_width, self.fan_in) {
            vec![s]
        } else {
            vec![]
        }
    }
}
