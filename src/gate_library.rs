// SPDX-License-Identifier: Apache-2.0

//! Catalogue of gate functions a synthesized circuit may instantiate.
//!
//! Every gate is identified by an 8-bit selector. Bit `k` of the selector
//! switches on one fixed Boolean term over the gate's input slots, and the
//! gate output is the XOR of all switched-on terms. The catalogue lists the
//! selector values that correspond to real standard cells together with
//! their area in gate-equivalents for each modelled technology.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Width of a gate-type selector.
pub const SELECTOR_WIDTH: usize = 8;

/// Width of a per-gate cost value.
pub const COST_WIDTH: usize = 8;

/// Upper bound on the number of input slots any selector term reads.
pub const MAX_INPUT_SLOTS: usize = 4;

/// Fabrication technology; picks the cost column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Technology {
    Umc180,
    Smic130,
}

impl Technology {
    fn column(self) -> usize {
        match self {
            Technology::Umc180 => 0,
            Technology::Smic130 => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Technology::Umc180 => "umc180",
            Technology::Smic130 => "smic130",
        }
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Technology {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "umc180" | "0" => Ok(Technology::Umc180),
            "smic130" | "1" => Ok(Technology::Smic130),
            other => Err(format!(
                "unknown technology '{}'; expected one of: umc180, smic130",
                other
            )),
        }
    }
}

/// The fixed term guarded by one selector bit. Slots are named `a`..`d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorTerm {
    /// All-ones vector.
    One,
    /// `a ^ b`
    XorAB,
    /// `a & b`
    AndAB,
    /// `b`
    B,
    /// `c`
    C,
    /// `a & b & c`
    AndABC,
    /// `c & (a ^ b)`
    CAndXorAB,
    /// `~(a & b) & ~c & d`
    NandABAndNotCAndD,
}

impl SelectorTerm {
    /// Terms indexed by selector bit position.
    pub const BY_BIT: [SelectorTerm; SELECTOR_WIDTH] = [
        SelectorTerm::One,
        SelectorTerm::XorAB,
        SelectorTerm::AndAB,
        SelectorTerm::B,
        SelectorTerm::C,
        SelectorTerm::AndABC,
        SelectorTerm::CAndXorAB,
        SelectorTerm::NandABAndNotCAndD,
    ];

    pub fn eval(self, slots: [bool; MAX_INPUT_SLOTS]) -> bool {
        let [a, b, c, d] = slots;
        match self {
            SelectorTerm::One => true,
            SelectorTerm::XorAB => a ^ b,
            SelectorTerm::AndAB => a & b,
            SelectorTerm::B => b,
            SelectorTerm::C => c,
            SelectorTerm::AndABC => a & b & c,
            SelectorTerm::CAndXorAB => c & (a ^ b),
            SelectorTerm::NandABAndNotCAndD => !(a & b) & !c & d,
        }
    }

    /// Number of leading slots the term reads.
    pub fn slot_span(self) -> usize {
        match self {
            SelectorTerm::One => 0,
            SelectorTerm::XorAB | SelectorTerm::AndAB | SelectorTerm::B => 2,
            SelectorTerm::C | SelectorTerm::AndABC | SelectorTerm::CAndXorAB => 3,
            SelectorTerm::NandABAndNotCAndD => 4,
        }
    }
}

/// Evaluates a raw selector value on one assignment of the input slots.
pub fn eval_selector(encoding: u8, slots: [bool; MAX_INPUT_SLOTS]) -> bool {
    SelectorTerm::BY_BIT
        .iter()
        .enumerate()
        .filter(|(bit, _)| encoding >> bit & 1 == 1)
        .fold(false, |acc, (_, term)| acc ^ term.eval(slots))
}

/// One catalogue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateType {
    pub name: &'static str,
    pub encoding: u8,
    costs: [u8; 2],
}

impl GateType {
    const fn new(name: &'static str, encoding: u8, umc180: u8, smic130: u8) -> Self {
        GateType {
            name,
            encoding,
            costs: [umc180, smic130],
        }
    }

    pub fn cost(&self, technology: Technology) -> u8 {
        self.costs[technology.column()]
    }

    pub fn eval(&self, slots: [bool; MAX_INPUT_SLOTS]) -> bool {
        eval_selector(self.encoding, slots)
    }

    /// Slots whose value actually influences the output, ascending.
    pub fn input_slots(&self) -> Vec<usize> {
        (0..MAX_INPUT_SLOTS)
            .filter(|&slot| {
                (0..1u8 << MAX_INPUT_SLOTS).any(|point| {
                    let slots = slot_values(point);
                    let mut flipped = slots;
                    flipped[slot] = !flipped[slot];
                    self.eval(slots) != self.eval(flipped)
                })
            })
            .collect()
    }

    /// One past the highest slot any switched-on term reads.
    pub fn slot_span(&self) -> usize {
        SelectorTerm::BY_BIT
            .iter()
            .enumerate()
            .filter(|(bit, _)| self.encoding >> bit & 1 == 1)
            .map(|(_, term)| term.slot_span())
            .max()
            .unwrap_or(0)
    }
}

fn slot_values(point: u8) -> [bool; MAX_INPUT_SLOTS] {
    [
        point & 1 != 0,
        point & 2 != 0,
        point & 4 != 0,
        point & 8 != 0,
    ]
}

/// Costs in gate equivalents: UMC 180nm, SMIC 130nm.
static CATALOGUE: [GateType; 17] = [
    GateType::new("XOR", 0x02, 8, 8),
    GateType::new("XNOR", 0x03, 6, 8),
    GateType::new("AND", 0x04, 4, 5),
    GateType::new("NAND", 0x05, 3, 3),
    GateType::new("OR", 0x06, 4, 5),
    GateType::new("NOR", 0x07, 3, 3),
    // NOT of slot b, slot a and slot c respectively.
    GateType::new("NOT", 0x09, 2, 3),
    GateType::new("NOT", 0x0B, 2, 3),
    GateType::new("NOT", 0x11, 2, 3),
    GateType::new("XOR3", 0x12, 14, 18),
    GateType::new("XNOR3", 0x13, 14, 19),
    GateType::new("AND3", 0x20, 6, 6),
    GateType::new("NAND3", 0x21, 4, 6),
    GateType::new("OR3", 0x76, 6, 6),
    GateType::new("NOR3", 0x77, 4, 6),
    GateType::new("MAOI1", 0xB0, 8, 8),
    GateType::new("MOAI1", 0xB1, 6, 8),
];

static STANDARD: Lazy<GateLibrary> = Lazy::new(|| GateLibrary::new(&CATALOGUE));

/// Indexed view of the catalogue.
#[derive(Debug)]
pub struct GateLibrary {
    gates: &'static [GateType],
    by_encoding: [Option<usize>; 256],
    by_name: HashMap<&'static str, Vec<usize>>,
}

impl GateLibrary {
    fn new(gates: &'static [GateType]) -> Self {
        let mut by_encoding = [None; 256];
        let mut by_name: HashMap<&'static str, Vec<usize>> = HashMap::new();
        for (i, gate) in gates.iter().enumerate() {
            by_encoding[gate.encoding as usize] = Some(i);
            by_name.entry(gate.name).or_default().push(i);
        }
        GateLibrary {
            gates,
            by_encoding,
            by_name,
        }
    }

    pub fn standard() -> &'static GateLibrary {
        &STANDARD
    }

    /// Catalogue entries in their fixed order.
    pub fn gates(&self) -> &[GateType] {
        self.gates
    }

    /// Distinct gate names in catalogue order.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = Vec::new();
        for gate in self.gates {
            if !names.contains(&gate.name) {
                names.push(gate.name);
            }
        }
        names
    }

    fn lookup(&self, name: &str) -> Option<&[usize]> {
        let key = name.trim().to_ascii_uppercase();
        self.by_name.get(key.as_str()).map(|v| v.as_slice())
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Primary (first-listed) encoding of `name`.
    pub fn encoding_of(&self, name: &str) -> Result<u8, ConfigError> {
        self.encodings_of(name).map(|e| e[0])
    }

    /// Every encoding registered under `name`; never empty on success.
    pub fn encodings_of(&self, name: &str) -> Result<Vec<u8>, ConfigError> {
        self.lookup(name)
            .map(|idxs| idxs.iter().map(|&i| self.gates[i].encoding).collect())
            .ok_or_else(|| ConfigError::UnknownGate(name.to_string()))
    }

    pub fn cost_of(&self, name: &str, technology: Technology) -> Result<u8, ConfigError> {
        self.lookup(name)
            .map(|idxs| self.gates[idxs[0]].cost(technology))
            .ok_or_else(|| ConfigError::UnknownGate(name.to_string()))
    }

    pub fn decode(&self, encoding: u8) -> Option<&GateType> {
        self.by_encoding[encoding as usize].map(|i| &self.gates[i])
    }

    /// True iff `names` is non-empty and every name is catalogued.
    pub fn validate_allowed_set<S: AsRef<str>>(&self, names: &[S]) -> bool {
        !names.is_empty() && names.iter().all(|n| self.is_known(n.as_ref()))
    }
}

/// The subset of catalogue entries a single run may choose from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateSet {
    gates: Vec<GateType>,
}

impl GateSet {
    pub fn full() -> Self {
        GateSet {
            gates: GateLibrary::standard().gates().to_vec(),
        }
    }

    /// Builds the set from gate names; names are case-insensitive and a name
    /// selects every encoding registered under it.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, ConfigError> {
        if names.is_empty() {
            return Err(ConfigError::EmptyGateSet);
        }
        let library = GateLibrary::standard();
        let mut gates: Vec<GateType> = Vec::new();
        for name in names {
            for encoding in library.encodings_of(name.as_ref())? {
                if gates.iter().any(|g| g.encoding == encoding) {
                    continue;
                }
                if let Some(gate) = library.decode(encoding) {
                    gates.push(*gate);
                }
            }
        }
        gates.sort_by_key(|g| g.encoding);
        Ok(GateSet { gates })
    }

    /// `None` selects the full catalogue.
    pub fn resolve<S: AsRef<str>>(names: Option<&[S]>) -> Result<Self, ConfigError> {
        match names {
            Some(names) => Self::from_names(names),
            None => Ok(Self::full()),
        }
    }

    pub fn gates(&self) -> &[GateType] {
        &self.gates
    }

    pub fn encodings(&self) -> Vec<u8> {
        self.gates.iter().map(|g| g.encoding).collect()
    }

    /// Number of input slots each gate instance needs.
    pub fn slot_span(&self) -> usize {
        self.gates.iter().map(|g| g.slot_span()).max().unwrap_or(0)
    }

    /// Largest number of distinct signals a single gate consumes.
    pub fn fan_in(&self) -> usize {
        self.gates
            .iter()
            .map(|g| g.input_slots().len())
            .max()
            .unwrap_or(0)
    }

    pub fn max_cost(&self, technology: Technology) -> u8 {
        self.gates
            .iter()
            .map(|g| g.cost(technology))
            .max()
            .unwrap_or(0)
    }

    /// Selector bits set by at least one member; other terms are always off.
    pub fn live_bits(&self) -> u8 {
        self.gates.iter().fold(0, |acc, g| acc | g.encoding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn truth_table(encoding: u8, arity: usize) -> Vec<bool> {
        (0..1u8 << arity)
            .map(|point| eval_selector(encoding, slot_values(point)))
            .collect()
    }

    #[test_case("XOR", &[false, true, true, false]; "xor")]
    #[test_case("XNOR", &[true, false, false, true]; "xnor")]
    #[test_case("AND", &[false, false, false, true]; "and")]
    #[test_case("NAND", &[true, true, true, false]; "nand")]
    #[test_case("OR", &[false, true, true, true]; "or")]
    #[test_case("NOR", &[true, false, false, false]; "nor")]
    fn two_input_gates_compute_their_function(name: &str, expected: &[bool]) {
        let encoding = GateLibrary::standard().encoding_of(name).unwrap();
        assert_eq!(truth_table(encoding, 2), expected);
    }

    #[test]
    fn three_and_four_input_gates_compute_their_function() {
        let library = GateLibrary::standard();
        for point in 0..16u8 {
            let s = slot_values(point);
            let [a, b, c, d] = s;
            let eval = |name: &str| library.decode(library.encoding_of(name).unwrap()).unwrap().eval(s);
            assert_eq!(eval("XOR3"), a ^ b ^ c);
            assert_eq!(eval("XNOR3"), !(a ^ b ^ c));
            assert_eq!(eval("AND3"), a & b & c);
            assert_eq!(eval("NAND3"), !(a & b & c));
            assert_eq!(eval("OR3"), a | b | c);
            assert_eq!(eval("NOR3"), !(a | b | c));
            assert_eq!(eval("MAOI1"), !((a & b) | !(c | d)));
            assert_eq!(eval("MOAI1"), (a & b) | !(c | d));
        }
    }

    #[test]
    fn not_variants_invert_distinct_slots() {
        let library = GateLibrary::standard();
        let slots: Vec<Vec<usize>> = library
            .encodings_of("not")
            .unwrap()
            .into_iter()
            .map(|e| library.decode(e).unwrap().input_slots())
            .collect();
        assert_eq!(slots, vec![vec![1], vec![0], vec![2]]);
        for point in 0..16u8 {
            let s = slot_values(point);
            assert_eq!(eval_selector(0x09, s), !s[1]);
            assert_eq!(eval_selector(0x0B, s), !s[0]);
            assert_eq!(eval_selector(0x11, s), !s[2]);
        }
    }

    #[test]
    fn lookups_by_name_and_encoding_agree() {
        let library = GateLibrary::standard();
        for gate in library.gates() {
            assert_eq!(library.decode(gate.encoding), Some(gate));
            assert!(library.encodings_of(gate.name).unwrap().contains(&gate.encoding));
        }
        assert_eq!(library.decode(0x00), None);
        assert_eq!(library.decode(0xFF), None);
        assert_eq!(library.names().len(), 15);
    }

    #[test]
    fn costs_follow_technology_column() {
        let library = GateLibrary::standard();
        assert_eq!(library.cost_of("XOR", Technology::Umc180).unwrap(), 8);
        assert_eq!(library.cost_of("XNOR3", Technology::Smic130).unwrap(), 19);
        assert_eq!(library.cost_of("nand", Technology::Smic130).unwrap(), 3);
        assert_eq!(
            library.cost_of("MUX", Technology::Umc180),
            Err(ConfigError::UnknownGate("MUX".to_string()))
        );
    }

    #[test]
    fn validate_allowed_set_accepts_catalogue_subsets_only() {
        let library = GateLibrary::standard();
        assert!(library.validate_allowed_set(&library.names()));
        assert!(library.validate_allowed_set(&["XOR", "and", "Or", "NOT"]));
        assert!(library.validate_allowed_set(&["MAOI1"]));
        assert!(!library.validate_allowed_set(&["XOR", "MUX"]));
        assert!(!library.validate_allowed_set::<&str>(&[]));
    }

    #[test]
    fn gate_set_width_and_live_bits() {
        let basic = GateSet::from_names(&["XOR", "AND", "OR", "NOT"]).unwrap();
        assert_eq!(basic.encodings(), vec![0x02, 0x04, 0x06, 0x09, 0x0B, 0x11]);
        assert_eq!(basic.slot_span(), 3);
        assert_eq!(basic.fan_in(), 2);
        assert_eq!(basic.live_bits(), 0x1F);

        let two = GateSet::from_names(&["xor", "and"]).unwrap();
        assert_eq!(two.slot_span(), 2);
        assert_eq!(two.max_cost(Technology::Umc180), 8);

        let full = GateSet::full();
        assert_eq!(full.slot_span(), 4);
        assert_eq!(full.fan_in(), 4);
        assert_eq!(full.live_bits(), 0xFF);

        assert_eq!(
            GateSet::from_names::<&str>(&[]),
            Err(ConfigError::EmptyGateSet)
        );
    }

    #[test]
    fn technology_parses_names_and_column_indices() {
        assert_eq!("UMC180".parse::<Technology>(), Ok(Technology::Umc180));
        assert_eq!("1".parse::<Technology>(), Ok(Technology::Smic130));
        assert!("tsmc7".parse::<Technology>().is_err());
    }
}
