// SPDX-License-Identifier: Apache-2.0

//! Conversion between an integer lookup table and per-bit truth vectors.
//!
//! Bit positions are numbered most significant first: vector `j` of an
//! `n`-bit table holds bit `n - 1 - j` of every entry, so `x0`/`y0` are the
//! top bits of the input and output words.

use std::collections::HashSet;
use std::fmt;

use bitvec::vec::BitVec;
use serde::Serialize;

use crate::error::ConfigError;

/// Widest table the synthesizer accepts.
pub const MAX_BIT_WIDTH: usize = 10;

/// One bit position evaluated at every domain point; index `i` is point `i`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TruthVector {
    bits: BitVec,
}

impl TruthVector {
    pub fn from_bits(bits: &[bool]) -> Self {
        TruthVector {
            bits: bits.iter().copied().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Value at domain point `i`.
    pub fn get(&self, i: usize) -> bool {
        self.bits.get(i).map(|b| *b).unwrap_or(false)
    }

    pub fn to_bits(&self) -> Vec<bool> {
        self.bits.iter().map(|b| *b).collect()
    }

    /// Renders the vector as an SMT-LIB binary literal, domain point 0 first.
    pub fn format(&self) -> String {
        let mut s = String::with_capacity(self.len() + 2);
        s.push_str("#b");
        for bit in self.bits.iter() {
            s.push(if *bit { '1' } else { '0' });
        }
        s
    }
}

impl fmt::Display for TruthVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format())
    }
}

/// Number of bits needed to index a table of `len` entries, if `len` is a
/// power of two.
pub fn bit_width_for(len: usize) -> Option<usize> {
    if len < 2 || !len.is_power_of_two() {
        return None;
    }
    Some(len.trailing_zeros() as usize)
}

/// Splits `values` into `bit_width` vectors, most significant bit first.
pub fn decompose(values: &[u64], bit_width: usize) -> Vec<TruthVector> {
    (0..bit_width)
        .map(|j| {
            let shift = bit_width - 1 - j;
            TruthVector {
                bits: values.iter().map(|v| (v >> shift) & 1 == 1).collect(),
            }
        })
        .collect()
}

/// The truth vectors of the identity over `bit_width` bits.
pub fn input_vectors(bit_width: usize) -> Vec<TruthVector> {
    let domain: Vec<u64> = (0..1u64 << bit_width).collect();
    decompose(&domain, bit_width)
}

/// Inverse of [`decompose`].
pub fn recompose(vectors: &[TruthVector]) -> Vec<u64> {
    let len = vectors.first().map(|v| v.len()).unwrap_or(0);
    let width = vectors.len();
    (0..len)
        .map(|i| {
            vectors.iter().enumerate().fold(0u64, |acc, (j, v)| {
                acc | (u64::from(v.get(i)) << (width - 1 - j))
            })
        })
        .collect()
}

/// Which properties a mapping must have to be accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingCheck {
    Permutation,
    RangeOnly,
}

/// Checks length, range and (for `Permutation`) distinctness.
pub fn check_mapping(
    mapping: &[u64],
    bit_width: usize,
    check: MappingCheck,
) -> Result<(), ConfigError> {
    if bit_width == 0 || bit_width > MAX_BIT_WIDTH {
        return Err(ConfigError::InvalidBitWidth(bit_width));
    }
    let size = 1usize << bit_width;
    if mapping.len() != size {
        return Err(ConfigError::MappingLength {
            bit_width,
            expected: size,
            actual: mapping.len(),
        });
    }
    let limit = size as u64;
    if let Some((index, &value)) = mapping.iter().enumerate().find(|&(_, &v)| v >= limit) {
        return Err(ConfigError::ValueOutOfRange {
            index,
            value,
            limit,
        });
    }
    if check == MappingCheck::Permutation {
        let mut seen = HashSet::with_capacity(size);
        for &value in mapping {
            if !seen.insert(value) {
                return Err(ConfigError::NotPermutation { value });
            }
        }
    }
    Ok(())
}

/// Boolean form of the permutation check; never fails.
pub fn validate(mapping: &[u64], bit_width: usize) -> bool {
    check_mapping(mapping, bit_width, MappingCheck::Permutation).is_ok()
}

/// An accepted target mapping together with its truth vectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetTable {
    bit_width: usize,
    mapping: Vec<u64>,
    inputs: Vec<TruthVector>,
    outputs: Vec<TruthVector>,
}

impl TargetTable {
    pub fn from_mapping(
        mapping: &[u64],
        bit_width: usize,
        check: MappingCheck,
    ) -> Result<Self, ConfigError> {
        check_mapping(mapping, bit_width, check)?;
        Ok(TargetTable {
            bit_width,
            mapping: mapping.to_vec(),
            inputs: input_vectors(bit_width),
            outputs: decompose(mapping, bit_width),
        })
    }

    /// Infers the bit width from the table length and requires a permutation.
    pub fn from_sbox(mapping: &[u64]) -> Result<Self, ConfigError> {
        Self::from_sbox_checked(mapping, MappingCheck::Permutation)
    }

    /// Like `from_sbox`, with the caller choosing whether repeated outputs
    /// are rejected.
    pub fn from_sbox_checked(mapping: &[u64], check: MappingCheck) -> Result<Self, ConfigError> {
        let bit_width = bit_width_for(mapping.len()).ok_or(ConfigError::MappingLength {
            bit_width: 0,
            expected: 0,
            actual: mapping.len(),
        })?;
        Self::from_mapping(mapping, bit_width, check)
    }

    pub fn bit_width(&self) -> usize {
        self.bit_width
    }

    pub fn domain_size(&self) -> usize {
        1 << self.bit_width
    }

    pub fn mapping(&self) -> &[u64] {
        &self.mapping
    }

    pub fn inputs(&self) -> &[TruthVector] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[TruthVector] {
        &self.outputs
    }
}

/// Summary statistics of a lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SboxAnalysis {
    pub size: usize,
    pub bit_width: usize,
    pub is_permutation: bool,
    pub min_value: u64,
    pub max_value: u64,
    pub fixed_points: usize,
    pub differential_uniformity: usize,
}

/// Largest entry of the difference distribution table over non-zero input
/// differences.
pub fn differential_uniformity(mapping: &[u64]) -> usize {
    let size = mapping.len();
    let mut best = 0;
    let mut counts = vec![0usize; size.next_power_of_two().max(1)];
    for delta in 1..size {
        counts.iter_mut().for_each(|c| *c = 0);
        for x in 0..size {
            let partner = x ^ delta;
            if partner >= size {
                continue;
            }
            let diff = (mapping[x] ^ mapping[partner]) as usize;
            if let Some(slot) = counts.get_mut(diff) {
                *slot += 1;
            }
        }
        best = best.max(counts.iter().copied().max().unwrap_or(0));
    }
    best
}

pub fn analyze(mapping: &[u64], bit_width: usize) -> Result<SboxAnalysis, ConfigError> {
    check_mapping(mapping, bit_width, MappingCheck::RangeOnly)?;
    Ok(SboxAnalysis {
        size: mapping.len(),
        bit_width,
        is_permutation: validate(mapping, bit_width),
        min_value: mapping.iter().copied().min().unwrap_or(0),
        max_value: mapping.iter().copied().max().unwrap_or(0),
        fixed_points: mapping
            .iter()
            .enumerate()
            .filter(|&(i, &v)| i as u64 == v)
            .count(),
        differential_uniformity: differential_uniformity(mapping),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;
    use test_case::test_case;

    fn permutations(items: Vec<u64>) -> Vec<Vec<u64>> {
        if items.len() <= 1 {
            return vec![items];
        }
        let mut out = Vec::new();
        for i in 0..items.len() {
            let mut rest = items.clone();
            let head = rest.remove(i);
            for mut tail in permutations(rest) {
                tail.insert(0, head);
                out.push(tail);
            }
        }
        out
    }

    #[test]
    fn decompose_is_msb_first() {
        let vectors = decompose(&[0, 1, 3, 6, 7, 4, 5, 2], 3);
        assert_eq!(vectors[0].format(), "#b00011110");
        assert_eq!(vectors[1].format(), "#b00111001");
        assert_eq!(vectors[2].format(), "#b01101010");
        let inputs = input_vectors(2);
        assert_eq!(inputs[0].to_bits(), vec![false, false, true, true]);
        assert_eq!(inputs[1].to_bits(), vec![false, true, false, true]);
    }

    #[test]
    fn recompose_inverts_decompose_for_every_small_permutation() {
        for n in 1..=3 {
            for perm in permutations((0..1u64 << n).collect()) {
                assert_eq!(recompose(&decompose(&perm, n)), perm);
            }
        }
    }

    #[test]
    fn recompose_inverts_decompose_for_random_permutations() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0x5b0c);
        for n in 4..=8 {
            for _ in 0..16 {
                let mut perm: Vec<u64> = (0..1u64 << n).collect();
                perm.shuffle(&mut rng);
                assert!(validate(&perm, n));
                assert_eq!(recompose(&decompose(&perm, n)), perm);
            }
        }
    }

    #[test_case(&[0, 1, 2], 2, ConfigError::MappingLength { bit_width: 2, expected: 4, actual: 3 }; "short")]
    #[test_case(&[0, 1, 2, 4], 2, ConfigError::ValueOutOfRange { index: 3, value: 4, limit: 4 }; "out of range")]
    #[test_case(&[0, 1, 1, 3], 2, ConfigError::NotPermutation { value: 1 }; "duplicate")]
    #[test_case(&[0, 1], 0, ConfigError::InvalidBitWidth(0); "zero width")]
    fn check_mapping_rejects(mapping: &[u64], n: usize, expected: ConfigError) {
        assert_eq!(
            check_mapping(mapping, n, MappingCheck::Permutation),
            Err(expected)
        );
        assert!(!validate(mapping, n));
    }

    #[test]
    fn range_only_accepts_repeated_values() {
        let table = TargetTable::from_mapping(&[0, 0, 3, 3], 2, MappingCheck::RangeOnly).unwrap();
        assert_eq!(table.outputs()[0].to_bits(), vec![false, false, true, true]);
        assert!(TargetTable::from_mapping(&[0, 0, 3, 3], 2, MappingCheck::Permutation).is_err());
    }

    #[test]
    fn from_sbox_infers_width() {
        let table = TargetTable::from_sbox(&[0, 1, 3, 6, 7, 4, 5, 2]).unwrap();
        assert_eq!(table.bit_width(), 3);
        assert_eq!(table.domain_size(), 8);
        assert!(TargetTable::from_sbox(&[0, 1, 2]).is_err());
    }

    #[test]
    fn range_only_check_admits_repeated_outputs() {
        let lossy = [0, 0, 3, 1];
        assert_eq!(
            TargetTable::from_sbox(&lossy),
            Err(ConfigError::NotPermutation { value: 0 })
        );
        let table = TargetTable::from_sbox_checked(&lossy, MappingCheck::RangeOnly).unwrap();
        assert_eq!(table.bit_width(), 2);
        assert_eq!(recompose(table.outputs()), lossy.to_vec());
        assert!(TargetTable::from_sbox_checked(&[0, 4, 1, 2], MappingCheck::RangeOnly).is_err());
    }

    #[test]
    fn analysis_of_present_sbox() {
        let present = [
            0xC, 0x5, 0x6, 0xB, 0x9, 0x0, 0xA, 0xD, 0x3, 0xE, 0xF, 0x8, 0x4, 0x7, 0x1, 0x2,
        ];
        let analysis = analyze(&present, 4).unwrap();
        assert!(analysis.is_permutation);
        assert_eq!(analysis.differential_uniformity, 4);
        assert_eq!(analysis.fixed_points, 0);
        assert_eq!(analysis.max_value, 15);
    }

    #[test]
    fn identity_has_full_differential_uniformity() {
        let identity: Vec<u64> = (0..8).collect();
        assert_eq!(differential_uniformity(&identity), 8);
    }
}
