// SPDX-License-Identifier: Apache-2.0

//! Error types for the synthesis core.
//!
//! Configuration problems abort a run before any candidate is attempted.
//! Everything else is scoped to a single candidate and is downgraded to a
//! failed attempt by the search.

use serde::Serialize;
use thiserror::Error;

use crate::truth_table::MAX_BIT_WIDTH;

/// A rejected run configuration. Fatal, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum ConfigError {
    #[error("invalid bit width {0}; supported widths are 1..={max}", max = MAX_BIT_WIDTH)]
    InvalidBitWidth(usize),

    #[error("mapping has {actual} entries but a {bit_width}-bit mapping needs {expected}")]
    MappingLength {
        bit_width: usize,
        expected: usize,
        actual: usize,
    },

    #[error("mapping value {value} at index {index} is outside [0, {limit})")]
    ValueOutOfRange { index: usize, value: u64, limit: u64 },

    #[error("mapping value {value} appears more than once; a permutation is required")]
    NotPermutation { value: u64 },

    #[error("unknown gate type: {0}")]
    UnknownGate(String),

    #[error("allowed gate set is empty")]
    EmptyGateSet,

    #[error("cost ceiling must be positive; got {0}")]
    NonPositiveCeiling(i64),

    #[error("cost minimisation requested without a cost objective")]
    MissingCostObjective,

    #[error("depth structure {structure} holds {actual} gates; expected {expected}")]
    StructureMismatch {
        structure: String,
        expected: usize,
        actual: usize,
    },

    #[error("depth structure {0} has an empty level")]
    EmptyLevel(String),

    #[error("per-candidate timeout must be non-zero")]
    ZeroTimeout,

    #[error("gate bound must be at least 1")]
    ZeroGateBound,
}

/// A satisfiable verdict whose assignment cannot be read back as a circuit.
/// Treated as a defect in the decision procedure's result.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum InterpretError {
    #[error("assignment is missing variable `{0}`")]
    MissingVariable(String),

    #[error("variable `{name}` has width {actual}; expected {expected}")]
    WidthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("gate {gate} has selector {value:#04x}, which is not in the catalogue")]
    UnknownSelector { gate: usize, value: u64 },

    #[error("input slot {slot} of gate {gate} matches no available signal")]
    UnresolvedInput { gate: usize, slot: usize },

    #[error("output {output} matches no gate output")]
    UnresolvedOutput { output: usize },

    #[error("decoded circuit maps input {input} to {actual}; expected {expected}")]
    MappingMismatch { input: u64, expected: u64, actual: u64 },

    #[error("decoded circuit costs {cost}, which is not below the ceiling {ceiling}")]
    CeilingViolated { cost: u64, ceiling: i64 },
}

/// The external procedure failed to run or produced something unreadable.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum SolverFailure {
    #[error("failed to launch solver `{program}`: {message}")]
    Spawn { program: String, message: String },

    #[error("solver I/O error: {0}")]
    Io(String),

    #[error("unrecognised solver response: {0}")]
    MalformedResponse(String),

    #[error("SAT backend error: {0}")]
    Backend(String),
}

impl From<std::io::Error> for SolverFailure {
    fn from(e: std::io::Error) -> Self {
        SolverFailure::Io(e.to_string())
    }
}
