// SPDX-License-Identifier: Apache-2.0

//! Gate-level circuit synthesis for small S-boxes.
//!
//! A target lookup table is decomposed into per-bit truth vectors, candidate
//! circuit shapes are enumerated, and every (gate count, depth structure)
//! pair is encoded as a single bit-vector constraint problem that a decision
//! procedure either satisfies (yielding a circuit) or refutes.

pub mod circuit;
pub mod config;
pub mod decision;
pub mod encoder;
pub mod error;
pub mod gate_library;
pub mod interpret;
pub mod problem;
pub mod search;
pub mod structure;
pub mod truth_table;

pub use circuit::{Circuit, GateInstance, Signal};
pub use config::{AcrossCountPolicy, CostObjective, PerCountPolicy, SearchConfig, StructureMode};
pub use decision::{DecisionProcedure, SolveOutcome, Verdict};
pub use encoder::{encode, CircuitLayout, CostBound, EncodeRequest, EncodedProblem};
pub use error::{ConfigError, InterpretError, SolverFailure};
pub use gate_library::{GateLibrary, GateSet, GateType, Technology};
pub use interpret::interpret;
pub use search::{
    Candidate, CandidateFailure, CandidateOutcome, CandidateRecord, NoopObserver, Search,
    SearchObserver, SearchOutcome, SearchReport,
};
pub use structure::{DepthStructure, StructureEnumerator};
pub use truth_table::{TargetTable, TruthVector};
