// SPDX-License-Identifier: Apache-2.0

// Subcommand handlers and their shared plumbing; `main.rs` only builds the
// command line and dispatches.
pub mod analyze;
pub mod common;
pub mod cost;
pub mod driver_config;
pub mod emit_smt2;
pub mod gate_count;
pub mod persist;
pub mod report_cli_error;
pub mod sbox_input;
pub mod solver_choice;
