// SPDX-License-Identifier: Apache-2.0

//! Command line driver for S-box circuit synthesis.
//!
//! Commands are given like:
//!
//! ```text
//! sboxsynth-driver <global-options> <command> <command-args-and-options>
//! ```
//!
//! Commands are:
//!
//! - gate-count: Finds a circuit with as few gates as possible.
//! - cost: Finds a circuit with as little area as possible for a technology,
//!   or every solution at an exact gate count.
//! - emit-smt2: Writes the constraint problem for one candidate.
//! - analyze: Prints permutation and differential properties of an S-box.
//!
//! Sample usage:
//!
//! ```shell
//! $ cargo run -- gate-count --sbox 0,1,3,6,7,4,5,2 --gates XOR,AND,OR,NOT \
//!     --max-gates 8 --serial true
//! $ cargo run -- cost --sbox 0,1,3,2 --technology umc180 --ceiling 40 \
//!     --output-dir /tmp/sboxsynth --name toy
//! $ cargo run -- --config sboxsynth.toml emit-smt2 --sbox-file present.txt \
//!     --gate-count 8 --structure 4-4
//! ```

use clap::{Arg, ArgAction};

use sboxsynth_driver::driver_config::DriverConfig;
use sboxsynth_driver::report_cli_error::report_cli_error_and_exit;
use sboxsynth_driver::solver_choice::SolverChoice;
use sboxsynth_driver::{analyze, cost, emit_smt2, gate_count};

trait AppExt {
    fn add_sbox_args(self) -> Self;
    fn add_mapping_check_args(self) -> Self;
    fn add_gate_set_args(self) -> Self;
    fn add_cost_args(self) -> Self;
    fn add_search_args(self) -> Self;
    fn add_solver_args(self) -> Self;
    fn add_output_args(self) -> Self;
    fn add_bool_arg(self, id: &'static str, long: &'static str, help: &'static str) -> Self;
}

impl AppExt for clap::Command {
    fn add_sbox_args(self) -> Self {
        (self as clap::Command)
            .arg(
                Arg::new("sbox")
                    .long("sbox")
                    .value_name("VALUES")
                    .help("S-box entries: comma separated (decimal or 0x hex) or a JSON array")
                    .action(ArgAction::Set),
            )
            .arg(
                Arg::new("sbox_file")
                    .long("sbox-file")
                    .value_name("PATH")
                    .help("File holding the S-box entries")
                    .conflicts_with("sbox")
                    .action(ArgAction::Set),
            )
    }

    fn add_mapping_check_args(self) -> Self {
        (self as clap::Command).add_bool_arg(
            "permutation_check",
            "permutation-check",
            "Reject S-boxes with repeated outputs (default true)",
        )
    }

    fn add_gate_set_args(self) -> Self {
        (self as clap::Command).arg(
            Arg::new("gates")
                .long("gates")
                .value_name("NAMES")
                .help("Comma separated gate names the circuit may use (default: whole catalogue)")
                .action(ArgAction::Set),
        )
    }

    fn add_cost_args(self) -> Self {
        (self as clap::Command)
            .arg(
                Arg::new("technology")
                    .long("technology")
                    .value_name("TECH")
                    .help("Cost column: umc180 or smic130")
                    .action(ArgAction::Set),
            )
            .arg(
                Arg::new("ceiling")
                    .long("ceiling")
                    .value_name("GE")
                    .help("Strict upper bound on total cost")
                    .allow_hyphen_values(true)
                    .action(ArgAction::Set),
            )
    }

    fn add_search_args(self) -> Self {
        (self as clap::Command)
            .arg(
                Arg::new("max_gates")
                    .long("max-gates")
                    .value_name("N")
                    .help("Largest gate count tried; the search walks down from here")
                    .action(ArgAction::Set),
            )
            .arg(
                Arg::new("max_depth")
                    .long("max-depth")
                    .value_name("N")
                    .help("Deepest structure tried (default: as deep as the gate count)")
                    .action(ArgAction::Set),
            )
            .add_bool_arg("serial", "serial", "Only try the one-gate-per-level structure")
            .add_bool_arg(
                "parallel",
                "parallel",
                "Let only the first gate of each level past the first read primary inputs",
            )
            .add_bool_arg(
                "explore_all",
                "explore-all",
                "Try every structure at a gate count instead of stopping at the first solution",
            )
            .add_bool_arg(
                "stop_at_first_solved",
                "stop-at-first-solved",
                "Stop at the first gate count with a solution instead of trying smaller ones",
            )
            .arg(
                Arg::new("timeout")
                    .long("timeout")
                    .value_name("SECONDS")
                    .help("Wall-clock limit per candidate")
                    .action(ArgAction::Set),
            )
            .arg(
                Arg::new("jobs")
                    .long("jobs")
                    .value_name("N")
                    .help("Candidates solved in parallel (0: one per CPU)")
                    .action(ArgAction::Set),
            )
            .arg(
                Arg::new("name")
                    .long("name")
                    .value_name("NAME")
                    .help("Name used for output files")
                    .action(ArgAction::Set),
            )
            .add_bool_arg("json", "json", "Print the search report as JSON")
    }

    fn add_solver_args(self) -> Self {
        let choices: Vec<String> = SolverChoice::ALL.iter().map(|c| c.to_string()).collect();
        (self as clap::Command)
            .arg(
                Arg::new("solver")
                    .long("solver")
                    .value_name("SOLVER")
                    .help(format!("Decision procedure: {}", choices.join(", ")))
                    .action(ArgAction::Set),
            )
            .arg(
                Arg::new("solver_path")
                    .long("solver-path")
                    .value_name("PATH")
                    .help("Solver binary to run instead of the one on PATH")
                    .action(ArgAction::Set),
            )
    }

    fn add_output_args(self) -> Self {
        (self as clap::Command).arg(
            Arg::new("output_dir")
                .long("output-dir")
                .value_name("DIR")
                .help("Write per-candidate problems and a JSON summary here")
                .action(ArgAction::Set),
        )
    }

    /// Adds a boolean argument to the command; all boolean flags take an
    /// explicit `true` / `false`.
    fn add_bool_arg(self, id: &'static str, long: &'static str, help: &'static str) -> Self {
        (self as clap::Command).arg(
            Arg::new(id)
                .long(long)
                .value_name("BOOL")
                .action(ArgAction::Set)
                .value_parser(["true", "false"])
                .num_args(1)
                .help(help),
        )
    }
}

fn main() {
    let _ = env_logger::try_init();

    log::info!(
        "sboxsynth-driver starting; version: {}",
        env!("CARGO_PKG_VERSION")
    );

    let matches = clap::Command::new("sboxsynth-driver")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Finds minimal gate-level circuits for small S-boxes")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("CONFIG")
                .help("Path to a sboxsynth TOML config file")
                .action(ArgAction::Set),
        )
        .subcommand(clap::Command::new("version").about("Prints the version of the driver"))
        .subcommand(
            clap::Command::new("gate-count")
                .about("Minimises the number of gates")
                .add_sbox_args()
                .add_mapping_check_args()
                .add_gate_set_args()
                .add_cost_args()
                .add_search_args()
                .add_solver_args()
                .add_output_args(),
        )
        .subcommand(
            clap::Command::new("cost")
                .about("Minimises technology-weighted area")
                .add_sbox_args()
                .add_mapping_check_args()
                .add_gate_set_args()
                .add_cost_args()
                .add_search_args()
                .add_solver_args()
                .add_output_args()
                .arg(
                    Arg::new("exact_gates")
                        .long("exact-gates")
                        .value_name("N")
                        .help("List every solution at exactly N gates under the ceiling")
                        .action(ArgAction::Set),
                ),
        )
        .subcommand(
            clap::Command::new("emit-smt2")
                .about("Writes the SMT-LIB2 problem for one gate count and structure")
                .add_sbox_args()
                .add_mapping_check_args()
                .add_gate_set_args()
                .add_cost_args()
                .arg(
                    Arg::new("gate_count")
                        .long("gate-count")
                        .value_name("N")
                        .required(true)
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("structure")
                        .long("structure")
                        .value_name("LEVELS")
                        .help("Gates per level such as 1-2-1 (default: first feasible)")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("max_depth")
                        .long("max-depth")
                        .value_name("N")
                        .action(ArgAction::Set),
                )
                .add_bool_arg(
                    "parallel",
                    "parallel",
                    "Encode with only the first gate of each later level reading inputs",
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_name("PATH")
                        .help("Output file (default: stdout)")
                        .action(ArgAction::Set),
                ),
        )
        .subcommand(
            clap::Command::new("analyze")
                .about("Prints permutation and differential properties of an S-box")
                .add_sbox_args()
                .add_bool_arg("json", "json", "Print the analysis as JSON"),
        )
        .get_matches();

    let config: Option<DriverConfig> = matches.get_one::<String>("config").map(|path| {
        if !std::path::Path::new(path).exists() {
            report_cli_error_and_exit(
                "config file does not exist",
                None,
                vec![("path", path.as_str())],
            );
        }
        match DriverConfig::load(path) {
            Ok(config) => config,
            Err(e) => report_cli_error_and_exit(&format!("{:#}", e), None, vec![]),
        }
    });

    let (subcommand, result) = match matches.subcommand() {
        Some(("gate-count", m)) => ("gate-count", gate_count::handle_gate_count(m, &config)),
        Some(("cost", m)) => ("cost", cost::handle_cost(m, &config)),
        Some(("emit-smt2", m)) => ("emit-smt2", emit_smt2::handle_emit_smt2(m, &config)),
        Some(("analyze", m)) => ("analyze", analyze::handle_analyze(m)),
        Some(("version", _)) => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            return;
        }
        _ => report_cli_error_and_exit("No valid subcommand provided.", None, vec![]),
    };
    if let Err(e) = result {
        report_cli_error_and_exit(&format!("{:#}", e), Some(subcommand), vec![]);
    }
}
