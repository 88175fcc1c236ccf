// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use anyhow::anyhow;
use clap::ArgMatches;

use sboxsynth::config::SearchConfig;
use sboxsynth::decision::DecisionProcedure;
use sboxsynth::search::{Search, SearchOutcome, SearchReport};
use sboxsynth::truth_table::TargetTable;

use crate::driver_config::{
    get_mapping_check, get_output_dir, get_search_config, get_solver, get_solver_path, DriverConfig,
};
use crate::persist::ArtifactWriter;
use crate::sbox_input::read_sbox;
use crate::solver_choice::SolverChoice;

pub const DEFAULT_NAME: &str = "sbox";

pub fn json_flag(matches: &ArgMatches) -> bool {
    matches
        .try_get_one::<String>("json")
        .ok()
        .flatten()
        .map(|s| s == "true")
        .unwrap_or(false)
}

/// Everything a search subcommand needs, resolved from flags and config.
pub struct SearchRun {
    pub name: String,
    pub sbox: Vec<u64>,
    pub target: TargetTable,
    pub search: SearchConfig,
    pub solver: SolverChoice,
    pub solver_path: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub json: bool,
}

impl SearchRun {
    pub fn from_matches(matches: &ArgMatches, config: &Option<DriverConfig>) -> anyhow::Result<Self> {
        let sbox = read_sbox(matches)?;
        let target = TargetTable::from_sbox_checked(&sbox, get_mapping_check(matches, config))?;
        Ok(SearchRun {
            name: matches
                .get_one::<String>("name")
                .cloned()
                .unwrap_or_else(|| DEFAULT_NAME.to_string()),
            sbox,
            target,
            search: get_search_config(matches, config)?,
            solver: get_solver(matches, config)?,
            solver_path: get_solver_path(matches, config),
            output_dir: get_output_dir(matches, config).map(PathBuf::from),
            json: json_flag(matches),
        })
    }

    /// Runs `drive` against a freshly built search, prints the report and
    /// persists artifacts when an output directory is configured.
    pub fn execute<F>(&self, show_all: bool, drive: F) -> anyhow::Result<()>
    where
        F: FnOnce(&Search<'_, Box<dyn DecisionProcedure>>) -> anyhow::Result<SearchReport>,
    {
        log::info!(
            "{}: {}-bit S-box, solver {}",
            self.name,
            self.target.bit_width(),
            self.solver
        );
        let backend = self.solver.make_backend(self.solver_path.as_deref());
        let solver_name = backend.name();
        let writer = self
            .output_dir
            .as_deref()
            .map(|dir| ArtifactWriter::new(dir, &self.name))
            .transpose()?;

        let mut search = Search::new(&self.target, self.search.clone(), backend)?;
        if let Some(writer) = &writer {
            search = search.with_observer(writer);
        }
        let report = drive(&search)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            self.print_report(&report, show_all);
        }
        if let Some(writer) = &writer {
            let path = writer.write_summary(&self.sbox, &self.search, &solver_name, &report)?;
            log::info!("wrote summary to {}", path.display());
        }

        match report.outcome {
            SearchOutcome::Inconclusive { timeouts, failures } => Err(anyhow!(
                "no solution found; {} candidate(s) timed out and {} failed",
                timeouts,
                failures
            )),
            _ => Ok(()),
        }
    }

    fn print_report(&self, report: &SearchReport, show_all: bool) {
        let technology = self.search.cost.map(|c| c.technology);
        if show_all {
            for circuit in report.solutions() {
                println!("structure {}:", circuit.structure);
                print!("{}", circuit);
            }
        }
        match &report.outcome {
            SearchOutcome::Found { best } => {
                println!(
                    "best: {} gates, structure {}",
                    best.gate_count(),
                    best.structure
                );
                if !show_all {
                    print!("{}", best);
                }
                if let Some(technology) = technology {
                    println!("cost ({}): {}", technology, best.cost(technology));
                }
            }
            SearchOutcome::Unsatisfiable => println!("no solution within bounds"),
            SearchOutcome::Inconclusive { .. } => {}
        }
        println!(
            "{} solution(s) in {} attempt(s)",
            report.solutions().len(),
            report.attempts()
        );
    }
}
