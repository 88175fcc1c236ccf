// SPDX-License-Identifier: Apache-2.0

//! The optional `--config` TOML file and its merge with command line flags.
//! Flags given on the command line always win over file values.

use std::str::FromStr;

use anyhow::{anyhow, Context};
use clap::ArgMatches;
use serde::Deserialize;

use sboxsynth::config::{
    AcrossCountPolicy, CostObjective, PerCountPolicy, SearchConfig, StructureMode,
};
use sboxsynth::gate_library::Technology;
use sboxsynth::truth_table::MappingCheck;

use crate::solver_choice::SolverChoice;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct DriverConfig {
    #[serde(default)]
    pub search: SearchConfig,

    /// Backend name as accepted by `--solver`.
    pub solver: Option<String>,

    /// Solver binary to run instead of the one found on `PATH`.
    pub solver_path: Option<String>,

    /// Where per-candidate problems and the run summary are written.
    pub output_dir: Option<String>,

    /// Set to false to accept S-boxes with repeated outputs.
    pub permutation_check: Option<bool>,
}

impl DriverConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path))?;
        toml::from_str(&text).with_context(|| format!("parsing config file {}", path))
    }
}

/// Flag value by id, tolerating subcommands that do not define the flag.
fn flag<'a>(matches: &'a ArgMatches, id: &str) -> Option<&'a String> {
    matches.try_get_one::<String>(id).ok().flatten()
}

fn parsed_flag<T>(matches: &ArgMatches, id: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    flag(matches, id)
        .map(|s| {
            s.parse::<T>()
                .map_err(|e| anyhow!("invalid value `{}` for --{}: {}", s, id.replace('_', "-"), e))
        })
        .transpose()
}

fn bool_flag(matches: &ArgMatches, id: &str) -> Option<bool> {
    flag(matches, id).map(|s| s == "true")
}

/// Splits a comma-separated gate list such as `XOR,AND,NOT`.
pub fn parse_gate_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_ascii_uppercase())
        .collect()
}

pub fn get_solver(matches: &ArgMatches, config: &Option<DriverConfig>) -> anyhow::Result<SolverChoice> {
    let name = match flag(matches, "solver") {
        Some(name) => Some(name.clone()),
        None => config.as_ref().and_then(|c| c.solver.clone()),
    };
    match name {
        Some(name) => name.parse::<SolverChoice>().map_err(|e| anyhow!(e)),
        None => Ok(SolverChoice::default()),
    }
}

pub fn get_solver_path(matches: &ArgMatches, config: &Option<DriverConfig>) -> Option<String> {
    if let Some(path) = flag(matches, "solver_path") {
        Some(path.to_string())
    } else if let Some(config) = config {
        config.solver_path.clone()
    } else {
        None
    }
}

pub fn get_output_dir(matches: &ArgMatches, config: &Option<DriverConfig>) -> Option<String> {
    if let Some(dir) = flag(matches, "output_dir") {
        Some(dir.to_string())
    } else if let Some(config) = config {
        config.output_dir.clone()
    } else {
        None
    }
}

pub fn get_mapping_check(matches: &ArgMatches, config: &Option<DriverConfig>) -> MappingCheck {
    let required = bool_flag(matches, "permutation_check")
        .or_else(|| config.as_ref().and_then(|c| c.permutation_check))
        .unwrap_or(true);
    if required {
        MappingCheck::Permutation
    } else {
        MappingCheck::RangeOnly
    }
}

/// Starts from the file's `[search]` table (or defaults) and applies every
/// search flag present on the command line.
pub fn get_search_config(
    matches: &ArgMatches,
    config: &Option<DriverConfig>,
) -> anyhow::Result<SearchConfig> {
    let mut search = config
        .as_ref()
        .map(|c| c.search.clone())
        .unwrap_or_default();

    if let Some(max_gates) = parsed_flag::<usize>(matches, "max_gates")? {
        search.max_gates = max_gates;
    }
    if let Some(max_depth) = parsed_flag::<usize>(matches, "max_depth")? {
        search.max_depth = Some(max_depth);
    }
    if let Some(serial) = bool_flag(matches, "serial") {
        search.structure_mode = if serial {
            StructureMode::Serial
        } else {
            StructureMode::Enumerated
        };
    }
    if let Some(explore_all) = bool_flag(matches, "explore_all") {
        search.per_count = if explore_all {
            PerCountPolicy::ExploreAll
        } else {
            PerCountPolicy::StopOnFirst
        };
    }
    if let Some(stop) = bool_flag(matches, "stop_at_first_solved") {
        search.across_counts = if stop {
            AcrossCountPolicy::StopAtFirstSolved
        } else {
            AcrossCountPolicy::ContinueToSmaller
        };
    }
    if let Some(gates) = flag(matches, "gates") {
        search.allowed_gates = Some(parse_gate_list(gates));
    }
    if let Some(timeout) = parsed_flag::<u64>(matches, "timeout")? {
        search.timeout_secs = timeout;
    }
    if let Some(jobs) = parsed_flag::<usize>(matches, "jobs")? {
        search.jobs = jobs;
    }
    if let Some(parallel) = bool_flag(matches, "parallel") {
        search.parallel = parallel;
    }

    let technology = parsed_flag::<Technology>(matches, "technology")?;
    let ceiling = parsed_flag::<i64>(matches, "ceiling")?;
    search.cost = match (search.cost, technology, ceiling) {
        (Some(cost), technology, ceiling) => Some(CostObjective {
            technology: technology.unwrap_or(cost.technology),
            ceiling: ceiling.unwrap_or(cost.ceiling),
        }),
        (None, technology, Some(ceiling)) => Some(CostObjective {
            technology: technology.unwrap_or(Technology::Umc180),
            ceiling,
        }),
        (None, Some(_), None) => {
            return Err(anyhow!("--technology needs a cost ceiling (--ceiling)"));
        }
        (None, None, None) => None,
    };

    search.validate()?;
    Ok(search)
}
