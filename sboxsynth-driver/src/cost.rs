// SPDX-License-Identifier: Apache-2.0

//! Minimises technology-weighted area, or lists every solution at an exact
//! gate count under a cost ceiling.

use anyhow::anyhow;
use clap::ArgMatches;

use crate::common::SearchRun;
use crate::driver_config::DriverConfig;

pub fn handle_cost(matches: &ArgMatches, config: &Option<DriverConfig>) -> anyhow::Result<()> {
    let run = SearchRun::from_matches(matches, config)?;
    if run.search.cost.is_none() {
        return Err(anyhow!(
            "cost search needs a ceiling (--ceiling or `cost` in the config file)"
        ));
    }
    let exact_gates = match matches.get_one::<String>("exact_gates") {
        Some(s) => Some(
            s.parse::<usize>()
                .map_err(|e| anyhow!("invalid value `{}` for --exact-gates: {}", s, e))?,
        ),
        None => None,
    };
    match exact_gates {
        Some(gate_count) => run.execute(true, |search| Ok(search.find_all_at(gate_count))),
        None => run.execute(false, |search| Ok(search.minimize_cost()?)),
    }
}
