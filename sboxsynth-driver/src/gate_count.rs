// SPDX-License-Identifier: Apache-2.0

//! Minimises the number of gates.

use clap::ArgMatches;

use crate::common::SearchRun;
use crate::driver_config::DriverConfig;

pub fn handle_gate_count(matches: &ArgMatches, config: &Option<DriverConfig>) -> anyhow::Result<()> {
    let run = SearchRun::from_matches(matches, config)?;
    run.execute(false, |search| Ok(search.minimize_gates()))
}
