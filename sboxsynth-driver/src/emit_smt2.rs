// SPDX-License-Identifier: Apache-2.0

//! Writes the encoded problem for a single (gate count, structure) candidate
//! without solving it.

use anyhow::{anyhow, Context};
use clap::ArgMatches;

use sboxsynth::encoder::{encode, EncodeRequest};
use sboxsynth::structure::{DepthStructure, StructureEnumerator};
use sboxsynth::truth_table::TargetTable;

use crate::driver_config::{get_mapping_check, get_search_config, DriverConfig};
use crate::sbox_input::read_sbox;

/// Parses `1-2-1` or `1,2,1`.
pub fn parse_structure(text: &str) -> anyhow::Result<DepthStructure> {
    let levels = text
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(|c: char| c == '-' || c == ',')
        .map(|s| {
            s.trim()
                .parse::<usize>()
                .with_context(|| format!("invalid level `{}` in structure `{}`", s, text))
        })
        .collect::<anyhow::Result<Vec<usize>>>()?;
    Ok(DepthStructure::new(levels)?)
}

pub fn handle_emit_smt2(matches: &ArgMatches, config: &Option<DriverConfig>) -> anyhow::Result<()> {
    let sbox = read_sbox(matches)?;
    let target = TargetTable::from_sbox_checked(&sbox, get_mapping_check(matches, config))?;
    let search = get_search_config(matches, config)?;

    let gate_count: usize = match matches.get_one::<String>("gate_count") {
        Some(s) => s
            .parse()
            .map_err(|e| anyhow!("invalid value `{}` for --gate-count: {}", s, e))?,
        None => return Err(anyhow!("--gate-count is required")),
    };
    let structure = match matches.get_one::<String>("structure") {
        Some(text) => parse_structure(text)?,
        None => {
            let fan_in = search.gate_set()?.fan_in();
            StructureEnumerator::new(target.bit_width())
                .with_fan_in(fan_in)
                .iter(gate_count, search.max_depth)
                .next()
                .ok_or_else(|| anyhow!("no feasible depth structure for {} gates", gate_count))?
        }
    };

    let encoded = encode(&EncodeRequest {
        target: &target,
        gate_count,
        structure: &structure,
        allowed_gates: search.allowed_gates.as_deref(),
        cost: search.cost.map(|c| c.bound()),
        parallel: search.parallel,
    })?;
    let text = encoded.problem.to_smtlib().context("rendering SMT-LIB2")?;
    match matches.get_one::<String>("output") {
        Some(path) => {
            std::fs::write(path, text).with_context(|| format!("writing {}", path))?;
            log::info!("wrote {} gates {} to {}", gate_count, structure, path);
        }
        None => print!("{}", text),
    }
    Ok(())
}
