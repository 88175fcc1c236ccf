// SPDX-License-Identifier: Apache-2.0

use anyhow::anyhow;
use clap::ArgMatches;

use sboxsynth::truth_table::{analyze, bit_width_for};

use crate::common::json_flag;
use crate::sbox_input::read_sbox;

pub fn handle_analyze(matches: &ArgMatches) -> anyhow::Result<()> {
    let sbox = read_sbox(matches)?;
    let bit_width = bit_width_for(sbox.len())
        .ok_or_else(|| anyhow!("S-box length {} is not a power of two", sbox.len()))?;
    let analysis = analyze(&sbox, bit_width)?;
    if json_flag(matches) {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        println!("size: {}", analysis.size);
        println!("bit width: {}", analysis.bit_width);
        println!("permutation: {}", analysis.is_permutation);
        println!("range: [{}, {}]", analysis.min_value, analysis.max_value);
        println!("fixed points: {}", analysis.fixed_points);
        println!(
            "differential uniformity: {}",
            analysis.differential_uniformity
        );
    }
    Ok(())
}
