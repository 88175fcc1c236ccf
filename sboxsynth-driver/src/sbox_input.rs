// SPDX-License-Identifier: Apache-2.0

//! Reading S-box tables from flags and files.

use anyhow::{anyhow, Context};
use clap::ArgMatches;

fn parse_entry(token: &str) -> anyhow::Result<u64> {
    let token = token.trim();
    let parsed = match token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => token.parse::<u64>(),
    };
    parsed.with_context(|| format!("invalid S-box entry `{}`", token))
}

/// Accepts a JSON array of integers or a list of decimal / `0x` hex values
/// separated by commas or whitespace, optionally wrapped in brackets.
pub fn parse_sbox(text: &str) -> anyhow::Result<Vec<u64>> {
    let text = text.trim();
    if let Ok(values) = serde_json::from_str::<Vec<u64>>(text) {
        return Ok(values);
    }
    let body = text
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .unwrap_or(text);
    let values = body
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(parse_entry)
        .collect::<anyhow::Result<Vec<u64>>>()?;
    if values.is_empty() {
        return Err(anyhow!("S-box is empty"));
    }
    Ok(values)
}

/// Reads the table from `--sbox` or, failing that, `--sbox-file`.
pub fn read_sbox(matches: &ArgMatches) -> anyhow::Result<Vec<u64>> {
    if let Some(text) = matches.get_one::<String>("sbox") {
        return parse_sbox(text);
    }
    if let Some(path) = matches.get_one::<String>("sbox_file") {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading S-box file {}", path))?;
        return parse_sbox(&text);
    }
    Err(anyhow!("one of --sbox or --sbox-file is required"))
}
