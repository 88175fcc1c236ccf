// SPDX-License-Identifier: Apache-2.0

//! Run configuration handed to the search at construction.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::encoder::CostBound;
use crate::error::ConfigError;
use crate::gate_library::{GateSet, Technology};

/// How candidate depth structures are generated for a gate count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StructureMode {
    /// Every feasible composition up to the depth bound.
    #[default]
    Enumerated,
    /// Only the one-gate-per-level structure.
    Serial,
}

/// How many structures are tried at a single gate count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PerCountPolicy {
    #[default]
    StopOnFirst,
    ExploreAll,
}

/// Whether the descending gate-count walk halts at the first count that has
/// a solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AcrossCountPolicy {
    StopAtFirstSolved,
    #[default]
    ContinueToSmaller,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CostObjective {
    pub technology: Technology,
    /// Strict upper bound on the total cost of an accepted circuit.
    pub ceiling: i64,
}

impl CostObjective {
    pub fn bound(&self) -> CostBound {
        CostBound {
            technology: self.technology,
            ceiling: self.ceiling,
        }
    }
}

pub const DEFAULT_MAX_GATES: usize = 6;
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct SearchConfig {
    /// Largest gate count tried; the walk descends from here to 1.
    pub max_gates: usize,
    /// `None` lets a structure be as deep as its gate count.
    pub max_depth: Option<usize>,
    pub structure_mode: StructureMode,
    pub per_count: PerCountPolicy,
    pub across_counts: AcrossCountPolicy,
    /// Gate names the circuit may use; `None` admits the whole catalogue.
    pub allowed_gates: Option<Vec<String>>,
    pub cost: Option<CostObjective>,
    /// Wall-clock limit for one candidate.
    pub timeout_secs: u64,
    /// Worker threads for candidates at one gate count; 0 means one per CPU.
    pub jobs: usize,
    /// Parallel connectivity: above the first level only the first input
    /// slot of a gate may read primary inputs.
    pub parallel: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            max_gates: DEFAULT_MAX_GATES,
            max_depth: None,
            structure_mode: StructureMode::default(),
            per_count: PerCountPolicy::default(),
            across_counts: AcrossCountPolicy::default(),
            allowed_gates: None,
            cost: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            jobs: 1,
            parallel: false,
        }
    }
}

impl SearchConfig {
    /// Rejects settings that would make every candidate fail the same way.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_gates == 0 {
            return Err(ConfigError::ZeroGateBound);
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        self.gate_set()?;
        if let Some(cost) = &self.cost {
            if cost.ceiling <= 0 {
                return Err(ConfigError::NonPositiveCeiling(cost.ceiling));
            }
        }
        Ok(())
    }

    pub fn gate_set(&self) -> Result<GateSet, ConfigError> {
        GateSet::resolve(self.allowed_gates.as_deref())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn worker_count(&self) -> usize {
        if self.jobs == 0 {
            num_cpus::get()
        } else {
            self.jobs
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_validate() {
        let config = SearchConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.timeout(), Duration::from_secs(300));
        assert_eq!(config.worker_count(), 1);
        assert_eq!(config.gate_set().unwrap(), GateSet::full());
    }

    #[test]
    fn rejects_unusable_settings() {
        let zero_gates = SearchConfig {
            max_gates: 0,
            ..SearchConfig::default()
        };
        assert_eq!(zero_gates.validate(), Err(ConfigError::ZeroGateBound));

        let zero_timeout = SearchConfig {
            timeout_secs: 0,
            ..SearchConfig::default()
        };
        assert_eq!(zero_timeout.validate(), Err(ConfigError::ZeroTimeout));

        let bad_gate = SearchConfig {
            allowed_gates: Some(vec!["XOR".into(), "MUX".into()]),
            ..SearchConfig::default()
        };
        assert_eq!(
            bad_gate.validate(),
            Err(ConfigError::UnknownGate("MUX".into()))
        );

        let empty = SearchConfig {
            allowed_gates: Some(vec![]),
            ..SearchConfig::default()
        };
        assert_eq!(empty.validate(), Err(ConfigError::EmptyGateSet));

        let free = SearchConfig {
            cost: Some(CostObjective {
                technology: Technology::Umc180,
                ceiling: 0,
            }),
            ..SearchConfig::default()
        };
        assert_eq!(free.validate(), Err(ConfigError::NonPositiveCeiling(0)));
    }

    #[test]
    fn deserializes_kebab_case_with_defaults() {
        let text = r#"{
            "max-gates": 4,
            "structure-mode": "serial",
            "per-count": "explore-all",
            "allowed-gates": ["XOR", "AND"],
            "cost": {"technology": "smic130", "ceiling": 40},
            "parallel": true
        }"#;
        let config: SearchConfig = serde_json::from_str(text).unwrap();
        assert_eq!(config.max_gates, 4);
        assert_eq!(config.structure_mode, StructureMode::Serial);
        assert_eq!(config.per_count, PerCountPolicy::ExploreAll);
        assert_eq!(config.across_counts, AcrossCountPolicy::ContinueToSmaller);
        assert_eq!(
            config.cost.map(|c| c.bound()),
            Some(CostBound {
                technology: Technology::Smic130,
                ceiling: 40
            })
        );
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(config.parallel);
        assert!(!SearchConfig::default().parallel);
        assert!(serde_json::from_str::<SearchConfig>(r#"{"max_gate": 4}"#).is_err());
    }
}
