// SPDX-License-Identifier: Apache-2.0

//! Selects the decision procedure backend on the command line or in the
//! config file.

use serde::{Deserialize, Serialize};
use std::fmt;

use sboxsynth::decision::{DecisionProcedure, SmtBinaryConfig, SmtBinarySolver, VarisatSolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SolverChoice {
    /// In-process SAT solving; needs no external tools.
    #[default]
    Varisat,
    Z3Binary,
    BitwuzlaBinary,
    BoolectorBinary,
    Cvc5Binary,
}

impl SolverChoice {
    pub const ALL: [SolverChoice; 5] = [
        SolverChoice::Varisat,
        SolverChoice::Z3Binary,
        SolverChoice::BitwuzlaBinary,
        SolverChoice::BoolectorBinary,
        SolverChoice::Cvc5Binary,
    ];

    fn binary_config(self) -> Option<SmtBinaryConfig> {
        match self {
            SolverChoice::Varisat => None,
            SolverChoice::Z3Binary => Some(SmtBinaryConfig::z3()),
            SolverChoice::BitwuzlaBinary => Some(SmtBinaryConfig::bitwuzla()),
            SolverChoice::BoolectorBinary => Some(SmtBinaryConfig::boolector()),
            SolverChoice::Cvc5Binary => Some(SmtBinaryConfig::cvc5()),
        }
    }

    /// Builds the backend; `solver_path` overrides the binary looked up on
    /// `PATH` and is ignored for in-process solving.
    pub fn make_backend(self, solver_path: Option<&str>) -> Box<dyn DecisionProcedure> {
        match self.binary_config() {
            None => Box::new(VarisatSolver::new()),
            Some(config) => {
                let config = match solver_path {
                    Some(path) => config.with_path(path),
                    None => config,
                };
                Box::new(SmtBinarySolver::new(config))
            }
        }
    }
}

impl fmt::Display for SolverChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SolverChoice::Varisat => "varisat",
            SolverChoice::Z3Binary => "z3-binary",
            SolverChoice::BitwuzlaBinary => "bitwuzla-binary",
            SolverChoice::BoolectorBinary => "boolector-binary",
            SolverChoice::Cvc5Binary => "cvc5-binary",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for SolverChoice {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "varisat" => Ok(Self::Varisat),
            "z3-binary" => Ok(Self::Z3Binary),
            "bitwuzla-binary" => Ok(Self::BitwuzlaBinary),
            "boolector-binary" => Ok(Self::BoolectorBinary),
            "cvc5-binary" => Ok(Self::Cvc5Binary),
            _ => Err(format!("invalid solver: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for choice in SolverChoice::ALL {
            assert_eq!(choice.to_string().parse::<SolverChoice>(), Ok(choice));
        }
        assert!("minisat".parse::<SolverChoice>().is_err());
    }

    #[test]
    fn backends_report_their_names() {
        assert_eq!(SolverChoice::Varisat.make_backend(None).name(), "varisat");
        let z3 = SolverChoice::Z3Binary.make_backend(Some("/opt/z3/bin/z3"));
        assert!(z3.name().contains("/opt/z3/bin/z3"), "{}", z3.name());
    }
}
