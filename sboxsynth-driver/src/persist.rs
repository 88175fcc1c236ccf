// SPDX-License-Identifier: Apache-2.0

//! Writes per-candidate problems, solved circuits and a run summary under
//! `<output-dir>/<name>/`.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;

use sboxsynth::config::SearchConfig;
use sboxsynth::encoder::EncodedProblem;
use sboxsynth::search::{Candidate, CandidateRecord, SearchObserver, SearchOutcome, SearchReport};

pub struct ArtifactWriter {
    dir: PathBuf,
    name: String,
}

impl ArtifactWriter {
    pub fn new(output_dir: &Path, name: &str) -> anyhow::Result<Self> {
        let dir = output_dir.join(name);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating output directory {}", dir.display()))?;
        Ok(ArtifactWriter {
            dir,
            name: name.to_string(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<name>_g<gates>_s<structure>`, plus `_c<ceiling>` for cost-bounded
    /// candidates since those repeat a structure at several ceilings.
    pub fn stem(&self, candidate: &Candidate) -> String {
        let mut stem = format!(
            "{}_g{}_s{}",
            self.name,
            candidate.gate_count,
            candidate.structure.tag()
        );
        if let Some(cost) = candidate.cost {
            stem.push_str(&format!("_c{}", cost.ceiling));
        }
        stem
    }

    pub fn summary_path(&self) -> PathBuf {
        self.dir.join(format!("{}_summary.json", self.name))
    }

    pub fn write_summary(
        &self,
        sbox: &[u64],
        config: &SearchConfig,
        solver: &str,
        report: &SearchReport,
    ) -> anyhow::Result<PathBuf> {
        let summary = Summary {
            name: &self.name,
            sbox,
            solver,
            config,
            outcome: &report.outcome,
            attempts: report.attempts(),
            solutions: report.solutions().len(),
            records: &report.records,
        };
        let path = self.summary_path();
        let text = serde_json::to_string_pretty(&summary)?;
        std::fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }
}

#[derive(Serialize)]
struct Summary<'a> {
    name: &'a str,
    sbox: &'a [u64],
    solver: &'a str,
    config: &'a SearchConfig,
    outcome: &'a SearchOutcome,
    attempts: usize,
    solutions: usize,
    records: &'a [CandidateRecord],
}

impl SearchObserver for ArtifactWriter {
    fn on_encoded(&self, candidate: &Candidate, problem: &EncodedProblem) {
        let path = self.dir.join(format!("{}.smt2", self.stem(candidate)));
        let written = problem
            .problem
            .to_smtlib()
            .and_then(|text| std::fs::write(&path, text));
        if let Err(e) = written {
            log::warn!("could not write {}: {}", path.display(), e);
        }
    }

    fn on_record(&self, record: &CandidateRecord) {
        let Some(circuit) = record.circuit() else {
            return;
        };
        let path = self
            .dir
            .join(format!("{}.circuit.txt", self.stem(&record.candidate)));
        if let Err(e) = std::fs::write(&path, circuit.to_string()) {
            log::warn!("could not write {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sboxsynth::encoder::CostBound;
    use sboxsynth::gate_library::Technology;
    use sboxsynth::structure::DepthStructure;

    #[test]
    fn stems_name_gate_count_structure_and_ceiling() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path(), "present").unwrap();
        assert!(writer.dir().is_dir());
        let mut candidate = Candidate {
            gate_count: 4,
            structure: DepthStructure::new(vec![1, 2, 1]).unwrap(),
            cost: None,
        };
        assert_eq!(writer.stem(&candidate), "present_g4_s1-2-1");
        candidate.cost = Some(CostBound {
            technology: Technology::Umc180,
            ceiling: 30,
        });
        assert_eq!(writer.stem(&candidate), "present_g4_s1-2-1_c30");
        assert_eq!(
            writer.summary_path(),
            dir.path().join("present").join("present_summary.json")
        );
    }
}
