// SPDX-License-Identifier: Apache-2.0

//! Drives candidate (gate count, structure) problems through encoding,
//! solving and interpretation, and applies the stop policies.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::circuit::Circuit;
use crate::config::{AcrossCountPolicy, PerCountPolicy, SearchConfig, StructureMode};
use crate::decision::{DecisionProcedure, SolveOutcome};
use crate::encoder::{encode, CostBound, EncodeRequest, EncodedProblem};
use crate::error::{ConfigError, InterpretError, SolverFailure};
use crate::interpret::interpret;
use crate::structure::{DepthStructure, StructureEnumerator};
use crate::truth_table::TargetTable;

/// One point of the search space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub gate_count: usize,
    pub structure: DepthStructure,
    pub cost: Option<CostBound>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "detail")]
pub enum CandidateFailure {
    Encode(ConfigError),
    Solver(SolverFailure),
    Interpret(InterpretError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "status", content = "detail")]
pub enum CandidateOutcome {
    Solved(Circuit),
    Unsat,
    Timeout,
    Failed(CandidateFailure),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateRecord {
    pub candidate: Candidate,
    pub outcome: CandidateOutcome,
    pub solve_time: Duration,
}

impl CandidateRecord {
    pub fn circuit(&self) -> Option<&Circuit> {
        match &self.outcome {
            CandidateOutcome::Solved(c) => Some(c),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "result")]
pub enum SearchOutcome {
    /// Smallest gate count found; for cost searches, cheapest at that count.
    Found { best: Circuit },
    /// Every attempted candidate was refuted.
    Unsatisfiable,
    /// No solution, but some candidates ended without a verdict.
    Inconclusive { timeouts: usize, failures: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchReport {
    pub outcome: SearchOutcome,
    /// Every attempted candidate in the order it was scheduled.
    pub records: Vec<CandidateRecord>,
}

impl SearchReport {
    pub fn best(&self) -> Option<&Circuit> {
        match &self.outcome {
            SearchOutcome::Found { best } => Some(best),
            _ => None,
        }
    }

    pub fn solutions(&self) -> Vec<&Circuit> {
        self.records.iter().filter_map(|r| r.circuit()).collect()
    }

    pub fn attempts(&self) -> usize {
        self.records.len()
    }
}

/// Receives each encoded problem and each finished candidate. Called from
/// worker threads when more than one job is configured.
pub trait SearchObserver: Sync {
    fn on_encoded(&self, _candidate: &Candidate, _problem: &EncodedProblem) {}

    fn on_record(&self, _record: &CandidateRecord) {}
}

pub struct NoopObserver;

impl SearchObserver for NoopObserver {}

static NOOP: NoopObserver = NoopObserver;

pub struct Search<'a, B: DecisionProcedure> {
    target: &'a TargetTable,
    config: SearchConfig,
    backend: B,
    enumerator: StructureEnumerator,
    observer: &'a dyn SearchObserver,
}

impl<'a, B: DecisionProcedure> Search<'a, B> {
    pub fn new(target: &'a TargetTable, config: SearchConfig, backend: B) -> Result<Self, ConfigError> {
        config.validate()?;
        let fan_in = config.gate_set()?.fan_in();
        Ok(Search {
            target,
            enumerator: StructureEnumerator::new(target.bit_width()).with_fan_in(fan_in),
            config,
            backend,
            observer: &NOOP,
        })
    }

    pub fn with_observer(self, observer: &'a dyn SearchObserver) -> Self {
        Search { observer, ..self }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn structures_for(&self, gate_count: usize) -> Vec<DepthStructure> {
        match self.config.structure_mode {
            StructureMode::Enumerated => self.enumerator.enumerate(gate_count, self.config.max_depth),
            StructureMode::Serial => self.enumerator.serial(gate_count),
        }
    }

    fn fixed_cost(&self) -> Option<CostBound> {
        self.config.cost.map(|c| c.bound())
    }

    fn candidates(&self, gate_count: usize, cost: Option<CostBound>) -> Vec<Candidate> {
        self.structures_for(gate_count)
            .into_iter()
            .map(|structure| Candidate {
                gate_count,
                structure,
                cost,
            })
            .collect()
    }

    /// Walks gate counts from the bound down to 1. A cost objective, if
    /// configured, acts as a fixed ceiling.
    pub fn minimize_gates(&self) -> SearchReport {
        let stop_on_first = self.config.per_count == PerCountPolicy::StopOnFirst;
        let mut records = Vec::new();
        for gate_count in (1..=self.config.max_gates).rev() {
            let candidates = self.candidates(gate_count, self.fixed_cost());
            if candidates.is_empty() {
                log::warn!("no feasible depth structures for {} gates", gate_count);
                continue;
            }
            log::info!(
                "trying {} gates over {} structure(s)",
                gate_count,
                candidates.len()
            );
            let level = self.run_level(&candidates, stop_on_first);
            let solved = level.iter().filter(|r| r.circuit().is_some()).count();
            records.extend(level);
            if solved > 0 {
                log::info!("{} gates: {} solution(s)", gate_count, solved);
                if self.config.across_counts == AcrossCountPolicy::StopAtFirstSolved {
                    break;
                }
            }
        }
        self.finish(records)
    }

    /// Like [`Search::minimize_gates`], but at every gate count keeps
    /// lowering the ceiling to the cheapest accepted cost until no structure
    /// beats it.
    pub fn minimize_cost(&self) -> Result<SearchReport, ConfigError> {
        let objective = self.config.cost.ok_or(ConfigError::MissingCostObjective)?;
        let stop_on_first = self.config.per_count == PerCountPolicy::StopOnFirst;
        let mut records = Vec::new();
        for gate_count in (1..=self.config.max_gates).rev() {
            let mut bound = objective.bound();
            let mut solved_here = false;
            loop {
                let candidates = self.candidates(gate_count, Some(bound));
                if candidates.is_empty() {
                    log::warn!("no feasible depth structures for {} gates", gate_count);
                    break;
                }
                log::info!(
                    "trying {} gates with cost below {}",
                    gate_count,
                    bound.ceiling
                );
                let level = self.run_level(&candidates, stop_on_first);
                let cheapest = level
                    .iter()
                    .filter_map(|r| r.circuit())
                    .map(|c| c.cost(bound.technology))
                    .min();
                records.extend(level);
                match cheapest {
                    Some(cost) => {
                        log::info!("{} gates: accepted cost {}", gate_count, cost);
                        solved_here = true;
                        bound.ceiling = cost as i64;
                    }
                    None => break,
                }
            }
            if solved_here && self.config.across_counts == AcrossCountPolicy::StopAtFirstSolved {
                break;
            }
        }
        Ok(self.finish(records))
    }

    /// Tries every structure at exactly `gate_count` gates and keeps every
    /// solution.
    pub fn find_all_at(&self, gate_count: usize) -> SearchReport {
        let candidates = self.candidates(gate_count, self.fixed_cost());
        log::info!(
            "finding all solutions at {} gates over {} structure(s)",
            gate_count,
            candidates.len()
        );
        let records = self.run_level(&candidates, false);
        self.finish(records)
    }

    fn finish(&self, records: Vec<CandidateRecord>) -> SearchReport {
        let technology = self.config.cost.map(|c| c.technology);
        let best = records
            .iter()
            .filter_map(|r| r.circuit())
            .min_by_key(|c| (c.gate_count(), technology.map(|t| c.cost(t)).unwrap_or(0)));
        let outcome = match best {
            Some(best) => {
                log::info!("best circuit: {} gates", best.gate_count());
                SearchOutcome::Found { best: best.clone() }
            }
            None => {
                let timeouts = records
                    .iter()
                    .filter(|r| r.outcome == CandidateOutcome::Timeout)
                    .count();
                let failures = records
                    .iter()
                    .filter(|r| matches!(r.outcome, CandidateOutcome::Failed(_)))
                    .count();
                if timeouts == 0 && failures == 0 {
                    log::info!("no solution within bounds");
                    SearchOutcome::Unsatisfiable
                } else {
                    log::warn!(
                        "no solution found; {} timeout(s), {} failure(s)",
                        timeouts,
                        failures
                    );
                    SearchOutcome::Inconclusive { timeouts, failures }
                }
            }
        };
        SearchReport { outcome, records }
    }

    /// Attempts `candidates` in order, sequentially or on scoped workers.
    /// Once `stop_on_first` is met no new candidate is started, but results
    /// already in flight are kept.
    fn run_level(&self, candidates: &[Candidate], stop_on_first: bool) -> Vec<CandidateRecord> {
        let workers = self.config.worker_count().min(candidates.len());
        if workers <= 1 {
            let mut records = Vec::with_capacity(candidates.len());
            for candidate in candidates {
                let record = self.attempt(candidate);
                let solved = record.circuit().is_some();
                records.push(record);
                if solved && stop_on_first {
                    break;
                }
            }
            return records;
        }

        let next = AtomicUsize::new(0);
        let stop = AtomicBool::new(false);
        let finished: Mutex<Vec<(usize, CandidateRecord)>> = Mutex::new(Vec::new());
        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    if stop.load(Ordering::SeqCst) {
                        break;
                    }
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    let Some(candidate) = candidates.get(index) else {
                        break;
                    };
                    let record = self.attempt(candidate);
                    if stop_on_first && record.circuit().is_some() {
                        stop.store(true, Ordering::SeqCst);
                    }
                    finished
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push((index, record));
                });
            }
        });
        let mut finished = finished.into_inner().unwrap_or_else(PoisonError::into_inner);
        finished.sort_by_key(|(index, _)| *index);
        finished.into_iter().map(|(_, record)| record).collect()
    }

    fn attempt(&self, candidate: &Candidate) -> CandidateRecord {
        let start = Instant::now();
        let request = EncodeRequest {
            target: self.target,
            gate_count: candidate.gate_count,
            structure: &candidate.structure,
            allowed_gates: self.config.allowed_gates.as_deref(),
            cost: candidate.cost,
            parallel: self.config.parallel,
        };
        let encoded = match encode(&request) {
            Ok(encoded) => encoded,
            Err(e) => {
                log::warn!("encoding {} failed: {}", candidate.structure, e);
                return self.record(
                    candidate,
                    CandidateOutcome::Failed(CandidateFailure::Encode(e)),
                    start.elapsed(),
                );
            }
        };
        self.observer.on_encoded(candidate, &encoded);

        let verdict = self.backend.solve(&encoded.problem, self.config.timeout());
        let outcome = match verdict.outcome {
            SolveOutcome::Sat(model) => {
                match interpret(&model, &encoded.layout).and_then(|c| self.verify(candidate, c)) {
                    Ok(circuit) => CandidateOutcome::Solved(circuit),
                    Err(e) => {
                        log::warn!("{} gates {}: {}", candidate.gate_count, candidate.structure, e);
                        CandidateOutcome::Failed(CandidateFailure::Interpret(e))
                    }
                }
            }
            SolveOutcome::Unsat => CandidateOutcome::Unsat,
            SolveOutcome::Timeout => {
                log::warn!(
                    "{} gates {}: timed out after {:?}",
                    candidate.gate_count,
                    candidate.structure,
                    verdict.wall_time
                );
                CandidateOutcome::Timeout
            }
            SolveOutcome::Error(e) => {
                log::warn!(
                    "{} gates {}: {} failed: {}",
                    candidate.gate_count,
                    candidate.structure,
                    self.backend.name(),
                    e
                );
                CandidateOutcome::Failed(CandidateFailure::Solver(e))
            }
        };
        self.record(candidate, outcome, verdict.wall_time)
    }

    fn record(&self, candidate: &Candidate, outcome: CandidateOutcome, solve_time: Duration) -> CandidateRecord {
        let record = CandidateRecord {
            candidate: candidate.clone(),
            outcome,
            solve_time,
        };
        log::debug!(
            "{} gates {}: {:?} in {:?}",
            candidate.gate_count,
            candidate.structure,
            record.circuit().map(|c| c.gate_count()),
            solve_time
        );
        self.observer.on_record(&record);
        record
    }

    /// Re-evaluates a decoded circuit so a wrong model never counts as a
    /// solution.
    fn verify(&self, candidate: &Candidate, circuit: Circuit) -> Result<Circuit, InterpretError> {
        if let Some((input, expected, actual)) = circuit.first_mismatch(self.target.mapping()) {
            return Err(InterpretError::MappingMismatch {
                input,
                expected,
                actual,
            });
        }
        if let Some(bound) = candidate.cost {
            let cost = circuit.cost(bound.technology);
            if cost as i64 >= bound.ceiling {
                return Err(InterpretError::CeilingViolated {
                    cost,
                    ceiling: bound.ceiling,
                });
            }
        }
        Ok(circuit)
    }
}
