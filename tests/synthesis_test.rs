// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use pretty_assertions::assert_eq;
use sboxsynth::decision::{SolveOutcome, VarisatSolver};
use sboxsynth::gate_library::Technology;
use sboxsynth::{
    encode, interpret, AcrossCountPolicy, CostObjective, DecisionProcedure, DepthStructure,
    EncodeRequest, Search, SearchConfig, SearchOutcome, TargetTable,
};

fn gates(names: &[&str]) -> Option<Vec<String>> {
    Some(names.iter().map(|n| n.to_string()).collect())
}

#[test]
fn identity_needs_one_gate_per_output() {
    let _ = env_logger::builder().is_test(true).try_init();
    let target = TargetTable::from_sbox(&[0, 1, 2, 3, 4, 5, 6, 7]).unwrap();

    let config = SearchConfig {
        max_gates: 3,
        allowed_gates: gates(&["AND"]),
        across_counts: AcrossCountPolicy::StopAtFirstSolved,
        ..SearchConfig::default()
    };
    let report = Search::new(&target, config, VarisatSolver::new())
        .unwrap()
        .minimize_gates();
    let best = report.best().expect("three pass-through gates");
    assert_eq!(best.gate_count(), 3);
    assert_eq!(best.truth_table(), (0..8).collect::<Vec<u64>>());

    // Outputs only bind to gates, so two gates cannot carry three distinct
    // output vectors.
    let config = SearchConfig {
        max_gates: 2,
        allowed_gates: gates(&["AND"]),
        ..SearchConfig::default()
    };
    let report = Search::new(&target, config, VarisatSolver::new())
        .unwrap()
        .minimize_gates();
    assert_eq!(report.outcome, SearchOutcome::Unsatisfiable);
    assert!(report.attempts() >= 2);
}

#[test]
fn solver_model_satisfies_every_assertion() {
    let target = TargetTable::from_sbox(&[0, 1, 3, 6, 7, 4, 5, 2]).unwrap();
    let structure = DepthStructure::new(vec![1, 1, 2, 2]).unwrap();
    let allowed = gates(&["XOR", "AND", "OR", "NOT"]).unwrap();
    let encoded = encode(&EncodeRequest {
        target: &target,
        gate_count: 6,
        structure: &structure,
        allowed_gates: Some(&allowed),
        cost: None,
        parallel: false,
    })
    .unwrap();

    let verdict = VarisatSolver::new().solve(&encoded.problem, Duration::from_secs(300));
    let assignment = match verdict.outcome {
        SolveOutcome::Sat(assignment) => assignment,
        other => panic!("expected a six-gate circuit, got {:?}", other),
    };
    encoded.problem.check(&assignment).unwrap();
    let circuit = interpret(&assignment, &encoded.layout).unwrap();
    assert!(circuit.implements(target.mapping()));
    assert_eq!(circuit.structure, structure);
}

#[test]
fn enumerated_search_finds_six_gate_three_bit_sbox() {
    let _ = env_logger::builder().is_test(true).try_init();
    let sbox = [0, 1, 3, 6, 7, 4, 5, 2];
    let target = TargetTable::from_sbox(&sbox).unwrap();
    let config = SearchConfig {
        max_gates: 6,
        allowed_gates: gates(&["XOR", "AND", "OR", "NOT"]),
        timeout_secs: 600,
        jobs: 0,
        ..SearchConfig::default()
    };
    let report = Search::new(&target, config, VarisatSolver::new())
        .unwrap()
        .minimize_gates();
    assert!(matches!(report.outcome, SearchOutcome::Found { .. }));
    let best = report.best().expect("a circuit of at most six gates");
    assert!(best.gate_count() <= 6);
    assert!(best.implements(&sbox));
}

#[test]
fn parallel_connectivity_still_reaches_three_bit_sbox() {
    // Level 0: x1&x0, x1|x2, !x0. Level 1: the two output XORs and
    // x2&!x0. Level 2: the last output XOR. Every later slot reads a gate.
    let sbox = [0, 1, 3, 6, 7, 4, 5, 2];
    let target = TargetTable::from_sbox(&sbox).unwrap();
    let structure = DepthStructure::new(vec![3, 3, 1]).unwrap();
    let allowed = gates(&["XOR", "AND", "OR", "NOT"]).unwrap();
    let encoded = encode(&EncodeRequest {
        target: &target,
        gate_count: 7,
        structure: &structure,
        allowed_gates: Some(&allowed),
        cost: None,
        parallel: true,
    })
    .unwrap();
    assert!(encoded.layout.parallel);

    let verdict = VarisatSolver::new().solve(&encoded.problem, Duration::from_secs(300));
    let assignment = match verdict.outcome {
        SolveOutcome::Sat(assignment) => assignment,
        other => panic!("expected sat, got {:?}", other),
    };
    encoded.problem.check(&assignment).unwrap();
    let circuit = interpret(&assignment, &encoded.layout).unwrap();
    assert!(circuit.implements(&sbox));
}

#[test]
fn cost_search_reports_cheapest_circuit() {
    let target = TargetTable::from_sbox(&[0, 1, 3, 2]).unwrap();
    let config = SearchConfig {
        max_gates: 2,
        allowed_gates: gates(&["XOR", "XNOR", "AND", "OR"]),
        cost: Some(CostObjective {
            technology: Technology::Umc180,
            ceiling: 40,
        }),
        ..SearchConfig::default()
    };
    let report = Search::new(&target, config, VarisatSolver::new())
        .unwrap()
        .minimize_cost()
        .unwrap();
    let best = report.best().expect("a circuit under the ceiling");
    assert!(best.implements(&[0, 1, 3, 2]));
    // One XOR (8) for y1 plus the cheapest pass-through of x0 (AND or OR, 4).
    assert_eq!(best.cost(Technology::Umc180), 12);
    assert_eq!(best.total_cost, Some(12));
}
