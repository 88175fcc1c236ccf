// SPDX-License-Identifier: Apache-2.0

use std::process::{Command, Output};

fn run_driver(args: &[&str]) -> Output {
    let command_path = env!("CARGO_BIN_EXE_sboxsynth-driver");
    Command::new(command_path)
        .args(args)
        .output()
        .expect("Failed to run sboxsynth-driver")
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "stdout: {}\nstderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn analyze_reports_present_sbox_properties() {
    let present = "0xC,0x5,0x6,0xB,0x9,0x0,0xA,0xD,0x3,0xE,0xF,0x8,0x4,0x7,0x1,0x2";
    let output = run_driver(&["analyze", "--sbox", present, "--json", "true"]);
    assert_success(&output);
    let analysis: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(analysis["size"], 16);
    assert_eq!(analysis["bit_width"], 4);
    assert_eq!(analysis["is_permutation"], true);
    assert_eq!(analysis["differential_uniformity"], 4);
}

#[test]
fn gate_count_finds_two_gate_circuit() {
    let output = run_driver(&[
        "gate-count",
        "--sbox",
        "0,1,3,2",
        "--gates",
        "XOR,AND",
        "--max-gates",
        "3",
    ]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("best: 2 gates"), "stdout: {}", stdout);
    assert!(
        stdout.contains("XOR(x0, x1)") || stdout.contains("XOR(x1, x0)"),
        "stdout: {}",
        stdout
    );
}

#[test]
fn gate_count_json_report_round_trips() {
    let output = run_driver(&[
        "gate-count",
        "--sbox",
        "[0, 1, 3, 2]",
        "--gates",
        "XOR,AND",
        "--max-gates",
        "2",
        "--stop-at-first-solved",
        "true",
        "--json",
        "true",
    ]);
    assert_success(&output);
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["outcome"]["result"], "found");
    assert_eq!(report["outcome"]["best"]["gates"].as_array().unwrap().len(), 2);
    assert_eq!(report["records"][0]["outcome"]["status"], "solved");
}

#[test]
fn cost_search_persists_artifacts() {
    let temp_dir = tempfile::tempdir().unwrap();
    let out = temp_dir.path().to_str().unwrap();
    let output = run_driver(&[
        "cost",
        "--sbox",
        "0,1,3,2",
        "--gates",
        "XOR,XNOR,AND,OR",
        "--max-gates",
        "2",
        "--stop-at-first-solved",
        "true",
        "--technology",
        "umc180",
        "--ceiling",
        "40",
        "--output-dir",
        out,
        "--name",
        "toy",
    ]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("cost (umc180): 12"), "stdout: {}", stdout);

    let dir = temp_dir.path().join("toy");
    assert!(dir.join("toy_g2_s2_c40.smt2").is_file());
    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join("toy_summary.json")).unwrap())
            .unwrap();
    assert_eq!(summary["name"], "toy");
    assert_eq!(summary["sbox"], serde_json::json!([0, 1, 3, 2]));
    assert_eq!(summary["outcome"]["result"], "found");
}

#[test]
fn config_file_supplies_search_settings() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("sboxsynth.toml");
    std::fs::write(
        &config_path,
        r#"
[search]
max-gates = 2
allowed-gates = ["XOR", "AND"]
across-counts = "stop-at-first-solved"
"#,
    )
    .unwrap();
    let output = run_driver(&[
        "--config",
        config_path.to_str().unwrap(),
        "gate-count",
        "--sbox",
        "0,1,3,2",
    ]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1 solution(s) in 1 attempt(s)"), "stdout: {}", stdout);
}

#[test]
fn emit_smt2_writes_requested_candidate() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("candidate.smt2");
    let output = run_driver(&[
        "emit-smt2",
        "--sbox",
        "0,1,3,6,7,4,5,2",
        "--gates",
        "XOR,AND,OR,NOT",
        "--gate-count",
        "4",
        "--structure",
        "1-2-1",
        "-o",
        path.to_str().unwrap(),
    ]);
    assert_success(&output);
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("(set-logic QF_BV)"));
    assert!(text.contains("(declare-const g3_sel (_ BitVec 8))"));
    assert!(text.contains("(check-sat)"));
}

#[test]
fn rejects_non_permutation_sbox() {
    let output = run_driver(&["gate-count", "--sbox", "0,1,1,2"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("gate-count"), "stderr: {}", stderr);
    assert!(stderr.contains("permutation"), "stderr: {}", stderr);
}

#[test]
fn permutation_check_can_be_switched_off() {
    let output = run_driver(&[
        "gate-count",
        "--sbox",
        "0,1,1,2",
        "--gates",
        "XOR,AND",
        "--max-gates",
        "3",
        "--permutation-check",
        "false",
    ]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("best: 2 gates"), "stdout: {}", stdout);
}

#[test]
fn parallel_flag_reaches_the_search() {
    let output = run_driver(&[
        "gate-count",
        "--sbox",
        "0,1,3,2",
        "--gates",
        "XOR,AND",
        "--max-gates",
        "3",
        "--parallel",
        "true",
    ]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("best: 2 gates"), "stdout: {}", stdout);
}

#[test]
fn rejects_unknown_gate() {
    let output = run_driver(&["gate-count", "--sbox", "0,1,3,2", "--gates", "XOR,MUX"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("MUX"), "stderr: {}", stderr);
}

#[test]
fn unavailable_solver_binary_is_inconclusive() {
    let output = run_driver(&[
        "gate-count",
        "--sbox",
        "0,1,3,2",
        "--gates",
        "XOR,AND",
        "--max-gates",
        "1",
        "--solver",
        "z3-binary",
        "--solver-path",
        "/nonexistent/z3",
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no solution found"), "stderr: {}", stderr);
}
