//! End-to-end seed scenarios, driven straight through parse → engine →
//! format without any threads, to validate correctness independent of
//! scheduling before trusting the threaded pipeline.

use fastbook::engine::MatchingEngine;
use fastbook::ingress::parse_record;
use fastbook::egress::format_event;

fn run(records: &[&str]) -> Vec<String> {
    let mut engine = MatchingEngine::new();
    let mut lines = Vec::new();
    for record in records {
        let req = parse_record(record).unwrap_or_else(|e| panic!("bad record {record:?}: {e}"));
        let mut out = Vec::new();
        match req {
            fastbook::Request::NewOrder(n) => engine.process_new_order(&n, &mut out),
            fastbook::Request::Cancel(c) => engine.process_cancel(&c, &mut out),
            fastbook::Request::Flush => engine.flush(),
        }
        for event in out {
            lines.push(format_event(&event).trim_end().to_string());
        }
    }
    lines
}

#[test]
fn scenario_1_simple_cross() {
    let lines = run(&["N, 1, IBM, 100, 50, S, 1", "N, 2, IBM, 100, 50, B, 2"]);
    assert_eq!(
        lines,
        vec![
            "A, 1, 1, IBM",
            "B, S, 100, 50, IBM",
            "A, 2, 2, IBM",
            "T, 2, 2, 1, 1, 100, 50, IBM",
            "B, S, -, -, IBM",
        ]
    );
}

#[test]
fn scenario_2_partial_fill_leaves_resting_residual() {
    let lines = run(&["N, 1, IBM, 100, 50, S, 1", "N, 2, IBM, 100, 30, B, 2"]);
    assert_eq!(
        lines,
        vec![
            "A, 1, 1, IBM",
            "B, S, 100, 50, IBM",
            "A, 2, 2, IBM",
            "T, 2, 2, 1, 1, 100, 30, IBM",
            "B, S, 100, 20, IBM",
        ]
    );
}

#[test]
fn scenario_3_time_priority_at_same_price() {
    let lines = run(&[
        "N, 1, IBM, 100, 10, S, 1",
        "N, 1, IBM, 100, 20, S, 2",
        "N, 1, IBM, 100, 30, S, 3",
        "N, 9, IBM, 0, 25, B, 10",
    ]);
    let trades: Vec<_> = lines.iter().filter(|l| l.starts_with("T,")).collect();
    assert_eq!(trades, vec!["T, 9, 10, 1, 1, 100, 10, IBM", "T, 9, 10, 1, 2, 100, 15, IBM"]);
}

#[test]
fn scenario_4_cancel_of_only_order_empties_and_elides_tob() {
    let lines = run(&["N, 1, IBM, 100, 50, B, 1", "C, 1, 1"]);
    assert_eq!(
        lines,
        vec!["A, 1, 1, IBM", "B, B, 100, 50, IBM", "C, 1, 1, IBM", "B, B, -, -, IBM"]
    );
}

#[test]
fn scenario_5_cross_symbol_isolation() {
    let lines = run(&["N, 1, IBM, 100, 50, B, 1", "N, 2, AAPL, 100, 50, S, 2"]);
    assert!(!lines.iter().any(|l| l.starts_with("T,")));
}

#[test]
fn scenario_6_flush_clears_everything() {
    let lines = run(&[
        "N, 1, IBM, 100, 50, B, 1",
        "N, 2, AAPL, 100, 50, S, 2",
        "F",
        "N, 1, IBM, 100, 50, B, 3",
    ]);
    let after_flush = &lines[lines.len() - 2..];
    assert_eq!(after_flush, &["A, 1, 3, IBM", "B, B, 100, 50, IBM"]);
}
