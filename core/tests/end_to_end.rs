//! The reference scenario: one closed loop plus one fan-in funnel.
//!
//! A→B→C→A (100 each, increasing time) and D,F,G,H,I → E (50 each),
//! smurfing threshold_count = 5.

use chrono::{Duration, NaiveDate};
use mulecatcher_core::{
    analyze, pattern::PatternKind, Analysis, AmlError, AnalysisEngine, DetectionConfig, Pattern,
    Transaction,
};
use std::collections::BTreeSet;

fn txn(id: &str, from: &str, to: &str, amount: f64, minute: i64) -> Transaction {
    let base = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap().and_hms_opt(8, 0, 0).unwrap();
    Transaction::new(id, from, to, amount, base + Duration::minutes(minute))
}

fn scenario() -> Vec<Transaction> {
    vec![
        txn("T01", "A", "B", 100.0, 0),
        txn("T02", "B", "C", 100.0, 10),
        txn("T03", "C", "A", 100.0, 20),
        txn("T04", "D", "E", 50.0, 30),
        txn("T05", "F", "E", 50.0, 31),
        txn("T06", "G", "E", 50.0, 32),
        txn("T07", "H", "E", 50.0, 33),
        txn("T08", "I", "E", 50.0, 34),
    ]
}

fn run() -> Analysis {
    let config = DetectionConfig::default_test();
    assert_eq!(config.smurfing.threshold_count, 5);
    analyze(&scenario(), &config).expect("analysis")
}

fn tags(kinds: &[PatternKind]) -> BTreeSet<PatternKind> {
    kinds.iter().copied().collect()
}

#[test]
fn one_ring_from_the_cycle() {
    let analysis = run();

    assert_eq!(analysis.rings.len(), 1);
    let ring = &analysis.rings[0];
    assert_eq!(ring.ring_id, "RING_001");
    assert_eq!(ring.members, vec!["A", "B", "C"]);
    assert_eq!(ring.pattern_types, tags(&[PatternKind::Cycle]));

    let constituents: Vec<_> = ring.patterns(&analysis.patterns).collect();
    assert_eq!(constituents.len(), 1);
    assert_eq!(constituents[0].path(), &["A", "B", "C"]);
    assert_eq!(constituents[0].total_amount(), 300.0);
}

#[test]
fn one_smurfing_pattern_on_e() {
    let analysis = run();
    let smurfing: Vec<_> = analysis.patterns_of(PatternKind::Smurfing).collect();
    assert_eq!(smurfing.len(), 1);
    match smurfing[0] {
        Pattern::Smurfing(s) => {
            assert_eq!(s.receiver, "E");
            assert_eq!(s.senders, vec!["D", "F", "G", "H", "I"]);
            assert_eq!(s.transfer_count, 5);
            assert_eq!(s.total_amount, 250.0);
        }
        other => panic!("expected smurfing, got {other:?}"),
    }
    assert_eq!(analysis.patterns_of(PatternKind::Shell).count(), 0);
}

#[test]
fn only_cycle_members_and_receiver_are_scored() {
    let analysis = run();
    let flagged: Vec<_> = analysis
        .suspicious_accounts
        .iter()
        .map(|a| a.account_id.as_str())
        .collect();
    assert_eq!(flagged, vec!["A", "B", "C", "E"]);

    for id in ["A", "B", "C"] {
        let account = analysis.account(id).unwrap();
        assert_eq!(account.detected_patterns, tags(&[PatternKind::Cycle]));
        assert_eq!(account.ring_id.as_deref(), Some("RING_001"));
        assert_eq!(account.suspicion_score, 40.0);
    }
    let e = analysis.account("E").unwrap();
    assert_eq!(e.detected_patterns, tags(&[PatternKind::Smurfing]));
    assert_eq!(e.ring_id, None);

    for id in ["D", "F", "G", "H", "I"] {
        assert!(analysis.account(id).is_none(), "{id} should not be flagged");
    }
    assert_eq!(analysis.rings[0].risk_score, 40.0);
}

#[test]
fn summary_counts() {
    let s = run().summary;
    assert_eq!(s.total_accounts, 9);
    assert_eq!(s.total_transactions, 8);
    assert_eq!(s.cycles, 1);
    assert_eq!(s.shell_chains, 0);
    assert_eq!(s.smurfing_funnels, 1);
    assert_eq!(s.rings, 1);
    assert_eq!(s.suspicious_accounts, 4);
}

#[test]
fn audit_trail_is_ordered() {
    let analysis = run();
    let types: Vec<_> = analysis.audit_trail.iter().map(|e| e.event_type()).collect();
    assert_eq!(types.first(), Some(&"graph_built"));
    assert_eq!(types.last(), Some(&"analysis_completed"));
    assert_eq!(types.iter().filter(|t| **t == "pattern_detected").count(), 2);
    assert_eq!(types.iter().filter(|t| **t == "account_scored").count(), 4);
    let ring_pos = types.iter().position(|t| *t == "ring_formed").unwrap();
    let last_detector = types.iter().rposition(|t| *t == "detector_completed").unwrap();
    assert!(ring_pos > last_detector, "rings must form after every detector");
}

#[test]
fn empty_input_is_an_empty_report() {
    let analysis = analyze(&[], &DetectionConfig::default()).expect("empty input must succeed");
    assert!(analysis.patterns.is_empty());
    assert!(analysis.rings.is_empty());
    assert!(analysis.suspicious_accounts.is_empty());
    assert_eq!(analysis.summary.total_accounts, 0);
}

#[test]
fn clean_traffic_is_not_an_error() {
    let txns = vec![txn("T1", "A", "B", 10.0, 0), txn("T2", "B", "B", 5.0, 1)];
    let analysis = analyze(&txns, &DetectionConfig::default()).unwrap();
    assert!(analysis.suspicious_accounts.is_empty());
    assert_eq!(analysis.graph.self_transfers, 1);
}

#[test]
fn invalid_policy_is_rejected_before_analysis() {
    let mut config = DetectionConfig::default();
    config.cycle.max_length = 1;
    match AnalysisEngine::build(config) {
        Err(AmlError::InvalidConfig { .. }) => {}
        Err(other) => panic!("expected InvalidConfig, got {other}"),
        Ok(_) => panic!("expected InvalidConfig, got an engine"),
    }
}

#[test]
fn dense_acyclic_traffic_finishes_promptly() {
    // Every account pays every later account: 1770 rows, no loop anywhere.
    let n = 60;
    let mut txns = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            let id = format!("T{:05}", txns.len());
            txns.push(txn(&id, &format!("N{i:02}"), &format!("N{j:02}"), 10.0, txns.len() as i64));
        }
    }

    let started = std::time::Instant::now();
    let analysis = analyze(&txns, &DetectionConfig::default()).unwrap();
    let elapsed = started.elapsed();

    assert_eq!(analysis.summary.cycles, 0);
    assert!(analysis.rings.is_empty());
    assert!(
        analysis.audit_trail.iter().all(|e| e.event_type() != "search_truncated"),
        "nothing should have been cut short"
    );
    assert!(elapsed.as_secs() < 5, "analysis took {elapsed:?}");
}
