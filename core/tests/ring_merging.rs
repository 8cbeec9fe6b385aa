//! Ring merging across detectors.
//!
//! Structural patterns that share an account collapse into one ring,
//! transitively. Funnels never pull accounts into a ring.

use chrono::{Duration, NaiveDate};
use mulecatcher_core::{analyze, pattern::PatternKind, DetectionConfig, Transaction};

fn txn(id: usize, from: &str, to: &str, minute: i64) -> Transaction {
    let base = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
    Transaction::new(format!("T{id:03}"), from, to, 1_000.0, base + Duration::minutes(minute))
}

fn rows(edges: &[(&str, &str)]) -> Vec<Transaction> {
    edges
        .iter()
        .enumerate()
        .map(|(i, (from, to))| txn(i, from, to, i as i64))
        .collect()
}

#[test]
fn cycles_sharing_an_account_form_one_ring() {
    // Two triangles joined at X.
    let txns = rows(&[
        ("A", "B"), ("B", "X"), ("X", "A"),
        ("X", "C"), ("C", "D"), ("D", "X"),
    ]);
    let analysis = analyze(&txns, &DetectionConfig::default()).unwrap();

    assert_eq!(analysis.patterns_of(PatternKind::Cycle).count(), 2);
    assert_eq!(analysis.rings.len(), 1, "shared account X must merge the loops");
    let ring = &analysis.rings[0];
    assert_eq!(ring.members, vec!["A", "B", "C", "D", "X"]);
    assert_eq!(ring.pattern_indices, vec![0, 1]);
    assert!(analysis
        .suspicious_accounts
        .iter()
        .all(|a| a.ring_id.as_deref() == Some("RING_001")));
}

#[test]
fn merging_is_transitive() {
    // Loop 1 shares B with loop 2, loop 2 shares D with loop 3; loops 1 and 3
    // share nothing directly.
    let txns = rows(&[
        ("A", "B"), ("B", "C"), ("C", "A"),
        ("B", "D"), ("D", "E"), ("E", "B"),
        ("D", "F"), ("F", "G"), ("G", "D"),
    ]);
    let analysis = analyze(&txns, &DetectionConfig::default()).unwrap();

    assert_eq!(analysis.patterns_of(PatternKind::Cycle).count(), 3);
    assert_eq!(analysis.rings.len(), 1);
    assert_eq!(analysis.rings[0].members, vec!["A", "B", "C", "D", "E", "F", "G"]);
}

#[test]
fn disjoint_structures_are_numbered_in_detection_order() {
    let txns = rows(&[
        // Loop on P, Q, R.
        ("P", "Q"), ("Q", "R"), ("R", "P"),
        // Loop on A, B, C (detected first: lower ids).
        ("A", "B"), ("B", "C"), ("C", "A"),
        // Pass-through chain H -> S1 -> S2 -> T, with busy endpoints.
        ("H", "S1"), ("S1", "S2"), ("S2", "T"),
        ("H", "Y1"), ("H", "Y2"), ("Y3", "H"), ("Y4", "H"),
        ("T", "Z1"), ("T", "Z2"), ("Z3", "T"),
    ]);
    let analysis = analyze(&txns, &DetectionConfig::default()).unwrap();

    let ids: Vec<_> = analysis.rings.iter().map(|r| r.ring_id.as_str()).collect();
    assert_eq!(ids, vec!["RING_001", "RING_002", "RING_003"]);
    assert_eq!(analysis.rings[0].members, vec!["A", "B", "C"]);
    assert_eq!(analysis.rings[1].members, vec!["P", "Q", "R"]);
    assert_eq!(analysis.rings[2].members, vec!["H", "S1", "S2", "T"]);
    assert!(analysis.rings[2].pattern_types.contains(&PatternKind::Shell));

    let s1 = analysis.account("S1").unwrap();
    assert_eq!(s1.ring_id.as_deref(), Some("RING_003"));
    assert_eq!(s1.suspicion_score, 30.0);
}

#[test]
fn cycle_and_chain_sharing_an_account_merge() {
    let txns = rows(&[
        ("A", "B"), ("B", "C"), ("C", "A"),
        // A also heads a chain through two pass-through accounts.
        ("A", "M1"), ("M1", "M2"), ("M2", "OUT"),
        ("OUT", "O1"), ("OUT", "O2"),
        ("A", "N1"),
    ]);
    let analysis = analyze(&txns, &DetectionConfig::default()).unwrap();

    let chains: Vec<_> = analysis
        .patterns_of(PatternKind::Shell)
        .map(|p| p.path().to_vec())
        .collect();
    assert_eq!(chains, vec![vec!["A", "M1", "M2", "OUT"]]);

    assert_eq!(analysis.rings.len(), 1);
    let ring = &analysis.rings[0];
    assert!(ring.contains("M1") && ring.contains("C"));
    assert!(!ring.contains("N1"));
    assert_eq!(ring.pattern_types.len(), 2);
    // A closes the loop and heads the chain; B only sits on the loop.
    assert_eq!(analysis.account("A").unwrap().suspicion_score, 70.0);
    assert_eq!(analysis.account("B").unwrap().suspicion_score, 40.0);
    assert_eq!(analysis.account("M1").unwrap().suspicion_score, 30.0);
    assert_eq!(ring.risk_score, 70.0);
}

#[test]
fn funnels_do_not_join_rings() {
    let mut edges = vec![("A", "B"), ("B", "C"), ("C", "A")];
    let senders = ["S1", "S2", "S3", "S4", "S5"];
    for s in senders {
        edges.push((s, "A"));
    }
    let analysis = analyze(&rows(&edges), &DetectionConfig::default_test()).unwrap();

    assert_eq!(analysis.patterns_of(PatternKind::Smurfing).count(), 1);
    assert_eq!(analysis.rings.len(), 1);
    assert_eq!(analysis.rings[0].members, vec!["A", "B", "C"]);
    for s in senders {
        assert!(!analysis.rings[0].contains(s));
        assert!(analysis.account(s).is_none());
    }
    let a = analysis.account("A").unwrap();
    assert_eq!(a.suspicion_score, 70.0);
    assert_eq!(analysis.rings[0].risk_score, 70.0);
    assert!(!analysis.rings[0].pattern_types.contains(&PatternKind::Smurfing));
}
