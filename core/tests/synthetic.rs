//! Planted structures in synthetic datasets must be recovered.

use mulecatcher_core::{
    analyze,
    pattern::{Pattern, PatternKind},
    synthetic::{ScenarioParams, SyntheticScenario},
    DetectionConfig,
};
use std::collections::BTreeSet;

fn scenario(seed: u64) -> SyntheticScenario {
    let params = ScenarioParams { background_transfers: 240, ..ScenarioParams::default() };
    SyntheticScenario::generate(seed, &params)
}

#[test]
fn every_planted_cycle_is_detected() {
    let s = scenario(2024);
    let analysis = analyze(&s.transactions, &DetectionConfig::default()).unwrap();

    for planted in s.planted_of(PatternKind::Cycle) {
        let found = analysis
            .patterns_of(PatternKind::Cycle)
            .any(|p| p.path() == planted.accounts.as_slice());
        assert!(found, "planted loop {:?} not detected", planted.accounts);
        for account in &planted.accounts {
            let scored = analysis.account(account).expect("loop member must be flagged");
            assert!(scored.detected_patterns.contains(&PatternKind::Cycle));
            assert!(scored.ring_id.is_some());
        }
    }
}

#[test]
fn every_planted_chain_is_detected_whole() {
    let s = scenario(7);
    let analysis = analyze(&s.transactions, &DetectionConfig::default()).unwrap();

    for planted in s.planted_of(PatternKind::Shell) {
        let found = analysis
            .patterns_of(PatternKind::Shell)
            .any(|p| p.path() == planted.accounts.as_slice());
        assert!(found, "planted chain {:?} not detected", planted.accounts);

        let ring = analysis
            .rings
            .iter()
            .find(|r| r.contains(&planted.accounts[1]))
            .expect("chain must form a ring");
        let members: BTreeSet<_> = ring.members.iter().collect();
        let expected: BTreeSet<_> = planted.accounts.iter().collect();
        assert_eq!(members, expected, "chain ring must not absorb background accounts");
    }
}

#[test]
fn every_planted_funnel_flags_only_its_receiver() {
    let s = scenario(31337);
    let analysis = analyze(&s.transactions, &DetectionConfig::default()).unwrap();

    for planted in s.planted_of(PatternKind::Smurfing) {
        let receiver = &planted.accounts[0];
        let pattern = analysis
            .patterns_of(PatternKind::Smurfing)
            .find(|p| matches!(p, Pattern::Smurfing(f) if &f.receiver == receiver))
            .expect("planted funnel not detected");
        if let Pattern::Smurfing(f) = pattern {
            assert_eq!(f.senders.len(), planted.accounts.len() - 1);
        }
        assert!(analysis.account(receiver).is_some());
        for sender in &planted.accounts[1..] {
            assert!(analysis.account(sender).is_none(), "sender {sender} must not be flagged");
        }
    }
}

#[test]
fn no_planted_structures_means_no_planted_findings() {
    let params = ScenarioParams {
        cycles: 0,
        shell_chains: 0,
        smurfing_funnels: 0,
        background_transfers: 240,
        ..ScenarioParams::default()
    };
    let s = SyntheticScenario::generate(11, &params);
    assert!(s.planted.is_empty());
    let analysis = analyze(&s.transactions, &DetectionConfig::default()).unwrap();
    assert!(analysis
        .suspicious_accounts
        .iter()
        .all(|a| a.account_id.starts_with("ACC_")));
}
