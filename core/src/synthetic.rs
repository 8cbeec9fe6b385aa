//! Synthetic transaction datasets with planted laundering structures.
//!
//! Background noise is random retail-sized traffic among ordinary accounts.
//! On top of it the generator plants closed loops, pass-through chains and
//! fan-in funnels on dedicated accounts, and returns them as ground truth.
//! Planted accounts never appear in background traffic, so each planted
//! structure is exactly what a detector should recover.
//!
//! Same seed + same params = identical dataset, row for row. Each planted
//! family draws from its own PCG stream derived from the seed, so changing
//! how many loops are planted never shifts the background traffic.

use crate::{
    pattern::PatternKind,
    transaction::Transaction,
    types::{AccountId, Timestamp},
};
use chrono::{Duration, NaiveDate};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use serde::{Deserialize, Serialize};

/// Minutes in the generated time span (30 days).
const SPAN_MINUTES: u64 = 30 * 24 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioParams {
    pub background_accounts:  usize,
    pub background_transfers: usize,
    pub cycles:               usize,
    pub shell_chains:         usize,
    pub smurfing_funnels:     usize,
    /// Distinct senders per planted funnel.
    pub smurfing_senders:     usize,
    /// Share of background rows that are same-account transfers.
    pub self_transfer_rate:   f64,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            background_accounts:  120,
            background_transfers: 400,
            cycles:               3,
            shell_chains:         3,
            smurfing_funnels:     2,
            smurfing_senders:     12,
            self_transfer_rate:   0.01,
        }
    }
}

/// Ground truth for one planted structure. Accounts are in flow order;
/// for smurfing the receiver comes first, then its senders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantedPattern {
    pub kind:     PatternKind,
    pub accounts: Vec<AccountId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticScenario {
    pub seed:         u64,
    pub transactions: Vec<Transaction>,
    pub planted:      Vec<PlantedPattern>,
}

impl SyntheticScenario {
    pub fn generate(seed: u64, params: &ScenarioParams) -> Self {
        let mut rows = RowBuilder::new();
        let mut planted = Vec::new();

        let mut rng = family_stream(seed, Family::Background);
        plant_background(&mut rows, &mut rng, params);

        let mut rng = family_stream(seed, Family::Cycles);
        for c in 0..params.cycles {
            planted.push(plant_cycle(&mut rows, &mut rng, c));
        }

        let mut rng = family_stream(seed, Family::Shells);
        for c in 0..params.shell_chains {
            planted.push(plant_shell_chain(&mut rows, &mut rng, c));
        }

        let mut rng = family_stream(seed, Family::Smurfing);
        for f in 0..params.smurfing_funnels {
            planted.push(plant_funnel(&mut rows, &mut rng, f, params.smurfing_senders));
        }

        log::debug!(
            "Generated scenario seed={seed}: {} rows, {} planted patterns",
            rows.len(),
            planted.len()
        );

        Self {
            seed,
            transactions: rows.finish(),
            planted,
        }
    }

    pub fn planted_of(&self, kind: PatternKind) -> impl Iterator<Item = &PlantedPattern> + '_ {
        self.planted.iter().filter(move |p| p.kind == kind)
    }
}

/// Planted families. Discriminants seed the streams: append, never renumber.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
enum Family {
    Background = 0,
    Cycles     = 1,
    Shells     = 2,
    Smurfing   = 3,
}

fn family_stream(seed: u64, family: Family) -> Pcg64Mcg {
    Pcg64Mcg::seed_from_u64(seed ^ (family as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15))
}

/// Heavy-tailed payment size with minimum `floor`; smaller `alpha` means
/// a fatter tail.
fn payment_size(rng: &mut Pcg64Mcg, floor: f64, alpha: f64) -> f64 {
    let u: f64 = rng.gen_range(f64::EPSILON..1.0);
    floor * u.powf(-1.0 / alpha)
}

fn plant_background(rows: &mut RowBuilder, rng: &mut Pcg64Mcg, params: &ScenarioParams) {
    let n = params.background_accounts;
    if n < 2 {
        return;
    }
    let self_rate = params.self_transfer_rate.clamp(0.0, 1.0);
    for _ in 0..params.background_transfers {
        let sender = rng.gen_range(0..n);
        let mut receiver = rng.gen_range(0..n);
        if receiver == sender && !rng.gen_bool(self_rate) {
            receiver = (sender + 1) % n;
        }
        let amount = cents(payment_size(rng, 20.0, 1.6).min(25_000.0));
        let minute = rng.gen_range(0..SPAN_MINUTES);
        rows.push(&format!("ACC_{sender:05}"), &format!("ACC_{receiver:05}"), amount, minute);
    }
}

fn plant_cycle(rows: &mut RowBuilder, rng: &mut Pcg64Mcg, c: usize) -> PlantedPattern {
    let len: usize = rng.gen_range(3..=5);
    let accounts: Vec<AccountId> = (0..len)
        .map(|k| format!("CYC{c:02}_{}", char::from(b'A' + k as u8)))
        .collect();
    let mut amount = cents(payment_size(rng, 5_000.0, 2.0));
    let mut minute = rng.gen_range(0..SPAN_MINUTES / 2);
    for k in 0..len {
        rows.push(&accounts[k], &accounts[(k + 1) % len], amount, minute);
        // Each hop skims a small fee and waits a few hours.
        amount = cents(amount * 0.98);
        minute += rng.gen_range(60..300);
    }
    PlantedPattern { kind: PatternKind::Cycle, accounts }
}

fn plant_shell_chain(rows: &mut RowBuilder, rng: &mut Pcg64Mcg, c: usize) -> PlantedPattern {
    let intermediates: usize = rng.gen_range(2..=4);
    let mut accounts = vec![format!("SHL{c:02}_SRC")];
    accounts.extend((1..=intermediates).map(|k| format!("SHL{c:02}_P{k}")));
    accounts.push(format!("SHL{c:02}_DST"));

    let mut amount = cents(payment_size(rng, 8_000.0, 2.0));
    let mut minute = rng.gen_range(0..SPAN_MINUTES / 2);
    for pair in accounts.windows(2) {
        rows.push(&pair[0], &pair[1], amount, minute);
        amount = cents(amount * 0.99);
        minute += rng.gen_range(30..150);
    }
    PlantedPattern { kind: PatternKind::Shell, accounts }
}

fn plant_funnel(rows: &mut RowBuilder, rng: &mut Pcg64Mcg, f: usize, senders: usize) -> PlantedPattern {
    let receiver = format!("SMF{f:02}_RCV");
    let mut accounts = vec![receiver.clone()];
    for s in 0..senders {
        let sender = format!("SMF{f:02}_S{s:02}");
        // Deposits kept just under a round reporting figure.
        let amount = cents(rng.gen_range(900.0..999.0));
        let minute = rng.gen_range(0..SPAN_MINUTES);
        rows.push(&sender, &receiver, amount, minute);
        accounts.push(sender);
    }
    PlantedPattern { kind: PatternKind::Smurfing, accounts }
}

fn cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

struct RowBuilder {
    base: Timestamp,
    rows: Vec<(String, String, f64, u64)>,
}

impl RowBuilder {
    fn new() -> Self {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default();
        Self { base, rows: Vec::new() }
    }

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn push(&mut self, sender: &str, receiver: &str, amount: f64, minute: u64) {
        self.rows.push((sender.to_string(), receiver.to_string(), amount, minute));
    }

    /// Order rows by time (stable, so generation order breaks ties) and
    /// number them.
    fn finish(mut self) -> Vec<Transaction> {
        self.rows.sort_by_key(|row| row.3);
        self.rows
            .into_iter()
            .enumerate()
            .map(|(i, (sender, receiver, amount, minute))| {
                Transaction::new(
                    format!("TXN_{:06}", i + 1),
                    sender,
                    receiver,
                    amount,
                    self.base + Duration::minutes(minute as i64),
                )
            })
            .collect()
    }
}
