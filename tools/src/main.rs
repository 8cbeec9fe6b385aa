//! mule-runner: batch host for the MuleCatcher detection engine.
//!
//! Usage:
//!   mule-runner analyze --input txns.csv [--config policy.json] [--output report.json]
//!   mule-runner generate --seed 12345 --accounts 500 --output txns.csv

mod ingest;
mod report;

use anyhow::{bail, Context, Result};
use mulecatcher_core::{
    synthetic::{ScenarioParams, SyntheticScenario},
    AnalysisEngine, DetectionConfig,
};
use std::env;
use std::path::Path;
use std::time::Instant;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("analyze") => run_analyze(&args),
        Some("generate") => run_generate(&args),
        Some(other) => bail!("unknown command '{other}' (expected 'analyze' or 'generate')"),
        None => bail!("usage: mule-runner <analyze|generate> [options]"),
    }
}

fn run_analyze(args: &[String]) -> Result<()> {
    let input = str_arg(args, "--input").context("analyze needs --input <csv>")?;
    let output = str_arg(args, "--output");

    let config = match str_arg(args, "--config") {
        Some(path) => DetectionConfig::load(path)?,
        None => DetectionConfig::default(),
    };

    let started = Instant::now();
    let transactions = ingest::read_transactions(Path::new(input))?;
    let engine = AnalysisEngine::build(config)?;
    log::info!("Detectors: {}", engine.detector_names().join(", "));
    let analysis = engine.analyze(&transactions)?;
    let elapsed = started.elapsed().as_secs_f64();

    let analysis_id = uuid::Uuid::new_v4().to_string();
    let report = report::Report::from_analysis(&analysis, elapsed, analysis_id);
    let json = serde_json::to_string_pretty(&report)?;

    match output {
        Some(path) => {
            std::fs::write(path, &json).with_context(|| format!("cannot write report to {path}"))?;
            print_summary(&report, input);
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn run_generate(args: &[String]) -> Result<()> {
    let seed = parse_arg(args, "--seed", 42u64);
    let accounts = parse_arg(args, "--accounts", ScenarioParams::default().background_accounts);
    let output = str_arg(args, "--output").context("generate needs --output <csv>")?;

    let defaults = ScenarioParams::default();
    let params = ScenarioParams {
        background_accounts:  accounts,
        // Keep the default edge density.
        background_transfers: accounts * defaults.background_transfers / defaults.background_accounts,
        ..defaults
    };
    let scenario = SyntheticScenario::generate(seed, &params);
    ingest::write_transactions(Path::new(output), &scenario.transactions)?;

    println!("MuleCatcher: synthetic dataset");
    println!("  seed:         {seed}");
    println!("  accounts:     {accounts}");
    println!("  transactions: {}", scenario.transactions.len());
    println!("  planted:      {}", scenario.planted.len());
    println!("  output:       {output}");
    Ok(())
}

fn print_summary(report: &report::Report, input: &str) {
    let s = &report.summary;
    println!("=== ANALYSIS SUMMARY ===");
    println!("  analysis_id:    {}", report.analysis_id);
    println!("  input:          {input}");
    println!("  accounts:       {}", s.total_accounts_analyzed);
    println!("  transactions:   {}", s.total_transactions);
    println!("  cycles:         {}", s.cycles_detected);
    println!("  shell chains:   {}", s.shell_chains_detected);
    println!("  funnels:        {}", s.smurfing_funnels_detected);
    println!("  rings:          {}", s.fraud_rings_detected);
    println!("  flagged:        {}", s.suspicious_accounts_flagged);
    println!("  elapsed:        {:.3}s", s.processing_time_seconds);

    if !report.suspicious_accounts.is_empty() {
        println!();
        println!("=== TOP ACCOUNTS ===");
        for a in report.suspicious_accounts.iter().take(10) {
            println!(
                "  {:<20} {:>5.1}  {:<10} {}",
                a.account_id,
                a.suspicion_score,
                a.ring_id.as_deref().unwrap_or("-"),
                a.detected_patterns.iter().map(|p| p.as_str()).collect::<Vec<_>>().join(",")
            );
        }
    }
}

fn str_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy + std::fmt::Display>(args: &[String], flag: &str, default: T) -> T {
    let Some(raw) = str_arg(args, flag) else {
        return default;
    };
    match raw.parse() {
        Ok(value) => value,
        Err(_) => {
            log::warn!("Ignoring {flag} '{raw}': not a valid value, using {default}");
            default
        }
    }
}
