//! CSV transaction files: reading for `analyze`, writing for `generate`.
//!
//! Expected header: transaction_id, sender_id, receiver_id, amount, timestamp.
//! Extra columns are ignored. Timestamps are `YYYY-MM-DD HH:MM:SS` or RFC 3339.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDateTime};
use mulecatcher_core::{transaction::validate_transactions, Transaction};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;

pub const REQUIRED_COLUMNS: [&str; 5] =
    ["transaction_id", "sender_id", "receiver_id", "amount", "timestamp"];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Deserialize)]
struct RawRow {
    transaction_id: String,
    sender_id:      String,
    receiver_id:    String,
    amount:         f64,
    timestamp:      String,
}

#[derive(Debug, Serialize)]
struct OutRow<'a> {
    transaction_id: &'a str,
    sender_id:      &'a str,
    receiver_id:    &'a str,
    amount:         String,
    timestamp:      String,
}

pub fn read_transactions(path: &Path) -> Result<Vec<Transaction>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("cannot open input file {}", path.display()))?;
    read_transactions_from(file).with_context(|| format!("in {}", path.display()))
}

pub fn read_transactions_from<R: Read>(source: R) -> Result<Vec<Transaction>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader.headers().context("cannot read CSV header")?.clone();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect();
    if !missing.is_empty() {
        bail!("missing required columns: {}", missing.join(", "));
    }

    let mut transactions = Vec::new();
    for (i, row) in reader.deserialize::<RawRow>().enumerate() {
        // Data rows start on line 2.
        let line = i + 2;
        let row = row.with_context(|| format!("malformed row on line {line}"))?;
        let timestamp = parse_timestamp(&row.timestamp)
            .with_context(|| format!("bad timestamp on line {line}"))?;
        transactions.push(Transaction::new(
            row.transaction_id,
            row.sender_id,
            row.receiver_id,
            row.amount,
            timestamp,
        ));
    }

    validate_transactions(&transactions)?;
    log::debug!("Read {} transactions", transactions.len());
    Ok(transactions)
}

pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT) {
        return Ok(ts);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.naive_utc())
        .with_context(|| format!("'{raw}' is neither '{TIMESTAMP_FORMAT}' nor RFC 3339"))
}

pub fn write_transactions(path: &Path, transactions: &[Transaction]) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("cannot create output file {}", path.display()))?;
    write_transactions_to(file, transactions)
}

pub fn write_transactions_to<W: Write>(sink: W, transactions: &[Transaction]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(sink);
    for txn in transactions {
        writer.serialize(OutRow {
            transaction_id: &txn.transaction_id,
            sender_id:      &txn.sender_id,
            receiver_id:    &txn.receiver_id,
            amount:         format!("{:.2}", txn.amount),
            timestamp:      txn.timestamp.format(TIMESTAMP_FORMAT).to_string(),
        })?;
    }
    writer.flush()?;
    Ok(())
}
