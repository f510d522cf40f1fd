use anyhow::Result;
use serde::Serialize;
use std::io::Write;

use crate::filters::FilterOutcome;

/// Pretty-print any serializable value as JSON to stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    write_json(&mut std::io::stdout().lock(), value)
}

pub fn write_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// `{"filtered": false, "ids": null}` or `{"filtered": true, "total": n, "ids": [...]}`.
pub fn outcome_json(outcome: &FilterOutcome) -> serde_json::Value {
    match outcome.ids() {
        None => serde_json::json!({ "filtered": false, "ids": null }),
        Some(ids) => serde_json::json!({
            "filtered": true,
            "total": ids.len(),
            "ids": ids,
        }),
    }
}
