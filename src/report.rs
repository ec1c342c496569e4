//! Measurement table and run report persistence
//!
//! The measurement table is a header-less CSV with one record per build
//! system:
//!
//! ```text
//! Bazel,#4CAF50,"[4.2, 3.9, 4.1]"
//! Buck2,#FF9800,"[8.7, 8.5, 8.6]"
//! ```
//!
//! Every record must carry a non-empty name, a `#RGB`/`#RRGGBB` color and a
//! bracketed list of durations, and every list must have the same length.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{KickError, Result};
use crate::orchestrator::{BenchmarkRun, WarmupTime};
use crate::stats::{summarize, Insights, Series, Summary};

static HEX_COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#([0-9A-Fa-f]{3}|[0-9A-Fa-f]{6})$").expect("hex color pattern is valid")
});

/// Whether `color` is a `#RGB` or `#RRGGBB` hex code
pub fn is_hex_color(color: &str) -> bool {
    HEX_COLOR.is_match(color)
}

/// Render durations as a bracketed list, e.g. `[4.2, 3.9, 4.1]`
pub fn format_measurements(values: &[f64]) -> String {
    let inner = values
        .iter()
        .map(|v| format!("{:?}", v))
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{}]", inner)
}

/// Parse a bracketed list of numbers
pub fn parse_measurements(text: &str) -> std::result::Result<Vec<f64>, String> {
    let text = text.trim();
    let inner = text
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .ok_or_else(|| "measurements must be a bracketed list".to_string())?
        .trim();

    if inner.is_empty() {
        return Ok(Vec::new());
    }

    inner
        .split(',')
        .map(str::trim)
        .map(|item| {
            item.parse::<f64>()
                .map_err(|_| format!("'{}' is not a number", item))
        })
        .collect()
}

/// Check the cross-record invariants of a measurement table
pub fn validate_records(records: &[Series]) -> Result<()> {
    if records.is_empty() {
        return Err(KickError::validation("no build system data found"));
    }

    for (i, record) in records.iter().enumerate() {
        let row = i + 1;
        if record.name.trim().is_empty() {
            return Err(KickError::validation(format!(
                "empty build_system name at row {}",
                row
            )));
        }
        // the reader trims cells, so such a name would not survive a round trip
        if record.name.trim() != record.name {
            return Err(KickError::validation(format!(
                "build_system name '{}' has surrounding whitespace at row {}",
                record.name, row
            )));
        }
        if !is_hex_color(&record.color) {
            return Err(KickError::validation(format!(
                "invalid hex color '{}' for {} at row {}, colors must be #RGB or #RRGGBB",
                record.color, record.name, row
            )));
        }
    }

    let expected = records[0].durations.len();
    if let Some(bad) = records.iter().find(|r| r.durations.len() != expected) {
        let counts = records
            .iter()
            .map(|r| format!("{}: {}", r.name, r.durations.len()))
            .collect::<Vec<_>>()
            .join(", ");
        return Err(KickError::validation(format!(
            "all build systems must have the same number of measurements ({} differs; {})",
            bad.name, counts
        )));
    }
    Ok(())
}

/// Parse and validate a measurement table from any reader
pub fn parse_table<R: Read>(reader: R) -> Result<Vec<Series>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records = Vec::new();
    for (i, result) in csv_reader.records().enumerate() {
        let row = i + 1;
        let record = result
            .map_err(|e| KickError::validation(format!("malformed CSV at row {}: {}", row, e)))?;

        if record.len() != 3 {
            return Err(KickError::validation(format!(
                "row {} must have exactly 3 columns (build_system, color, measurements), found {}",
                row,
                record.len()
            )));
        }

        let name = record[0].trim().to_string();
        let color = record[1].trim().to_string();
        let durations = parse_measurements(&record[2]).map_err(|e| {
            KickError::validation(format!(
                "error parsing measurements for {} at row {}: {}",
                name, row, e
            ))
        })?;

        records.push(Series {
            name,
            color,
            durations,
        });
    }

    validate_records(&records)?;
    Ok(records)
}

/// Read and validate a measurement table file
pub fn read_table(path: &Path) -> Result<Vec<Series>> {
    let file = fs::File::open(path).map_err(|e| KickError::io(path, e))?;
    parse_table(file)
}

/// Serialize a measurement table to any writer
pub fn write_table_to<W: Write>(writer: W, records: &[Series]) -> Result<()> {
    validate_records(records)?;

    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    for record in records {
        csv_writer
            .write_record([
                record.name.as_str(),
                record.color.as_str(),
                format_measurements(&record.durations).as_str(),
            ])
            .map_err(|e| KickError::IoFailure {
                path: "<measurement table>".into(),
                message: e.to_string(),
            })?;
    }
    csv_writer.flush().map_err(|e| KickError::IoFailure {
        path: "<measurement table>".into(),
        message: e.to_string(),
    })?;
    Ok(())
}

/// Write a measurement table file
pub fn write_table(path: &Path, records: &[Series]) -> Result<()> {
    let file = fs::File::create(path).map_err(|e| KickError::io(path, e))?;
    write_table_to(file, records).map_err(|e| match e {
        KickError::IoFailure { message, .. } => KickError::IoFailure {
            path: path.to_path_buf(),
            message,
        },
        other => other,
    })
}

/// Full JSON record of a completed benchmark run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub iterations: usize,
    pub mutated_files: usize,
    pub excluded_files: usize,
    pub warmup: Vec<WarmupTime>,
    pub series: Vec<Series>,
    pub summaries: Vec<Summary>,
    pub insights: Option<Insights>,
}

impl RunReport {
    pub fn from_run(run: &BenchmarkRun) -> Self {
        let summaries = summarize(&run.series);
        let insights = Insights::from_summaries(&summaries);
        Self {
            generated_at: Utc::now(),
            iterations: run.iterations,
            mutated_files: run.mutated_files,
            excluded_files: run.excluded_files,
            warmup: run.warmup.clone(),
            series: run.series.clone(),
            summaries,
            insights,
        }
    }
}

/// Save a run report as pretty-printed JSON
pub fn write_run_report(path: &Path, report: &RunReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report).map_err(|e| KickError::IoFailure {
        path: path.to_path_buf(),
        message: format!("failed to serialize run report: {}", e),
    })?;
    fs::write(path, json).map_err(|e| KickError::io(path, e))
}
