// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The sentinel-file signal plane: agents notify the orchestrator of
//! lifecycle events by writing a file to `<plans-dir>/.signals/` named
//! `<event>-<plan-stem>.md`, body optional. `scan` reads the directory
//! whole each call (signal files are tiny, unlike the teacher's
//! incremental JSONL log tailing); `consume` deletes a named file and
//! treats a missing file as already-consumed.

pub use kasmos_core::{SignalEvent, SignalRecord, WaveSignalRecord};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("reading signal directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("reading signal file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("removing signal file {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

const WAVE_PREFIX: &str = "implement-wave-";

/// Scan `signals_dir` for plain (non-wave) signal files, in filename order.
/// Unreadable or malformed entries are skipped with a warning, not fatal —
/// one corrupt sentinel must not block the rest of the scan.
pub fn scan(signals_dir: &Path) -> Result<Vec<SignalRecord>, SignalError> {
    let mut out = Vec::new();
    for name in list_signal_files(signals_dir)? {
        if name.starts_with(WAVE_PREFIX) {
            continue;
        }
        let Some((event, stem)) = parse_plain(&name) else {
            tracing::warn!(file = %name, "unrecognized signal filename, skipping");
            continue;
        };
        let body = read_body(signals_dir, &name)?;
        out.push(SignalRecord {
            event,
            plan_file: format!("{stem}.md"),
            body,
        });
    }
    out.sort_by(|a, b| a.plan_file.cmp(&b.plan_file).then(a.event_order().cmp(&b.event_order())));
    Ok(out)
}

/// Scan `signals_dir` for wave-specific signal files.
pub fn scan_waves(signals_dir: &Path) -> Result<Vec<WaveSignalRecord>, SignalError> {
    let mut out = Vec::new();
    for name in list_signal_files(signals_dir)? {
        let Some(rest) = name.strip_prefix(WAVE_PREFIX) else {
            continue;
        };
        let Some((wave_number, stem)) = parse_wave(rest) else {
            tracing::warn!(file = %name, "unrecognized wave signal filename, skipping");
            continue;
        };
        let body = read_body(signals_dir, &name)?;
        out.push(WaveSignalRecord {
            wave_number,
            plan_file: format!("{stem}.md"),
            body,
        });
    }
    out.sort_by(|a, b| a.plan_file.cmp(&b.plan_file).then(a.wave_number.cmp(&b.wave_number)));
    Ok(out)
}

/// Delete the sentinel file named `filename` under `signals_dir`. Idempotent:
/// a file that's already gone (consumed by a previous, possibly crashed,
/// run) is not an error.
pub fn consume(signals_dir: &Path, filename: &str) -> Result<(), SignalError> {
    let path = signals_dir.join(filename);
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(SignalError::Remove { path, source }),
    }
}

/// The filename a plain signal record was (or would be) read from.
pub fn filename_for(event: SignalEvent, plan_file: &str) -> String {
    let stem = plan_file.strip_suffix(".md").unwrap_or(plan_file);
    format!("{}-{}.md", event.as_filename_prefix(), stem)
}

/// The filename a wave signal record was (or would be) read from.
pub fn wave_filename_for(wave_number: u32, plan_file: &str) -> String {
    let stem = plan_file.strip_suffix(".md").unwrap_or(plan_file);
    format!("{WAVE_PREFIX}{wave_number}-{stem}.md")
}

fn list_signal_files(signals_dir: &Path) -> Result<Vec<String>, SignalError> {
    let entries = match std::fs::read_dir(signals_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(SignalError::ReadDir {
                path: signals_dir.to_path_buf(),
                source,
            })
        }
    };
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| SignalError::ReadDir {
            path: signals_dir.to_path_buf(),
            source,
        })?;
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        if let Some(stem) = name.strip_suffix(".md") {
            names.push(stem.to_string());
        }
    }
    names.sort();
    Ok(names)
}

fn read_body(signals_dir: &Path, stem: &str) -> Result<String, SignalError> {
    let path = signals_dir.join(format!("{stem}.md"));
    std::fs::read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|source| SignalError::ReadFile { path, source })
}

fn parse_plain(stem: &str) -> Option<(SignalEvent, &str)> {
    const PREFIXES: &[&str] = &[
        "planner-finished",
        "implement-finished",
        "review-changes-requested",
        "review-approved",
    ];
    for prefix in PREFIXES {
        if let Some(rest) = stem.strip_prefix(prefix).and_then(|r| r.strip_prefix('-')) {
            let event = SignalEvent::from_filename_prefix(prefix)?;
            return Some((event, rest));
        }
    }
    None
}

fn parse_wave(rest: &str) -> Option<(u32, &str)> {
    let dash = rest.find('-')?;
    let (digits, remainder) = rest.split_at(dash);
    let wave_number: u32 = digits.parse().ok()?;
    Some((wave_number, &remainder[1..]))
}

trait EventOrder {
    fn event_order(&self) -> u8;
}

impl EventOrder for SignalRecord {
    fn event_order(&self) -> u8 {
        self.event as u8
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
