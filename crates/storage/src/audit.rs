// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The audit log (C10): an append-only record of lifecycle-significant
//! events. `AuditSink` decides *where* entries land; callers decide *what*
//! and *when* to log. Write failures never propagate to the caller — they
//! are logged at `warn` and swallowed, matching §7's taxonomy.

use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind")]
pub enum AuditKind {
    PlanCreated,
    StatusChanged { from: String, to: String },
    WaveCompleted { n: u32 },
    WaveFailed { n: u32, failed_tasks: Vec<String> },
    AgentStarted { title: String },
    AgentFinished { title: String },
    PullRequestOpened { url: String },
    PermissionPrompted { pattern: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
    pub at: chrono::DateTime<chrono::Utc>,
    pub kind: AuditKind,
    pub plan_file: Option<String>,
    pub detail: String,
}

/// Where audit entries go. Implementors must not block the reducer for
/// long; `FileAuditSink` appends one JSON line per call.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditEntry);
}

/// Appends one JSON-line per entry to a log file, opening it in append
/// mode each call (no held file handle, so external rotation — e.g. `mv`
/// plus a fresh file — is safe between writes, matching the teacher's
/// `tracing-appender` rotation style).
pub struct FileAuditSink {
    path: PathBuf,
}

impl FileAuditSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn try_record(&self, entry: &AuditEntry) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut line = serde_json::to_string(entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        line.push('\n');
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(line.as_bytes())
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, entry: AuditEntry) {
        if let Err(err) = self.try_record(&entry) {
            tracing::warn!(path = %self.path.display(), %err, "failed to append audit entry");
        }
    }
}

/// Discards every entry. Used in tests and anywhere the operator has
/// disabled the audit log.
#[derive(Debug, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _entry: AuditEntry) {}
}

/// Read back every entry from a JSON-lines audit file, skipping (and
/// warning on) any line that fails to parse rather than aborting the read.
pub fn read_entries(path: &Path) -> std::io::Result<Vec<AuditEntry>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let mut entries = Vec::new();
    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(entry) => entries.push(entry),
            Err(err) => tracing::warn!(%err, "skipping malformed audit line"),
        }
    }
    Ok(entries)
}

#[cfg(test)]
#[path = "audit_tests.rs"]
mod tests;
