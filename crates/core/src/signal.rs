// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signal record types shared between the scanner (`kasmos-signals`) and
//! its consumers (`kasmos-engine`, `kasmos-app`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle event a sentinel file encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalEvent {
    PlannerFinished,
    ImplementFinished,
    ReviewChangesRequested,
    ReviewApproved,
}

impl SignalEvent {
    /// The filename fragment this event is encoded as, e.g. `planner-finished`.
    pub fn as_filename_prefix(self) -> &'static str {
        match self {
            SignalEvent::PlannerFinished => "planner-finished",
            SignalEvent::ImplementFinished => "implement-finished",
            SignalEvent::ReviewChangesRequested => "review-changes-requested",
            SignalEvent::ReviewApproved => "review-approved",
        }
    }

    pub fn from_filename_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "planner-finished" => Some(SignalEvent::PlannerFinished),
            "implement-finished" => Some(SignalEvent::ImplementFinished),
            "review-changes-requested" => Some(SignalEvent::ReviewChangesRequested),
            "review-approved" => Some(SignalEvent::ReviewApproved),
            _ => None,
        }
    }
}

impl fmt::Display for SignalEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_filename_prefix())
    }
}

/// One sentinel file found by a scan, with its file already identified by
/// `<event>-<plan-file>` and its body (if any) parsed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalRecord {
    pub event: SignalEvent,
    pub plan_file: String,
    pub body: String,
}

impl SignalRecord {
    /// Dedup key: scans against the main plans dir and every worktree
    /// mirror are merged by `(event, plan_file)`.
    pub fn dedup_key(&self) -> (SignalEvent, &str) {
        (self.event, self.plan_file.as_str())
    }
}

/// A wave-specific signal: `implement-wave-<n>-<plan-file>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaveSignalRecord {
    pub wave_number: u32,
    pub plan_file: String,
    pub body: String,
}

#[cfg(test)]
#[path = "signal_tests.rs"]
mod tests;
