// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan and topic types.
//!
//! A plan is identified by its filename (`YYYY-MM-DD-slug.md`), not a
//! generated id — the filename is the thing on disk, and using it directly
//! avoids a second index that could drift from the markdown file it names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a plan. The [`crate::fsm`]-adjacent `kasmos-fsm` crate
/// is the only writer; this type itself carries no transition logic so that
/// every crate can share it without depending on the FSM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Unknown,
    Planning,
    Ready,
    Implementing,
    Reviewing,
    Done,
    Cancelled,
}

impl PlanStatus {
    /// A plan in one of these statuses is finished and will never transition again
    /// except via [`PlanStatus::Cancelled`] (cancellation is only blocked from
    /// `Done`/`Cancelled` themselves — see `kasmos-fsm`).
    pub fn is_terminal(self) -> bool {
        matches!(self, PlanStatus::Done | PlanStatus::Cancelled)
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlanStatus::Unknown => "unknown",
            PlanStatus::Planning => "planning",
            PlanStatus::Ready => "ready",
            PlanStatus::Implementing => "implementing",
            PlanStatus::Reviewing => "reviewing",
            PlanStatus::Done => "done",
            PlanStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// A plan's durable record, as stored in `docs/plans/plan-state.json`.
///
/// `file` is the map key in the store, not a field here, mirroring how the
/// on-disk schema nests entries under their filename (see §6 of the spec).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanEntry {
    pub description: String,
    pub branch: String,
    #[serde(default)]
    pub topic: String,
    pub status: PlanStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl PlanEntry {
    pub fn is_done(&self) -> bool {
        self.status == PlanStatus::Done
    }
}

/// Whether a plan in `status` counts against the at-most-one-in-flight
/// topic gate (§3: "at most one plan per topic may be in `implementing`
/// or `reviewing`").
pub fn plans_in_flight(status: PlanStatus) -> bool {
    matches!(status, PlanStatus::Implementing | PlanStatus::Reviewing)
}

/// A topic's durable record. Topics have no lifecycle of their own; they
/// exist only to group plans and to gate the at-most-one-in-flight
/// invariant enforced by callers that consult [`crate::plan::plans_in_flight`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicEntry {
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Branch name for a plan: `plan/<slug>`, where slug is the filename minus
/// its date prefix and extension, lowercased, non-alphanumerics collapsed
/// to single dashes.
pub fn branch_name(plan_file: &str) -> String {
    format!("plan/{}", slug(plan_file))
}

/// Display name: the filename minus its `YYYY-MM-DD-` prefix and extension.
pub fn display_name(plan_file: &str) -> String {
    let stem = plan_file.strip_suffix(".md").unwrap_or(plan_file);
    match strip_date_prefix(stem) {
        Some(rest) => rest.to_string(),
        None => stem.to_string(),
    }
}

fn slug(plan_file: &str) -> String {
    let name = display_name(plan_file);
    let mut out = String::with_capacity(name.len());
    let mut prev_dash = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            prev_dash = false;
        } else if !prev_dash {
            out.push('-');
            prev_dash = true;
        }
    }
    out.trim_matches('-').to_string()
}

fn strip_date_prefix(stem: &str) -> Option<&str> {
    let bytes = stem.as_bytes();
    if bytes.len() < 11 {
        return None;
    }
    let is_digit = |i: usize| bytes[i].is_ascii_digit();
    let date_shape = (0..4).all(is_digit)
        && bytes[4] == b'-'
        && (5..7).all(is_digit)
        && bytes[7] == b'-'
        && (8..10).all(is_digit)
        && bytes[10] == b'-';
    if date_shape {
        Some(&stem[11..])
    } else {
        None
    }
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
