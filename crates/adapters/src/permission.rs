// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Detecting a blocking permission prompt in a captured pane tail.
//!
//! Some agents (notably `opencode`) render an inline modal asking whether
//! a filesystem/network action may proceed, and then block on stdin until
//! answered. This module recognizes that shape in plain captured text so
//! the permission arbiter (engine, §4.9) can react without understanding
//! any particular agent's UI.

use std::sync::LazyLock;

/// A permission prompt detected in a pane's captured tail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionPrompt {
    /// The normalized pattern used as the cache key, e.g. the command or
    /// path the agent wants to run/touch.
    pub pattern: String,
    /// Human-readable description surfaced in the permission modal.
    pub description: String,
}

static YES_OPTION_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"(?i)\[y\]|\(y\)|\by\b|\byes\b").expect("static yes-option regex is valid"));
static NO_OPTION_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"(?i)\[n\]|\(n\)|\bn\b|\bno\b").expect("static no-option regex is valid"));

const PROMPT_PREFIXES: &[&str] = &["allow:", "allow", "permission requested:", "permission required:"];

/// Scan the last few lines of a captured pane for a permission-prompt
/// shape: a line starting with "Allow ..." / "Permission requested: ..."
/// within a tail that also contains a yes/no option line. Returns `None`
/// when the tail doesn't look like a live prompt.
pub fn detect_permission_prompt(tail: &str) -> Option<PermissionPrompt> {
    let recent: Vec<&str> = tail.lines().rev().take(12).collect();
    let joined = recent.join("\n");
    if !(YES_OPTION_RE.is_match(&joined) && NO_OPTION_RE.is_match(&joined)) {
        return None;
    }

    for line in &recent {
        let trimmed = line.trim();
        let lower = trimmed.to_lowercase();
        let Some(matched_prefix) = PROMPT_PREFIXES.iter().find(|p| lower.starts_with(**p)) else {
            continue;
        };
        let mut rest = trimmed[matched_prefix.len()..].trim();
        // "Allow running: rm -rf build/?" — the verb before the colon is
        // filler; the description is whatever the colon introduces.
        if let Some((_, after)) = rest.split_once(':') {
            rest = after.trim();
        }
        let description = rest.trim_end_matches('?').trim().to_string();
        if description.is_empty() {
            continue;
        }
        let pattern = normalize_pattern(&description);
        return Some(PermissionPrompt { pattern, description });
    }
    None
}

/// Collapse whitespace and lowercase so the same request from slightly
/// different renders still hits the same cache entry.
fn normalize_pattern(description: &str) -> String {
    description.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

#[cfg(test)]
#[path = "permission_tests.rs"]
mod tests;
