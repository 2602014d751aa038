// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `git diff --stat` sampling against a worktree's base branch.
//!
//! Pane diff stats are a metadata-tick concern (§4.8), not a session/pane
//! operation — kept as a free function rather than a `SessionAdapter`
//! method so `FakeSessionAdapter` doesn't have to fake git too.

use kasmos_core::DiffStats;
use std::path::Path;
use thiserror::Error;
use tokio::process::Command;

use crate::subprocess::{run_with_timeout, GIT_DIFF_STAT_TIMEOUT};

#[derive(Debug, Error)]
pub enum GitError {
    #[error("git diff --stat failed: {0}")]
    CommandFailed(String),
}

/// Sample `git diff --stat <base>...HEAD` in `worktree`, summing the
/// per-file numstat into [`DiffStats`]. Returns all-zero stats (not an
/// error) when there is no diff yet, e.g. immediately after worktree
/// creation.
pub async fn diff_stat(worktree: &Path, base_branch: &str) -> Result<DiffStats, GitError> {
    let mut cmd = Command::new("git");
    cmd.current_dir(worktree)
        .args(["diff", "--numstat", &format!("{base_branch}...HEAD")]);

    let output = run_with_timeout(cmd, GIT_DIFF_STAT_TIMEOUT, "git diff --numstat")
        .await
        .map_err(GitError::CommandFailed)?;

    if !output.status.success() {
        // A worktree with no commits yet against base is not an error —
        // the caller just gets zeroed stats for this tick.
        return Ok(DiffStats::default());
    }

    let text = String::from_utf8_lossy(&output.stdout);
    let mut stats = DiffStats::default();
    for line in text.lines() {
        let mut fields = line.split('\t');
        let (Some(ins), Some(del), Some(_path)) = (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        // Binary files report `-` for both columns; skip them.
        let (Ok(ins), Ok(del)) = (ins.parse::<u32>(), del.parse::<u32>()) else {
            continue;
        };
        stats.files_changed += 1;
        stats.insertions += ins;
        stats.deletions += del;
    }
    Ok(stats)
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;
