// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted user state beyond any one repo: the recent-repos MRU ring and
//! the seen-help bitmask (spec §3, §6). Stored at
//! `~/.config/kasmos/app-state.json` by convention; the path is passed in
//! by the caller so tests never touch a real home directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::atomic::{atomic_write_json, read_json_or_default};

/// Capacity of the recent-repos MRU ring (spec §3 SUPPLEMENT).
pub const RECENT_REPOS_CAPACITY: usize = 10;

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppState {
    #[serde(default)]
    recent_repos: Vec<PathBuf>,
    /// Bitmask of help-overlay sections the operator has already
    /// dismissed once; each bit is a section index, never re-shown.
    #[serde(default)]
    seen_help: u64,
}

impl AppState {
    pub fn load(path: &Path) -> std::io::Result<Self> {
        read_json_or_default(path)
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        atomic_write_json(path, self)
    }

    pub fn recent_repos(&self) -> &[PathBuf] {
        &self.recent_repos
    }

    /// Push `repo` to the front of the MRU ring. A path already present
    /// moves to the front instead of duplicating; the ring is truncated
    /// to [`RECENT_REPOS_CAPACITY`].
    pub fn push_recent_repo(&mut self, repo: PathBuf) {
        self.recent_repos.retain(|p| p != &repo);
        self.recent_repos.insert(0, repo);
        self.recent_repos.truncate(RECENT_REPOS_CAPACITY);
    }

    pub fn has_seen_help(&self, section: u32) -> bool {
        debug_assert!(section < 64);
        self.seen_help & (1 << section) != 0
    }

    pub fn mark_help_seen(&mut self, section: u32) {
        debug_assert!(section < 64);
        self.seen_help |= 1 << section;
    }
}

/// Default location: `~/.config/kasmos/app-state.json`, following the
/// teacher's `dirs`-based path resolution.
pub fn default_app_state_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("kasmos").join("app-state.json"))
}

#[cfg(test)]
#[path = "app_state_tests.rs"]
mod tests;
