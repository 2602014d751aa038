// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The "allow always" permission cache (§6): a set of prompt patterns the
//! operator has chosen to stop being asked about, persisted per-repo at
//! `<repo>/.kasmos/permissions.json` so the decision survives restarts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::atomic::{atomic_write_json, read_json_or_default};

const CACHE_FILE: &str = "permissions.json";

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
struct Document {
    #[serde(default)]
    always_allow: BTreeSet<String>,
}

/// Per-repo store of permission-prompt patterns the operator has
/// whitelisted via "allow always" (spec §4.9, §6).
#[derive(Debug)]
pub struct PermissionCache {
    dir: PathBuf,
    doc: Document,
}

impl PermissionCache {
    /// Load `<dir>/permissions.json`, where `dir` is the repo's `.kasmos`
    /// directory. A missing file is an empty cache, not an error.
    pub fn load(dir: &Path) -> std::io::Result<Self> {
        let doc = read_json_or_default(&dir.join(CACHE_FILE))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            doc,
        })
    }

    fn path(&self) -> PathBuf {
        self.dir.join(CACHE_FILE)
    }

    /// Whether `pattern` has been marked "allow always". `pattern` is
    /// expected to already be normalized (see `kasmos_adapters::permission`).
    pub fn is_always_allowed(&self, pattern: &str) -> bool {
        self.doc.always_allow.contains(pattern)
    }

    /// Mark `pattern` as "allow always" and persist the cache.
    pub fn allow_always(&mut self, pattern: &str) -> std::io::Result<()> {
        self.doc.always_allow.insert(pattern.to_string());
        atomic_write_json(&self.path(), &self.doc)
    }

    /// Revoke a previously-cached pattern, persisting the cache.
    pub fn revoke(&mut self, pattern: &str) -> std::io::Result<()> {
        self.doc.always_allow.remove(pattern);
        atomic_write_json(&self.path(), &self.doc)
    }
}

#[cfg(test)]
#[path = "permission_cache_tests.rs"]
mod tests;
