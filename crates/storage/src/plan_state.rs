// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The plan state store (C1): `docs/plans/plan-state.json`, one entry per
//! plan plus a `topics` map, written atomically. This is the *only*
//! component allowed to touch the on-disk document directly; `set_status`
//! exists for [`kasmos-fsm`]'s exclusive use — nothing else in the engine
//! should call it.

use indexmap::IndexMap;
use kasmos_core::{PlanEntry, PlanStatus, TopicEntry};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::atomic::{atomic_write_json, read_json_or_default};

const STATE_FILE: &str = "plan-state.json";

#[derive(Debug, Error)]
pub enum PlanStateError {
    #[error("plan {0} is already registered")]
    AlreadyRegistered(String),
    #[error("plan {0} not found")]
    NotFound(String),
    #[error("reading/writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// On-disk document shape, matching spec §6 exactly — a `plans` map and a
/// `topics` map, both keyed by name.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    plans: IndexMap<String, PlanEntry>,
    #[serde(default)]
    topics: IndexMap<String, TopicEntry>,
}

/// The durable plan/topic corpus for one repo's `docs/plans/` directory.
#[derive(Debug)]
pub struct PlanStateStore {
    dir: PathBuf,
    doc: Document,
}

impl PlanStateStore {
    /// Load `<dir>/plan-state.json`, tolerating a missing directory or
    /// file (first run returns an empty, already-initialized store).
    pub fn load(dir: &Path) -> Result<Self, PlanStateError> {
        let path = dir.join(STATE_FILE);
        let doc: Document = read_json_or_default(&path).map_err(|source| PlanStateError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
            doc,
        })
    }

    fn path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    fn save(&self) -> Result<(), PlanStateError> {
        atomic_write_json(&self.path(), &self.doc).map_err(|source| PlanStateError::Io {
            path: self.path(),
            source,
        })
    }

    /// Register a new plan at initial status `unknown`. Fails if `file`
    /// is already registered — re-registration is a caller bug, not a
    /// legitimate update path (use `set_branch`/`set_topic`/`rename`).
    pub fn register(
        &mut self,
        file: &str,
        description: &str,
        branch: &str,
        topic: &str,
        created_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), PlanStateError> {
        if self.doc.plans.contains_key(file) {
            return Err(PlanStateError::AlreadyRegistered(file.to_string()));
        }
        self.doc.plans.insert(
            file.to_string(),
            PlanEntry {
                description: description.to_string(),
                branch: branch.to_string(),
                topic: topic.to_string(),
                status: PlanStatus::Unknown,
                created_at,
            },
        );
        if !topic.is_empty() && !self.doc.topics.contains_key(topic) {
            self.doc.topics.insert(
                topic.to_string(),
                TopicEntry {
                    created_at,
                },
            );
        }
        self.save()
    }

    /// Low-level status write. Reserved for `kasmos-fsm`: application code
    /// should call through `PlanFsm::apply` plus this, never this alone.
    pub fn set_status(&mut self, file: &str, status: PlanStatus) -> Result<(), PlanStateError> {
        let entry = self
            .doc
            .plans
            .get_mut(file)
            .ok_or_else(|| PlanStateError::NotFound(file.to_string()))?;
        entry.status = status;
        self.save()
    }

    pub fn set_branch(&mut self, file: &str, branch: &str) -> Result<(), PlanStateError> {
        let entry = self
            .doc
            .plans
            .get_mut(file)
            .ok_or_else(|| PlanStateError::NotFound(file.to_string()))?;
        entry.branch = branch.to_string();
        self.save()
    }

    pub fn set_topic(&mut self, file: &str, topic: &str) -> Result<(), PlanStateError> {
        let entry = self
            .doc
            .plans
            .get_mut(file)
            .ok_or_else(|| PlanStateError::NotFound(file.to_string()))?;
        entry.topic = topic.to_string();
        if !topic.is_empty() && !self.doc.topics.contains_key(topic) {
            self.doc.topics.insert(
                topic.to_string(),
                TopicEntry {
                    created_at: chrono::Utc::now(),
                },
            );
        }
        self.save()
    }

    /// Rename a plan's filename key (e.g. after the operator edits the
    /// plan's slug). The plan's map position and all other fields are
    /// preserved.
    pub fn rename(&mut self, file: &str, new_name: &str) -> Result<(), PlanStateError> {
        let entry = self
            .doc
            .plans
            .shift_remove(file)
            .ok_or_else(|| PlanStateError::NotFound(file.to_string()))?;
        self.doc.plans.insert(new_name.to_string(), entry);
        self.save()
    }

    pub fn entry(&self, file: &str) -> Option<&PlanEntry> {
        self.doc.plans.get(file)
    }

    pub fn topics(&self) -> impl Iterator<Item = (&String, &TopicEntry)> {
        self.doc.topics.iter()
    }

    pub fn plans_by_topic<'a>(&'a self, name: &'a str) -> impl Iterator<Item = (&'a String, &'a PlanEntry)> {
        self.doc.plans.iter().filter(move |(_, e)| e.topic == name)
    }

    pub fn ungrouped_plans(&self) -> impl Iterator<Item = (&String, &PlanEntry)> {
        self.doc.plans.iter().filter(|(_, e)| e.topic.is_empty())
    }

    pub fn finished_plans(&self) -> impl Iterator<Item = (&String, &PlanEntry)> {
        self.doc.plans.iter().filter(|(_, e)| e.is_done())
    }

    pub fn all_plans(&self) -> impl Iterator<Item = (&String, &PlanEntry)> {
        self.doc.plans.iter()
    }

    pub fn is_done(&self, file: &str) -> bool {
        self.doc.plans.get(file).map(PlanEntry::is_done).unwrap_or(false)
    }

    pub fn display_name(&self, file: &str) -> String {
        kasmos_core::display_name(file)
    }

    /// Whether any plan in `topic` is currently in-flight (`implementing`
    /// or `reviewing`), enforcing the at-most-one-per-topic gate from §3.
    pub fn topic_has_in_flight_plan(&self, topic: &str, excluding: &str) -> bool {
        self.plans_by_topic(topic)
            .any(|(file, entry)| file != excluding && kasmos_core::plans_in_flight(entry.status))
    }
}

#[cfg(test)]
#[path = "plan_state_tests.rs"]
mod tests;
