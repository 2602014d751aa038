// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The permission arbiter (C9): detects a live permission prompt in a
//! session's captured pane tail and decides, per tick, whether to
//! auto-approve from the cache, open the operator-facing modal, or do
//! nothing — per spec §4.9.

use std::collections::HashSet;

use kasmos_adapters::permission::PermissionPrompt;
use kasmos_core::InstanceId;
use kasmos_storage::PermissionCache;

/// What the reducer should do this tick for one instance, given its
/// latest snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionAction {
    /// No live prompt, or one already being handled this tick.
    None,
    /// `pattern` has an "allow-always" cache hit: schedule a worker task
    /// that sends the cached response, and mark this instance in-flight
    /// so repeated ticks don't double-send while the prompt is still
    /// visible.
    AutoApprove { instance: InstanceId, pattern: String },
    /// No cache hit: the reducer should focus the instance and open the
    /// permission modal.
    OpenModal { instance: InstanceId, prompt: PermissionPrompt },
}

/// Per-app-run bookkeeping for C9. Holds only the in-flight guard set —
/// the cache itself is owned by the caller (it's per-repo, persisted).
#[derive(Debug, Default)]
pub struct PermissionArbiter {
    in_flight: HashSet<InstanceId>,
}

impl PermissionArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide an action for `instance`, given its latest-tick prompt
    /// detection (if any) and the operator's permission cache. Must only
    /// be called while the app is in its default state (§4.9 precondition)
    /// — the caller, not this type, enforces that.
    pub fn on_tick(
        &mut self,
        instance: &InstanceId,
        prompt: Option<&PermissionPrompt>,
        cache: &PermissionCache,
    ) -> PermissionAction {
        let Some(prompt) = prompt else {
            // Step 4: prompt cleared, guard removed so future matches
            // trigger again.
            self.in_flight.remove(instance);
            return PermissionAction::None;
        };

        if self.in_flight.contains(instance) {
            // Step 1: already handling this instance's prompt.
            return PermissionAction::None;
        }

        if cache.is_always_allowed(&prompt.pattern) {
            self.in_flight.insert(instance.clone());
            return PermissionAction::AutoApprove {
                instance: instance.clone(),
                pattern: prompt.pattern.clone(),
            };
        }

        PermissionAction::OpenModal {
            instance: instance.clone(),
            prompt: prompt.clone(),
        }
    }

    pub fn is_in_flight(&self, instance: &InstanceId) -> bool {
        self.in_flight.contains(instance)
    }
}

#[cfg(test)]
#[path = "permission_arbiter_tests.rs"]
mod tests;
