// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `AppModel`: every piece of state the reducer (§4.7) exclusively owns.
//! Nothing here performs I/O — loading/saving the documents held inside
//! (`PlanStateStore`, `PermissionCache`, `AppState`) is the caller's job at
//! startup/shutdown and via [`crate::Cmd::SaveUserState`].

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;

use kasmos_core::{Instance, InstanceId};
use kasmos_engine::{PermissionArbiter, WaveOrchestrator};
use kasmos_storage::{AppState, AuditSink, PermissionCache, PlanStateStore};

use crate::config::Config;
use crate::overlay::{Overlay, OverlayTrigger, ToastLevel};

/// How long the three-way wave-failed dialog stays suppressed after the
/// operator dismisses it with Esc (§4.6).
pub const WAVE_FAILED_COOLDOWN_SECS: u64 = 30;

/// Every piece of state the event loop (C7) owns exclusively. Worker tasks
/// never see this directly — they receive plain data via `Cmd` and report
/// back via `Message`.
pub struct AppModel {
    pub config: Config,
    pub repo_root: PathBuf,
    pub plans_dir: PathBuf,

    pub sessions: IndexMap<InstanceId, Instance>,
    pub wave_orchestrators: HashMap<String, WaveOrchestrator>,
    wave_failed_cooldown: HashMap<String, Instant>,
    /// Free-text review feedback recorded from a `review-changes-requested`
    /// signal, injected into the next coder prompt for that plan (§4.7).
    pub review_feedback: HashMap<String, String>,

    pub overlay: Overlay,
    deferred: VecDeque<OverlayTrigger>,

    pub permission_arbiter: PermissionArbiter,
    pub permission_cache: PermissionCache,

    /// Replaced wholesale on every metadata tick with the freshly loaded
    /// document (§4.8 step 2); `None` until the first tick completes.
    pub plan_state: Option<PlanStateStore>,

    pub app_state: AppState,
    pub selected: Option<InstanceId>,
    pub terminal_instance: Option<InstanceId>,
    pub terminal_generation: u64,
    last_size: Option<(u16, u16)>,

    pub toasts: Vec<(String, ToastLevel)>,
    audit: Arc<dyn AuditSink>,

    /// Cached markdown->display output from the last `RenderMarkdown` cmd,
    /// keyed by plan file, for the plan-detail pane.
    pub rendered_plans: HashMap<String, String>,

    pub should_quit: bool,
}

impl AppModel {
    pub fn new(
        config: Config,
        repo_root: PathBuf,
        plans_dir: PathBuf,
        permission_cache: PermissionCache,
        app_state: AppState,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            config,
            repo_root,
            plans_dir,
            sessions: IndexMap::new(),
            wave_orchestrators: HashMap::new(),
            wave_failed_cooldown: HashMap::new(),
            review_feedback: HashMap::new(),
            overlay: Overlay::None,
            deferred: VecDeque::new(),
            permission_arbiter: PermissionArbiter::new(),
            permission_cache,
            plan_state: None,
            app_state,
            selected: None,
            terminal_instance: None,
            terminal_generation: 0,
            last_size: None,
            toasts: Vec::new(),
            audit,
            rendered_plans: HashMap::new(),
            should_quit: false,
        }
    }

    pub fn toast(&mut self, message: impl Into<String>, level: ToastLevel) {
        self.toasts.push((message.into(), level));
    }

    pub fn record_audit(&self, entry: kasmos_storage::AuditEntry) {
        self.audit.record(entry);
    }

    /// Whether `title` is already in use — callers must check this before
    /// constructing a new `Instance` (§8: "For any two sessions `s1 != s2`,
    /// their `title` differ").
    pub fn title_in_use(&self, title: &str) -> bool {
        self.sessions.values().any(|i| i.title == title)
    }

    /// Number of sessions not `paused` — the §5 `GlobalInstanceLimit` gate.
    pub fn started_instance_count(&self) -> usize {
        self.sessions
            .values()
            .filter(|i| !matches!(i.status, kasmos_core::InstanceStatus::Paused))
            .count()
    }

    pub fn at_instance_limit(&self) -> bool {
        self.started_instance_count() >= self.config.global_instance_limit
    }

    /// Sessions bound to `plan_file`, in insertion order.
    pub fn sessions_for_plan<'a>(&'a self, plan_file: &'a str) -> impl Iterator<Item = (&'a InstanceId, &'a Instance)> {
        self.sessions
            .iter()
            .filter(move |(_, i)| i.plan_file.as_deref() == Some(plan_file))
    }

    /// Whether reporting a terminal-size change is a real resize or a
    /// synthetic redraw of the same size (§4.7). Updates the stored size
    /// as a side effect of a genuine change.
    pub fn last_size(&self) -> Option<(u16, u16)> {
        self.last_size
    }

    pub fn observe_resize(&mut self, cols: u16, rows: u16) -> bool {
        if self.last_size == Some((cols, rows)) {
            return false;
        }
        self.last_size = Some((cols, rows));
        true
    }

    /// Open `trigger`'s overlay now if the app is in its default state,
    /// else enqueue it for the drain point (§4.7 overlay invariant). Either
    /// way, applies the focus-before-overlay rule first.
    pub fn open_or_defer(&mut self, trigger: OverlayTrigger) {
        if self.overlay.is_active() {
            if !self.deferred.contains(&trigger) {
                self.deferred.push_back(trigger);
            }
            return;
        }
        self.selected = focus_instance_for_overlay(&self.sessions, Some(trigger.plan_file()), None)
            .or(self.selected.clone());
        self.overlay = trigger.into_overlay();
    }

    /// Pop and open exactly one deferred trigger, if the app just returned
    /// to its default state. No-op otherwise.
    pub fn drain_one_deferred(&mut self) {
        if self.overlay.is_active() {
            return;
        }
        if let Some(trigger) = self.deferred.pop_front() {
            self.selected = focus_instance_for_overlay(&self.sessions, Some(trigger.plan_file()), None)
                .or(self.selected.clone());
            self.overlay = trigger.into_overlay();
        }
    }

    pub fn deferred_triggers(&self) -> impl Iterator<Item = &OverlayTrigger> {
        self.deferred.iter()
    }

    /// Open an overlay that names a specific instance directly (coder-exit,
    /// permission), applying focus-before-overlay with that instance.
    pub fn open_overlay_for_instance(&mut self, instance: InstanceId, overlay: Overlay) {
        self.selected = Some(instance);
        self.overlay = overlay;
    }

    pub fn close_overlay(&mut self) {
        self.overlay = Overlay::None;
    }

    /// Suppress the wave-failed dialog for `plan_file` for
    /// [`WAVE_FAILED_COOLDOWN_SECS`] (§4.6: Esc "cools the prompt").
    pub fn start_wave_failed_cooldown(&mut self, plan_file: &str) {
        self.wave_failed_cooldown.insert(
            plan_file.to_string(),
            Instant::now() + std::time::Duration::from_secs(WAVE_FAILED_COOLDOWN_SECS),
        );
    }

    pub fn is_wave_failed_cooling_down(&self, plan_file: &str) -> bool {
        self.wave_failed_cooldown
            .get(plan_file)
            .is_some_and(|until| Instant::now() < *until)
    }

    /// Drop any expired cooldown entries, re-arming that orchestrator's
    /// confirm latch so the next reconciliation pass re-shows the dialog.
    pub fn expire_wave_failed_cooldowns(&mut self) {
        let expired: Vec<String> = self
            .wave_failed_cooldown
            .iter()
            .filter(|(_, until)| Instant::now() >= **until)
            .map(|(plan, _)| plan.clone())
            .collect();
        for plan_file in expired {
            self.wave_failed_cooldown.remove(&plan_file);
            if let Some(orch) = self.wave_orchestrators.get_mut(&plan_file) {
                orch.reset_confirm();
            }
        }
    }
}

/// A pure function (§9 design note) deciding which instance the event loop
/// should select before opening an overlay that references a plan or a
/// specific instance, so the agent's output is visible behind the modal.
/// `explicit` wins when given (coder-exit, permission); otherwise the
/// first session bound to `plan_file` is picked, preferring one that is
/// still running.
pub fn focus_instance_for_overlay(
    sessions: &IndexMap<InstanceId, Instance>,
    plan_file: Option<&str>,
    explicit: Option<&InstanceId>,
) -> Option<InstanceId> {
    if let Some(id) = explicit {
        return Some(id.clone());
    }
    let plan_file = plan_file?;
    let mut candidates = sessions
        .iter()
        .filter(|(_, i)| i.plan_file.as_deref() == Some(plan_file));
    let running = candidates
        .clone()
        .find(|(_, i)| !i.exited && i.status != kasmos_core::InstanceStatus::Paused);
    running
        .or_else(|| candidates.next())
        .map(|(id, _)| id.clone())
}
