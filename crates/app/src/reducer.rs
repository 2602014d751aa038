// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The event loop's reducer (C7): the sole mutator of [`AppModel`]. Every
//! `Message` is handled by exactly one branch of [`Reducer::update`], which
//! returns the `Cmd`s the caller must schedule as worker tasks — no handler
//! here performs blocking I/O itself (§4.7, §5).

use kasmos_core::{
    AgentType, Instance, InstanceId, InstanceOpts, InstanceStatus, SignalRecord, WaveSignalRecord,
};
use kasmos_engine::{OrchestratorState, SessionSnapshot, TaskState, WaveOrchestrator};
use kasmos_fsm::FsmEvent;
use kasmos_storage::{AuditEntry, AuditKind};

use crate::cmd::Cmd;
use crate::message::{Message, MetadataTickResult};
use crate::model::AppModel;
use crate::overlay::{Overlay, OverlayTrigger, ToastLevel};

/// Wraps an [`AppModel`] and exposes the single `update` entry point the
/// event loop drives.
pub struct Reducer {
    model: AppModel,
}

impl Reducer {
    pub fn new(model: AppModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &AppModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut AppModel {
        &mut self.model
    }

    pub fn into_model(self) -> AppModel {
        self.model
    }

    pub fn update(&mut self, msg: Message) -> Vec<Cmd> {
        match msg {
            Message::Key(key) => self.handle_key(key),
            Message::Mouse(_mouse) => Vec::new(),
            Message::Resize { cols, rows } => self.handle_resize(cols, rows),
            Message::MetadataTick(result) => self.handle_metadata_tick(result),
            Message::WaveAdvance { plan_file } => self.handle_wave_advance(plan_file),
            Message::WaveRetry { plan_file } => self.handle_wave_retry(plan_file),
            Message::WaveAbort { plan_file } => self.handle_wave_abort(plan_file),
            Message::WaveAllComplete { plan_file } => self.handle_wave_all_complete(plan_file),
            Message::CoderComplete { instance, plan_file } => self.handle_coder_complete(instance, plan_file),
            Message::PlannerComplete { plan_file } => self.handle_planner_complete(plan_file),
            Message::InstanceStarted { instance, result } => self.handle_instance_started(instance, result),
            Message::WaveTasksSpawned { plan_file, instances } => {
                self.handle_wave_tasks_spawned(plan_file, instances)
            }
            Message::KillInstance { instance } => self.handle_kill_instance(instance),
            Message::TerminalReady { instance, generation } => self.handle_terminal_ready(instance, generation),
            Message::PlanRendered { plan_file, html } => {
                self.model.rendered_plans.insert(plan_file, html);
                Vec::new()
            }
            Message::FolderPicked { path } => self.handle_folder_picked(path),
            Message::ClickUpImportResult { result } => self.handle_clickup_result(result),
            Message::RemoteMirrorResult { file, result } => self.handle_remote_mirror_result(file, result),
            Message::PermissionResponse { instance, pattern, allow, always } => {
                self.apply_permission_response(instance, pattern, allow, always)
            }
        }
    }

    // -- keyboard/mouse -----------------------------------------------

    fn handle_key(&mut self, key: crossterm::event::KeyEvent) -> Vec<Cmd> {
        use crossterm::event::{KeyCode, KeyModifiers};

        match self.model.overlay.clone() {
            Overlay::None => self.handle_key_default(key),
            Overlay::PlannerFinishedConfirm { plan_file } => match key.code {
                KeyCode::Char('y') | KeyCode::Enter => self.confirm_planner_finished(plan_file),
                KeyCode::Char('n') | KeyCode::Esc => {
                    self.model.close_overlay();
                    self.model.drain_one_deferred();
                    Vec::new()
                }
                _ => Vec::new(),
            },
            Overlay::WaveComplete { plan_file, is_final_wave, .. } => match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    if is_final_wave {
                        self.handle_wave_all_complete(plan_file)
                    } else {
                        self.handle_wave_advance(plan_file)
                    }
                }
                KeyCode::Char('n') | KeyCode::Esc => {
                    if let Some(orch) = self.model.wave_orchestrators.get_mut(&plan_file) {
                        orch.reset_confirm();
                    }
                    self.model.close_overlay();
                    self.model.drain_one_deferred();
                    Vec::new()
                }
                _ => Vec::new(),
            },
            Overlay::WaveFailed { plan_file, .. } => match key.code {
                KeyCode::Char('r') => self.handle_wave_retry(plan_file),
                KeyCode::Char('a') => self.handle_wave_abort(plan_file),
                KeyCode::Esc => {
                    self.model.start_wave_failed_cooldown(&plan_file);
                    self.model.close_overlay();
                    self.model.drain_one_deferred();
                    Vec::new()
                }
                _ => Vec::new(),
            },
            Overlay::CoderExitConfirm { instance, .. } => match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    self.model.close_overlay();
                    self.model.drain_one_deferred();
                    vec![Cmd::PushBranch { instance }]
                }
                KeyCode::Char('n') | KeyCode::Esc => {
                    self.model.close_overlay();
                    self.model.drain_one_deferred();
                    Vec::new()
                }
                _ => Vec::new(),
            },
            Overlay::Permission { instance, prompt } => match key.code {
                KeyCode::Char('y') => self.apply_permission_response(instance, prompt.pattern, true, false),
                KeyCode::Char('a') => self.apply_permission_response(instance, prompt.pattern, true, true),
                KeyCode::Char('n') | KeyCode::Esc => {
                    self.apply_permission_response(instance, prompt.pattern, false, false)
                }
                _ => Vec::new(),
            },
        }
        .into_iter()
        .chain(if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.model.should_quit = true;
            vec![Cmd::SaveUserState]
        } else {
            Vec::new()
        })
        .collect()
    }

    fn handle_key_default(&mut self, key: crossterm::event::KeyEvent) -> Vec<Cmd> {
        use crossterm::event::KeyCode;

        match key.code {
            KeyCode::Char('q') => {
                self.model.should_quit = true;
                vec![Cmd::SaveUserState]
            }
            KeyCode::Down => {
                self.select_relative(1);
                Vec::new()
            }
            KeyCode::Up => {
                self.select_relative(-1);
                Vec::new()
            }
            KeyCode::Enter => {
                let Some(instance) = self.model.selected.clone() else {
                    return Vec::new();
                };
                let (cols, rows) = self.model.last_size().unwrap_or((80, 24));
                self.model.terminal_generation += 1;
                vec![Cmd::SpawnTerminal {
                    instance,
                    generation: self.model.terminal_generation,
                    cols,
                    rows,
                }]
            }
            KeyCode::Char(c) => {
                let Some(instance) = self.model.terminal_instance.clone() else {
                    return Vec::new();
                };
                vec![Cmd::SendKey {
                    instance,
                    bytes: c.to_string().into_bytes(),
                }]
            }
            _ => Vec::new(),
        }
    }

    fn select_relative(&mut self, delta: i64) {
        let ids: Vec<InstanceId> = self.model.sessions.keys().cloned().collect();
        if ids.is_empty() {
            self.model.selected = None;
            return;
        }
        let current = self
            .model
            .selected
            .as_ref()
            .and_then(|sel| ids.iter().position(|id| id == sel))
            .unwrap_or(0) as i64;
        let next = (current + delta).rem_euclid(ids.len() as i64) as usize;
        self.model.selected = Some(ids[next].clone());
    }

    fn handle_resize(&mut self, cols: u16, rows: u16) -> Vec<Cmd> {
        if !self.model.observe_resize(cols, rows) {
            return Vec::new();
        }
        let mut cmds = vec![Cmd::ResizeTerminal { cols, rows }];
        if let Some(instance) = self.model.terminal_instance.clone() {
            cmds.push(Cmd::ResizeSession { instance, cols, rows });
        }
        cmds
    }

    // -- signal-driven confirm dialogs ---------------------------------

    fn confirm_planner_finished(&mut self, plan_file: String) -> Vec<Cmd> {
        let mut cmds = Vec::new();
        self.apply_fsm_event(&plan_file, FsmEvent::ImplementStart, &mut cmds);
        self.model.close_overlay();
        self.model.drain_one_deferred();
        cmds
    }

    fn handle_wave_advance(&mut self, plan_file: String) -> Vec<Cmd> {
        if let Some(orch) = self.model.wave_orchestrators.get_mut(&plan_file) {
            orch.start_next_wave();
        }
        self.model.close_overlay();
        self.model.drain_one_deferred();
        vec![Cmd::SpawnWaveTasks { plan_file }]
    }

    fn handle_wave_retry(&mut self, plan_file: String) -> Vec<Cmd> {
        let task_numbers: Vec<u32> = self
            .model
            .wave_orchestrators
            .get_mut(&plan_file)
            .map(|orch| orch.retry_failed_tasks().iter().map(|t| t.number).collect())
            .unwrap_or_default();
        self.model.close_overlay();
        self.model.drain_one_deferred();
        if task_numbers.is_empty() {
            Vec::new()
        } else {
            vec![Cmd::RespawnWaveTasks { plan_file, task_numbers }]
        }
    }

    fn handle_wave_abort(&mut self, plan_file: String) -> Vec<Cmd> {
        let mut cmds = Vec::new();
        self.model.wave_orchestrators.remove(&plan_file);
        self.apply_fsm_event(&plan_file, FsmEvent::Cancel, &mut cmds);
        self.model.close_overlay();
        self.model.drain_one_deferred();
        cmds
    }

    fn handle_wave_all_complete(&mut self, plan_file: String) -> Vec<Cmd> {
        self.model.close_overlay();
        self.model.drain_one_deferred();
        let representative = self
            .model
            .sessions
            .iter()
            .find(|(_, i)| i.plan_file.as_deref() == Some(plan_file.as_str()) && i.is_wave_task())
            .map(|(id, _)| id.clone());
        match representative {
            Some(instance) => vec![Cmd::PushBranch { instance }],
            None => Vec::new(),
        }
    }

    fn handle_coder_complete(&mut self, instance: InstanceId, plan_file: String) -> Vec<Cmd> {
        let mut cmds = vec![Cmd::Pause { instance }];
        self.model.wave_orchestrators.remove(&plan_file);
        self.apply_fsm_event(&plan_file, FsmEvent::ImplementFinished, &mut cmds);
        let branch = self
            .model
            .plan_state
            .as_ref()
            .and_then(|ps| ps.entry(&plan_file))
            .map(|e| e.branch.clone());
        if let Some(branch) = branch {
            let reviewer = self.spawn_tracked_instance(&plan_file, AgentType::Reviewer, "review", None);
            cmds.push(Cmd::SpawnOnBranch { instance: reviewer, branch });
        }
        cmds
    }

    fn handle_planner_complete(&mut self, plan_file: String) -> Vec<Cmd> {
        self.model.toast(format!("planner finished for {plan_file}"), ToastLevel::Info);
        Vec::new()
    }

    // -- async worker-task results --------------------------------------

    fn handle_instance_started(&mut self, instance: InstanceId, result: Result<String, String>) -> Vec<Cmd> {
        match result {
            Ok(session_id) => {
                if let Some(inst) = self.model.sessions.get_mut(&instance) {
                    inst.session_id = Some(session_id);
                    return Self::deliver_queued_prompt(inst);
                }
            }
            Err(err) => {
                self.model.toast(format!("failed to start session: {err}"), ToastLevel::Error);
                self.model.sessions.shift_remove(&instance);
            }
        }
        Vec::new()
    }

    fn handle_wave_tasks_spawned(&mut self, plan_file: String, instances: Result<Vec<Instance>, String>) -> Vec<Cmd> {
        match instances {
            Ok(instances) => {
                let mut cmds = Vec::new();
                for mut instance in instances {
                    let id = instance.id.clone();
                    cmds.extend(Self::deliver_queued_prompt(&mut instance));
                    self.model.sessions.insert(id, instance);
                }
                cmds
            }
            Err(err) => {
                self.model
                    .toast(format!("failed to spawn wave tasks for {plan_file}: {err}"), ToastLevel::Error);
                Vec::new()
            }
        }
    }

    /// If `inst` was constructed with a prompt already queued (review
    /// feedback, a wave task's generated task prompt), hand delivery off
    /// to a `DeliverPrompt` worker task and apply the same
    /// prompt-detected/awaiting-work bookkeeping `Session::mark_prompt_queued`
    /// applies on the worker-task side, so the two copies of this
    /// instance's status stay in lockstep (§4.4's ordering invariant).
    fn deliver_queued_prompt(inst: &mut Instance) -> Vec<Cmd> {
        let Some(text) = inst.queued_prompt.take() else {
            return Vec::new();
        };
        inst.prompt_detected = false;
        inst.awaiting_work = true;
        if inst.status == InstanceStatus::Ready {
            inst.status = InstanceStatus::Running;
        }
        vec![Cmd::DeliverPrompt { instance: inst.id.clone(), text }]
    }

    fn handle_kill_instance(&mut self, instance: InstanceId) -> Vec<Cmd> {
        self.model.sessions.shift_remove(&instance);
        if self.model.selected.as_ref() == Some(&instance) {
            self.model.selected = None;
        }
        if self.model.terminal_instance.as_ref() == Some(&instance) {
            self.model.terminal_instance = None;
        }
        Vec::new()
    }

    fn handle_terminal_ready(&mut self, instance: InstanceId, generation: u64) -> Vec<Cmd> {
        if generation != self.model.terminal_generation {
            return Vec::new();
        }
        self.model.terminal_instance = Some(instance);
        Vec::new()
    }

    fn handle_folder_picked(&mut self, path: std::path::PathBuf) -> Vec<Cmd> {
        self.model.app_state.push_recent_repo(path);
        vec![Cmd::SaveUserState]
    }

    fn handle_clickup_result(&mut self, result: Result<Vec<crate::overlay::ImportedTask>, String>) -> Vec<Cmd> {
        match result {
            Ok(tasks) => {
                let count = tasks.len();
                for task in tasks {
                    self.register_imported_plan(&task);
                }
                self.model.toast(format!("imported {count} task(s)"), ToastLevel::Info);
            }
            Err(err) => self.model.toast(format!("import failed: {err}"), ToastLevel::Error),
        }
        Vec::new()
    }

    fn register_imported_plan(&mut self, task: &crate::overlay::ImportedTask) {
        let file = format!("{}-{}.md", chrono::Utc::now().format("%Y-%m-%d"), slugify(&task.title));
        let branch = kasmos_core::branch_name(&file);
        let Some(plan_state) = self.model.plan_state.as_mut() else {
            return;
        };
        let _ = plan_state.register(&file, &task.title, &branch, "", chrono::Utc::now());
    }

    fn handle_remote_mirror_result(&mut self, file: String, result: Result<(), String>) -> Vec<Cmd> {
        if let Err(err) = result {
            self.model.toast(format!("remote mirror failed for {file}: {err}"), ToastLevel::Warning);
        }
        Vec::new()
    }

    fn apply_permission_response(&mut self, instance: InstanceId, pattern: String, allow: bool, always: bool) -> Vec<Cmd> {
        let mut cmds = vec![Cmd::SendPermissionResponse {
            instance,
            pattern: pattern.clone(),
            allow,
            always,
        }];
        if always {
            if let Err(err) = self.model.permission_cache.allow_always(&pattern) {
                tracing::warn!(%err, "failed to persist allow-always permission pattern");
            }
        }
        self.model.close_overlay();
        self.model.drain_one_deferred();
        cmds.push(Cmd::RecordAudit(AuditEntry {
            at: chrono::Utc::now(),
            kind: AuditKind::PermissionPrompted { pattern },
            plan_file: None,
            detail: format!("operator answered: allow={allow} always={always}"),
        }));
        cmds
    }

    // -- metadata tick ----------------------------------------------------

    fn handle_metadata_tick(&mut self, result: MetadataTickResult) -> Vec<Cmd> {
        let MetadataTickResult { snapshots, context } = result;
        let mut cmds = Vec::new();

        self.model.plan_state = Some(context.plan_state);
        self.model.expire_wave_failed_cooldowns();

        for sig in &context.signals {
            self.apply_signal(sig, &mut cmds);
        }
        for wsig in &context.wave_signals {
            self.apply_wave_signal(wsig);
        }

        for (id, snap) in &snapshots {
            if let Some(inst) = self.model.sessions.get_mut(id) {
                apply_snapshot_to_instance(inst, snap);
            }
        }

        self.check_permission_prompts(&snapshots, &mut cmds);
        self.reconcile_wave_orchestrators(&mut cmds);
        self.check_coder_exits(&mut cmds);

        cmds.push(Cmd::RunMetadataTick);
        cmds
    }

    fn apply_signal(&mut self, sig: &SignalRecord, cmds: &mut Vec<Cmd>) {
        self.consume_signal(kasmos_signals::filename_for(sig.event, &sig.plan_file));
        match sig.event {
            kasmos_core::SignalEvent::PlannerFinished => {
                self.apply_fsm_event(&sig.plan_file, FsmEvent::PlannerFinished, cmds);
                self.model.open_or_defer(OverlayTrigger::PlannerFinished { plan_file: sig.plan_file.clone() });
            }
            kasmos_core::SignalEvent::ImplementFinished => {
                if !self.model.wave_orchestrators.contains_key(&sig.plan_file) {
                    self.apply_fsm_event(&sig.plan_file, FsmEvent::ImplementFinished, cmds);
                    let branch = self
                        .model
                        .plan_state
                        .as_ref()
                        .and_then(|ps| ps.entry(&sig.plan_file))
                        .map(|e| e.branch.clone());
                    if let Some(branch) = branch {
                        let reviewer = self.spawn_tracked_instance(&sig.plan_file, AgentType::Reviewer, "review", None);
                        cmds.push(Cmd::SpawnOnBranch { instance: reviewer, branch });
                    }
                }
            }
            kasmos_core::SignalEvent::ReviewChangesRequested => {
                self.apply_fsm_event(&sig.plan_file, FsmEvent::ReviewChangesRequested, cmds);
                self.model.review_feedback.insert(sig.plan_file.clone(), sig.body.clone());
                let branch = self
                    .model
                    .plan_state
                    .as_ref()
                    .and_then(|ps| ps.entry(&sig.plan_file))
                    .map(|e| e.branch.clone());
                if let Some(branch) = branch {
                    let coder = self.spawn_tracked_instance(
                        &sig.plan_file,
                        AgentType::Coder,
                        "revise",
                        Some(sig.body.clone()),
                    );
                    cmds.push(Cmd::SpawnOnBranch { instance: coder, branch });
                }
            }
            kasmos_core::SignalEvent::ReviewApproved => {
                self.apply_fsm_event(&sig.plan_file, FsmEvent::ReviewApproved, cmds);
            }
        }
    }

    fn apply_wave_signal(&mut self, wsig: &WaveSignalRecord) {
        self.consume_signal(kasmos_signals::wave_filename_for(wsig.wave_number, &wsig.plan_file));
        let Some(orch) = self.model.wave_orchestrators.get_mut(&wsig.plan_file) else {
            return;
        };
        if orch.current_wave_number() != wsig.wave_number {
            return;
        }
        let running: Vec<u32> = orch
            .current_wave_tasks()
            .iter()
            .filter(|t| orch.task_state(t.number) == Some(TaskState::Running))
            .map(|t| t.number)
            .collect();
        for n in running {
            orch.mark_task_complete(n);
        }
    }

    /// Delete `filename` from the main plans signal directory and, if this
    /// plan has an active wave orchestrator with a materialized worktree,
    /// from its mirrored `.signals/` directory too.
    fn consume_signal(&self, filename: String) {
        let main_dir = self.model.plans_dir.join(".signals");
        if let Err(err) = kasmos_signals::consume(&main_dir, &filename) {
            tracing::warn!(%err, file = %filename, "failed to consume signal");
        }
    }

    fn check_permission_prompts(&mut self, snapshots: &[(InstanceId, SessionSnapshot)], cmds: &mut Vec<Cmd>) {
        if self.model.overlay.is_active() {
            return;
        }
        for (id, snap) in snapshots {
            if self.model.overlay.is_active() {
                break;
            }
            let action = self
                .model
                .permission_arbiter
                .on_tick(id, snap.permission_prompt.as_ref(), &self.model.permission_cache);
            match action {
                kasmos_engine::PermissionAction::None => {}
                kasmos_engine::PermissionAction::AutoApprove { instance, pattern } => {
                    cmds.push(Cmd::SendPermissionResponse {
                        instance,
                        pattern,
                        allow: true,
                        always: true,
                    });
                }
                kasmos_engine::PermissionAction::OpenModal { instance, prompt } => {
                    cmds.push(Cmd::RecordAudit(AuditEntry {
                        at: chrono::Utc::now(),
                        kind: AuditKind::PermissionPrompted { pattern: prompt.pattern.clone() },
                        plan_file: None,
                        detail: prompt.description.clone(),
                    }));
                    self.model.open_overlay_for_instance(instance.clone(), Overlay::Permission { instance, prompt });
                }
            }
        }
    }

    fn reconcile_wave_orchestrators(&mut self, cmds: &mut Vec<Cmd>) {
        let plan_files: Vec<String> = self.model.wave_orchestrators.keys().cloned().collect();
        for plan_file in plan_files {
            let current_wave = match self.model.wave_orchestrators.get(&plan_file) {
                Some(orch) => orch.current_wave_number(),
                None => continue,
            };
            let task_outcomes: Vec<(u32, bool, bool)> = self
                .model
                .sessions
                .values()
                .filter(|i| i.plan_file.as_deref() == Some(plan_file.as_str()) && i.wave_number == current_wave)
                .map(|i| (i.task_number, i.status == InstanceStatus::Ready, i.exited))
                .collect();

            let mut needs_confirm = false;
            let mut failed_tasks = Vec::new();
            let mut is_final_wave = false;
            let mut wave_number = current_wave;
            {
                let orch = self.model.wave_orchestrators.get_mut(&plan_file).expect("checked above");
                for (task_number, is_ready, exited) in task_outcomes {
                    if orch.task_state(task_number) != Some(TaskState::Running) {
                        continue;
                    }
                    if is_ready {
                        orch.mark_task_complete(task_number);
                    } else if exited {
                        orch.mark_task_failed(task_number);
                    }
                }
                if orch.needs_confirm() {
                    needs_confirm = true;
                    wave_number = orch.current_wave_number();
                    is_final_wave = orch.state() == OrchestratorState::AllComplete;
                    failed_tasks = orch
                        .current_wave_tasks()
                        .iter()
                        .filter(|t| orch.task_state(t.number) == Some(TaskState::Failed))
                        .map(|t| t.number)
                        .collect();
                }
            }
            if !needs_confirm {
                continue;
            }
            if failed_tasks.is_empty() {
                cmds.push(Cmd::RecordAudit(AuditEntry {
                    at: chrono::Utc::now(),
                    kind: AuditKind::WaveCompleted { n: wave_number },
                    plan_file: Some(plan_file.clone()),
                    detail: String::new(),
                }));
                self.model.open_or_defer(OverlayTrigger::WaveComplete {
                    plan_file,
                    wave_number,
                    is_final_wave,
                });
            } else {
                if self.model.is_wave_failed_cooling_down(&plan_file) {
                    continue;
                }
                cmds.push(Cmd::RecordAudit(AuditEntry {
                    at: chrono::Utc::now(),
                    kind: AuditKind::WaveFailed {
                        n: wave_number,
                        failed_tasks: failed_tasks.iter().map(|n| n.to_string()).collect(),
                    },
                    plan_file: Some(plan_file.clone()),
                    detail: String::new(),
                }));
                self.model.open_or_defer(OverlayTrigger::WaveFailed {
                    plan_file,
                    wave_number,
                    failed_tasks,
                });
            }
        }
    }

    /// Coder-exit push dialog (§4.8): a non-wave, non-solo coder whose
    /// plan is `implementing` and whose pane just died. Shown once per
    /// instance, guarded by `Instance::notified`.
    fn check_coder_exits(&mut self, cmds: &mut Vec<Cmd>) {
        let plan_status = |model: &AppModel, plan_file: &str| {
            model.plan_state.as_ref().and_then(|ps| ps.entry(plan_file)).map(|e| e.status)
        };
        let candidates: Vec<(InstanceId, String)> = self
            .model
            .sessions
            .values()
            .filter(|i| {
                i.exited
                    && !i.notified
                    && i.agent_type == AgentType::Coder
                    && !i.solo_agent
                    && !i.is_wave_task()
                    && i.plan_file.as_deref().is_some_and(|pf| plan_status(&self.model, pf) == Some(kasmos_core::PlanStatus::Implementing))
            })
            .map(|i| (i.id.clone(), i.plan_file.clone().unwrap_or_default()))
            .collect();
        for (instance, plan_file) in candidates {
            let title = self
                .model
                .sessions
                .get_mut(&instance)
                .map(|inst| {
                    inst.notified = true;
                    inst.title.clone()
                })
                .unwrap_or_default();
            cmds.push(Cmd::RecordAudit(AuditEntry {
                at: chrono::Utc::now(),
                kind: AuditKind::AgentFinished { title },
                plan_file: Some(plan_file.clone()),
                detail: "coder pane exited while plan was implementing".to_string(),
            }));
            self.model.open_or_defer(OverlayTrigger::CoderExit { instance, plan_file });
        }
    }

    // -- helpers -----------------------------------------------------------

    fn apply_fsm_event(&mut self, plan_file: &str, event: FsmEvent, cmds: &mut Vec<Cmd>) {
        let Some(plan_state) = self.model.plan_state.as_mut() else {
            return;
        };
        let Some(entry) = plan_state.entry(plan_file) else {
            return;
        };
        let from = entry.status;
        match kasmos_fsm::transition(from, event) {
            Ok(to) => {
                if let Err(err) = plan_state.set_status(plan_file, to) {
                    tracing::warn!(%err, plan_file, "failed to persist plan status");
                    return;
                }
                cmds.push(Cmd::RecordAudit(AuditEntry {
                    at: chrono::Utc::now(),
                    kind: AuditKind::StatusChanged { from: from.to_string(), to: to.to_string() },
                    plan_file: Some(plan_file.to_string()),
                    detail: String::new(),
                }));
                if let Some(entry) = plan_state.entry(plan_file) {
                    cmds.push(Cmd::MirrorPlanState { file: plan_file.to_string(), entry: entry.clone() });
                }
            }
            Err(err) => {
                tracing::warn!(%err, plan_file, "ignoring invalid plan transition");
            }
        }
    }

    /// Build and register a fresh coder/reviewer [`Instance`] bound to
    /// `plan_file`, for signal-driven spawns that have no wave fan-out to
    /// go through. `feedback`, when given, is folded into the queued
    /// prompt ahead of a coder's revision pass.
    fn spawn_tracked_instance(
        &mut self,
        plan_file: &str,
        agent_type: AgentType,
        suffix: &str,
        feedback: Option<String>,
    ) -> InstanceId {
        let display = kasmos_core::display_name(plan_file);
        let mut title = format!("{display}-{suffix}");
        let mut n = 1;
        while self.model.title_in_use(&title) {
            n += 1;
            title = format!("{display}-{suffix}-{n}");
        }
        let opts = InstanceOpts {
            title,
            program: self.model.config.program.clone(),
            path: self.model.repo_root.clone(),
            agent_type,
            plan_file: Some(plan_file.to_string()),
            wave_number: 0,
            task_number: 0,
            solo_agent: false,
        };
        let mut instance = Instance::new(opts);
        if let Some(feedback) = feedback {
            instance.queued_prompt = Some(format!("Address this review feedback:\n\n{feedback}"));
        }
        let id = instance.id.clone();
        self.model.sessions.insert(id.clone(), instance);
        id
    }
}

/// Lowercase, dash-separated stem for a freshly imported task's plan
/// filename (mirrors the punctuation-collapsing rule `kasmos_core::plan`
/// applies to plan-file slugs).
fn slugify(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut prev_dash = false;
    for ch in title.chars() {
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

/// Mirrors [`kasmos_engine::Session::apply_snapshot`] for bare `Instance`
/// records — the reducer holds no adapter-bound `Session`, only the plain
/// data the metadata tick reports back.
fn apply_snapshot_to_instance(i: &mut Instance, snap: &SessionSnapshot) {
    if snap.changed {
        i.cached_content = snap.captured.clone();
        i.last_activity = Some(std::time::Instant::now());
        i.prompt_detected = true;
        i.awaiting_work = false;
    }
    i.diff_stats = snap.diff_stats;
    i.cpu_percent = snap.cpu_percent;
    i.mem_mb = snap.mem_mb;
    if !snap.pane_alive && !i.exited {
        i.exited = true;
    }
    if i.status == InstanceStatus::Loading && snap.pane_alive {
        i.status = InstanceStatus::Running;
    }
    if i.status == InstanceStatus::Running && i.wave_task_complete() {
        i.status = InstanceStatus::Ready;
    }
}

#[cfg(test)]
#[path = "reducer_tests.rs"]
mod tests;
