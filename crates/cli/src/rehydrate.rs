// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup rehydration (§4.6 "Rehydration on startup"): a prior process's
//! orphaned tmux sessions survive a restart, so every plan still
//! `implementing` is checked against the live tmux namespace and, where a
//! wave's tasks are still running, its orchestrator and `Instance` records
//! are rebuilt rather than left for the operator to restart from scratch.

use kasmos_adapters::session::list_namespace_sessions;
use kasmos_app::AppModel;
use kasmos_core::{AgentType, InstanceOpts, InstanceStatus, PlanStatus};
use kasmos_engine::{Session, SurvivingTaskState, WaveOrchestrator};
use kasmos_storage::PlanStateStore;

use crate::context::Ctx;

/// Rediscover live wave-task sessions for every `implementing` plan and
/// fold them back into `model`. Best-effort: a plan whose state or plan
/// file can't be loaded is silently skipped, since it means there is
/// nothing coherent to rehydrate.
pub async fn rehydrate(ctx: &Ctx, model: &mut AppModel) {
    let Ok(plan_state) = PlanStateStore::load(&ctx.plans_dir) else {
        return;
    };
    let live_sessions = list_namespace_sessions(&ctx.namespace_prefix).await;

    let implementing: Vec<(String, kasmos_core::PlanEntry)> = plan_state
        .all_plans()
        .filter(|(_, entry)| entry.status == PlanStatus::Implementing)
        .map(|(file, entry)| (file.clone(), entry.clone()))
        .collect();

    for (file, entry) in implementing {
        let Ok(plan) = ctx.load_plan_file(&file) else { continue };
        if !plan.has_waves() {
            continue;
        }
        let display = kasmos_core::display_name(&file);

        // Walk waves in order: a wave with zero live sessions for any of
        // its tasks is either finished or was never reached. The first
        // wave with at least one live session is the one still in flight.
        let mut completed_waves = 0u32;
        let mut current_wave_live: Vec<(u32, String)> = Vec::new();
        for wave in &plan.waves {
            let live: Vec<(u32, String)> = wave
                .tasks
                .iter()
                .filter_map(|t| {
                    let name = format!("{}{display}-W{}-T{}", ctx.namespace_prefix, wave.number, t.number);
                    live_sessions.contains(&name).then_some((t.number, name))
                })
                .collect();
            if live.is_empty() {
                completed_waves += 1;
            } else {
                current_wave_live = live;
                break;
            }
        }
        if current_wave_live.is_empty() {
            // No live pane anywhere in the plan; nothing to reattach.
            continue;
        }

        let surviving: Vec<(u32, SurvivingTaskState)> =
            current_wave_live.iter().map(|(n, _)| (*n, SurvivingTaskState::Other)).collect();
        let mut orch = WaveOrchestrator::rehydrate(file.clone(), plan.clone(), completed_waves, &surviving);
        let wave_number = orch.current_wave_number();
        let worktree_path = ctx.repo_root.join(".kasmos").join("worktrees").join(entry.branch.replace('/', "-"));
        orch.set_worktree_path(worktree_path.clone());

        for (task_number, session_name) in &current_wave_live {
            let title = format!("{display}-W{wave_number}-T{task_number}");
            if model.title_in_use(&title) {
                continue;
            }
            let opts = InstanceOpts {
                title,
                program: ctx.program.clone(),
                path: ctx.repo_root.clone(),
                agent_type: AgentType::Coder,
                plan_file: Some(file.clone()),
                wave_number,
                task_number: *task_number,
                solo_agent: false,
            };
            let mut session = Session::new(opts, ctx.adapter.clone(), ctx.worktree.clone());
            session.instance.session_id = Some(session_name.clone());
            session.instance.branch = Some(entry.branch.clone());
            session.instance.worktree_path = Some(worktree_path.clone());
            session.instance.status = InstanceStatus::Running;
            let id = session.instance.id.clone();
            model.sessions.insert(id.clone(), session.instance.clone());
            ctx.sessions.lock().await.insert(id, session);
        }

        model.wave_orchestrators.insert(file, orch);
    }
}
