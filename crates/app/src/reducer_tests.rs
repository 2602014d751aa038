use std::sync::Arc;

use kasmos_core::{AgentType, Instance, InstanceOpts, PlanStatus, SignalEvent, SignalRecord};
use kasmos_engine::TickContext;
use kasmos_storage::{NoopAuditSink, PermissionCache, PlanStateStore};

use super::*;
use crate::message::MetadataTickResult;

fn new_model(dir: &std::path::Path) -> AppModel {
    let permission_cache = PermissionCache::load(dir).expect("load permission cache");
    AppModel::new(
        Config::default(),
        dir.to_path_buf(),
        dir.to_path_buf(),
        permission_cache,
        kasmos_storage::AppState::default(),
        Arc::new(NoopAuditSink),
    )
}

fn new_instance(model: &mut AppModel, plan_file: &str, agent_type: AgentType) -> kasmos_core::InstanceId {
    let instance = Instance::new(InstanceOpts {
        title: format!("{plan_file}-{agent_type}"),
        program: "claude".to_string(),
        path: model.repo_root.clone(),
        agent_type,
        plan_file: Some(plan_file.to_string()),
        wave_number: 0,
        task_number: 0,
        solo_agent: false,
    });
    let id = instance.id.clone();
    model.sessions.insert(id.clone(), instance);
    id
}

fn empty_tick_context(plan_state: PlanStateStore) -> TickContext {
    TickContext {
        plan_state,
        signals: Vec::new(),
        wave_signals: Vec::new(),
        namespace_session_count: 0,
    }
}

#[test]
fn deferred_overlay_invariant_queues_second_trigger() {
    let dir = tempfile::tempdir().unwrap();
    let mut model = new_model(dir.path());
    model.open_or_defer(OverlayTrigger::PlannerFinished { plan_file: "a.md".to_string() });
    assert!(model.overlay.is_active());

    model.open_or_defer(OverlayTrigger::PlannerFinished { plan_file: "b.md".to_string() });
    assert_eq!(model.overlay.plan_file(), Some("a.md"));
    assert_eq!(model.deferred_triggers().count(), 1);

    model.close_overlay();
    model.drain_one_deferred();
    assert_eq!(model.overlay.plan_file(), Some("b.md"));
    assert_eq!(model.deferred_triggers().count(), 0);
}

#[test]
fn focus_before_overlay_selects_instance_bound_to_plan() {
    let dir = tempfile::tempdir().unwrap();
    let mut model = new_model(dir.path());
    let id = new_instance(&mut model, "plan.md", AgentType::Coder);

    model.open_or_defer(OverlayTrigger::CoderExit { instance: id.clone(), plan_file: "plan.md".to_string() });
    assert_eq!(model.selected, Some(id));
}

#[test]
fn resize_to_same_size_is_a_synthetic_redraw() {
    let dir = tempfile::tempdir().unwrap();
    let mut reducer = Reducer::new(new_model(dir.path()));

    let cmds = reducer.update(Message::Resize { cols: 80, rows: 24 });
    assert!(!cmds.is_empty());

    let cmds = reducer.update(Message::Resize { cols: 80, rows: 24 });
    assert!(cmds.is_empty(), "identical size must not re-trigger a resize");

    let cmds = reducer.update(Message::Resize { cols: 100, rows: 24 });
    assert!(!cmds.is_empty(), "an actual size change must trigger a resize");
}

#[test]
fn wave_failed_dialog_cools_down_after_escape() {
    let dir = tempfile::tempdir().unwrap();
    let mut model = new_model(dir.path());
    model.open_or_defer(OverlayTrigger::WaveFailed {
        plan_file: "plan.md".to_string(),
        wave_number: 1,
        failed_tasks: vec![2],
    });
    model.start_wave_failed_cooldown("plan.md");
    model.close_overlay();

    assert!(model.is_wave_failed_cooling_down("plan.md"));
}

#[test]
fn planner_finished_signal_advances_fsm_and_opens_confirm_dialog() {
    let dir = tempfile::tempdir().unwrap();
    let mut plan_state = PlanStateStore::load(dir.path()).unwrap();
    plan_state
        .register("plan.md", "a plan", "plan/plan", "", chrono::Utc::now())
        .unwrap();
    plan_state.set_status("plan.md", PlanStatus::Planning).unwrap();

    let mut reducer = Reducer::new(new_model(dir.path()));
    let result = MetadataTickResult {
        snapshots: Vec::new(),
        context: TickContext {
            signals: vec![SignalRecord {
                event: SignalEvent::PlannerFinished,
                plan_file: "plan.md".to_string(),
                body: String::new(),
            }],
            ..empty_tick_context(plan_state)
        },
    };

    reducer.update(Message::MetadataTick(result));

    assert_eq!(
        reducer.model().plan_state.as_ref().unwrap().entry("plan.md").unwrap().status,
        PlanStatus::Ready
    );
    assert!(matches!(reducer.model().overlay, Overlay::PlannerFinishedConfirm { .. }));
}

#[test]
fn overlay_busy_during_tick_defers_new_trigger() {
    let dir = tempfile::tempdir().unwrap();
    let mut plan_state = PlanStateStore::load(dir.path()).unwrap();
    plan_state
        .register("plan.md", "a plan", "plan/plan", "", chrono::Utc::now())
        .unwrap();
    plan_state.set_status("plan.md", PlanStatus::Planning).unwrap();

    let mut reducer = Reducer::new(new_model(dir.path()));
    reducer
        .model_mut()
        .open_or_defer(OverlayTrigger::PlannerFinished { plan_file: "busy.md".to_string() });

    let result = MetadataTickResult {
        snapshots: Vec::new(),
        context: TickContext {
            signals: vec![SignalRecord {
                event: SignalEvent::PlannerFinished,
                plan_file: "plan.md".to_string(),
                body: String::new(),
            }],
            ..empty_tick_context(plan_state)
        },
    };
    reducer.update(Message::MetadataTick(result));

    assert_eq!(reducer.model().overlay.plan_file(), Some("busy.md"));
    assert_eq!(reducer.model().deferred_triggers().count(), 1);
}
