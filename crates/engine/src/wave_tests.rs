// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use kasmos_core::parse_plan_file;

const TWO_WAVE_PLAN: &str = "\
# Fix login flow

**Goal:** make login reliable under load

## Wave 1

### Task 1: Add retry to the token refresh

Retry token refresh up to 3 times with backoff.

### Task 2: Add a regression test

Write a regression test for the flaky login case.

## Wave 2

### Task 1: Wire retry into the UI

Surface retry state in the login screen.
";

const ONE_TASK_PLAN: &str = "\
# Fix one thing

**Goal:** ship a narrow fix

## Wave 1

### Task 1: Do the fix

Do the one fix.
";

fn parse(markdown: &str) -> kasmos_core::PlanFile {
    parse_plan_file(markdown).unwrap()
}

#[test]
fn not_started_before_first_wave() {
    let orch = WaveOrchestrator::new("p.md", parse(TWO_WAVE_PLAN));
    assert_eq!(orch.state(), OrchestratorState::NotStarted);
    assert_eq!(orch.total_waves(), 2);
    assert_eq!(orch.total_tasks(), 3);
}

#[test]
fn start_next_wave_marks_tasks_running() {
    let mut orch = WaveOrchestrator::new("p.md", parse(TWO_WAVE_PLAN));
    let tasks = orch.start_next_wave();
    assert_eq!(tasks.len(), 2);
    assert_eq!(orch.current_wave_number(), 1);
    assert_eq!(orch.state(), OrchestratorState::Running);
    for t in orch.current_wave_tasks() {
        assert_eq!(orch.task_state(t.number), Some(TaskState::Running));
    }
}

#[test]
fn wave_complete_when_every_task_resolved_no_pending() {
    let mut orch = WaveOrchestrator::new("p.md", parse(TWO_WAVE_PLAN));
    orch.start_next_wave();
    orch.mark_task_complete(1);
    assert_eq!(orch.state(), OrchestratorState::Running);
    orch.mark_task_complete(2);
    assert_eq!(orch.state(), OrchestratorState::WaveComplete);
    assert_eq!(orch.completed_task_count(), 2);
    assert_eq!(orch.failed_task_count(), 0);
}

#[test]
fn all_complete_after_last_wave() {
    let mut orch = WaveOrchestrator::new("p.md", parse(TWO_WAVE_PLAN));
    orch.start_next_wave();
    orch.mark_task_complete(1);
    orch.mark_task_complete(2);
    assert!(orch.needs_confirm());
    orch.start_next_wave();
    orch.mark_task_complete(1);
    assert_eq!(orch.state(), OrchestratorState::AllComplete);
    assert!(orch.start_next_wave().is_empty());
}

#[test]
fn needs_confirm_fires_exactly_once_per_completion() {
    let mut orch = WaveOrchestrator::new("p.md", parse(ONE_TASK_PLAN));
    orch.start_next_wave();
    orch.mark_task_complete(1);
    assert!(orch.needs_confirm());
    assert!(!orch.needs_confirm());
}

#[test]
fn reset_confirm_rearms_the_latch() {
    let mut orch = WaveOrchestrator::new("p.md", parse(ONE_TASK_PLAN));
    orch.start_next_wave();
    orch.mark_task_complete(1);
    assert!(orch.needs_confirm());
    orch.reset_confirm();
    assert!(orch.needs_confirm());
}

#[test]
fn failed_task_counts_toward_wave_complete() {
    let mut orch = WaveOrchestrator::new("p.md", parse(TWO_WAVE_PLAN));
    orch.start_next_wave();
    orch.mark_task_complete(1);
    orch.mark_task_failed(2);
    assert_eq!(orch.state(), OrchestratorState::WaveComplete);
    assert_eq!(orch.failed_task_count(), 1);
}

#[test]
fn retry_failed_tasks_rearms_as_running_and_returns_them() {
    let mut orch = WaveOrchestrator::new("p.md", parse(TWO_WAVE_PLAN));
    orch.start_next_wave();
    orch.mark_task_complete(1);
    orch.mark_task_failed(2);
    let retried = orch.retry_failed_tasks();
    assert_eq!(retried.len(), 1);
    assert_eq!(retried[0].number, 2);
    assert_eq!(orch.task_state(2), Some(TaskState::Running));
    assert_eq!(orch.state(), OrchestratorState::Running);
}

#[test]
fn rehydrate_fast_forwards_completed_waves_and_adopts_current() {
    let plan = parse(TWO_WAVE_PLAN);
    let orch = WaveOrchestrator::rehydrate(
        "p.md",
        plan,
        1,
        &[(1, SurvivingTaskState::Other)],
    );
    assert_eq!(orch.current_wave_number(), 2);
    assert_eq!(orch.task_state(1), Some(TaskState::Running));
}

#[test]
fn rehydrate_treats_paused_survivor_as_complete_and_missing_as_failed() {
    let plan = parse(TWO_WAVE_PLAN);
    let orch = WaveOrchestrator::rehydrate(
        "p.md",
        plan,
        0,
        &[(1, SurvivingTaskState::Paused)],
    );
    assert_eq!(orch.current_wave_number(), 1);
    assert_eq!(orch.task_state(1), Some(TaskState::Complete));
    assert_eq!(orch.task_state(2), Some(TaskState::Failed));
}

#[test]
fn build_task_prompt_includes_parallel_clause_only_with_siblings() {
    let plan = parse(TWO_WAVE_PLAN);
    let wave = plan.wave(1).unwrap();
    let task = &wave.tasks[0];
    let prompt = build_task_prompt(&plan, wave, task);
    assert!(prompt.contains("Parallel execution"));
    assert!(prompt.contains("Task 2"));

    let one_task_plan = parse(ONE_TASK_PLAN);
    let wave = one_task_plan.wave(1).unwrap();
    let task = &wave.tasks[0];
    let prompt = build_task_prompt(&one_task_plan, wave, task);
    assert!(!prompt.contains("Parallel execution"));
}

#[tokio::test]
async fn spawn_wave_tasks_materializes_worktree_and_spawns_one_session_per_task() {
    use crate::worktree::FakeWorktreeManager;
    use kasmos_adapters::FakeSessionAdapter;
    use std::path::Path;

    let plan = parse(TWO_WAVE_PLAN);
    let mut orch = WaveOrchestrator::new("p.md", plan.clone());
    orch.start_next_wave();

    let sessions = spawn_wave_tasks(
        &mut orch,
        &plan,
        "fix-login",
        Path::new("/repo"),
        "plan/fix-login",
        "claude",
        FakeSessionAdapter::new(),
        FakeWorktreeManager::new(),
        &[],
    )
    .await
    .unwrap();

    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].instance.title, "fix-login-W1-T1");
    assert_eq!(sessions[1].instance.title, "fix-login-W1-T2");
    assert!(sessions[0].instance.queued_prompt.is_some());
    assert!(orch.worktree_path().is_some());
}
