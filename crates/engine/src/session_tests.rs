// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use kasmos_adapters::FakeSessionAdapter;
use kasmos_core::AgentType;
use std::path::PathBuf;

use crate::worktree::FakeWorktreeManager;

fn opts(title: &str) -> InstanceOpts {
    InstanceOpts {
        title: title.to_string(),
        program: "claude".to_string(),
        path: PathBuf::from("/repo"),
        agent_type: AgentType::Coder,
        plan_file: Some("2026-01-01-demo.md".to_string()),
        wave_number: 1,
        task_number: 1,
        solo_agent: false,
    }
}

fn session(title: &str) -> Session<FakeSessionAdapter, FakeWorktreeManager> {
    Session::new(opts(title), FakeSessionAdapter::new(), FakeWorktreeManager::new())
}

#[tokio::test]
async fn start_on_branch_materializes_and_spawns() {
    let mut s = session("alpha");
    s.start_on_branch(Path::new("/repo"), "plan/demo", Path::new("/repo/.worktrees/demo"), &[])
        .await
        .unwrap();
    assert_eq!(s.instance.branch.as_deref(), Some("plan/demo"));
    assert_eq!(s.instance.worktree_path.as_deref(), Some(Path::new("/repo/.worktrees/demo")));
    assert!(s.instance.session_id.is_some());
    assert_eq!(s.instance.status, InstanceStatus::Loading);
}

#[tokio::test]
async fn pause_kills_pane_and_keeps_worktree() {
    let mut s = session("alpha");
    s.start_on_branch(Path::new("/repo"), "plan/demo", Path::new("/repo/.worktrees/demo"), &[])
        .await
        .unwrap();
    s.pause().await.unwrap();
    assert_eq!(s.instance.status, InstanceStatus::Paused);
    assert!(s.instance.session_id.is_none());
    assert!(s.instance.worktree_path.is_some());
}

#[tokio::test]
async fn resume_respawns_in_same_worktree() {
    let mut s = session("alpha");
    s.start_on_branch(Path::new("/repo"), "plan/demo", Path::new("/repo/.worktrees/demo"), &[])
        .await
        .unwrap();
    s.pause().await.unwrap();
    s.resume(&[]).await.unwrap();
    assert!(s.instance.session_id.is_some());
    assert_eq!(s.instance.status, InstanceStatus::Loading);
    assert!(!s.instance.exited);
}

#[tokio::test]
async fn kill_with_shared_false_removes_worktree_dir() {
    let mut s = session("alpha");
    let wt = PathBuf::from("/repo/.worktrees/demo");
    s.start_on_branch(Path::new("/repo"), "plan/demo", &wt, &[]).await.unwrap();
    s.kill(Path::new("/repo"), false).await.unwrap();
    assert_eq!(s.instance.status, InstanceStatus::Paused);
    assert!(s.instance.worktree_path.is_none());
}

#[tokio::test]
async fn kill_with_shared_true_keeps_worktree_path() {
    let mut s = session("alpha");
    let wt = PathBuf::from("/repo/.worktrees/demo");
    s.start_on_branch(Path::new("/repo"), "plan/demo", &wt, &[]).await.unwrap();
    s.kill(Path::new("/repo"), true).await.unwrap();
    assert_eq!(s.instance.status, InstanceStatus::Paused);
    assert!(s.instance.worktree_path.is_some());
}

#[tokio::test]
async fn collect_metadata_reports_dead_pane_when_never_spawned() {
    let mut s = session("alpha");
    let snap = s.collect_metadata("main").await;
    assert!(!snap.pane_alive);
}

#[tokio::test]
async fn apply_snapshot_sets_exited_once_on_pane_death() {
    let mut s = session("alpha");
    s.start_on_main(&[]).await.unwrap();
    let mut snap = SessionSnapshot {
        pane_alive: true,
        ..Default::default()
    };
    s.apply_snapshot(&snap);
    assert_eq!(s.instance.status, InstanceStatus::Running);
    assert!(!s.instance.exited);

    snap.pane_alive = false;
    s.apply_snapshot(&snap);
    assert!(s.instance.exited);
}

#[tokio::test]
async fn apply_snapshot_marks_ready_when_task_complete() {
    let mut s = session("alpha");
    s.start_on_main(&[]).await.unwrap();
    s.apply_snapshot(&SessionSnapshot {
        pane_alive: true,
        changed: true,
        captured: "done".to_string(),
        ..Default::default()
    });
    assert_eq!(s.instance.status, InstanceStatus::Ready);
    assert!(s.instance.wave_task_complete());
}

#[tokio::test]
async fn mark_prompt_queued_resets_completion_heuristic() {
    let mut s = session("alpha");
    s.instance.prompt_detected = true;
    s.mark_prompt_queued();
    assert!(!s.instance.prompt_detected);
    assert!(s.instance.awaiting_work);
    assert!(!s.instance.wave_task_complete());
}

#[tokio::test]
async fn send_prompt_without_session_id_errors() {
    let s = session("alpha");
    let err = s.send_prompt("hello").await.unwrap_err();
    assert!(matches!(err, EngineError::InstanceNotFound(_)));
}
