// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

fn write_signal(dir: &Path, filename: &str, body: &str) {
    std::fs::write(dir.join(filename), body).unwrap();
}

#[test]
fn scan_finds_plain_signals_and_reads_body() {
    let dir = tempdir().unwrap();
    write_signal(dir.path(), "review-changes-requested-2026-07-20-my-plan.md", "needs more tests");

    let records = scan(dir.path()).unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].event, SignalEvent::ReviewChangesRequested);
    assert_eq!(records[0].plan_file, "2026-07-20-my-plan.md");
    assert_eq!(records[0].body, "needs more tests");
}

#[test]
fn scan_ignores_wave_signals() {
    let dir = tempdir().unwrap();
    write_signal(dir.path(), "implement-wave-2-2026-07-20-my-plan.md", "");
    write_signal(dir.path(), "planner-finished-2026-07-20-my-plan.md", "");

    let records = scan(dir.path()).unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].event, SignalEvent::PlannerFinished);
}

#[test]
fn scan_waves_parses_wave_number() {
    let dir = tempdir().unwrap();
    write_signal(dir.path(), "implement-wave-3-2026-07-20-my-plan.md", "wave 3 done");

    let records = scan_waves(dir.path()).unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].wave_number, 3);
    assert_eq!(records[0].plan_file, "2026-07-20-my-plan.md");
    assert_eq!(records[0].body, "wave 3 done");
}

#[test]
fn scan_skips_unrecognized_filenames() {
    let dir = tempdir().unwrap();
    write_signal(dir.path(), "not-a-signal-event-2026-07-20-my-plan.md", "");

    let records = scan(dir.path()).unwrap();

    assert!(records.is_empty());
}

#[test]
fn scan_on_missing_directory_returns_empty() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");

    let records = scan(&missing).unwrap();

    assert!(records.is_empty());
}

#[test]
fn consume_deletes_file() {
    let dir = tempdir().unwrap();
    let filename = "review-approved-2026-07-20-my-plan.md";
    write_signal(dir.path(), filename, "");

    consume(dir.path(), filename).unwrap();

    assert!(!dir.path().join(filename).exists());
}

#[test]
fn consume_is_idempotent_on_missing_file() {
    let dir = tempdir().unwrap();

    consume(dir.path(), "planner-finished-2026-07-20-my-plan.md").unwrap();
    consume(dir.path(), "planner-finished-2026-07-20-my-plan.md").unwrap();
}

#[test]
fn consumed_signal_never_reappears_in_a_later_scan() {
    let dir = tempdir().unwrap();
    let filename = "implement-finished-2026-07-20-my-plan.md";
    write_signal(dir.path(), filename, "");

    let first = scan(dir.path()).unwrap();
    assert_eq!(first.len(), 1);
    consume(dir.path(), filename).unwrap();

    let second = scan(dir.path()).unwrap();
    assert!(second.is_empty());
}

#[yare::parameterized(
    planner_finished = { SignalEvent::PlannerFinished, "2026-07-20-my-plan.md", "planner-finished-2026-07-20-my-plan.md" },
    implement_finished = { SignalEvent::ImplementFinished, "2026-07-20-my-plan.md", "implement-finished-2026-07-20-my-plan.md" },
    review_approved = { SignalEvent::ReviewApproved, "2026-07-20-my-plan.md", "review-approved-2026-07-20-my-plan.md" },
)]
fn filename_for_round_trips_through_scan(event: SignalEvent, plan_file: &str, expected_filename: &str) {
    assert_eq!(filename_for(event, plan_file), expected_filename);

    let dir = tempdir().unwrap();
    write_signal(dir.path(), expected_filename, "feedback");
    let records = scan(dir.path()).unwrap();
    assert_eq!(records[0].event, event);
    assert_eq!(records[0].plan_file, plan_file);
}

#[test]
fn wave_filename_for_round_trips_through_scan_waves() {
    let plan_file = "2026-07-20-my-plan.md";
    let filename = wave_filename_for(4, plan_file);
    assert_eq!(filename, "implement-wave-4-2026-07-20-my-plan.md");

    let dir = tempdir().unwrap();
    write_signal(dir.path(), &filename, "");
    let records = scan_waves(dir.path()).unwrap();
    assert_eq!(records[0].wave_number, 4);
    assert_eq!(records[0].plan_file, plan_file);
}
