// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{parse, ParseError};

const TWO_WAVE_PLAN: &str = "\
# Fix Login

**Goal:** Users can log in again.

## Wave 1

### Task 1: Patch the session cookie bug

Investigate the expired-cookie path in `auth.rs` and fix it.

### Task 2: Add regression test

Add a test that reproduces the original bug.

## Wave 2

### Task 1: Update docs

Document the fix in CHANGELOG.md.
";

#[test]
fn parses_title_and_goal() {
    let plan = parse(TWO_WAVE_PLAN).unwrap();
    assert_eq!(plan.title, "Fix Login");
    assert_eq!(plan.goal, "Users can log in again.");
}

#[test]
fn parses_waves_in_order() {
    let plan = parse(TWO_WAVE_PLAN).unwrap();
    assert_eq!(plan.waves.len(), 2);
    assert_eq!(plan.waves[0].number, 1);
    assert_eq!(plan.waves[1].number, 2);
}

#[test]
fn parses_task_titles_and_bodies() {
    let plan = parse(TWO_WAVE_PLAN).unwrap();
    let wave1 = plan.wave(1).unwrap();
    assert_eq!(wave1.tasks.len(), 2);
    assert_eq!(wave1.tasks[0].title, "Patch the session cookie bug");
    assert!(wave1.tasks[0].body.contains("expired-cookie path"));
    assert_eq!(wave1.tasks[1].title, "Add regression test");
}

#[test]
fn total_tasks_sums_across_waves() {
    let plan = parse(TWO_WAVE_PLAN).unwrap();
    assert_eq!(plan.total_tasks(), 3);
}

#[test]
fn plan_without_waves_has_waves_false() {
    let plan = parse("# No Waves Yet\n\n**Goal:** placeholder.\n").unwrap();
    assert!(!plan.has_waves());
}

#[test]
fn missing_title_is_an_error() {
    let err = parse("no heading here\n").unwrap_err();
    assert_eq!(err, ParseError::MissingTitle);
}

#[test]
fn unparseable_wave_number_is_an_error() {
    let err = parse("# T\n## Wave nope\n").unwrap_err();
    assert_eq!(err, ParseError::InvalidWaveNumber("nope".to_string()));
}

#[test]
fn task_without_title_suffix_is_an_error() {
    let err = parse("# T\n## Wave 1\n### Task 1 no colon\n").unwrap_err();
    assert!(matches!(err, ParseError::MissingTaskTitle(_)));
}
