// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

#[test]
fn push_recent_repo_moves_existing_to_front() {
    let mut state = AppState::default();
    state.push_recent_repo(PathBuf::from("/repo/a"));
    state.push_recent_repo(PathBuf::from("/repo/b"));
    state.push_recent_repo(PathBuf::from("/repo/a"));

    assert_eq!(
        state.recent_repos(),
        &[PathBuf::from("/repo/a"), PathBuf::from("/repo/b")]
    );
}

#[test]
fn push_recent_repo_truncates_at_capacity() {
    let mut state = AppState::default();
    for i in 0..(RECENT_REPOS_CAPACITY + 3) {
        state.push_recent_repo(PathBuf::from(format!("/repo/{i}")));
    }
    assert_eq!(state.recent_repos().len(), RECENT_REPOS_CAPACITY);
    assert_eq!(
        state.recent_repos()[0],
        PathBuf::from(format!("/repo/{}", RECENT_REPOS_CAPACITY + 2))
    );
}

#[test]
fn help_bitmask_tracks_sections_independently() {
    let mut state = AppState::default();
    assert!(!state.has_seen_help(3));
    state.mark_help_seen(3);
    assert!(state.has_seen_help(3));
    assert!(!state.has_seen_help(4));
}

#[test]
fn save_then_load_round_trips() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app-state.json");

    let mut state = AppState::default();
    state.push_recent_repo(PathBuf::from("/repo/a"));
    state.mark_help_seen(1);
    state.save(&path).unwrap();

    let reloaded = AppState::load(&path).unwrap();
    assert_eq!(reloaded, state);
}
