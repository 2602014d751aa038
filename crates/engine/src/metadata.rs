// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The plan-state/signal half of the metadata tick (C8, spec §4.8 steps
//! 2-5). Per-session pane snapshots (step 1) are gathered by the caller
//! via [`crate::session::Session::collect_metadata`] — this module only
//! covers the parts that don't need a live session handle, so it can run
//! as one self-contained worker-task body.

use std::path::{Path, PathBuf};

use kasmos_adapters::count_namespace_sessions;
use kasmos_signals::{scan, scan_waves, SignalRecord, WaveSignalRecord};
use kasmos_storage::PlanStateStore;

use crate::error::EngineError;

/// Everything the metadata tick gathers that isn't a per-session pane
/// snapshot: plan state, deduplicated signals from the main plans dir and
/// every active worktree's mirrored `.signals/` directory, and the live
/// namespace-prefixed tmux session count.
#[derive(Debug)]
pub struct TickContext {
    pub plan_state: PlanStateStore,
    pub signals: Vec<SignalRecord>,
    pub wave_signals: Vec<WaveSignalRecord>,
    pub namespace_session_count: usize,
}

/// Run steps 2-5 of the metadata tick.
///
/// `plans_dir` holds both `plan-state.json` and the `.signals/` directory
/// a planner or coder writes sentinels into when working on the main
/// checkout; `worktree_signal_dirs` is the same `.signals/` path mirrored
/// into each active worktree, since an agent working in a worktree has no
/// other way to reach the main plans directory. Records from every
/// directory are merged and de-duplicated by `(event, plan_file)` /
/// `(wave_number, plan_file)` — two agents racing to write the same
/// sentinel must not produce two queued transitions.
pub async fn collect_tick_context(
    plans_dir: &Path,
    worktree_signal_dirs: &[PathBuf],
    namespace_prefix: &str,
) -> Result<TickContext, EngineError> {
    let plan_state = PlanStateStore::load(plans_dir)?;

    let signals_dir = plans_dir.join(".signals");
    let mut signals = scan(&signals_dir)?;
    let mut wave_signals = scan_waves(&signals_dir)?;
    for dir in worktree_signal_dirs {
        signals.extend(scan(dir)?);
        wave_signals.extend(scan_waves(dir)?);
    }
    dedup_by_key(&mut signals, |r| (r.event, r.plan_file.clone()));
    dedup_by_key(&mut wave_signals, |r| (r.wave_number, r.plan_file.clone()));

    let namespace_session_count = count_namespace_sessions(namespace_prefix).await;

    Ok(TickContext {
        plan_state,
        signals,
        wave_signals,
        namespace_session_count,
    })
}

/// Keep only the first record for each key. `SignalEvent` doesn't derive
/// `Hash`, so this is a linear scan rather than a `HashSet` — the per-tick
/// record counts are small (one sentinel per in-flight plan) so that's
/// not a concern.
fn dedup_by_key<T, K: PartialEq>(items: &mut Vec<T>, key: impl Fn(&T) -> K) {
    let mut seen: Vec<K> = Vec::new();
    items.retain(|item| {
        let k = key(item);
        if seen.contains(&k) {
            false
        } else {
            seen.push(k);
            true
        }
    });
}

#[cfg(test)]
#[path = "metadata_tests.rs"]
mod tests;
