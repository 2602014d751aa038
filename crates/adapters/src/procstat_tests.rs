// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn unknown_pid_returns_none() {
    let mut sampler = CpuSampler::new();
    // pid 1 exists but is unreadable without privileges in most sandboxes,
    // and a pid this large should never exist.
    assert!(sampler.sample(u32::MAX).is_none());
}

#[cfg(target_os = "linux")]
#[test]
fn self_pid_produces_a_sample() {
    let mut sampler = CpuSampler::new();
    let pid = std::process::id();
    let first = sampler.sample(pid);
    assert!(first.is_some());
    // First call has no prior ticks to diff against.
    assert_eq!(first.unwrap().cpu_percent, 0.0);
}
