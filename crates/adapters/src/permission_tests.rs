// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn detects_allow_prompt_with_yes_no_option() {
    let tail = "some earlier output\nAllow running: rm -rf build/?\n[y]es / [n]o\n";
    let prompt = detect_permission_prompt(tail).expect("should detect prompt");
    assert_eq!(prompt.pattern, "rm -rf build/");
}

#[test]
fn detects_permission_requested_phrasing() {
    let tail = "Permission requested: write to /etc/hosts\n[y] yes  [n] no\n";
    let prompt = detect_permission_prompt(tail).expect("should detect prompt");
    assert!(prompt.description.contains("/etc/hosts"));
}

#[test]
fn plain_output_is_not_a_prompt() {
    let tail = "Compiling kasmos-core v0.1.0\nFinished dev profile\n";
    assert!(detect_permission_prompt(tail).is_none());
}

#[test]
fn normalizes_pattern_for_cache_key_stability() {
    let tail_a = "Allow:   rm   -rf   build/?\n[y]es/[n]o\n";
    let tail_b = "Allow: rm -rf build/?\n[y]es/[n]o\n";
    let a = detect_permission_prompt(tail_a).unwrap();
    let b = detect_permission_prompt(tail_b).unwrap();
    assert_eq!(a.pattern, b.pattern);
}
