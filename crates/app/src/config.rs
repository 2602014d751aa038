// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime configuration the reducer consults (§5 concurrency bounds, §4.6
//! auto-advance). Loaded by `kasmos-cli` from defaults, then
//! `~/.config/kasmos/config.toml`, then CLI flags (SPEC_FULL §1.1
//! AMBIENT) and handed to [`crate::Reducer::new`] as a plain value.

/// Default cap on concurrently started sessions (§5: "`GlobalInstanceLimit`
/// (≈ 10–20)").
pub const DEFAULT_GLOBAL_INSTANCE_LIMIT: usize = 16;

/// Multiplexer session namespace prefix, used both for `Instance::
/// multiplexer_name` and for the metadata tick's orphan-session count
/// (§6: "Multiplexer session names. Prefixed `kas_<title>`").
pub const NAMESPACE_PREFIX: &str = "kas_";

#[derive(Debug, Clone)]
pub struct Config {
    /// The default agent CLI command line (`--program`, §6).
    pub program: String,
    /// Globally pre-accept permission prompts (`--auto-yes`, §6).
    pub auto_yes: bool,
    /// Skip the y/n wave-complete dialog when the wave had zero failures
    /// (§4.6).
    pub auto_advance: bool,
    /// Upper bound on concurrently started sessions (§5).
    pub global_instance_limit: usize,
    /// Branch diff stats and pushes are computed against this branch.
    pub base_branch: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            program: "claude".to_string(),
            auto_yes: false,
            auto_advance: false,
            global_instance_limit: DEFAULT_GLOBAL_INSTANCE_LIMIT,
            base_branch: "main".to_string(),
        }
    }
}
