// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent role and instance status types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What role an instance plays in a plan's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    Planner,
    Coder,
    Reviewer,
    /// Ad-hoc agent not bound to a plan's lifecycle flows (see `solo_agent`
    /// on [`crate::instance::Instance`]).
    Custodian,
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AgentType::Planner => "planner",
            AgentType::Coder => "coder",
            AgentType::Reviewer => "reviewer",
            AgentType::Custodian => "custodian",
        };
        write!(f, "{}", s)
    }
}

/// Lifecycle status of an instance's pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    /// Pane spawn in flight; no output observed yet.
    Loading,
    /// Pane alive, agent process running.
    Running,
    /// Agent finished its turn and is idle, waiting for the next prompt.
    Ready,
    /// Pane killed, worktree and metadata retained for resume.
    Paused,
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InstanceStatus::Loading => "loading",
            InstanceStatus::Running => "running",
            InstanceStatus::Ready => "ready",
            InstanceStatus::Paused => "paused",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
