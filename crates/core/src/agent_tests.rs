// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{AgentType, InstanceStatus};

#[yare::parameterized(
    planner = { AgentType::Planner, "planner" },
    coder = { AgentType::Coder, "coder" },
    reviewer = { AgentType::Reviewer, "reviewer" },
    custodian = { AgentType::Custodian, "custodian" },
)]
fn agent_type_display(kind: AgentType, expected: &str) {
    assert_eq!(kind.to_string(), expected);
}

#[yare::parameterized(
    loading = { InstanceStatus::Loading, "loading" },
    running = { InstanceStatus::Running, "running" },
    ready = { InstanceStatus::Ready, "ready" },
    paused = { InstanceStatus::Paused, "paused" },
)]
fn instance_status_display(status: InstanceStatus, expected: &str) {
    assert_eq!(status.to_string(), expected);
}
