// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{branch_name, display_name, plans_in_flight};
use crate::PlanStatus;

#[yare::parameterized(
    simple       = { "2026-07-28-fix-login.md", "fix-login" },
    multi_word   = { "2026-07-28-Fix The Login Bug.md", "fix-the-login-bug" },
    punctuation  = { "2026-07-28-wip!!tasks.md", "wip-tasks" },
    no_date      = { "no-date-prefix.md", "no-date-prefix" },
)]
fn branch_name_slugifies(plan_file: &str, expected_slug: &str) {
    assert_eq!(branch_name(plan_file), format!("plan/{}", expected_slug));
}

#[yare::parameterized(
    strips_date    = { "2026-07-28-fix-login.md", "fix-login" },
    keeps_non_date = { "readme.md", "readme" },
)]
fn display_name_strips_date_prefix(plan_file: &str, expected: &str) {
    assert_eq!(display_name(plan_file), expected);
}

#[yare::parameterized(
    implementing = { PlanStatus::Implementing, true },
    reviewing = { PlanStatus::Reviewing, true },
    planning = { PlanStatus::Planning, false },
    ready = { PlanStatus::Ready, false },
    done = { PlanStatus::Done, false },
    cancelled = { PlanStatus::Cancelled, false },
    unknown = { PlanStatus::Unknown, false },
)]
fn plans_in_flight_matches_topic_gate(status: PlanStatus, expected: bool) {
    assert_eq!(plans_in_flight(status), expected);
}
