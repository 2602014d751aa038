// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The plan FSM: the sole writer of [`PlanStatus`].
//!
//! `transition` is a pure function over the matrix in the spec. It never
//! spawns or kills sessions — those are side effects the event loop
//! schedules after a successful transition.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use kasmos_core::PlanStatus;
use thiserror::Error;

/// Events that drive plan status transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsmEvent {
    PlanStart,
    PlannerFinished,
    ImplementStart,
    ImplementFinished,
    ReviewChangesRequested,
    ReviewApproved,
    Cancel,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot apply {event:?} to a plan in status {from}")]
pub struct InvalidTransition {
    pub from: PlanStatus,
    pub event: FsmEvent,
}

/// Apply `event` to a plan currently in `from`, returning the new status or
/// `InvalidTransition` if the matrix has no entry for this pair. `from` is
/// never mutated on rejection — callers own persistence, this function is
/// pure.
pub fn transition(from: PlanStatus, event: FsmEvent) -> Result<PlanStatus, InvalidTransition> {
    use FsmEvent::*;
    use PlanStatus::*;

    let to = match (event, from) {
        (PlanStart, Unknown) | (PlanStart, Cancelled) => Planning,
        (PlannerFinished, Planning) => Ready,
        (ImplementStart, Ready) | (ImplementStart, Reviewing) => Implementing,
        (ImplementFinished, Implementing) => Reviewing,
        (ReviewChangesRequested, Reviewing) => Implementing,
        (ReviewApproved, Reviewing) => Done,
        (Cancel, status) if !status.is_terminal() => Cancelled,
        _ => {
            tracing::warn!(?event, %from, "rejected invalid plan transition");
            return Err(InvalidTransition { from, event });
        }
    };

    Ok(to)
}

/// Applies transitions against a plan's current status, keeping it in sync
/// with the engine's store. `PlanFsm` holds no store reference itself — it
/// is the engine's job to persist `status` after [`PlanFsm::apply`] returns
/// `Ok`; on `Err` the caller discards the event and leaves the store alone.
#[derive(Debug, Clone, Copy)]
pub struct PlanFsm {
    status: PlanStatus,
}

impl PlanFsm {
    pub fn new(status: PlanStatus) -> Self {
        Self { status }
    }

    pub fn status(&self) -> PlanStatus {
        self.status
    }

    /// Attempt `event`. On success, `self.status()` reflects the new status
    /// and the caller should persist it. On failure, `self` is unchanged.
    pub fn apply(&mut self, event: FsmEvent) -> Result<PlanStatus, InvalidTransition> {
        let to = transition(self.status, event)?;
        self.status = to;
        Ok(to)
    }
}
