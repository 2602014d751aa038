// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors for the engine runtime

use kasmos_adapters::SessionError;
use kasmos_storage::PlanStateError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    PlanState(#[from] PlanStateError),
    #[error(transparent)]
    Signal(#[from] kasmos_signals::SignalError),
    #[error("worktree error: {0}")]
    Worktree(String),
    #[error("instance not found: {0}")]
    InstanceNotFound(String),
    #[error("plan file error: {0}")]
    PlanFile(#[from] kasmos_core::PlanFileParseError),
}
