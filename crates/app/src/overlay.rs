// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Overlay state and the out-of-scope collaborator interfaces the reducer
//! calls through (§1.1, SPEC_FULL §1): the terminal UI widgets themselves
//! are black boxes, referenced only by these traits.

use async_trait::async_trait;

use kasmos_adapters::permission::PermissionPrompt;
use kasmos_core::InstanceId;

/// At most one of these is active at a time (§4.7 overlay invariant).
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Overlay {
    #[default]
    None,
    /// "Start implementation?" — shown on a `planner-finished` signal.
    PlannerFinishedConfirm { plan_file: String },
    /// Three-way continue/retry/abort choice once a wave's tasks all
    /// resolved with at least one failure.
    WaveFailed {
        plan_file: String,
        wave_number: u32,
        failed_tasks: Vec<u32>,
    },
    /// Every task in a wave succeeded; confirm advancing to the next one
    /// (or finishing the plan, on the last wave — `is_final_wave` tells the
    /// overlay host which copy to render: "advance?" vs. "push branch and
    /// start review?").
    WaveComplete {
        plan_file: String,
        wave_number: u32,
        is_final_wave: bool,
    },
    /// A non-wave, non-solo coder's pane died while its plan was
    /// `implementing`; confirm pushing the branch and spawning a reviewer.
    CoderExitConfirm { instance: InstanceId, plan_file: String },
    /// No cached "allow always" decision for this prompt; ask the operator.
    Permission {
        instance: InstanceId,
        prompt: PermissionPrompt,
    },
}

impl Overlay {
    pub fn is_active(&self) -> bool {
        !matches!(self, Overlay::None)
    }

    /// The plan an active overlay references, if any — used by the
    /// focus-before-overlay rule to pick which instance to select.
    pub fn plan_file(&self) -> Option<&str> {
        match self {
            Overlay::None => None,
            Overlay::PlannerFinishedConfirm { plan_file }
            | Overlay::WaveFailed { plan_file, .. }
            | Overlay::WaveComplete { plan_file, .. }
            | Overlay::CoderExitConfirm { plan_file, .. } => Some(plan_file),
            Overlay::Permission { .. } => None,
        }
    }
}

/// A trigger for one of the three overlay kinds the deferred-overlay
/// queue covers (§4.7: "Applies to: planner-finished dialog, wave-complete
/// dialog, coder-exit push dialog"). The permission modal is deliberately
/// excluded — its prompt is re-evaluated fresh every tick by
/// [`kasmos_engine::PermissionArbiter`], so a tick where the overlay was
/// busy simply tries again next tick with no queue needed.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayTrigger {
    PlannerFinished { plan_file: String },
    WaveComplete {
        plan_file: String,
        wave_number: u32,
        is_final_wave: bool,
    },
    WaveFailed {
        plan_file: String,
        wave_number: u32,
        failed_tasks: Vec<u32>,
    },
    CoderExit { instance: InstanceId, plan_file: String },
}

impl OverlayTrigger {
    /// Build the overlay this trigger stands for, once it's safe to open
    /// (the drain point / the direct-open path both funnel through here).
    pub fn into_overlay(self) -> Overlay {
        match self {
            OverlayTrigger::PlannerFinished { plan_file } => {
                Overlay::PlannerFinishedConfirm { plan_file }
            }
            OverlayTrigger::WaveComplete {
                plan_file,
                wave_number,
                is_final_wave,
            } => Overlay::WaveComplete {
                plan_file,
                wave_number,
                is_final_wave,
            },
            OverlayTrigger::WaveFailed {
                plan_file,
                wave_number,
                failed_tasks,
            } => Overlay::WaveFailed {
                plan_file,
                wave_number,
                failed_tasks,
            },
            OverlayTrigger::CoderExit { instance, plan_file } => {
                Overlay::CoderExitConfirm { instance, plan_file }
            }
        }
    }

    pub fn plan_file(&self) -> &str {
        match self {
            OverlayTrigger::PlannerFinished { plan_file }
            | OverlayTrigger::WaveComplete { plan_file, .. }
            | OverlayTrigger::WaveFailed { plan_file, .. }
            | OverlayTrigger::CoderExit { plan_file, .. } => plan_file,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warning,
    Error,
}

/// The toast/notification surface (§7: subprocess and worktree failures
/// are "surfaced as a toast").
pub trait ToastSink: Send + Sync {
    fn push(&self, message: &str, level: ToastLevel);
}

/// No-op toast sink, for headless/test contexts.
#[derive(Debug, Default)]
pub struct NoopToastSink;

impl ToastSink for NoopToastSink {
    fn push(&self, _message: &str, _level: ToastLevel) {}
}

/// The overlay widget host: told what to show/hide, draws it.
pub trait OverlayHost: Send + Sync {
    fn open(&self, overlay: &Overlay);
    fn close(&self);
}

/// Renders a plan file's markdown body for the plan-detail pane.
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, markdown: &str) -> String;
}

/// Reference implementation: no syntax highlighting, markdown passed
/// through verbatim (SPEC_FULL §1: "a pass-through reference
/// implementation").
#[derive(Debug, Default)]
pub struct PassthroughMarkdownRenderer;

impl MarkdownRenderer for PassthroughMarkdownRenderer {
    fn render(&self, markdown: &str) -> String {
        markdown.to_string()
    }
}

/// One task pulled in from a third-party tracker.
#[derive(Debug, Clone)]
pub struct ImportedTask {
    pub title: String,
    pub body: String,
}

/// Third-party task-tracker import (ClickUp), run under the §5 30s
/// deadline via [`kasmos_engine::with_timeout`].
#[async_trait]
pub trait TaskImporter: Send + Sync + 'static {
    async fn import(&self) -> Result<Vec<ImportedTask>, String>;
}
