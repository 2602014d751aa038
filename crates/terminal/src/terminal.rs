// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;
use thiserror::Error;

use kasmos_adapters::{SessionAdapter, SessionError};

use crate::pane_reader::{PaneReader, PaneReaderError};

/// How often `wait_for_render` re-polls the pane while waiting for new
/// output or the deadline, whichever comes first.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum TerminalError {
    #[error(transparent)]
    PaneReader(#[from] PaneReaderError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// A VT emulator bound to one multiplexer pane. Owns a `vt100::Parser`
/// fed by periodic escape-sequence-preserving captures of that pane.
///
/// Exactly one `EmbeddedTerminal` is attached in the engine's model at a
/// time (§4.5's stale-attach invariant): on selection change the old one
/// is dropped and a new one is spawned asynchronously, with the result
/// discarded if the selection moved again before the spawn completed.
pub struct EmbeddedTerminal<S, R> {
    pane_id: String,
    session: S,
    reader: R,
    parser: vt100::Parser,
    last_raw: Vec<u8>,
    dirty: bool,
    closed: bool,
}

impl<S, R> EmbeddedTerminal<S, R>
where
    S: SessionAdapter,
    R: PaneReader,
{
    pub fn new(pane_id: impl Into<String>, cols: u16, rows: u16, session: S, reader: R) -> Self {
        Self {
            pane_id: pane_id.into(),
            session,
            reader,
            parser: vt100::Parser::new(rows, cols, 0),
            last_raw: Vec::new(),
            dirty: false,
            closed: false,
        }
    }

    /// The current parsed grid, and whether it changed since the last
    /// call to `render` (i.e. since the last successful `wait_for_render`
    /// that observed new bytes).
    pub fn render(&mut self) -> (&vt100::Screen, bool) {
        let changed = self.dirty;
        self.dirty = false;
        (self.parser.screen(), changed)
    }

    /// Block until new pane output arrives or `timeout` elapses,
    /// whichever comes first. Returns `Ok(true)` if new bytes were fed
    /// into the parser, `Ok(false)` on a timeout with no change.
    pub async fn wait_for_render(&mut self, timeout: Duration) -> Result<bool, TerminalError> {
        if self.closed {
            return Ok(false);
        }
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let raw = self.reader.capture_raw(&self.pane_id).await?;
            if raw != self.last_raw {
                self.parser.process(&raw);
                self.last_raw = raw;
                self.dirty = true;
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL.min(deadline - tokio::time::Instant::now())).await;
        }
    }

    /// Resize both the underlying pane and the local parser so the next
    /// capture lands on a grid of the right shape.
    pub async fn resize(&mut self, cols: u16, rows: u16) -> Result<(), TerminalError> {
        self.session.resize(&self.pane_id, cols, rows).await?;
        self.parser.set_size(rows, cols);
        Ok(())
    }

    /// Forward a key press to the pane as literal bytes.
    pub async fn send_key(&self, bytes: &[u8]) -> Result<(), TerminalError> {
        let text = String::from_utf8_lossy(bytes);
        self.session.send_literal(&self.pane_id, &text).await?;
        Ok(())
    }

    /// Detach from the pane. Does not kill the underlying session —
    /// lifecycle ownership stays with the engine.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn pane_id(&self) -> &str {
        &self.pane_id
    }
}

#[cfg(test)]
#[path = "terminal_tests.rs"]
mod tests;
