// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The embedded terminal (C5): a VT emulator bound to one multiplexer
//! pane at a time, feeding escape-sequence-preserving captures into a
//! `vt100::Parser` and exposing the parsed grid for the `tui-term`
//! widget. Exactly one [`EmbeddedTerminal`] is attached at a time in the
//! engine's model — attaching a new one is the caller's job, not this
//! crate's.

mod pane_reader;
mod terminal;

pub use pane_reader::{PaneReader, TmuxPaneReader};
pub use terminal::{EmbeddedTerminal, TerminalError};

#[cfg(any(test, feature = "test-support"))]
pub use pane_reader::FakePaneReader;
