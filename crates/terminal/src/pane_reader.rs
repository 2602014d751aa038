// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Raw, escape-sequence-preserving pane capture. Split out from
//! `kasmos_adapters::SessionAdapter::capture_output` because that method
//! deliberately strips escape codes for agent log scraping — the
//! embedded terminal needs the opposite.

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

use kasmos_adapters::subprocess::{run_with_timeout, TMUX_TIMEOUT};

#[derive(Debug, Error)]
pub enum PaneReaderError {
    #[error("capturing pane {0}: {1}")]
    CaptureFailed(String, String),
}

#[async_trait]
pub trait PaneReader: Clone + Send + Sync + 'static {
    /// Capture the pane's current contents with escape sequences intact.
    async fn capture_raw(&self, id: &str) -> Result<Vec<u8>, PaneReaderError>;
}

/// Shells out to `tmux capture-pane -e -p`.
#[derive(Clone, Default)]
pub struct TmuxPaneReader;

#[async_trait]
impl PaneReader for TmuxPaneReader {
    async fn capture_raw(&self, id: &str) -> Result<Vec<u8>, PaneReaderError> {
        let mut cmd = Command::new("tmux");
        cmd.args(["capture-pane", "-e", "-p", "-t", id]);
        let output = run_with_timeout(cmd, TMUX_TIMEOUT, "tmux capture-pane -e")
            .await
            .map_err(|e| PaneReaderError::CaptureFailed(id.to_string(), e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(PaneReaderError::CaptureFailed(id.to_string(), stderr));
        }
        Ok(output.stdout)
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    /// A pane reader whose captures are set directly by the test, rather
    /// than shelling out to a real tmux.
    #[derive(Clone, Default)]
    pub struct FakePaneReader {
        panes: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl FakePaneReader {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_output(&self, id: &str, bytes: impl Into<Vec<u8>>) {
            self.panes.lock().insert(id.to_string(), bytes.into());
        }
    }

    #[async_trait]
    impl PaneReader for FakePaneReader {
        async fn capture_raw(&self, id: &str) -> Result<Vec<u8>, PaneReaderError> {
            Ok(self.panes.lock().get(id).cloned().unwrap_or_default())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakePaneReader;
