// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The remote plan-store collaborator (out of scope per spec §1; modeled
//! as a trait interface per SPEC_FULL §1.1). An optional mirror of every
//! local plan-state write; on failure the local file stays authoritative
//! and the caller surfaces a toast (§4.1, §7).
//!
//! Every call is wrapped in [`with_timeout`] so a slow remote can never
//! stall the reducer's worker-task budget (§5 SUPPLEMENT).

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use kasmos_core::PlanEntry;

/// Deadline for ClickUp import and remote-store mirroring calls (§5).
pub const TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum TimeoutError {
    #[error("operation timed out after {0:?}")]
    Elapsed(Duration),
}

/// Run `fut`, failing with [`TimeoutError`] if it does not resolve within
/// `dur`.
pub async fn with_timeout<T>(dur: Duration, fut: impl Future<Output = T>) -> Result<T, TimeoutError> {
    tokio::time::timeout(dur, fut).await.map_err(|_| TimeoutError::Elapsed(dur))
}

#[derive(Debug, Error)]
pub enum RemoteStoreError {
    #[error(transparent)]
    Timeout(#[from] TimeoutError),
    #[error("remote plan store request failed: {0}")]
    Request(String),
}

/// Mirrors plan-state writes to a remote store. The local
/// [`kasmos_storage::PlanStateStore`] file is always authoritative; this
/// is best-effort replication only.
#[async_trait]
pub trait RemotePlanStore: Send + Sync + 'static {
    async fn mirror_plan(&self, file: &str, entry: &PlanEntry) -> Result<(), RemoteStoreError>;
}

/// Disabled by default, per SPEC_FULL §1: "a `Noop` implementation
/// (disabled by default)".
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRemoteStore;

#[async_trait]
impl RemotePlanStore for NoopRemoteStore {
    async fn mirror_plan(&self, _file: &str, _entry: &PlanEntry) -> Result<(), RemoteStoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_store_always_succeeds() {
        let store = NoopRemoteStore;
        let entry = PlanEntry {
            description: "d".to_string(),
            branch: "plan/d".to_string(),
            topic: String::new(),
            status: kasmos_core::PlanStatus::Unknown,
            created_at: chrono::Utc::now(),
        };
        store.mirror_plan("p.md", &entry).await.unwrap();
    }

    #[tokio::test]
    async fn with_timeout_reports_elapsed() {
        let result = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
        })
        .await;
        assert!(result.is_err());
    }
}
