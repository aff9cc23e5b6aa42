//! One reconciliation pass: normalize, chunk, read state, plan, execute.

use crate::chunk::{chunk, Chunk, DEFAULT_CHUNK_SIZE};
use crate::domain::{normalize, NormalizeStats};
use crate::error::{SyncError, SyncResult};
use crate::executor::{ExecutionReport, Executor};
use crate::gateway::Gateway;
use crate::plan::{OperationKind, OperationPlan, Reconciler};
use crate::sources::RawLists;
use crate::state::read_remote_state;
use gatesync_core::MAX_LIST_ITEMS;
use serde::Serialize;
use std::num::NonZeroUsize;
use tracing::{info, warn};

/// Name prefix for managed lists and rules when none is configured
pub const DEFAULT_PREFIX: &str = "AdBlock-DNS-Filters";

/// Settings for a synchronization pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    prefix: String,
    chunk_size: NonZeroUsize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl SyncOptions {
    /// Validate a prefix and a chunk size of at most [`MAX_LIST_ITEMS`]
    pub fn new(prefix: impl Into<String>, chunk_size: usize) -> SyncResult<Self> {
        let prefix = prefix.into();
        if prefix.trim().is_empty() {
            return Err(SyncError::Options("prefix must not be empty".into()));
        }
        let chunk_size = NonZeroUsize::new(chunk_size)
            .filter(|size| size.get() <= MAX_LIST_ITEMS)
            .ok_or_else(|| {
                SyncError::Options(format!(
                    "chunk size must be between 1 and {MAX_LIST_ITEMS}, got {chunk_size}"
                ))
            })?;
        Ok(Self { prefix, chunk_size })
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[must_use]
    pub const fn chunk_size(&self) -> NonZeroUsize {
        self.chunk_size
    }
}

/// A computed plan and the inputs that produced it
#[derive(Debug, Clone, Serialize)]
pub struct SyncPlan {
    pub stats: NormalizeStats,
    /// Desired list count
    pub chunks: usize,
    /// Managed lists found remotely
    pub remote_lists: usize,
    /// Managed domains found remotely
    pub remote_items: usize,
    pub plan: OperationPlan,
}

/// Outcome of an executed pass
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    #[serde(flatten)]
    pub planned: SyncPlan,
    pub execution: ExecutionReport,
}

impl SyncReport {
    /// Whether remote state is now fully converged
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.execution.is_complete()
    }
}

/// Runs reconciliation passes against one gateway
pub struct Synchronizer<'a, G: Gateway + ?Sized> {
    gateway: &'a G,
    options: SyncOptions,
}

impl<'a, G: Gateway + ?Sized> Synchronizer<'a, G> {
    #[must_use]
    pub const fn new(gateway: &'a G, options: SyncOptions) -> Self {
        Self { gateway, options }
    }

    #[must_use]
    pub const fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Compute the plan for `raw` without mutating anything.
    ///
    /// Fails only when remote state cannot be read.
    pub async fn prepare(&self, raw: &RawLists) -> SyncResult<SyncPlan> {
        let normalized = normalize(&raw.block, &raw.allow);
        let stats = normalized.stats;
        info!(
            blocked = stats.blocked,
            allowed = stats.allowed,
            allow_listed = stats.allow_listed,
            discarded = stats.discarded,
            total = stats.total,
            "normalized domains"
        );

        let domains = normalized.domains.into_vec();
        let chunks = chunk(&domains, self.options.chunk_size);
        self.plan_chunks(stats, &chunks).await
    }

    /// Plan and execute one full pass over `raw`
    pub async fn run(&self, raw: &RawLists) -> SyncResult<SyncReport> {
        let planned = self.prepare(raw).await?;
        Ok(self.execute(planned).await)
    }

    /// Delete every managed list and rule under the prefix
    pub async fn purge(&self) -> SyncResult<SyncReport> {
        let planned = self.plan_chunks(NormalizeStats::default(), &[]).await?;
        Ok(self.execute(planned).await)
    }

    async fn plan_chunks(
        &self,
        stats: NormalizeStats,
        chunks: &[Chunk],
    ) -> SyncResult<SyncPlan> {
        let state = read_remote_state(self.gateway, &self.options.prefix)
            .await
            .map_err(SyncError::Gateway)?;
        if let Some(rule) = state.rule().filter(|r| !r.enabled) {
            warn!(rule = %rule.name, "managed rule is disabled");
        }

        let plan = Reconciler::new(self.options.prefix.as_str()).plan_state(chunks, &state);
        info!(
            chunks = chunks.len(),
            operations = plan.len(),
            creates = plan.count(OperationKind::CreateList),
            updates = plan.count(OperationKind::UpdateList),
            deletes = plan.count(OperationKind::DeleteList),
            "planned operations"
        );

        Ok(SyncPlan {
            stats,
            chunks: chunks.len(),
            remote_lists: state.lists.len(),
            remote_items: state.item_count(),
            plan,
        })
    }

    async fn execute(&self, planned: SyncPlan) -> SyncReport {
        let execution = Executor::new(self.gateway).execute(&planned.plan).await;
        SyncReport { planned, execution }
    }
}
