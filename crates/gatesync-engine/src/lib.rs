//! Reconciliation engine for gateway domain lists.
//!
//! A pass runs in sequential stages:
//!
//! 1. [`normalize`] raw block and allow text into a [`DomainSet`]
//! 2. [`chunk`] the set into list-sized [`Chunk`]s
//! 3. [`read_remote_state`] for everything under the name prefix
//! 4. plan with the [`Reconciler`]
//! 5. apply the [`OperationPlan`] with the [`Executor`]
//!
//! [`Synchronizer`] wires the stages together over any [`Gateway`].
//!
//! ```
//! use gatesync_engine::{chunk, normalize, Reconciler};
//! use std::num::NonZeroUsize;
//!
//! let normalized = normalize("0.0.0.0 ads.example.com\n||track.example.net^\n", "");
//! let chunks = chunk(&normalized.domains.into_vec(), NonZeroUsize::new(1000).unwrap());
//! let plan = Reconciler::new("AdBlock-DNS-Filters").plan(&chunks, &[], None);
//! assert_eq!(plan.len(), 2);
//! ```

#![doc(html_root_url = "https://docs.rs/gatesync-engine/0.3.0")]

mod chunk;
mod domain;
mod error;
mod executor;
mod gateway;
mod plan;
mod sources;
mod state;
mod sync;

#[cfg(test)]
mod testing;

pub use chunk::{chunk, Chunk, DEFAULT_CHUNK_SIZE};
pub use domain::{
    is_valid_domain, normalize, normalize_line, DomainSet, NormalizeStats, Normalized,
};
pub use error::{SourceError, SyncError, SyncResult};
pub use executor::{ExecutionReport, Executor, OperationResult, Outcome};
pub use gateway::Gateway;
pub use plan::{ListRef, Operation, OperationKind, OperationPlan, Reconciler};
pub use sources::{
    parse_url_file, split_entries, RawLists, SourceConfig, SourceLoader, ADLIST_URLS,
    DYNAMIC_BLACKLIST, DYNAMIC_WHITELIST, WHITELIST_URLS,
};
pub use state::{read_remote_state, RemoteList, RemoteRule, RemoteState};
pub use sync::{SyncOptions, SyncPlan, SyncReport, Synchronizer, DEFAULT_PREFIX};
