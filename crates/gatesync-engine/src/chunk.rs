//! Splitting the ordered domain set into list-sized chunks.

use gatesync_core::MAX_LIST_ITEMS;
use serde::Serialize;
use std::num::NonZeroUsize;

/// Default chunk size, equal to the gateway's per-list item limit
pub const DEFAULT_CHUNK_SIZE: NonZeroUsize = match NonZeroUsize::new(MAX_LIST_ITEMS) {
    Some(size) => size,
    None => panic!("MAX_LIST_ITEMS must be non-zero"),
};

/// An ordered slice of the domain set destined for one list.
///
/// `index` is the chunk's position; it pairs with the existing list of the
/// same position, never by content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Position in the chunk sequence (0-based)
    pub index: usize,
    /// Domains, in set order
    pub items: Vec<String>,
}

impl Chunk {
    /// Number of domains in the chunk
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the chunk is empty (never true for chunker output)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Split `domains` in order into chunks of exactly `size`, except the last
/// which holds the remainder. Empty input yields no chunks.
#[must_use]
pub fn chunk(domains: &[String], size: NonZeroUsize) -> Vec<Chunk> {
    domains
        .chunks(size.get())
        .enumerate()
        .map(|(index, items)| Chunk {
            index,
            items: items.to_vec(),
        })
        .collect()
}
