//! API endpoint modules.

mod lists;
mod rules;

pub use lists::{ListsApi, ITEMS_PAGE_SIZE};
pub use rules::RulesApi;

use gatesync_core::{ApiEnvelope, GatewayError, Result};

/// Unwrap the payload of a call that must return one
fn require_result<T>(envelope: ApiEnvelope<T>, what: &str) -> Result<T> {
    envelope
        .result
        .ok_or_else(|| GatewayError::Internal(format!("{what} returned no result")))
}
