//! Core types and errors for the gateway list synchronizer.
//!
//! This crate provides the foundational types shared across the workspace:
//!
//! - **Types**: Strongly-typed representations of gateway lists, rules and the
//!   API response envelope
//! - **Traffic expressions**: building and parsing the rule expression that
//!   references lists by ID
//! - **Errors**: Gateway error taxonomy with [`GatewayError`]
//!
//! # Example
//!
//! ```rust
//! use gatesync_core::{parse_list_ids, traffic_expression};
//!
//! let ids = vec!["0f3a1c2e-1111-2222-3333-444455556666".to_string()];
//! let traffic = traffic_expression(&ids);
//! assert!(parse_list_ids(&traffic).contains(&ids[0]));
//! ```

mod error;
pub mod types;

pub use error::{GatewayError, Result};
pub use types::*;
