//! HTTP client for the gateway list and rule API.
//!
//! This crate provides the main [`GatewayClient`] plus the call wrappers it
//! applies to every request: [`with_retry`] for transient failures and
//! [`with_rate_limit`] for the shared mutation gate.

#![doc(html_root_url = "https://docs.rs/gatesync-client/0.3.0")]

mod client;
mod config;
mod retry;
pub mod api;

pub use client::{GatewayClient, GatewayClientBuilder};
pub use config::*;
pub use gatesync_core::{GatewayError, Result};
pub use retry::{with_rate_limit, with_retry, RateGate, Retryable};
