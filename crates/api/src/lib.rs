//! HTTP API clients for external services.
//!
//! This crate provides:
//! - Priority fee estimation via the `getPriorityFeeEstimate` RPC method

mod priority_fee;

pub use priority_fee::{PriorityFeeClient, PriorityFeeEstimator, PriorityLevel};
