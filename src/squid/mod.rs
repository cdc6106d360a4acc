//! Bridge Aggregator Module
//!
//! - `client` - HTTP client for the route and status endpoints
//! - `types` - Request bodies and response envelopes

pub mod client;
pub mod types;

pub use client::{SquidClient, INTEGRATOR_HEADER, REQUEST_ID_HEADER};
