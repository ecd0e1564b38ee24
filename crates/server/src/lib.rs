//! HTTP server exposing the gatehouse authentication layer.

pub mod api;
pub mod metrics;
pub mod state;
