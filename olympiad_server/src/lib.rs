//! HTTP server for the olympiad bracket engine.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
