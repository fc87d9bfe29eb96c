//! HTTP API: the bus and the four blog services, one binary.

pub mod app;
pub mod config;
pub mod middleware;
