//! CLI command implementations

pub mod auth;
pub mod dashboard;
pub mod log;
pub mod predict;
