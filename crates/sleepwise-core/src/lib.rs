//! Core library for the SleepWise coach client
//!
//! This crate provides the core functionality for:
//! - Validating daily health metrics before submission
//! - Authenticated requests against the SleepWise API
//! - Session credential handling
//! - Dashboard aggregation and driver ranking
//! - Logging and client-side metrics

pub mod client;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod flows;
pub mod models;
pub mod observability;
pub mod session;
pub mod validation;

pub use client::ApiClient;
pub use config::ClientConfig;
pub use dashboard::{rank_drivers, DashboardController, DashboardState, RefreshOutcome};
pub use error::{ClientError, Result};
pub use models::*;
pub use observability::ClientMetrics;
pub use session::{FileSession, MemorySession, SessionProvider};
pub use validation::{validate, validate_coach, ValidationErrors};
