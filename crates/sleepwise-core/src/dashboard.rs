//! Dashboard aggregation
//!
//! A refresh fetches the series and the driver statistics for one window
//! concurrently and only updates the view once both have arrived. Every
//! refresh takes a generation number; a response that comes back after a
//! newer refresh was started is discarded instead of overwriting newer data.

use crate::error::{ClientError, Result};
use crate::models::{Averages, DashboardSeries, DriverCounts, DriverFrequency, TopDrivers, Window};
use crate::observability::ClientMetrics;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Number of drivers shown on the dashboard
pub const TOP_DRIVER_LIMIT: usize = 5;

/// Data source for the dashboard
#[async_trait]
pub trait DashboardApi: Send + Sync {
    async fn fetch_series(&self, window: Window) -> Result<DashboardSeries>;

    async fn fetch_top_drivers(&self, window: Window) -> Result<TopDrivers>;
}

/// Rank drivers by descending count; equal counts keep their original order
pub fn rank_drivers(counts: &DriverCounts, limit: usize) -> Vec<DriverFrequency> {
    let mut ranked: Vec<DriverFrequency> = counts
        .iter()
        .map(|(driver, count)| DriverFrequency {
            driver: driver.to_string(),
            count,
        })
        .collect();

    // sort_by is stable
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(limit);
    ranked
}

/// Presentation-ready result of one refresh
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub window: Window,
    pub series: DashboardSeries,
    pub latest_top_drivers: Vec<String>,
    pub top_drivers: Vec<DriverFrequency>,
}

impl DashboardSummary {
    pub fn build(window: Window, series: DashboardSeries, drivers: TopDrivers) -> Self {
        let top_drivers = rank_drivers(&drivers.driver_counts, TOP_DRIVER_LIMIT);
        Self {
            window,
            series,
            latest_top_drivers: drivers.latest_top_drivers,
            top_drivers,
        }
    }

    /// Averages exactly as the backend computed them
    pub fn averages(&self) -> &Averages {
        &self.series.averages
    }
}

/// Current view state of the dashboard
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardState {
    Idle,
    Loading { window: Window, generation: u64 },
    Ready(DashboardSummary),
    Failed { window: Window, message: String },
}

/// What happened to one refresh
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// The refresh was the latest one and its data is now displayed
    Applied(DashboardSummary),
    /// A newer refresh was started while this one was in flight
    Stale { generation: u64, latest: u64 },
}

/// Drives dashboard refreshes and owns the displayed state
pub struct DashboardController {
    api: Arc<dyn DashboardApi>,
    generation: AtomicU64,
    state: RwLock<DashboardState>,
    metrics: ClientMetrics,
}

impl DashboardController {
    pub fn new(api: Arc<dyn DashboardApi>) -> Self {
        Self {
            api,
            generation: AtomicU64::new(0),
            state: RwLock::new(DashboardState::Idle),
            metrics: ClientMetrics::new(),
        }
    }

    /// Snapshot of the displayed state
    pub async fn state(&self) -> DashboardState {
        self.state.read().await.clone()
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Fetch series and drivers for `window` and update the state
    ///
    /// Returns an error only when this refresh is still the latest one and
    /// either fetch failed.
    pub async fn refresh(&self, window: Window) -> Result<RefreshOutcome> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.metrics.inc_dashboard_refreshes();
        *self.state.write().await = DashboardState::Loading { window, generation };
        info!(window = %window, generation, "Refreshing dashboard");

        let fetched = tokio::try_join!(
            self.api.fetch_series(window),
            self.api.fetch_top_drivers(window)
        );

        let mut state = self.state.write().await;
        let latest = self.generation.load(Ordering::SeqCst);
        if latest != generation {
            self.metrics.inc_stale_dashboard_responses();
            debug!(window = %window, generation, latest, "Discarding stale dashboard response");
            return Ok(RefreshOutcome::Stale { generation, latest });
        }

        match fetched {
            Ok((series, drivers)) => {
                let summary = DashboardSummary::build(window, series, drivers);
                *state = DashboardState::Ready(summary.clone());
                Ok(RefreshOutcome::Applied(summary))
            }
            Err(err) => {
                warn!(window = %window, error = %err, "Dashboard refresh failed");
                *state = DashboardState::Failed {
                    window,
                    message: err.user_message(),
                };
                Err(err)
            }
        }
    }

    /// Refresh and return the summary, treating a superseded refresh as an error
    pub async fn load(&self, window: Window) -> Result<DashboardSummary> {
        match self.refresh(window).await? {
            RefreshOutcome::Applied(summary) => Ok(summary),
            RefreshOutcome::Stale { .. } => Err(ClientError::api(
                None,
                Some("Dashboard request was superseded".to_string()),
            )),
        }
    }
}
