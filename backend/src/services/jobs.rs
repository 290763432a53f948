//! Background Jobs
//!
//! Leaderboard window rollover. Every tick the job asks the analytics
//! service to reset each windowed leaderboard whose sentinel has expired,
//! so a boundary missed while the service was down is caught up on the
//! first tick after startup.

use std::env;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::models::LeaderboardWindow;
use crate::services::{AnalyticsError, AnalyticsService};

const DEFAULT_CHECK_INTERVAL_SECS: u64 = 60;

const ENV_RESET_ENABLED: &str = "LEADERBOARD_RESET_ENABLED";
const ENV_CHECK_INTERVAL: &str = "LEADERBOARD_CHECK_INTERVAL_SECS";

/// Configuration for the leaderboard reset job
#[derive(Debug, Clone)]
pub struct LeaderboardResetJobConfig {
    /// Interval between sentinel checks (default: 1 minute)
    pub interval: Duration,
    /// Whether the job is enabled
    pub enabled: bool,
}

impl Default for LeaderboardResetJobConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_CHECK_INTERVAL_SECS),
            enabled: true,
        }
    }
}

impl LeaderboardResetJobConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let enabled = env::var(ENV_RESET_ENABLED)
            .map(|v| !matches!(v.to_lowercase().as_str(), "false" | "0"))
            .unwrap_or(true);

        let interval_secs = env::var(ENV_CHECK_INTERVAL)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_CHECK_INTERVAL_SECS);

        Self {
            interval: Duration::from_secs(interval_secs),
            enabled,
        }
    }
}

/// Background runner for leaderboard window rollover
pub struct LeaderboardResetJob {
    analytics: AnalyticsService,
    config: LeaderboardResetJobConfig,
}

impl LeaderboardResetJob {
    pub fn new(analytics: AnalyticsService, config: LeaderboardResetJobConfig) -> Self {
        Self { analytics, config }
    }

    /// Start the rollover job
    ///
    /// Returns a shutdown sender that can be used to stop the job.
    pub fn start(self) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        if !self.config.enabled {
            info!("Leaderboard reset job is disabled");
            return shutdown_tx;
        }

        let analytics = self.analytics;
        let interval = self.config.interval;

        tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), "Starting leaderboard reset job");

            // First tick fires immediately and catches up missed boundaries
            let mut interval_timer = tokio::time::interval(interval);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        run_window_rollover(&analytics).await;
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            info!("Leaderboard reset job shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }
}

/// Reset every window that is due. Returns the windows that were reset.
///
/// A failure on one window is logged and does not stop the others.
pub async fn run_window_rollover(analytics: &AnalyticsService) -> Vec<LeaderboardWindow> {
    let mut reset = Vec::new();

    for window in LeaderboardWindow::ALL {
        match analytics.reset_window_if_due(window).await {
            Ok(true) => reset.push(window),
            Ok(false) => debug!(window = %window, "Leaderboard window not due"),
            Err(e) => log_reset_failure(window, &e),
        }
    }

    reset
}

fn log_reset_failure(window: LeaderboardWindow, err: &AnalyticsError) {
    error!(window = %window, error = %err, "Leaderboard window rollover failed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LeaderboardPeriod;
    use crate::services::analytics::ViewTarget;
    use crate::services::memory_store::InMemoryStore;
    use std::sync::Arc;

    fn test_analytics() -> (Arc<InMemoryStore>, AnalyticsService) {
        let store = Arc::new(InMemoryStore::new());
        (store.clone(), AnalyticsService::new(store))
    }

    #[test]
    fn test_default_config() {
        let config = LeaderboardResetJobConfig::default();
        assert!(config.enabled);
        assert_eq!(config.interval, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_rollover_resets_each_window_once() {
        let (_store, analytics) = test_analytics();

        let first = run_window_rollover(&analytics).await;
        assert_eq!(first, LeaderboardWindow::ALL.to_vec());

        // Sentinels are now set, nothing is due
        assert!(run_window_rollover(&analytics).await.is_empty());
    }

    #[tokio::test]
    async fn test_rollover_keeps_running_windows() {
        let (_store, analytics) = test_analytics();
        run_window_rollover(&analytics).await;

        analytics
            .record_view(ViewTarget::Manga { manga_id: 3 })
            .await;
        run_window_rollover(&analytics).await;

        let daily = analytics
            .get_top_manga(LeaderboardPeriod::Day, None)
            .await;
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].views, 1);
    }

    #[tokio::test]
    async fn test_rollover_survives_store_outage() {
        let (store, analytics) = test_analytics();
        store.set_unavailable(true);

        assert!(run_window_rollover(&analytics).await.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_job_does_not_spawn() {
        let (_store, analytics) = test_analytics();
        let job = LeaderboardResetJob::new(
            analytics.clone(),
            LeaderboardResetJobConfig {
                interval: Duration::from_millis(10),
                enabled: false,
            },
        );
        let _shutdown = job.start();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(
            analytics
                .window_remaining(LeaderboardWindow::Day)
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_started_job_sets_sentinels_and_stops() {
        let (_store, analytics) = test_analytics();
        let job = LeaderboardResetJob::new(
            analytics.clone(),
            LeaderboardResetJobConfig {
                interval: Duration::from_millis(10),
                enabled: true,
            },
        );
        let shutdown = job.start();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(analytics
            .window_remaining(LeaderboardWindow::Week)
            .await
            .unwrap()
            .is_some());

        shutdown.send(true).unwrap();
    }
}
