//! Daily retrain schedule
//!
//! A plain tokio task that sleeps until the configured UTC hour, then runs
//! one retrain cycle over the lookback window ending yesterday. The core is
//! trigger-agnostic; this loop and the manual HTTP trigger call the same
//! entry point and share one single-flight guard.

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use service_lib::{
    EquipmentScope, ModelLifecycle, RetrainOutcome, ServiceMetrics, StructuredLogger, TimeRange,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{info, warn};

pub struct RetrainScheduler {
    lifecycle: Arc<ModelLifecycle>,
    metrics: ServiceMetrics,
    logger: StructuredLogger,
    retrain_guard: Arc<Mutex<()>>,
    lookback_days: u32,
    hour_utc: u32,
}

impl RetrainScheduler {
    pub fn new(
        lifecycle: Arc<ModelLifecycle>,
        metrics: ServiceMetrics,
        logger: StructuredLogger,
        retrain_guard: Arc<Mutex<()>>,
        lookback_days: u32,
        hour_utc: u32,
    ) -> Self {
        Self {
            lifecycle,
            metrics,
            logger,
            retrain_guard,
            lookback_days,
            hour_utc: hour_utc % 24,
        }
    }

    /// Run the schedule loop; never returns
    pub async fn run(self) {
        loop {
            let wait = seconds_until_hour(Utc::now(), self.hour_utc);
            info!(
                wait_secs = wait,
                hour_utc = self.hour_utc,
                "scheduler sleeping until next retrain window"
            );
            tokio::time::sleep(Duration::from_secs(wait)).await;
            self.run_cycle(Utc::now().date_naive()).await;
        }
    }

    /// One scheduled cycle: lookback window ends yesterday, so only full
    /// days of data are considered
    pub async fn run_cycle(&self, today: NaiveDate) {
        let Ok(_guard) = self.retrain_guard.try_lock() else {
            warn!("retrain already in flight, skipping scheduled cycle");
            return;
        };
        let end = today.pred_opt().unwrap_or(today);
        let window = TimeRange::lookback(end, self.lookback_days);
        info!(%window, "scheduled retrain cycle starting");

        let start = Instant::now();
        match self
            .lifecycle
            .retrain(&EquipmentScope::Fleet, &window, None)
            .await
        {
            Ok(RetrainOutcome::Published(published)) => {
                self.metrics.inc_retrains_published();
                self.metrics
                    .observe_retrain_duration(start.elapsed().as_secs_f64());
                self.metrics
                    .set_last_training_rows(published.trained_rows as i64);
                self.logger.log_retrain_published(
                    &published.version,
                    published.trained_rows,
                    published.metrics.rmse,
                    published.metrics.r2,
                );
            }
            Ok(RetrainOutcome::Skipped(verdict)) => {
                self.metrics.inc_retrains_skipped();
                self.logger
                    .log_retrain_skipped(verdict.observed_days, verdict.required_days);
            }
            Err(err) => {
                self.metrics.inc_retrain_errors();
                self.logger.log_retrain_failed(&err.to_string());
            }
        }
    }
}

/// Seconds from `now` until the next occurrence of `hour:00:00` UTC
fn seconds_until_hour(now: DateTime<Utc>, hour: u32) -> u64 {
    let today_fire = now
        .date_naive()
        .and_hms_opt(hour, 0, 0)
        .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
        .unwrap_or(now);
    let fire = if today_fire > now {
        today_fire
    } else {
        today_fire + ChronoDuration::days(1)
    };
    (fire - now).num_seconds().max(1) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn at(time: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(time).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_fires_later_today_when_hour_ahead() {
        let now = at("2025-06-15T10:00:00Z");
        assert_eq!(seconds_until_hour(now, 12), 2 * 3600);
    }

    #[test]
    fn test_fires_tomorrow_when_hour_passed() {
        let now = at("2025-06-15T10:00:00Z");
        assert_eq!(seconds_until_hour(now, 0), 14 * 3600);
    }

    #[test]
    fn test_exact_hour_waits_a_full_day() {
        let now = at("2025-06-15T00:00:00Z");
        assert_eq!(seconds_until_hour(now, 0), 24 * 3600);
    }

    #[test]
    fn test_never_returns_zero() {
        let now = at("2025-06-15T23:59:59Z");
        assert!(seconds_until_hour(now, 0) >= 1);
        assert!(seconds_until_hour(now.with_nanosecond(500).unwrap(), 0) >= 1);
    }
}
