//! Sufficiency gate for scheduled retrains
//!
//! A cheap, read-only pre-filter: counts distinct calendar days with at
//! least one raw blob for the scope and compares against a configured
//! minimum. Distinct from the engine's row floor, which is the
//! authoritative training-time guard.

use crate::dataset::DatasetLoader;
use crate::error::Result;
use crate::models::{EquipmentScope, SufficiencyVerdict, TimeRange};
use tracing::info;

/// Default minimum distinct days of data before a retrain may proceed
pub const DEFAULT_MIN_DAYS: usize = 21;

/// Decides whether enough fresh data exists to attempt a retrain
#[derive(Clone)]
pub struct SufficiencyGate {
    loader: DatasetLoader,
    min_days: usize,
}

impl SufficiencyGate {
    pub fn new(loader: DatasetLoader, min_days: usize) -> Self {
        Self { loader, min_days }
    }

    /// Count days with data in `range` for the scope. The boundary is
    /// inclusive: observing exactly the threshold passes.
    pub async fn check(
        &self,
        scope: &EquipmentScope,
        range: &TimeRange,
    ) -> Result<SufficiencyVerdict> {
        let observed = self.loader.list_days(scope, range).await?.len();
        let verdict = SufficiencyVerdict {
            passed: observed >= self.min_days,
            observed_days: observed,
            required_days: self.min_days,
        };
        info!(
            %scope,
            %range,
            observed_days = verdict.observed_days,
            required_days = verdict.required_days,
            passed = verdict.passed,
            "sufficiency check"
        );
        Ok(verdict)
    }
}
