//! Retraining pipeline
//!
//! This module provides:
//! - RUL labeling from alert thresholds
//! - Class balancing of the skewed label distribution
//! - The retraining engine: load, transform, fit, version, promote

mod balance;
mod engine;
mod labels;

pub use balance::{balance_indices, OVERSAMPLE_RATIO, ZERO_LABEL_KEEP_STRIDE};
pub use engine::{PublishedModel, RetrainEngine};
pub use labels::{assign_rul_labels, ALERT_THRESHOLDS, FAULT_ALERT_COUNT, MAX_RUL_HOURS};
