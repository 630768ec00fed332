//! Core library for the equipment RUL lifecycle service
//!
//! This crate provides the model lifecycle manager:
//! - Remote object store access with fingerprint-conditional reads
//! - Raw sensor dataset loading and the wide feature transform
//! - The in-process model cache serving inference
//! - The retraining engine with versioned publish and atomic promotion
//! - The data-sufficiency gate for scheduled retrains
//! - Health checks and observability

pub mod dataset;
pub mod error;
pub mod features;
pub mod health;
pub mod lifecycle;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod store;
pub mod sufficiency;
pub mod training;

pub use error::{LifecycleError, Result};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use lifecycle::{ModelLifecycle, RetrainOutcome};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
