// src/data/mod.rs
//! Data handling for the point cloud core.
//!
//! This module provides:
//! - The validated `Point` record and the per-instance GPU layouts.
//! - Deserialization and validation of the raw dataset payload.
//! - The `PointStore`, which owns the current point array and its filters.

pub mod dataset;
pub mod store;
pub mod types;

// Re-export commonly used types for convenience.
pub use self::dataset::{Dataset, RawDataset, RawPoint};
pub use self::store::{FilterThresholds, PointStore};
pub use self::types::{InstanceColor, InstanceTransform, Point, PointId};
