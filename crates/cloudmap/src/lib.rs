// src/lib.rs
//! Point cloud exploration core.
//!
//! Partitions a community embedding into a uniform voxel grid, builds one
//! instanced draw batch per occupied voxel, resolves pointer picks against
//! analytic spheres and animates an orbit camera toward the current selection.
//! Nothing in here talks to a GPU; the host renderer uploads the buffers that
//! [`engine::Engine`] hands out each frame.

pub mod batch;
pub mod bounds;
pub mod camera;
pub mod collision;
pub mod color;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod frustum;
pub mod picking;
pub mod selection;
pub mod voxel;

pub use config::EngineConfig;
pub use data::{Dataset, FilterThresholds, Point, PointId, PointStore};
pub use engine::{Engine, FrameOutput};
pub use error::DatasetError;
