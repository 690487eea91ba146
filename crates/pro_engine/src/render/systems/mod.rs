//! Stateful per-frame rendering systems
//!
//! Culling, instance batching, debug lines and the statistics they feed.

pub mod culling;
pub mod instancing;
pub mod lines;
pub mod statistics;

pub use culling::{EntityCullingRecord, VisibilityCuller, BOUNDING_RADIUS_FACTOR};
pub use instancing::{BatchAccumulator, InstanceRecord, InstancedStats};
pub use lines::{LineBatch, LineVertex};
pub use statistics::FrameStatistics;
