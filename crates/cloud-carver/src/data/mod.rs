//! Data handling modules for the viewer.
//!
//! This module provides functionality for:
//! - Normalizing decoded colors into [0,1] RGB.
//! - Holding the centered point buffer and preparing it for the GPU.
//! - Defining the data structures for GPU buffers.

pub mod color;
pub mod point_cloud;
pub mod types;

// Re-export commonly used types for convenience.
pub use self::point_cloud::PointCloud;
pub use self::types::{CloudGpu, PointInstance, ShadingParams, ShadingUniform};
