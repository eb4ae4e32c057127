//! Core data types for the viewer, focused on GPU data representation.

use crate::filter::{Axis, FilterState};
use glam::Mat4;

/// Defines the per-instance data uploaded to the GPU vertex buffer.
/// Must match the instance inputs of `points.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable, Debug, PartialEq)]
pub struct PointInstance {
    /// Centered world position.
    pub position: [f32; 3],
    /// Normalized color; zero when the cloud is colorless.
    pub color: [f32; 3],
}

/// Shading configuration of the point pipeline, respecting WGSL uniform layout.
/// Must match `Shading` in `points.wgsl`; the filter fields are the device
/// side of the retain rule.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable, Debug, PartialEq)]
pub struct ShadingUniform {
    pub view_proj: [[f32; 4]; 4],
    /// Size of the viewport in physical pixels.
    pub viewport_size: [f32; 2],
    pub point_size_px: f32,
    pub color_boost: f32,
    pub use_color: u32,
    pub has_color: u32,
    pub _pad0: [u32; 2],
    /// Per-axis enable flag (x, y, z, unused).
    pub axis_enabled: [u32; 4],
    pub axis_min: [f32; 4],
    pub axis_max: [f32; 4],
}

const _: [(); 144] = [(); core::mem::size_of::<ShadingUniform>()];

/// User-controlled display settings that survive reloads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadingParams {
    pub point_size: f32,
    pub use_color: bool,
    pub color_boost: f32,
}

impl Default for ShadingParams {
    fn default() -> Self {
        Self {
            point_size: 2.0,
            use_color: true,
            color_boost: 1.0,
        }
    }
}

impl ShadingUniform {
    /// Snapshot of everything the point shader reads for one frame.
    pub fn new(
        filter: &FilterState,
        params: &ShadingParams,
        has_color: bool,
        view_proj: Mat4,
        viewport_size: [f32; 2],
    ) -> Self {
        let mut axis_enabled = [0u32; 4];
        let mut axis_min = [0.0f32; 4];
        let mut axis_max = [0.0f32; 4];
        for axis in Axis::ALL {
            let b = filter.axis(axis);
            axis_enabled[axis.index()] = b.enabled as u32;
            axis_min[axis.index()] = b.min;
            axis_max[axis.index()] = b.max;
        }

        Self {
            view_proj: view_proj.to_cols_array_2d(),
            viewport_size,
            point_size_px: params.point_size,
            color_boost: params.color_boost,
            use_color: params.use_color as u32,
            has_color: has_color as u32,
            _pad0: [0; 2],
            axis_enabled,
            axis_min,
            axis_max,
        }
    }
}

/// Shared camera block for the overlay and marker pipelines.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable, Debug)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub viewport_size: [f32; 2],
    pub marker_size_px: f32,
    pub _pad0: f32,
}

/// One marker sprite.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable, Debug)]
pub struct MarkerInstance {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

/// Holds the GPU resources of the active point cloud.
#[derive(Debug)]
pub struct CloudGpu {
    pub instances_len: u32,

    /// Vertex buffer containing `PointInstance` data.
    pub vtx: wgpu::Buffer,
    /// Uniform buffer containing `ShadingUniform` data.
    pub ubo: wgpu::Buffer,
    /// Bind group connecting the UBO to the pipeline.
    pub bind: wgpu::BindGroup,
}

impl CloudGpu {
    /// Frees the buffers immediately instead of waiting for the last handle to drop.
    pub fn release(self) {
        self.vtx.destroy();
        self.ubo.destroy();
    }
}
