use crate::data::color::normalize_colors;
use crate::data::types::{CloudGpu, PointInstance};
use crate::filter::{Axis, Extent, NativeExtent};
use crate::loader::LoadError;
use pcd::{ColorAttribute, PcdCloud};
use rayon::prelude::*;
use wgpu::util::DeviceExt;

/// The loaded point buffer. Positions are centered once at construction and
/// never change afterwards; a new load builds a new `PointCloud`.
#[derive(Debug, Clone)]
pub struct PointCloud {
    name: String,
    positions: Vec<[f32; 3]>,
    colors: Option<Vec<[f32; 3]>>,
    /// Translation subtracted at load; adding it back gives file coordinates.
    origin_offset: [f64; 3],
    /// Unpadded extent of the centered positions.
    observed: [Extent; 3],
}

/// Parallel AABB over `positions`, `None` when empty.
fn aabb(positions: &[[f32; 3]]) -> Option<([f32; 3], [f32; 3])> {
    if positions.is_empty() {
        return None;
    }

    use std::f32::{INFINITY, NEG_INFINITY};
    let (min, max) = positions
        .par_iter()
        .map(|p| (*p, *p))
        .reduce(
            || ([INFINITY; 3], [NEG_INFINITY; 3]),
            |(a_min, a_max), (b_min, b_max)| {
                (
                    [
                        a_min[0].min(b_min[0]),
                        a_min[1].min(b_min[1]),
                        a_min[2].min(b_min[2]),
                    ],
                    [
                        a_max[0].max(b_max[0]),
                        a_max[1].max(b_max[1]),
                        a_max[2].max(b_max[2]),
                    ],
                )
            },
        );
    Some((min, max))
}

impl PointCloud {
    /// Normalizes colors and centers positions: X/Y around the bounding-box
    /// center, Z so the lowest point rests on the z = 0 reference plane.
    pub fn from_parts(
        name: impl Into<String>,
        mut positions: Vec<[f32; 3]>,
        colors: Option<ColorAttribute>,
    ) -> Result<Self, LoadError> {
        let name = name.into();

        if let Some(attr) = colors.as_ref() {
            if attr.len() != positions.len() {
                return Err(LoadError::ColorCount {
                    colors: attr.len(),
                    points: positions.len(),
                });
            }
        }

        let (min, max) = aabb(&positions).ok_or_else(|| LoadError::Empty { name: name.clone() })?;

        let origin_offset = [
            0.5 * (min[0] as f64 + max[0] as f64),
            0.5 * (min[1] as f64 + max[1] as f64),
            min[2] as f64,
        ];

        positions.par_iter_mut().for_each(|p| {
            *p = [
                (p[0] as f64 - origin_offset[0]) as f32,
                (p[1] as f64 - origin_offset[1]) as f32,
                (p[2] as f64 - origin_offset[2]) as f32,
            ];
        });

        // Recompute on the centered values so the extent matches them bit for bit.
        let (min, max) = aabb(&positions).ok_or_else(|| LoadError::Empty { name: name.clone() })?;
        let observed = [0usize, 1, 2].map(|i| Extent::new(min[i], max[i]));

        let colors = colors.map(normalize_colors);

        log::debug!(
            "Cloud '{}': pts={}, colored={}, offset=({:.3},{:.3},{:.3}), extent=x[{:.2},{:.2}] y[{:.2},{:.2}] z[{:.2},{:.2}]",
            name,
            positions.len(),
            colors.is_some(),
            origin_offset[0],
            origin_offset[1],
            origin_offset[2],
            observed[0].min,
            observed[0].max,
            observed[1].min,
            observed[1].max,
            observed[2].min,
            observed[2].max,
        );

        Ok(Self {
            name,
            positions,
            colors,
            origin_offset,
            observed,
        })
    }

    pub fn from_decoded(name: impl Into<String>, decoded: PcdCloud) -> Result<Self, LoadError> {
        Self::from_parts(name, decoded.positions, decoded.colors)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[inline]
    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    #[inline]
    pub fn colors(&self) -> Option<&[[f32; 3]]> {
        self.colors.as_deref()
    }

    #[inline]
    pub fn has_color(&self) -> bool {
        self.colors.is_some()
    }

    pub fn origin_offset(&self) -> [f64; 3] {
        self.origin_offset
    }

    /// Observed extent of the centered cloud, used to normalize the readout.
    pub fn observed_extent(&self) -> [Extent; 3] {
        self.observed
    }

    pub fn observed_axis(&self, axis: Axis) -> Extent {
        self.observed[axis.index()]
    }

    pub fn native_extent(&self) -> NativeExtent {
        NativeExtent::from_observed(self.observed)
    }

    /// Position `i` in the coordinates of the source file.
    pub fn file_position(&self, i: usize) -> [f32; 3] {
        let p = self.positions[i];
        [
            (p[0] as f64 + self.origin_offset[0]) as f32,
            (p[1] as f64 + self.origin_offset[1]) as f32,
            (p[2] as f64 + self.origin_offset[2]) as f32,
        ]
    }

    pub fn instances(&self) -> Vec<PointInstance> {
        match self.colors.as_deref() {
            Some(colors) => self
                .positions
                .par_iter()
                .zip(colors.par_iter())
                .map(|(p, c)| PointInstance {
                    position: *p,
                    color: *c,
                })
                .collect(),
            None => self
                .positions
                .par_iter()
                .map(|p| PointInstance {
                    position: *p,
                    color: [0.0; 3],
                })
                .collect(),
        }
    }

    /// Uploads the instances and a per-cloud shading UBO.
    pub fn upload(&self, device: &wgpu::Device, layout: &wgpu::BindGroupLayout) -> CloudGpu {
        let instances = self.instances();

        let vtx = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Cloud Instances"),
            contents: bytemuck::cast_slice(&instances),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        let ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Cloud Shading UBO"),
            size: std::mem::size_of::<crate::data::types::ShadingUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Cloud Shading BindGroup"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: ubo.as_entire_binding(),
            }],
        });

        CloudGpu {
            instances_len: instances.len() as u32,
            vtx,
            ubo,
            bind,
        }
    }
}
