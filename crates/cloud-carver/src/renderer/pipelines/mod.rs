pub mod ground_grid;
pub mod markers;
pub mod overlay;
pub mod points;

use crate::data::types::CameraUniform;

/// Camera UBO shared by the overlay and marker pipelines, written once per frame.
pub struct CameraBinding {
    pub layout: wgpu::BindGroupLayout,
    pub bind: wgpu::BindGroup,
    ubo: wgpu::Buffer,
}

impl CameraBinding {
    pub fn new(device: &wgpu::Device) -> Self {
        let ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Camera UBO"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Camera UBO Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<CameraUniform>() as u64),
                },
                count: None,
            }],
        });

        let bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera BindGroup"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: ubo.as_entire_binding(),
            }],
        });

        Self { layout, bind, ubo }
    }

    pub fn write(&self, queue: &wgpu::Queue, camera: &CameraUniform) {
        queue.write_buffer(&self.ubo, 0, bytemuck::bytes_of(camera));
    }
}
