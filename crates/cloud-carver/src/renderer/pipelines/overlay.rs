//! Wireframe of the filter box.

use super::CameraBinding;
use crate::overlay::BoundingBox;
use wgpu::util::DeviceExt;

pub struct OverlayPipeline {
    pipeline: wgpu::RenderPipeline,
    /// Line-list vertices of the current box; `None` while no axis is enabled.
    mesh: Option<wgpu::Buffer>,
}

impl OverlayPipeline {
    pub fn new(
        device: &wgpu::Device,
        camera: &CameraBinding,
        color_fmt: wgpu::TextureFormat,
        depth_fmt: wgpu::TextureFormat,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Overlay WGSL"),
            source: wgpu::ShaderSource::Wgsl(OVERLAY_WGSL.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Overlay PipelineLayout"),
            bind_group_layouts: &[&camera.layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Overlay Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<[f32; 3]>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &[wgpu::VertexAttribute {
                        shader_location: 0,
                        offset: 0,
                        format: wgpu::VertexFormat::Float32x3,
                    }],
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: depth_fmt,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_fmt,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        Self { pipeline, mesh: None }
    }

    /// Replaces the box mesh. The previous buffer is destroyed before the new
    /// one is created.
    pub fn set_box(&mut self, device: &wgpu::Device, bbox: Option<BoundingBox>) {
        self.clear();

        self.mesh = bbox.map(|b| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Overlay Box VB"),
                contents: bytemuck::cast_slice(&b.line_vertices()),
                usage: wgpu::BufferUsages::VERTEX,
            })
        });
    }

    pub fn clear(&mut self) {
        if let Some(old) = self.mesh.take() {
            old.destroy();
        }
    }

    pub fn draw<'a>(&'a self, rpass: &mut wgpu::RenderPass<'a>, camera: &'a CameraBinding) {
        let Some(mesh) = self.mesh.as_ref() else {
            return;
        };
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &camera.bind, &[]);
        rpass.set_vertex_buffer(0, mesh.slice(..));
        rpass.draw(0..24, 0..1);
    }
}

const OVERLAY_WGSL: &str = r#"
struct Cam {
    view_proj: mat4x4<f32>,
    viewport_size: vec2<f32>,
    marker_size_px: f32,
    _pad0: f32,
};
@group(0) @binding(0) var<uniform> C: Cam;

@vertex
fn vs_main(@location(0) pos: vec3<f32>) -> @builtin(position) vec4<f32> {
    return C.view_proj * vec4<f32>(pos, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 0.85, 0.2, 0.9);
}
"#;
