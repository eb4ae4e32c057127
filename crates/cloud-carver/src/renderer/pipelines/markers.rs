//! Hover and selection markers: screen-sized rings drawn on top of the cloud.

use super::CameraBinding;
use crate::data::types::MarkerInstance;
use crate::picking::Marker;
use wgpu::util::DeviceExt;

pub const HOVER_COLOR: [f32; 3] = [1.0, 0.75, 0.1];
pub const SELECTION_COLOR: [f32; 3] = [0.1, 0.9, 1.0];

const MAX_MARKERS: usize = 2;

pub struct MarkerPipeline {
    pipeline: wgpu::RenderPipeline,
    quad_vb: wgpu::Buffer,
    instances: wgpu::Buffer,
    count: u32,
}

impl MarkerPipeline {
    pub fn new(
        device: &wgpu::Device,
        camera: &CameraBinding,
        color_fmt: wgpu::TextureFormat,
        depth_fmt: wgpu::TextureFormat,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Marker WGSL"),
            source: wgpu::ShaderSource::Wgsl(MARKER_WGSL.into()),
        });

        let corners: [[f32; 2]; 6] = [
            [-1.0, -1.0], [1.0, -1.0], [1.0, 1.0],
            [-1.0, -1.0], [1.0, 1.0], [-1.0, 1.0],
        ];
        let quad_vb = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Marker Quad VB"),
            contents: bytemuck::cast_slice(&corners),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let instances = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Marker Instances"),
            size: (MAX_MARKERS * std::mem::size_of::<MarkerInstance>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Marker PipelineLayout"),
            bind_group_layouts: &[&camera.layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Marker Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<[f32; 2]>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &[wgpu::VertexAttribute {
                            shader_location: 0,
                            offset: 0,
                            format: wgpu::VertexFormat::Float32x2,
                        }],
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<MarkerInstance>() as u64,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &[
                            wgpu::VertexAttribute {
                                shader_location: 1,
                                offset: 0,
                                format: wgpu::VertexFormat::Float32x3,
                            },
                            wgpu::VertexAttribute {
                                shader_location: 2,
                                offset: 12,
                                format: wgpu::VertexFormat::Float32x3,
                            },
                        ],
                    },
                ],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: Some(wgpu::DepthStencilState {
                format: depth_fmt,
                depth_write_enabled: false,
                // Always visible, even behind other points.
                depth_compare: wgpu::CompareFunction::Always,
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

        Self {
            pipeline,
            quad_vb,
            instances,
            count: 0,
        }
    }

    /// Uploads the visible markers.
    pub fn set_markers(&mut self, queue: &wgpu::Queue, hover: Marker, selection: Marker) {
        let list: Vec<MarkerInstance> = [(hover, HOVER_COLOR), (selection, SELECTION_COLOR)]
            .into_iter()
            .filter(|(m, _)| m.visible)
            .map(|(m, color)| MarkerInstance {
                position: m.position.to_array(),
                color,
            })
            .collect();

        if !list.is_empty() {
            queue.write_buffer(&self.instances, 0, bytemuck::cast_slice(&list));
        }
        self.count = list.len() as u32;
    }

    pub fn clear(&mut self) {
        self.count = 0;
    }

    pub fn draw<'a>(&'a self, rpass: &mut wgpu::RenderPass<'a>, camera: &'a CameraBinding) {
        if self.count == 0 {
            return;
        }
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &camera.bind, &[]);
        rpass.set_vertex_buffer(0, self.quad_vb.slice(..));
        rpass.set_vertex_buffer(1, self.instances.slice(..));
        rpass.draw(0..6, 0..self.count);
    }
}

const MARKER_WGSL: &str = r#"
struct Cam {
    view_proj: mat4x4<f32>,
    viewport_size: vec2<f32>,
    marker_size_px: f32,
    _pad0: f32,
};
@group(0) @binding(0) var<uniform> C: Cam;

struct VsOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) color: vec3<f32>,
    @location(1) corner: vec2<f32>,
};

@vertex
fn vs_main(
    @location(0) corner: vec2<f32>,
    @location(1) position: vec3<f32>,
    @location(2) color: vec3<f32>,
) -> VsOut {
    var out: VsOut;
    let center = C.view_proj * vec4<f32>(position, 1.0);
    let ofs = corner * C.marker_size_px / C.viewport_size * center.w;
    out.clip = center + vec4<f32>(ofs, 0.0, 0.0);
    out.color = color;
    out.corner = corner;
    return out;
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let r = length(in.corner);
    // Ring with a small solid dot in the middle.
    if (r > 1.0 || (r > 0.25 && r < 0.7)) {
        discard;
    }
    return vec4<f32>(in.color, 1.0);
}
"#;
