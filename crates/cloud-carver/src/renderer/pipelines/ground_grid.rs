// Renders an anti-aliased grid on the z = 0 reference plane.

use crate::filter::NativeExtent;
use glam::Mat4;
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GridUniforms {
    pub view_proj: Mat4,       // 64 B
    /// Half-size of the drawn square, world units.
    pub half_extent: f32,      // +4
    /// Minor cell size; major lines every ten cells.
    pub cell: f32,             // +4
    pub _pad0: [f32; 2],       // +8 -> 80
}

// Compile-time check against the WGSL struct size.
const _: [(); 80] = [(); core::mem::size_of::<GridUniforms>()];

/// Grid sizing for a cloud: twice its largest horizontal half-span, with a
/// power-of-ten cell giving roughly ten to a hundred cells across.
pub fn grid_dimensions(native: &NativeExtent) -> (f32, f32) {
    let [x, y, _] = native.axes();
    let reach = x.min.abs().max(x.max.abs()).max(y.min.abs()).max(y.max.abs()).max(1.0e-3);
    let half_extent = reach * 2.0;
    let cell = 10f32.powf((half_extent / 10.0).log10().floor());
    (half_extent, cell)
}

pub struct GroundGridPipeline {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    uniform_buffer: wgpu::Buffer,
    quad_vb: wgpu::Buffer,
    half_extent: f32,
    cell: f32,
}

impl GroundGridPipeline {
    pub fn new(device: &wgpu::Device, color_fmt: wgpu::TextureFormat, depth_fmt: wgpu::TextureFormat) -> Self {
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Grid Uniform Buffer"),
            size: std::mem::size_of::<GridUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Grid BGL"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Grid Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let corners: [[f32; 2]; 6] = [
            [-1.0, -1.0], [1.0, -1.0], [1.0, 1.0],
            [-1.0, -1.0], [1.0, 1.0], [-1.0, 1.0],
        ];
        let quad_vb = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Grid Quad VB"),
            contents: bytemuck::cast_slice(&corners),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Grid WGSL"),
            source: wgpu::ShaderSource::Wgsl(GRID_WGSL.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Grid Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Ground Grid Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<[f32; 2]>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &[wgpu::VertexAttribute {
                        shader_location: 0,
                        format: wgpu::VertexFormat::Float32x2,
                        offset: 0,
                    }],
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
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
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: Some(wgpu::DepthStencilState {
                format: depth_fmt,
                depth_write_enabled: false, // Do not occlude points
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        Self {
            pipeline,
            bind_group,
            uniform_buffer,
            quad_vb,
            half_extent: 10.0,
            cell: 1.0,
        }
    }

    /// Sizes the grid for a newly loaded cloud.
    pub fn fit(&mut self, native: &NativeExtent) {
        (self.half_extent, self.cell) = grid_dimensions(native);
    }

    pub fn draw<'a>(&'a self, rpass: &mut wgpu::RenderPass<'a>, queue: &wgpu::Queue, view_proj: Mat4) {
        let uniforms = GridUniforms {
            view_proj,
            half_extent: self.half_extent,
            cell: self.cell,
            _pad0: [0.0; 2],
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &self.bind_group, &[]);
        rpass.set_vertex_buffer(0, self.quad_vb.slice(..));
        rpass.draw(0..6, 0..1);
    }
}

pub const GRID_WGSL: &str = r#"
struct GridUniforms {
    view_proj: mat4x4<f32>,
    half_extent: f32,
    cell: f32,
    _pad0: vec2<f32>,
};
@group(0) @binding(0) var<uniform> U: GridUniforms;

struct VSOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) world_xy: vec2<f32>,
}

@vertex
fn vs_main(@location(0) corner: vec2<f32>) -> VSOut {
    var out: VSOut;
    let xy = corner * U.half_extent;
    out.clip = U.view_proj * vec4<f32>(xy, 0.0, 1.0);
    out.world_xy = xy;
    return out;
}

// Anti-aliased line mask
fn line(coord: f32, step: f32) -> f32 {
    let t   = coord / step;
    let aaw = min(fwidth(t) * 1.5, 0.5);
    let f   = fract(t);
    let d   = min(f, 1.0 - f);
    return 1.0 - smoothstep(0.0, aaw, d);
}

@fragment
fn fs_main(in: VSOut) -> @location(0) vec4<f32> {
    let p = in.world_xy;
    let minor = max(line(p.x, U.cell), line(p.y, U.cell));
    let major = max(line(p.x, U.cell * 10.0), line(p.y, U.cell * 10.0));
    let grid  = minor * 0.35 + major * 0.65;

    // Fade toward the border of the square.
    let r    = length(p) / U.half_extent;
    let fade = 1.0 - smoothstep(0.6, 1.0, r);

    return vec4<f32>(0.55, 0.6, 0.65, grid * fade * 0.35);
}
"#;
