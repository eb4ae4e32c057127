//! The rendering orchestrator. Owns the GPU context, the depth target and
//! every scene pipeline.

pub mod context;
pub mod pipelines;
pub mod targets;

use self::{
    context::GfxContext,
    pipelines::{
        ground_grid::GroundGridPipeline, markers::MarkerPipeline, overlay::OverlayPipeline,
        points::PointsPipeline, CameraBinding,
    },
    targets::DepthTarget,
};
use crate::data::types::{CameraUniform, CloudGpu, ShadingUniform};
use glam::Mat4;
use std::sync::Arc;
use winit::window::Window;

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.02,
    g: 0.025,
    b: 0.03,
    a: 1.0,
};

/// Everything the scene pass needs for one frame of the active cloud.
pub struct FrameScene<'a> {
    pub cloud: &'a CloudGpu,
    pub shading: ShadingUniform,
    pub camera: CameraUniform,
}

pub struct Renderer {
    pub gfx: GfxContext,
    pub depth: DepthTarget,
    pub camera: CameraBinding,
    pub points: PointsPipeline,
    pub overlay: OverlayPipeline,
    pub markers: MarkerPipeline,
    pub grid: GroundGridPipeline,
    pub egui_renderer: egui_wgpu::Renderer,
}

impl Renderer {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let gfx = GfxContext::new(window).await?;
        let color_fmt = gfx.config.format;

        let depth = DepthTarget::new(&gfx.device, gfx.size);
        let camera = CameraBinding::new(&gfx.device);
        let points = PointsPipeline::new(&gfx.device, color_fmt, depth.format);
        let overlay = OverlayPipeline::new(&gfx.device, &camera, color_fmt, depth.format);
        let markers = MarkerPipeline::new(&gfx.device, &camera, color_fmt, depth.format);
        let grid = GroundGridPipeline::new(&gfx.device, color_fmt, depth.format);

        let egui_renderer = egui_wgpu::Renderer::new(&gfx.device, color_fmt, None, 1);

        Ok(Self {
            gfx,
            depth,
            camera,
            points,
            overlay,
            markers,
            grid,
            egui_renderer,
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.gfx.resize(new_size);
            self.depth.resize(&self.gfx.device, new_size);
        }
    }

    /// Frees the active cloud's GPU resources together with the overlay mesh
    /// and markers that referred to it.
    pub fn release_cloud(&mut self, cloud: CloudGpu) {
        cloud.release();
        self.overlay.clear();
        self.markers.clear();
    }

    /// Scene pass: grid, filtered points, overlay box, markers. With no scene
    /// the frame is only cleared.
    pub fn render(&mut self, swap_view: &wgpu::TextureView, scene: Option<FrameScene<'_>>) {
        let mut encoder = self
            .gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        if let Some(scene) = scene.as_ref() {
            self.points.write_shading(&self.gfx.queue, scene.cloud, &scene.shading);
            self.camera.write(&self.gfx.queue, &scene.camera);
        }

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: swap_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some(scene) = scene.as_ref() {
                let view_proj = Mat4::from_cols_array_2d(&scene.camera.view_proj);
                self.grid.draw(&mut pass, &self.gfx.queue, view_proj);
                self.points.draw_cloud(&mut pass, scene.cloud);
                self.overlay.draw(&mut pass, &self.camera);
                self.markers.draw(&mut pass, &self.camera);
            }
        }

        self.gfx.queue.submit(std::iter::once(encoder.finish()));
    }
}
