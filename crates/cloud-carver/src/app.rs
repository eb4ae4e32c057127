use crate::{
    config::Config,
    data::{
        types::{CameraUniform, CloudGpu, ShadingUniform},
        PointCloud, ShadingParams,
    },
    export::export_session,
    interaction::PointerEvent,
    loader::{LoadOutcome, Loader},
    renderer::{FrameScene, Renderer},
    session::Session,
    ui::{self, PanelState, PanelView, UiAction},
};
use anyhow::Result;
use glam::Vec2;
use std::{path::PathBuf, sync::Arc, time::Instant};
use winit::{
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    keyboard::ModifiersState,
    window::Window,
};

/// Marker sprite diameter in pixels.
const MARKER_SIZE_PX: f32 = 14.0;

pub struct App {
    pub renderer: Renderer,
    pub egui_ctx: egui::Context,
    pub egui_state: egui_winit::State,
    config: Config,
    params: ShadingParams,
    /// `None` until the first load succeeds.
    session: Option<Session>,
    cloud_gpu: Option<CloudGpu>,
    loader: Loader,
    panel: PanelState,
    status: String,
    modifiers: ModifiersState,
    cursor: Vec2,
    redraw: bool,
}

impl App {
    pub async fn new(window: Arc<Window>, config: Config) -> Result<Self> {
        let renderer = Renderer::new(window.clone()).await?;

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui_ctx.viewport_id(),
            &*window,
            None,
            None,
        );

        let params = ShadingParams {
            point_size: config.point_size,
            color_boost: config.color_boost,
            ..ShadingParams::default()
        };

        Ok(Self {
            renderer,
            egui_ctx,
            egui_state,
            config,
            params,
            session: None,
            cloud_gpu: None,
            loader: Loader::new(),
            panel: PanelState::default(),
            status: String::new(),
            modifiers: ModifiersState::empty(),
            cursor: Vec2::ZERO,
            redraw: true,
        })
    }

    pub fn is_loading(&self) -> bool {
        self.loader.is_busy()
    }

    /// Whether something visible changed since the last frame. A running load
    /// keeps the panel spinner animated.
    pub fn needs_redraw(&self) -> bool {
        self.redraw
            || self.loader.is_busy()
            || self.session.as_ref().is_some_and(Session::has_pending_changes)
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.renderer.resize(new_size);
            let viewport = self.renderer.gfx.viewport();
            if let Some(session) = self.session.as_mut() {
                session.resize(viewport);
            }
            self.redraw = true;
        }
    }

    /// Returns true when the event was consumed.
    pub fn handle_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        let response = self.egui_state.on_window_event(window, event);
        if response.repaint {
            self.redraw = true;
        }

        match event {
            WindowEvent::Resized(size) => {
                self.resize(*size);
                return false;
            }
            WindowEvent::ModifiersChanged(m) => {
                self.modifiers = m.state();
                return false;
            }
            WindowEvent::DroppedFile(path) => {
                self.request_load(path.clone());
                return true;
            }
            _ => {}
        }

        // Releases always reach the state machine so a drag can't get stuck.
        let is_release = matches!(
            event,
            WindowEvent::MouseInput {
                state: ElementState::Released,
                button: MouseButton::Left,
                ..
            }
        );
        if response.consumed && !is_release {
            return true;
        }

        let pointer = match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Vec2::new(position.x as f32, position.y as f32);
                Some(PointerEvent::Moved { pos: self.cursor })
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => Some(match state {
                ElementState::Pressed => PointerEvent::Pressed {
                    pos: self.cursor,
                    modifier: self.modifiers.shift_key(),
                    at: Instant::now(),
                },
                ElementState::Released => PointerEvent::Released { pos: self.cursor },
            }),
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 120.0,
                };
                Some(PointerEvent::Scrolled { delta: lines })
            }
            _ => None,
        };

        match (pointer, self.session.as_mut()) {
            (Some(ev), Some(session)) => {
                session.handle_pointer(ev);
                true
            }
            _ => false,
        }
    }

    pub fn request_load(&mut self, path: PathBuf) {
        match self.loader.request(path.clone()) {
            Ok(()) => self.status = format!("Loading {}...", path.display()),
            Err(e) => {
                log::warn!("Load of {} refused: {}", path.display(), e);
                self.status = e.to_string();
            }
        }
        self.redraw = true;
    }

    /// Installs a finished load, if any. Returns whether one arrived.
    pub fn poll_loader(&mut self) -> bool {
        let Some(outcome) = self.loader.poll() else {
            return false;
        };
        self.finish_load(outcome);
        self.redraw = true;
        true
    }

    fn finish_load(&mut self, outcome: LoadOutcome) {
        match outcome.result {
            Ok(cloud) => {
                self.status = format!("Loaded {} ({} points)", cloud.name(), cloud.len());
                self.install(cloud);
            }
            Err(e) => {
                log::error!("Failed to load {}: {}", outcome.path.display(), e);
                self.status = format!("Load failed: {}", e);
            }
        }
    }

    /// Swaps in a new cloud. The old cloud's buffers and overlay are freed
    /// before anything for the new one is allocated.
    fn install(&mut self, cloud: PointCloud) {
        if let Some(old) = self.cloud_gpu.take() {
            self.renderer.release_cloud(old);
        }
        self.session = None;

        let gpu = cloud.upload(&self.renderer.gfx.device, &self.renderer.points.shading_layout);
        self.renderer.grid.fit(&cloud.native_extent());

        self.cloud_gpu = Some(gpu);
        self.session = Some(Session::new(cloud, self.renderer.gfx.viewport()));
    }

    fn apply(&mut self, action: UiAction) {
        match action {
            UiAction::Shading(params) => self.params = params,
            UiAction::Open(path) => self.request_load(path),
            UiAction::Export => self.export(),
            other => {
                let Some(session) = self.session.as_mut() else {
                    return;
                };
                match other {
                    UiAction::Filter(edit) => {
                        session.edit_filter(edit);
                    }
                    UiAction::RotateQuarter { clockwise } => session.rotate_quarter(clockwise),
                    UiAction::ResetView => session.reset_view(),
                    UiAction::LockPolar(on) => session.set_polar_lock(on),
                    UiAction::LockAzimuth(on) => session.set_azimuth_lock(on),
                    UiAction::Shading(_) | UiAction::Open(_) | UiAction::Export => {}
                }
            }
        }
        self.redraw = true;
    }

    fn export(&mut self) {
        let path = self.config.export_path.clone();
        self.status = match export_session(self.session.as_ref(), &path) {
            Ok(summary) => format!("Exported {} points to {}", summary.points, summary.path.display()),
            Err(e) => {
                log::warn!("Export to {} failed: {}", path.display(), e);
                format!("Export failed: {}", e)
            }
        };
    }

    pub fn render(&mut self, window: &Window) -> Result<(), wgpu::SurfaceError> {
        let frame = self.renderer.gfx.surface.get_current_texture()?;
        let swap_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.redraw = false;

        let viewport = self.renderer.gfx.viewport();
        let viewport_size = [viewport.width, viewport.height];

        // --- Scene ---
        let scene = match (self.session.as_mut(), self.cloud_gpu.as_ref()) {
            (Some(session), Some(cloud)) => {
                let changes = session.take_changes();
                if changes.overlay {
                    self.renderer
                        .overlay
                        .set_box(&self.renderer.gfx.device, session.overlay());
                }
                if changes.markers {
                    self.renderer.markers.set_markers(
                        &self.renderer.gfx.queue,
                        session.hover(),
                        session.selection(),
                    );
                }

                let view_proj = session.camera().view_proj();
                Some(FrameScene {
                    cloud,
                    shading: ShadingUniform::new(
                        session.filter(),
                        &self.params,
                        session.cloud().has_color(),
                        view_proj,
                        viewport_size,
                    ),
                    camera: CameraUniform {
                        view_proj: view_proj.to_cols_array_2d(),
                        viewport_size,
                        marker_size_px: MARKER_SIZE_PX,
                        _pad0: 0.0,
                    },
                })
            }
            _ => None,
        };
        self.renderer.render(&swap_view, scene);

        // --- UI ---
        let egui_input = self.egui_state.take_egui_input(window);
        self.egui_ctx.begin_frame(egui_input);

        let actions = {
            let session = self.session.as_ref();
            let view = PanelView {
                filter: session.map(Session::filter),
                params: self.params,
                has_color: session.is_some_and(|s| s.cloud().has_color()),
                readout: session.map(Session::readout).unwrap_or_default(),
                polar_locked: session.is_some_and(|s| s.camera().polar_lock().is_some()),
                azimuth_locked: session.is_some_and(|s| s.camera().azimuth_lock().is_some()),
                cloud_name: session.map(|s| s.cloud().name()),
                total_points: session.map_or(0, |s| s.cloud().len()),
                retained_points: session.map_or(0, Session::retained_count),
                loading: self.loader.is_busy(),
                status: &self.status,
            };
            ui::draw_panel(&self.egui_ctx, &view, &mut self.panel)
        };

        let egui_output = self.egui_ctx.end_frame();
        self.egui_state
            .handle_platform_output(window, egui_output.platform_output);
        let shapes = self
            .egui_ctx
            .tessellate(egui_output.shapes, self.egui_ctx.pixels_per_point());

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.renderer.gfx.config.width, self.renderer.gfx.config.height],
            pixels_per_point: self.egui_ctx.pixels_per_point(),
        };

        let mut encoder = self
            .renderer
            .gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("UI Encoder"),
            });

        for (id, delta) in &egui_output.textures_delta.set {
            self.renderer.egui_renderer.update_texture(
                &self.renderer.gfx.device,
                &self.renderer.gfx.queue,
                *id,
                delta,
            );
        }

        self.renderer.egui_renderer.update_buffers(
            &self.renderer.gfx.device,
            &self.renderer.gfx.queue,
            &mut encoder,
            &shapes,
            &screen_descriptor,
        );

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("EGUI Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &swap_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.renderer
                .egui_renderer
                .render(&mut render_pass, &shapes, &screen_descriptor);
        }

        for id in &egui_output.textures_delta.free {
            self.renderer.egui_renderer.free_texture(id);
        }

        self.renderer
            .gfx
            .queue
            .submit(std::iter::once(encoder.finish()));
        frame.present();

        for action in actions {
            self.apply(action);
        }

        Ok(())
    }
}
