//! Entry point for Cloud Carver.

use anyhow::Result;
use clap::Parser;
use cloud_carver::{app::App, config::Config};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use winit::{
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::WindowBuilder,
};

/// How often the loader is polled while a decode runs in the background.
const LOAD_POLL_INTERVAL: Duration = Duration::from_millis(50);

fn main() -> Result<()> {
    // Initialize logging; default to "info" if RUST_LOG is unset.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    log::debug!("{:?}", config);

    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Cloud Carver")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 800))
            .build(&event_loop)?,
    );

    let mut app = pollster::block_on(App::new(window.clone(), config.clone()))?;

    if let Some(path) = config.file {
        app.request_load(path);
    }

    event_loop.run(move |event, elwt| {
        match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => {
                if !app.handle_event(&window, &event) {
                    match event {
                        WindowEvent::CloseRequested => elwt.exit(),
                        WindowEvent::KeyboardInput { event, .. } => {
                            if event.physical_key == PhysicalKey::Code(KeyCode::Escape) {
                                elwt.exit();
                            }
                        }
                        WindowEvent::RedrawRequested => match app.render(&window) {
                            Ok(_) => {}
                            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                                app.resize(app.renderer.gfx.size);
                            }
                            Err(wgpu::SurfaceError::OutOfMemory) => {
                                log::error!("WGPU out of memory, exiting.");
                                elwt.exit();
                            }
                            Err(e) => log::error!("Render error: {:?}", e),
                        },
                        _ => {}
                    }
                }
            }
            Event::AboutToWait => {
                app.poll_loader();

                if app.needs_redraw() {
                    window.request_redraw();
                }

                // Rendering is on demand; only a running load needs a timer.
                if app.is_loading() {
                    elwt.set_control_flow(ControlFlow::WaitUntil(Instant::now() + LOAD_POLL_INTERVAL));
                } else {
                    elwt.set_control_flow(ControlFlow::Wait);
                }
            }
            _ => {}
        }
    })?;

    Ok(())
}
