//! Pointer state machine driving the camera.
//!
//! ```text
//! Idle --press--> OrbitDragging --|d| > 10px--> AxisLockedHorizontal | AxisLockedVertical
//! Idle --shift+press--> ViewAxisRotating
//! any --release--> Idle
//! ```

use crate::camera::Camera;
use glam::Vec2;
use std::time::{Duration, Instant};

/// Drag distance from the press point after which the orbit axis is locked.
pub const AXIS_LOCK_THRESHOLD_PX: f32 = 10.0;
/// Orbit radians per pixel.
pub const ORBIT_SENSITIVITY: f32 = 0.005;
/// View-axis rotation radians per pixel.
pub const ROLL_SENSITIVITY: f32 = 0.01;
pub const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(400);
pub const DOUBLE_CLICK_SLOP_PX: f32 = 6.0;
/// Press-to-release travel below which a release counts as a click.
pub const CLICK_SLOP_PX: f32 = 4.0;
/// Base of the exponential wheel zoom.
pub const ZOOM_STEP: f32 = 1.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    OrbitDragging,
    AxisLockedHorizontal,
    AxisLockedVertical,
    ViewAxisRotating,
}

/// Primary-button pointer input, in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Pressed { pos: Vec2, modifier: bool, at: Instant },
    Moved { pos: Vec2 },
    Released { pos: Vec2 },
    /// Wheel lines; positive zooms in.
    Scrolled { delta: f32 },
}

/// What the caller has to follow up on after one event.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Response {
    pub camera_changed: bool,
    /// Cursor position to hover-pick at.
    pub hover: Option<Vec2>,
    /// Cursor position of a completed click.
    pub click: Option<Vec2>,
    pub reset_view: bool,
}

#[derive(Debug, Default)]
pub struct Interaction {
    state: DragState,
    press_pos: Vec2,
    last_pos: Vec2,
    last_press: Option<(Instant, Vec2)>,
}

impl Interaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn handle(&mut self, event: PointerEvent, camera: &mut Camera) -> Response {
        let mut out = Response::default();

        match event {
            PointerEvent::Pressed { pos, modifier, at } => {
                let double = self.last_press.is_some_and(|(t, p)| {
                    at.saturating_duration_since(t) <= DOUBLE_CLICK_WINDOW
                        && p.distance(pos) <= DOUBLE_CLICK_SLOP_PX
                });
                if double {
                    out.reset_view = true;
                    out.camera_changed = true;
                    self.last_press = None;
                } else {
                    self.last_press = Some((at, pos));
                }

                self.state = if modifier {
                    DragState::ViewAxisRotating
                } else {
                    DragState::OrbitDragging
                };
                self.press_pos = pos;
                self.last_pos = pos;
            }

            PointerEvent::Moved { pos } => {
                let step = pos - self.last_pos;
                self.last_pos = pos;

                match self.state {
                    DragState::Idle => {}
                    DragState::OrbitDragging => {
                        let d = pos - self.press_pos;
                        if d.x.abs() > AXIS_LOCK_THRESHOLD_PX || d.y.abs() > AXIS_LOCK_THRESHOLD_PX {
                            if d.x.abs() > d.y.abs() {
                                self.state = DragState::AxisLockedHorizontal;
                                camera.orbit(-d.x * ORBIT_SENSITIVITY, 0.0);
                            } else {
                                self.state = DragState::AxisLockedVertical;
                                camera.orbit(0.0, -d.y * ORBIT_SENSITIVITY);
                            }
                            log::debug!("Orbit locked: {:?} (d = {:.1}, {:.1})", self.state, d.x, d.y);
                            out.camera_changed = true;
                        }
                    }
                    DragState::AxisLockedHorizontal => {
                        if step.x != 0.0 {
                            camera.orbit(-step.x * ORBIT_SENSITIVITY, 0.0);
                            out.camera_changed = true;
                        }
                    }
                    DragState::AxisLockedVertical => {
                        if step.y != 0.0 {
                            camera.orbit(0.0, -step.y * ORBIT_SENSITIVITY);
                            out.camera_changed = true;
                        }
                    }
                    DragState::ViewAxisRotating => {
                        if step.x != 0.0 {
                            camera.roll(step.x * ROLL_SENSITIVITY);
                            out.camera_changed = true;
                        }
                    }
                }

                if self.state != DragState::ViewAxisRotating {
                    out.hover = Some(pos);
                }
            }

            PointerEvent::Released { pos } => {
                if self.state != DragState::Idle {
                    if pos.distance(self.press_pos) < CLICK_SLOP_PX {
                        out.click = Some(pos);
                    }
                    self.state = DragState::Idle;
                }
                self.last_pos = pos;
            }

            PointerEvent::Scrolled { delta } => {
                if delta != 0.0 {
                    camera.zoom(ZOOM_STEP.powf(-delta));
                    out.camera_changed = true;
                }
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{CameraPose, WORLD_UP};
    use glam::Vec3;

    fn camera() -> Camera {
        Camera::new(
            CameraPose {
                position: Vec3::new(0.0, -10.0, 10.0),
                target: Vec3::ZERO,
                up: WORLD_UP,
            },
            1.0,
        )
    }

    fn press(ix: &mut Interaction, cam: &mut Camera, x: f32, y: f32, modifier: bool, at: Instant) -> Response {
        ix.handle(
            PointerEvent::Pressed {
                pos: Vec2::new(x, y),
                modifier,
                at,
            },
            cam,
        )
    }

    fn mv(ix: &mut Interaction, cam: &mut Camera, x: f32, y: f32) -> Response {
        ix.handle(PointerEvent::Moved { pos: Vec2::new(x, y) }, cam)
    }

    fn release(ix: &mut Interaction, cam: &mut Camera, x: f32, y: f32) -> Response {
        ix.handle(PointerEvent::Released { pos: Vec2::new(x, y) }, cam)
    }

    #[test]
    fn first_crossing_locks_horizontal_and_suppresses_pitch() {
        let mut cam = camera();
        let mut ix = Interaction::new();
        let start = cam.pose();
        let polar = cam.polar_angle();
        let azimuth = cam.azimuth_angle();

        press(&mut ix, &mut cam, 0.0, 0.0, false, Instant::now());
        assert_eq!(ix.state(), DragState::OrbitDragging);

        let r = mv(&mut ix, &mut cam, 5.0, 1.0);
        assert!(!r.camera_changed);
        assert_eq!(cam.pose(), start);

        mv(&mut ix, &mut cam, 12.0, 3.0);
        assert_eq!(ix.state(), DragState::AxisLockedHorizontal);
        assert!((cam.azimuth_angle() - (azimuth - 12.0 * ORBIT_SENSITIVITY)).abs() < 1e-4);

        let r = mv(&mut ix, &mut cam, 12.0, 200.0);
        assert!(!r.camera_changed);
        assert!((cam.polar_angle() - polar).abs() < 1e-4);
        assert_eq!(ix.state(), DragState::AxisLockedHorizontal);
    }

    #[test]
    fn vertical_lock_suppresses_yaw() {
        let mut cam = camera();
        let mut ix = Interaction::new();
        let azimuth = cam.azimuth_angle();
        let polar = cam.polar_angle();

        press(&mut ix, &mut cam, 100.0, 100.0, false, Instant::now());
        mv(&mut ix, &mut cam, 103.0, 120.0);
        assert_eq!(ix.state(), DragState::AxisLockedVertical);
        assert!((cam.polar_angle() - (polar - 20.0 * ORBIT_SENSITIVITY)).abs() < 1e-4);

        mv(&mut ix, &mut cam, 300.0, 120.0);
        assert!((cam.azimuth_angle() - azimuth).abs() < 1e-4);
    }

    #[test]
    fn release_clears_the_lock() {
        let mut cam = camera();
        let mut ix = Interaction::new();
        press(&mut ix, &mut cam, 0.0, 0.0, false, Instant::now());
        mv(&mut ix, &mut cam, 30.0, 0.0);
        assert_eq!(ix.state(), DragState::AxisLockedHorizontal);

        let r = release(&mut ix, &mut cam, 30.0, 0.0);
        assert_eq!(ix.state(), DragState::Idle);
        assert_eq!(r.click, None);

        let t = Instant::now() + DOUBLE_CLICK_WINDOW * 2;
        press(&mut ix, &mut cam, 0.0, 0.0, false, t);
        mv(&mut ix, &mut cam, 0.0, 30.0);
        assert_eq!(ix.state(), DragState::AxisLockedVertical);
    }

    #[test]
    fn modifier_press_rolls_about_view_axis() {
        let mut cam = camera();
        let mut ix = Interaction::new();
        let start = cam.pose();

        press(&mut ix, &mut cam, 0.0, 0.0, true, Instant::now());
        assert_eq!(ix.state(), DragState::ViewAxisRotating);

        let r = mv(&mut ix, &mut cam, 50.0, 80.0);
        assert!(r.camera_changed);
        assert_eq!(r.hover, None);
        assert!(cam.position.abs_diff_eq(start.position, 1e-3));
        let angle = cam.up.angle_between(start.up);
        assert!((angle - 50.0 * ROLL_SENSITIVITY).abs() < 1e-3);

        release(&mut ix, &mut cam, 50.0, 80.0);
        assert_eq!(ix.state(), DragState::Idle);
    }

    #[test]
    fn double_press_requests_reset() {
        let mut cam = camera();
        let mut ix = Interaction::new();
        let t0 = Instant::now();

        let r = press(&mut ix, &mut cam, 10.0, 10.0, false, t0);
        assert!(!r.reset_view);
        release(&mut ix, &mut cam, 10.0, 10.0);

        let r = press(&mut ix, &mut cam, 12.0, 11.0, false, t0 + Duration::from_millis(150));
        assert!(r.reset_view);
        release(&mut ix, &mut cam, 12.0, 11.0);

        // The pair is consumed; a third press starts over.
        let r = press(&mut ix, &mut cam, 12.0, 11.0, false, t0 + Duration::from_millis(300));
        assert!(!r.reset_view);

        let r = press(&mut ix, &mut cam, 12.0, 11.0, false, t0 + Duration::from_millis(1000));
        assert!(!r.reset_view);
    }

    #[test]
    fn short_release_is_a_click_and_drag_is_not() {
        let mut cam = camera();
        let mut ix = Interaction::new();
        let t0 = Instant::now();

        press(&mut ix, &mut cam, 40.0, 40.0, false, t0);
        mv(&mut ix, &mut cam, 42.0, 41.0);
        let r = release(&mut ix, &mut cam, 42.0, 41.0);
        assert_eq!(r.click, Some(Vec2::new(42.0, 41.0)));

        press(&mut ix, &mut cam, 40.0, 40.0, false, t0 + Duration::from_secs(2));
        mv(&mut ix, &mut cam, 48.0, 40.0);
        let r = release(&mut ix, &mut cam, 48.0, 40.0);
        assert_eq!(r.click, None);
    }

    #[test]
    fn idle_moves_request_hover_and_wheel_zooms() {
        let mut cam = camera();
        let mut ix = Interaction::new();
        let r = mv(&mut ix, &mut cam, 5.0, 5.0);
        assert_eq!(r.hover, Some(Vec2::new(5.0, 5.0)));
        assert!(!r.camera_changed);

        let radius = cam.radius();
        let r = ix.handle(PointerEvent::Scrolled { delta: 1.0 }, &mut cam);
        assert!(r.camera_changed);
        assert!((cam.radius() - radius / 1.1).abs() < 1e-3);
    }
}
