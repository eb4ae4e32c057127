use crate::camera::{Camera, WORLD_UP};
use crate::filter::{Axis, Extent, FilterState};
use crate::predicate::host_retain;
use glam::{Vec2, Vec3};
use rayon::prelude::*;

/// Screen-space radius within which a point counts as under the cursor.
pub const PICK_TOLERANCE_PX: f32 = 6.0;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.dir * t
    }

    /// Parameter of the crossing with the plane `dot(normal, x) = offset`, if
    /// the plane lies ahead of the origin.
    pub fn intersect_plane(&self, normal: Vec3, offset: f32) -> Option<f32> {
        let denom = self.dir.dot(normal);
        if denom.abs() < 1.0e-6 {
            return None;
        }
        let t = (offset - self.origin.dot(normal)) / denom;
        (t.is_finite() && t >= 0.0).then_some(t)
    }
}

/// Drawable area in physical pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }

    /// Pixel (top-left origin) to normalized device coordinates.
    pub fn to_ndc(&self, px: Vec2) -> Option<Vec2> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return None;
        }
        Some(Vec2::new(
            2.0 * px.x / self.width - 1.0,
            1.0 - 2.0 * px.y / self.height,
        ))
    }

    fn to_px(&self, ndc: Vec2) -> Vec2 {
        Vec2::new(
            (ndc.x + 1.0) * 0.5 * self.width,
            (1.0 - ndc.y) * 0.5 * self.height,
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PickHit {
    pub index: usize,
    pub position: Vec3,
    /// Distance from the camera.
    pub distance: f32,
}

/// Nearest retained point within [`PICK_TOLERANCE_PX`] of `cursor`.
///
/// Ordering contract: the point closest to the camera wins; equal distances
/// go to the lower buffer index.
pub fn pick_point(
    camera: &Camera,
    viewport: Viewport,
    cursor: Vec2,
    positions: &[[f32; 3]],
    filter: &FilterState,
) -> Option<PickHit> {
    if viewport.width <= 0.0 || viewport.height <= 0.0 {
        return None;
    }
    let view_proj = camera.view_proj();
    let tol2 = PICK_TOLERANCE_PX * PICK_TOLERANCE_PX;

    positions
        .par_iter()
        .enumerate()
        .filter(|(_, p)| host_retain(filter, **p))
        .filter_map(|(index, p)| {
            let position = Vec3::from_array(*p);
            let clip = view_proj * position.extend(1.0);
            if clip.w <= 0.0 {
                return None;
            }
            let ndc = clip.truncate() / clip.w;
            if !(0.0..=1.0).contains(&ndc.z) {
                return None;
            }
            let screen = viewport.to_px(ndc.truncate());
            if screen.distance_squared(cursor) > tol2 {
                return None;
            }
            Some(PickHit {
                index,
                position,
                distance: position.distance(camera.position),
            })
        })
        .min_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.index.cmp(&b.index))
        })
}

/// Crossing of `ray` with the reference plane through the origin, normal to world up.
pub fn reference_plane_hit(ray: &Ray) -> Option<Vec3> {
    let t = ray.intersect_plane(WORLD_UP, 0.0)?;
    let p = ray.at(t);
    // Exactly on the plane; avoids "-0.00" from rounding noise.
    Some(Vec3::new(p.x, p.y, 0.0))
}

/// Live coordinate readout.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Readout {
    #[default]
    Empty,
    Point {
        raw: [f32; 3],
        /// Position within the observed extent, per axis in [0,1].
        normalized: [f32; 3],
    },
}

impl Readout {
    pub fn from_point(p: Vec3, observed: [Extent; 3]) -> Self {
        let raw = p.to_array();
        let normalized = Axis::ALL.map(|a| observed[a.index()].normalize(raw[a.index()]));
        Readout::Point { raw, normalized }
    }

    /// `"x, y, z"` with two decimals, or an empty string.
    pub fn label(&self) -> String {
        match self {
            Readout::Empty => String::new(),
            Readout::Point { raw, .. } => {
                let [x, y, z] = raw.map(two_decimals);
                format!("{:.2}, {:.2}, {:.2}", x, y, z)
            }
        }
    }

    pub fn normalized_label(&self) -> String {
        match self {
            Readout::Empty => String::new(),
            Readout::Point { normalized, .. } => {
                let [x, y, z] = normalized.map(two_decimals);
                format!("{:.2}, {:.2}, {:.2}", x, y, z)
            }
        }
    }
}

/// Rounds to two decimals and folds negative zero.
fn two_decimals(v: f32) -> f32 {
    (v * 100.0).round() / 100.0 + 0.0
}

/// Hover or selection marker.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Marker {
    pub position: Vec3,
    pub visible: bool,
}

impl Marker {
    pub fn show(&mut self, position: Vec3) {
        self.position = position;
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraPose;
    use crate::filter::{Endpoint, NativeExtent};

    fn top_down(at: Vec3) -> Camera {
        Camera::new(
            CameraPose {
                position: at + Vec3::new(0.0, 0.0, 10.0),
                target: at,
                up: Vec3::Y,
            },
            1.0,
        )
    }

    fn open_filter() -> FilterState {
        FilterState::new(NativeExtent::new([Extent::new(-20.0, 20.0); 3]))
    }

    const VIEW: Viewport = Viewport {
        width: 600.0,
        height: 600.0,
    };

    #[test]
    fn nearest_point_to_camera_wins() {
        let cam = top_down(Vec3::ZERO);
        let positions = vec![[0.0, 0.0, 0.0], [0.0, 0.0, 2.0], [5.0, 5.0, 0.0]];
        let hit = pick_point(&cam, VIEW, Vec2::new(300.0, 300.0), &positions, &open_filter()).unwrap();
        assert_eq!(hit.index, 1);
        assert!((hit.distance - 8.0).abs() < 1e-4);
    }

    #[test]
    fn equal_distance_goes_to_lower_index() {
        let cam = top_down(Vec3::ZERO);
        let positions = vec![[9.0, 9.0, 9.0], [0.0, 0.0, 1.0], [0.0, 0.0, 1.0]];
        let hit = pick_point(&cam, VIEW, Vec2::new(300.0, 300.0), &positions, &open_filter()).unwrap();
        assert_eq!(hit.index, 1);
    }

    #[test]
    fn filtered_points_are_not_pickable() {
        let cam = top_down(Vec3::ZERO);
        let positions = vec![[0.0, 0.0, 0.0]];
        let filter = open_filter()
            .set_enabled(Axis::X, true)
            .set_bound(Axis::X, Endpoint::Min, 1.0);
        assert!(pick_point(&cam, VIEW, Vec2::new(300.0, 300.0), &positions, &filter).is_none());
    }

    #[test]
    fn far_cursor_misses() {
        let cam = top_down(Vec3::ZERO);
        let positions = vec![[0.0, 0.0, 0.0]];
        assert!(pick_point(&cam, VIEW, Vec2::new(320.0, 300.0), &positions, &open_filter()).is_none());
    }

    #[test]
    fn plane_hit_under_top_down_camera() {
        let cam = top_down(Vec3::new(3.0, -1.0, 0.0));
        let ray = cam.screen_ray(VIEW, Vec2::new(300.0, 300.0)).unwrap();
        let p = reference_plane_hit(&ray).unwrap();
        assert!(p.abs_diff_eq(Vec3::new(3.0, -1.0, 0.0), 1e-4));
    }

    #[test]
    fn ray_parallel_to_plane_has_no_hit() {
        let ray = Ray {
            origin: Vec3::new(0.0, 0.0, 1.0),
            dir: Vec3::X,
        };
        assert_eq!(reference_plane_hit(&ray), None);
        let away = Ray {
            origin: Vec3::new(0.0, 0.0, 1.0),
            dir: Vec3::Z,
        };
        assert_eq!(reference_plane_hit(&away), None);
    }

    #[test]
    fn readout_formats_and_normalizes() {
        let observed = [Extent::new(0.0, 10.0), Extent::new(-5.0, 5.0), Extent::new(0.0, 0.0)];
        let r = Readout::from_point(Vec3::new(2.5, -0.0001, 0.0), observed);
        assert_eq!(r.label(), "2.50, 0.00, 0.00");
        assert_eq!(r.normalized_label(), "0.25, 0.50, 0.00");
        assert_eq!(Readout::Empty.label(), "");
    }
}
