//! Wireframe box describing the active filter region.

use crate::filter::{Axis, FilterState};
use glam::Vec3;

/// Axis-aligned box in centered world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    /// Box spanned by the enabled bounds, with disabled axes at their native
    /// extent. `None` while no axis is enabled.
    pub fn from_filter(filter: &FilterState) -> Option<Self> {
        if !filter.any_enabled() {
            return None;
        }

        let mut min = [0.0f32; 3];
        let mut max = [0.0f32; 3];
        for axis in Axis::ALL {
            let b = filter.axis(axis);
            let e = if b.enabled {
                b.extent()
            } else {
                filter.native().axis(axis)
            };
            min[axis.index()] = e.min;
            max[axis.index()] = e.max;
        }

        Some(Self {
            min: Vec3::from_array(min),
            max: Vec3::from_array(max),
        })
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(b.x, b.y, b.z),
            Vec3::new(a.x, b.y, b.z),
        ]
    }

    /// Corner index pairs of the 12 edges.
    pub const EDGES: [(usize, usize); 12] = [
        (0, 1),
        (1, 2),
        (2, 3),
        (3, 0),
        (4, 5),
        (5, 6),
        (6, 7),
        (7, 4),
        (0, 4),
        (1, 5),
        (2, 6),
        (3, 7),
    ];

    /// Line-list vertices, two per edge.
    pub fn line_vertices(&self) -> [[f32; 3]; 24] {
        let c = self.corners();
        let mut out = [[0.0; 3]; 24];
        for (i, (a, b)) in Self::EDGES.iter().enumerate() {
            out[2 * i] = c[*a].to_array();
            out[2 * i + 1] = c[*b].to_array();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Endpoint, Extent, NativeExtent};

    fn native() -> NativeExtent {
        NativeExtent::new([
            Extent::new(-10.0, 10.0),
            Extent::new(-10.0, 10.0),
            Extent::new(0.0, 5.0),
        ])
    }

    #[test]
    fn hidden_while_no_axis_is_enabled() {
        assert_eq!(BoundingBox::from_filter(&FilterState::new(native())), None);
    }

    #[test]
    fn disabled_axes_span_native_extent() {
        let filter = FilterState::new(native())
            .set_enabled(Axis::X, true)
            .set_bound(Axis::X, Endpoint::Min, -2.0)
            .set_bound(Axis::X, Endpoint::Max, 2.0);
        let bb = BoundingBox::from_filter(&filter).unwrap();

        assert_eq!(bb.min, Vec3::new(-2.0, -10.0, 0.0));
        assert_eq!(bb.max, Vec3::new(2.0, 10.0, 5.0));
        assert_eq!(bb.center(), Vec3::new(0.0, 0.0, 2.5));
        assert_eq!(bb.size(), Vec3::new(4.0, 20.0, 5.0));
    }

    #[test]
    fn disabling_last_axis_removes_the_box() {
        let filter = FilterState::new(native()).set_enabled(Axis::Z, true);
        assert!(BoundingBox::from_filter(&filter).is_some());
        assert!(BoundingBox::from_filter(&filter.set_enabled(Axis::Z, false)).is_none());
    }

    #[test]
    fn every_edge_is_axis_aligned() {
        let bb = BoundingBox {
            min: Vec3::splat(-1.0),
            max: Vec3::new(1.0, 2.0, 3.0),
        };
        let v = bb.line_vertices();
        for pair in v.chunks(2) {
            let differing = (0..3).filter(|&i| pair[0][i] != pair[1][i]).count();
            assert_eq!(differing, 1);
        }
    }
}
