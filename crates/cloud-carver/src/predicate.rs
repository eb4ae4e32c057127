//! The retain rule and its two realizations.
//!
//! ```text
//! retain(P) = AND over axis in {X,Y,Z} of
//!             (NOT enabled[axis] OR (min[axis] <= P[axis] <= max[axis]))
//! ```
//!
//! The device realization lives in `shaders/points.wgsl` and reads the
//! [`ShadingUniform`] bytes; [`device_retain`] mirrors it on the CPU so the
//! two can be compared. The host realization, [`host_retain`], reads the
//! [`FilterState`] directly and drives export and picking. Both compare f32
//! against f32, so they agree bit for bit.

use crate::data::types::ShadingUniform;
use crate::filter::{Axis, FilterState};
use rayon::prelude::*;

/// Host realization, evaluated against the filter state.
#[inline]
pub fn host_retain(filter: &FilterState, p: [f32; 3]) -> bool {
    Axis::ALL.iter().all(|&axis| {
        let b = filter.axis(axis);
        !b.enabled || b.extent().contains(p[axis.index()])
    })
}

/// Indices kept by [`host_retain`], in buffer order.
pub fn retained_indices(filter: &FilterState, positions: &[[f32; 3]]) -> Vec<usize> {
    positions
        .par_iter()
        .enumerate()
        .filter_map(|(i, p)| host_retain(filter, *p).then_some(i))
        .collect()
}

pub fn retained_count(filter: &FilterState, positions: &[[f32; 3]]) -> usize {
    positions
        .par_iter()
        .filter(|p| host_retain(filter, **p))
        .count()
}

/// CPU mirror of WGSL `retain()`, reading exactly what the GPU reads.
#[inline]
pub fn device_retain(u: &ShadingUniform, p: [f32; 3]) -> bool {
    for i in 0..3 {
        if u.axis_enabled[i] != 0 && !(u.axis_min[i] <= p[i] && p[i] <= u.axis_max[i]) {
            return false;
        }
    }
    true
}

/// Indices the point shader rasterizes under `u`.
pub fn device_retained_indices(u: &ShadingUniform, positions: &[[f32; 3]]) -> Vec<usize> {
    positions
        .par_iter()
        .enumerate()
        .filter_map(|(i, p)| device_retain(u, *p).then_some(i))
        .collect()
}

/// CPU mirror of WGSL `depth_ramp()`.
#[inline]
pub fn depth_ramp(t: f32) -> [f32; 3] {
    [t, 1.0 - (2.0 * t - 1.0).abs(), 1.0 - t]
}

/// CPU mirror of WGSL `shade()`: boosted point color, or the Z depth ramp
/// between the current Z bound pair when color is off or absent.
pub fn display_color(u: &ShadingUniform, p: [f32; 3], color: [f32; 3]) -> [f32; 3] {
    if u.use_color != 0 && u.has_color != 0 {
        return color.map(|c| (c * u.color_boost).clamp(0.0, 1.0));
    }
    let span = u.axis_max[2] - u.axis_min[2];
    let t = if span > 0.0 {
        ((p[2] - u.axis_min[2]) / span).clamp(0.0, 1.0)
    } else {
        0.0
    };
    depth_ramp(t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::ShadingParams;
    use crate::filter::{Endpoint, Extent, FilterEdit, NativeExtent};
    use glam::Mat4;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn uniform(filter: &FilterState, params: ShadingParams, has_color: bool) -> ShadingUniform {
        ShadingUniform::new(filter, &params, has_color, Mat4::IDENTITY, [800.0, 600.0])
    }

    fn native() -> NativeExtent {
        NativeExtent::new([
            Extent::new(-10.0, 10.0),
            Extent::new(-10.0, 10.0),
            Extent::new(0.0, 5.0),
        ])
    }

    /// Random points, with a share snapped to a 0.5 grid so they land exactly on bounds.
    fn synthetic_buffer(rng: &mut StdRng, n: usize) -> Vec<[f32; 3]> {
        (0..n)
            .map(|_| {
                let mut p = [
                    rng.gen_range(-11.0f32..11.0),
                    rng.gen_range(-11.0f32..11.0),
                    rng.gen_range(-1.0f32..6.0),
                ];
                if rng.gen_bool(0.3) {
                    p = p.map(|v| (v * 2.0).round() / 2.0);
                }
                p
            })
            .collect()
    }

    fn random_filter(rng: &mut StdRng) -> FilterState {
        let mut f = FilterState::new(native());
        for axis in Axis::ALL {
            f = f.apply(FilterEdit::SetEnabled {
                axis,
                enabled: rng.gen_bool(0.6),
            });
            for endpoint in [Endpoint::Min, Endpoint::Max] {
                let raw = rng.gen_range(-12.0f32..12.0);
                let value = if rng.gen_bool(0.5) {
                    (raw * 2.0).round() / 2.0
                } else {
                    raw
                };
                f = f.apply(FilterEdit::SetBound {
                    axis,
                    endpoint,
                    value,
                });
            }
        }
        f
    }

    #[test]
    fn host_and_device_select_identical_indices() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..200 {
            let positions = synthetic_buffer(&mut rng, 500);
            let filter = random_filter(&mut rng);
            let u = uniform(&filter, ShadingParams::default(), false);

            let host = retained_indices(&filter, &positions);
            let device = device_retained_indices(&u, &positions);
            assert_eq!(host, device, "filter {:?}", filter);
            assert_eq!(retained_count(&filter, &positions), host.len());
        }
    }

    #[test]
    fn bounds_are_inclusive_on_both_realizations() {
        let filter = FilterState::new(native())
            .set_enabled(Axis::X, true)
            .set_bound(Axis::X, Endpoint::Min, -2.0)
            .set_bound(Axis::X, Endpoint::Max, 2.0);
        let u = uniform(&filter, ShadingParams::default(), false);

        for (x, keep) in [(-2.0, true), (2.0, true), (-2.000_001, false), (2.000_001, false)] {
            let p = [x, 100.0, -100.0];
            assert_eq!(host_retain(&filter, p), keep, "x = {}", x);
            assert_eq!(device_retain(&u, p), keep, "x = {}", x);
        }
    }

    #[test]
    fn disabled_axes_retain_everything() {
        let filter = FilterState::new(native());
        let u = uniform(&filter, ShadingParams::default(), false);
        let far = [1e9, -1e9, 1e9];
        assert!(host_retain(&filter, far));
        assert!(device_retain(&u, far));
    }

    #[test]
    fn x_slab_scenario_keeps_only_the_slab() {
        let filter = FilterState::new(native())
            .set_enabled(Axis::X, true)
            .set_bound(Axis::X, Endpoint::Min, -2.0)
            .set_bound(Axis::X, Endpoint::Max, 2.0);
        let positions: Vec<[f32; 3]> = (-10..=10).map(|x| [x as f32, 0.0, 1.0]).collect();

        let kept = retained_indices(&filter, &positions);
        let xs: Vec<f32> = kept.iter().map(|&i| positions[i][0]).collect();
        assert_eq!(xs, vec![-2.0, -1.0, 0.0, 1.0, 2.0]);

        let u = uniform(&filter, ShadingParams::default(), false);
        assert_eq!(device_retained_indices(&u, &positions), kept);
    }

    #[test]
    fn boosted_color_is_clamped_per_channel() {
        let filter = FilterState::new(native());
        let params = ShadingParams {
            color_boost: 2.0,
            ..ShadingParams::default()
        };
        let u = uniform(&filter, params, true);
        assert_eq!(display_color(&u, [0.0; 3], [0.2, 0.6, 0.0]), [0.4, 1.0, 0.0]);
    }

    #[test]
    fn colorless_points_use_depth_ramp_between_z_bounds() {
        let filter = FilterState::new(native());
        let u = uniform(&filter, ShadingParams::default(), false);
        assert_eq!(display_color(&u, [0.0, 0.0, 0.0], [1.0; 3]), depth_ramp(0.0));
        assert_eq!(display_color(&u, [0.0, 0.0, 5.0], [1.0; 3]), depth_ramp(1.0));
        assert_eq!(display_color(&u, [0.0, 0.0, 2.5], [1.0; 3]), [0.5, 1.0, 0.5]);

        let off = uniform(
            &filter,
            ShadingParams {
                use_color: false,
                ..ShadingParams::default()
            },
            true,
        );
        assert_eq!(display_color(&off, [0.0, 0.0, 9.0], [1.0; 3]), depth_ramp(1.0));
    }

    #[test]
    fn color_preference_survives_a_colorless_cloud() {
        let filter = FilterState::new(native());
        let params = ShadingParams::default();

        // A colorless cloud falls back to the ramp without touching the preference.
        let plain = uniform(&filter, params, false);
        assert_eq!(plain.use_color, 1);
        assert_eq!(display_color(&plain, [0.0, 0.0, 2.5], [0.2, 0.4, 0.6]), [0.5, 1.0, 0.5]);

        // The next colored cloud is shaded with its colors straight away.
        let colored = uniform(&filter, params, true);
        assert_eq!(display_color(&colored, [0.0, 0.0, 2.5], [0.2, 0.4, 0.6]), [0.2, 0.4, 0.6]);
    }

    #[test]
    fn point_shader_validates_and_shares_the_uniform_layout() {
        use naga::valid::{Capabilities, ValidationFlags, Validator};
        use std::mem::{offset_of, size_of};

        const SOURCE: &str = include_str!("../shaders/points.wgsl");
        let module = naga::front::wgsl::parse_str(SOURCE)
            .map_err(|e| e.emit_to_string(SOURCE))
            .unwrap();
        Validator::new(ValidationFlags::all(), Capabilities::all())
            .validate(&module)
            .unwrap();

        let (_, uniform_var) = module
            .global_variables
            .iter()
            .find(|(_, g)| g.space == naga::AddressSpace::Uniform)
            .expect("uniform binding");
        assert_eq!(
            uniform_var.binding,
            Some(naga::ResourceBinding { group: 0, binding: 0 })
        );

        let shading = &module.types[uniform_var.ty];
        assert_eq!(shading.name.as_deref(), Some("Shading"));
        let naga::TypeInner::Struct { members, span } = &shading.inner else {
            panic!("Shading is not a struct");
        };
        assert_eq!(*span as usize, size_of::<ShadingUniform>());

        let layout: Vec<(&str, u32)> = members
            .iter()
            .map(|m| (m.name.as_deref().unwrap_or(""), m.offset))
            .collect();
        let expected = vec![
            ("view_proj", offset_of!(ShadingUniform, view_proj)),
            ("viewport_size", offset_of!(ShadingUniform, viewport_size)),
            ("point_size_px", offset_of!(ShadingUniform, point_size_px)),
            ("color_boost", offset_of!(ShadingUniform, color_boost)),
            ("use_color", offset_of!(ShadingUniform, use_color)),
            ("has_color", offset_of!(ShadingUniform, has_color)),
            ("_pad0", offset_of!(ShadingUniform, _pad0)),
            ("axis_enabled", offset_of!(ShadingUniform, axis_enabled)),
            ("axis_min", offset_of!(ShadingUniform, axis_min)),
            ("axis_max", offset_of!(ShadingUniform, axis_max)),
        ]
        .into_iter()
        .map(|(name, at)| (name, at as u32))
        .collect::<Vec<_>>();
        assert_eq!(layout, expected);

        for entry in ["retain", "depth_ramp", "shade"] {
            assert!(
                module.functions.iter().any(|(_, f)| f.name.as_deref() == Some(entry)),
                "points.wgsl lost `{}`",
                entry
            );
        }
    }
}
