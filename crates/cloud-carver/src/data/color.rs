//! Brings decoded colors into canonical form: three f32 channels in [0,1].

use pcd::ColorAttribute;

/// Converts any supported color encoding into normalized RGB. Runs once per load.
pub fn normalize_colors(attr: ColorAttribute) -> Vec<[f32; 3]> {
    match attr {
        ColorAttribute::Packed(values) => values.into_iter().map(unpack_normalized).collect(),
        ColorAttribute::Rgb(mut values) => {
            rescale_byte_scale(&mut values);
            for c in values.iter_mut() {
                *c = c.map(|v| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) });
            }
            values
        }
    }
}

/// `0x00RRGGBB` to normalized channels.
#[inline]
pub fn unpack_normalized(v: u32) -> [f32; 3] {
    pcd::unpack_rgb(v).map(|c| c as f32 / 255.0)
}

/// Divides every channel by 255 if any channel exceeds 1.0. Returns whether it did.
pub fn rescale_byte_scale(values: &mut [[f32; 3]]) -> bool {
    let max = values
        .iter()
        .flat_map(|c| c.iter().copied())
        .fold(f32::NEG_INFINITY, f32::max);

    if max > 1.0 {
        for c in values.iter_mut() {
            *c = c.map(|v| v / 255.0);
        }
        true
    } else {
        false
    }
}

/// Normalized channels back to `0x00RRGGBB`, each channel rounded to 0..=255.
#[inline]
pub fn pack_normalized(c: [f32; 3]) -> u32 {
    let [r, g, b] = c.map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8);
    pcd::pack_rgb(r, g, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_color_unpacks_to_unit_range() {
        let out = normalize_colors(ColorAttribute::Packed(vec![pcd::pack_rgb(255, 0, 128)]));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0][0], 1.0);
        assert_eq!(out[0][1], 0.0);
        assert!((out[0][2] - 0.501_96).abs() < 1e-5);
    }

    #[test]
    fn byte_scale_floats_are_rescaled_once() {
        let out = normalize_colors(ColorAttribute::Rgb(vec![[255.0, 51.0, 0.0], [0.5, 0.5, 0.5]]));
        assert_eq!(out[0], [1.0, 0.2, 0.0]);
        assert!((out[1][0] - 0.5 / 255.0).abs() < 1e-7);
    }

    #[test]
    fn normalized_floats_are_left_alone() {
        let input = vec![[0.0, 0.25, 1.0], [0.75, 0.5, 0.125]];
        let once = normalize_colors(ColorAttribute::Rgb(input.clone()));
        assert_eq!(once, input);

        let twice = normalize_colors(ColorAttribute::Rgb(once.clone()));
        assert_eq!(twice, once);
    }

    #[test]
    fn out_of_range_channels_are_clamped() {
        let out = normalize_colors(ColorAttribute::Rgb(vec![[300.0, -5.0, 10.0]]));
        assert_eq!(out[0][0], 1.0);
        assert_eq!(out[0][1], 0.0);
        assert!(out[0].iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn pack_inverts_unpack() {
        for v in [0x000000u32, 0xFF0080, 0x123456, 0xFFFFFF] {
            assert_eq!(pack_normalized(unpack_normalized(v)), v);
        }
    }
}
