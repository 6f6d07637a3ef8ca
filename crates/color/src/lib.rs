//! Color & gamma conversion: sRGB-to-linear LED-PWM mapping, and the two
//! fixed lookup tables chip encoders consult (HD108 log curve, WS2816
//! low-value error correction).

mod lut;

pub use lut::{hd108_lut, ws2816_correct};

use nalgebra::Matrix3;

/// sRGB-to-XYZ matrices for named working spaces. Only `srgb` is shipped;
/// the converter is generic so other spaces can be added without touching
/// call sites.
fn matrix_for(space: &str) -> Matrix3<f32> {
    match space {
        // Rec. 709 / sRGB primaries, D65 white point.
        _ => Matrix3::new(
            0.4124564, 0.3575761, 0.1804375, 0.2126729, 0.7151522, 0.0721750, 0.0193339,
            0.1191920, 0.9503041,
        ),
    }
}

/// Holds the active RGB-to-XYZ matrix for a named colorspace. Stateless
/// beyond the matrix; cheap to clone per terminal/strip.
#[derive(Debug, Clone)]
pub struct ColorSpaceConverter {
    matrix: Matrix3<f32>,
}

impl ColorSpaceConverter {
    pub fn named(space: &str) -> Self {
        Self {
            matrix: matrix_for(space),
        }
    }

    pub fn matrix(&self) -> &Matrix3<f32> {
        &self.matrix
    }
}

impl Default for ColorSpaceConverter {
    fn default() -> Self {
        Self::named("srgb")
    }
}

/// sRGB electro-optical transfer function: encoded [0,1] -> linear [0,1].
fn srgb_eotf(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Convert an 8-bit sRGB triple to linear LED-PWM values in `[0, max]`.
pub fn srgb8_to_led_pwm(r: u8, g: u8, b: u8, max: u16) -> (u16, u16, u16) {
    let conv = |c: u8| {
        let linear = srgb_eotf(c as f32 / 255.0);
        (linear * max as f32).round().clamp(0.0, max as f32) as u16
    };
    (conv(r), conv(g), conv(b))
}

/// Convert a single 8-bit sRGB-encoded component to a linear value in
/// `[0.0, 1.0]`. Used by the strip pixel pipeline, which works in unit-range
/// floats before scaling to the chip's native bit depth.
pub fn srgb_linear_unit(c: u8) -> f32 {
    srgb_eotf(c as f32 / 255.0)
}

/// HSV (all components `[0,1]`, `h` wrapping) to 8-bit RGB. Used by the
/// RAINBOW startup pattern to cycle hue over time.
pub fn hsv_to_rgb8(h: f32, s: f32, v: f32) -> (u8, u8, u8) {
    let h = h.rem_euclid(1.0) * 6.0;
    let s = s.clamp(0.0, 1.0);
    let v = v.clamp(0.0, 1.0);
    let i = h.floor() as i32;
    let f = h - h.floor();
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    let (r, g, b) = match i.rem_euclid(6) {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    let to_u8 = |c: f32| (c * 255.0).round().clamp(0.0, 255.0) as u8;
    (to_u8(r), to_u8(g), to_u8(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srgb_black_and_white_are_exact() {
        assert_eq!(srgb8_to_led_pwm(0, 0, 0, 255), (0, 0, 0));
        assert_eq!(srgb8_to_led_pwm(255, 255, 255, 255), (255, 255, 255));
    }

    #[test]
    fn srgb_midgray_is_darker_than_linear_midpoint() {
        // sRGB gamma means 8-bit 128 maps well below the linear midpoint.
        let (r, _, _) = srgb8_to_led_pwm(128, 128, 128, 65535);
        assert!(r < 32767);
    }

    #[test]
    fn srgb_is_monotonic() {
        let mut prev = 0u16;
        for v in 0..=255u8 {
            let (r, _, _) = srgb8_to_led_pwm(v, 0, 0, 65535);
            assert!(r >= prev);
            prev = r;
        }
    }

    #[test]
    fn hsv_red_at_zero_hue() {
        assert_eq!(hsv_to_rgb8(0.0, 1.0, 1.0), (255, 0, 0));
    }

    #[test]
    fn hsv_wraps_hue() {
        assert_eq!(hsv_to_rgb8(0.0, 1.0, 1.0), hsv_to_rgb8(1.0, 1.0, 1.0));
    }

    #[test]
    fn hsv_zero_saturation_is_gray() {
        let (r, g, b) = hsv_to_rgb8(0.3, 0.0, 0.5);
        assert_eq!((r, g, b), (128, 128, 128));
    }

    #[test]
    fn default_converter_is_srgb() {
        let conv = ColorSpaceConverter::default();
        // Row sums of the sRGB->XYZ matrix are close to 1 for the white point.
        let sum: f32 = conv.matrix().row(1).sum();
        assert!((sum - 1.0).abs() < 0.01);
    }
}
