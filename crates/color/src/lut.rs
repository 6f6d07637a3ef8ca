//! Fixed lookup tables computed once at first use and held immutable for
//! the life of the process — no mutation after init, per the
//! compile-time-constant-table re-architecture note.

use std::sync::OnceLock;

/// HD108 per-channel log curve, 256 entries per channel, values in
/// `[0, 65535]`. Red is a straight power curve; green and blue follow the
/// chip's log-gain curve, grounded directly on `original_source/strip.cpp`'s
/// `make_hd108_table` (the `ga`/`gai`/`gbi` constant names below match it
/// one for one).
static HD108_LUT: OnceLock<[[u16; 256]; 3]> = OnceLock::new();

const HD108_GREEN_CONST: f64 = 0.760;
const HD108_BLUE_CONST: f64 = 0.550;

/// `ga`, `gai`, `gbi` (or the blue analogue) for one log channel, derived
/// from its gain constant exactly as `strip.cpp` derives them.
fn hd108_log_constants(channel_const: f64) -> (f64, f64, f64) {
    let a = (-channel_const).exp() - 1.0;
    let ai = 1.0 / a;
    let bi = -1.0 / channel_const;
    (a, ai, bi)
}

fn hd108_log_channel(t: f64, channel_const: f64) -> f64 {
    let (a, ai, bi) = hd108_log_constants(channel_const);
    (((t + ai) * a).ln() * bi).powf(2.4)
}

fn build_hd108_lut() -> [[u16; 256]; 3] {
    let mut red = [0u16; 256];
    let mut green = [0u16; 256];
    let mut blue = [0u16; 256];

    for i in 0..256 {
        let t = i as f64 / 255.0;
        red[i] = (t.powf(2.4) * 65535.0).round().clamp(0.0, 65535.0) as u16;
        green[i] = (hd108_log_channel(t, HD108_GREEN_CONST) * 65535.0)
            .round()
            .clamp(0.0, 65535.0) as u16;
        blue[i] = (hd108_log_channel(t, HD108_BLUE_CONST) * 65535.0)
            .round()
            .clamp(0.0, 65535.0) as u16;
    }

    [red, green, blue]
}

/// HD108 curve LUT: `[channel][0..256]`, channel 0=red, 1=green, 2=blue.
pub fn hd108_lut() -> &'static [[u16; 256]; 3] {
    HD108_LUT.get_or_init(build_hd108_lut)
}

/// WS2816 low-value error table: 438 entries correcting the chip's
/// nonlinear response near zero. Any intended 16-bit value `v < 438` should
/// be passed through [`ws2816_correct`].
static WS2816_LUT: OnceLock<[u16; 438]> = OnceLock::new();

fn build_ws2816_lut() -> [u16; 438] {
    let mut table = [0u16; 438];
    for (v, slot) in table.iter_mut().enumerate() {
        *slot = ((v as u32 * 255) / 438) as u16;
    }
    table
}

/// Remap a 16-bit value through the WS2816 low-value error table if it
/// falls below the table's domain; values at or above 438 pass through.
pub fn ws2816_correct(v: u16) -> u16 {
    let table = WS2816_LUT.get_or_init(build_ws2816_lut);
    match table.get(v as usize) {
        Some(&corrected) => corrected,
        None => v,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hd108_red_channel_endpoints() {
        let lut = hd108_lut();
        assert_eq!(lut[0][0], 0);
        assert_eq!(lut[0][255], 65535);
    }

    #[test]
    fn hd108_all_channels_are_off_at_zero_input() {
        let lut = hd108_lut();
        assert_eq!(lut[0][0], 0, "red");
        assert_eq!(lut[1][0], 0, "green");
        assert_eq!(lut[2][0], 0, "blue");
    }

    #[test]
    fn hd108_green_and_blue_reach_full_scale() {
        let lut = hd108_lut();
        assert_eq!(lut[1][255], 65535);
        assert_eq!(lut[2][255], 65535);
    }

    #[test]
    fn hd108_channels_monotonic() {
        let lut = hd108_lut();
        for channel in lut.iter() {
            let mut prev = 0u16;
            for &v in channel.iter() {
                assert!(v >= prev);
                prev = v;
            }
        }
    }

    #[test]
    fn ws2816_table_has_438_entries_and_is_monotonic() {
        let mut prev = 0u16;
        for v in 0..438u16 {
            let c = ws2816_correct(v);
            assert!(c >= prev);
            prev = c;
        }
    }

    #[test]
    fn ws2816_passes_through_above_domain() {
        assert_eq!(ws2816_correct(438), 438);
        assert_eq!(ws2816_correct(60000), 60000);
    }

    #[test]
    fn ws2816_lut_is_cached_across_calls() {
        let a = ws2816_correct(100);
        let b = ws2816_correct(100);
        assert_eq!(a, b);
    }
}
