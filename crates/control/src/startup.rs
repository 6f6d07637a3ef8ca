//! Startup pattern generator: paints a strip before any lighting data has
//! been received. Output is always computed as 8-bit RGB and handed to
//! [`strip::Strip::set_data`] under [`types::InputFormat::Rgb8`], so each
//! chip's own pixel pipeline (reorder, bit depth, gamma) still applies —
//! patterns never bypass the format matrix.

use color::hsv_to_rgb8;
use types::{Rgb8, StartupMode, StripConfig};

/// RAINBOW hue cycle and TRACER/SOLID_TRACER traversal both repeat on this
/// period (spec §4.5: "period ≈5 s" for the tracers, "≈10 s" for rainbow).
const RAINBOW_PERIOD_MS: u64 = 10_000;
const TRACER_PERIOD_MS: u64 = 5_000;

fn phase(elapsed_ms: u64, period_ms: u64) -> f32 {
    (elapsed_ms % period_ms) as f32 / period_ms as f32
}

/// Render one frame of `cfg.startup_mode` for a strip of `pixel_count`
/// pixels, `elapsed_ms` since boot (or since the pattern started), as a
/// flat RGB8 byte buffer ready for `Strip::set_data`.
pub fn render(cfg: &StripConfig, elapsed_ms: u64) -> Vec<u8> {
    let n = cfg.pixel_count as usize;
    let mut out = vec![0u8; n * 3];

    match cfg.startup_mode {
        StartupMode::NoData => {}

        StartupMode::Color => {
            for px in out.chunks_mut(3) {
                px.copy_from_slice(&[cfg.startup_color.r, cfg.startup_color.g, cfg.startup_color.b]);
            }
        }

        StartupMode::Rainbow => {
            let phase = phase(elapsed_ms, RAINBOW_PERIOD_MS);
            for (i, px) in out.chunks_mut(3).enumerate() {
                let h = (1.0 - phase + i as f32 / 255.0).rem_euclid(1.0);
                let (r, g, b) = hsv_to_rgb8(h, 1.0, 1.0);
                px.copy_from_slice(&[r, g, b]);
            }
        }

        StartupMode::Tracer => {
            if n > 0 {
                let phase = phase(elapsed_ms, TRACER_PERIOD_MS);
                let pos = ((phase * n as f32) as usize).min(n - 1);
                let Rgb8 { r, g, b } = cfg.startup_color;
                out[pos * 3..pos * 3 + 3].copy_from_slice(&[r, g, b]);
            }
        }

        StartupMode::SolidTracer => {
            if n > 0 {
                let phase = phase(elapsed_ms, TRACER_PERIOD_MS);
                let lit = ((phase * n as f32) as usize).min(n);
                let Rgb8 { r, g, b } = cfg.startup_color;
                for px in out[..lit * 3].chunks_mut(3) {
                    px.copy_from_slice(&[r, g, b]);
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{ChipType, InputFormat};

    fn cfg(mode: StartupMode, pixel_count: u16) -> StripConfig {
        StripConfig {
            name: "t".into(),
            chip: ChipType::Ws2812,
            input_format: InputFormat::Rgb8,
            startup_mode: mode,
            startup_color: Rgb8 { r: 10, g: 20, b: 30 },
            component_limit: 1.0,
            global_illum: 1.0,
            pixel_count,
            artnet_universes: [0; 6],
            e131_universes: [0; 6],
        }
    }

    #[test]
    fn nodata_is_blank() {
        let out = render(&cfg(StartupMode::NoData, 4), 0);
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn color_fills_every_pixel() {
        let out = render(&cfg(StartupMode::Color, 3), 0);
        for px in out.chunks(3) {
            assert_eq!(px, &[10, 20, 30]);
        }
    }

    #[test]
    fn rainbow_pixel_zero_at_t0_is_full_red() {
        let out = render(&cfg(StartupMode::Rainbow, 8), 0);
        // h = (1 - 0) + 0/255 mod 1 == 0 -> pure red.
        assert_eq!(&out[0..3], &[255, 0, 0]);
    }

    #[test]
    fn tracer_lights_exactly_one_pixel() {
        let out = render(&cfg(StartupMode::Tracer, 10), 0);
        let lit = out.chunks(3).filter(|px| *px != [0, 0, 0]).count();
        assert_eq!(lit, 1);
    }

    #[test]
    fn solid_tracer_grows_over_time() {
        let early = render(&cfg(StartupMode::SolidTracer, 10), 0);
        let later = render(&cfg(StartupMode::SolidTracer, 10), TRACER_PERIOD_MS / 2);
        let count = |buf: &[u8]| buf.chunks(3).filter(|px| *px != [0, 0, 0]).count();
        assert!(count(&later) >= count(&early));
    }
}
