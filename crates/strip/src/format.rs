//! Input-format demux and per-pixel conversion pipeline: optional
//! sRGB→linear, white-channel extraction/injection, component clamp,
//! byte-order reorder, and the chip-specific low-value/log LUTs.
//!
//! Pure functions only — no global mutable state on this path, so the same
//! input always produces the same encoded bytes (spec's round-trip law).

use color::{hd108_lut, srgb_linear_unit, ws2816_correct};
use types::{ChipType, InputFormat, NativeType, Reorder, StripConfig};

fn read_u16(raw: &[u8], i: usize, msb: bool) -> u16 {
    let a = raw[i * 2];
    let b = raw[i * 2 + 1];
    if msb {
        u16::from_be_bytes([a, b])
    } else {
        u16::from_le_bytes([a, b])
    }
}

/// Decode one input pixel (already sliced to `input.bytes_per_pixel()`
/// bytes) into linear `(r, g, b, w)` fractions in `[0.0, 1.0]`. `w` is
/// `None` when the input format carries no white channel.
fn decode_input_pixel(input: InputFormat, raw: &[u8]) -> (f32, f32, f32, Option<f32>) {
    if input.is_16bit() {
        let msb = input.is_msb();
        let r = read_u16(raw, 0, msb) as f32 / 65535.0;
        let g = read_u16(raw, 1, msb) as f32 / 65535.0;
        let b = read_u16(raw, 2, msb) as f32 / 65535.0;
        let w = input
            .has_white()
            .then(|| read_u16(raw, 3, msb) as f32 / 65535.0);
        (r, g, b, w)
    } else if input.is_srgb() {
        let r = srgb_linear_unit(raw[0]);
        let g = srgb_linear_unit(raw[1]);
        let b = srgb_linear_unit(raw[2]);
        let w = input.has_white().then(|| raw[3] as f32 / 255.0);
        (r, g, b, w)
    } else {
        let r = raw[0] as f32 / 255.0;
        let g = raw[1] as f32 / 255.0;
        let b = raw[2] as f32 / 255.0;
        let w = input.has_white().then(|| raw[3] as f32 / 255.0);
        (r, g, b, w)
    }
}

/// Apply white-channel extraction/injection and the per-component clamp,
/// returning up to 4 fractions `[r,g,b,w]` in `[0.0, limit]` sized for the
/// chip's native component count.
fn reconcile_white(
    native: NativeType,
    limit: f32,
    r: f32,
    g: f32,
    b: f32,
    w: Option<f32>,
) -> [f32; 4] {
    let native_has_white = matches!(native, NativeType::Rgbw8);
    let mut out = [0.0f32; 4];

    match (w, native_has_white) {
        (Some(wv), false) => {
            // RGBW -> RGB collapse.
            out[0] = (r + wv).min(limit);
            out[1] = (g + wv).min(limit);
            out[2] = (b + wv).min(limit);
        }
        (None, true) => {
            // RGB -> RGBW expansion.
            let m = r.min(g).min(b);
            out[0] = (r - m).clamp(0.0, limit);
            out[1] = (g - m).clamp(0.0, limit);
            out[2] = (b - m).clamp(0.0, limit);
            out[3] = m.clamp(0.0, limit);
        }
        (wv, _) => {
            out[0] = r.min(limit);
            out[1] = g.min(limit);
            out[2] = b.min(limit);
            if native_has_white {
                out[3] = wv.unwrap_or(0.0).min(limit);
            }
        }
    }
    for v in out.iter_mut() {
        *v = v.max(0.0);
    }
    out
}

/// Convert one already-decoded-and-reconciled pixel to its final native
/// byte sequence: per-component bit-depth expansion (with the HD108/WS2816
/// LUTs substituted where applicable), then chip-specific reorder.
fn to_native_bytes(chip: ChipType, comps: [f32; 4]) -> Vec<u8> {
    let native = chip.native_type();
    let n = match native {
        NativeType::Rgb8 | NativeType::Rgb16 => 3,
        NativeType::Rgbw8 => 4,
    };

    let mut raw_vals = [0u32; 4];
    for (i, slot) in raw_vals.iter_mut().enumerate().take(n) {
        let frac = comps[i];
        *slot = match native {
            NativeType::Rgb8 | NativeType::Rgbw8 => {
                (frac * 255.0).round().clamp(0.0, 255.0) as u32
            }
            NativeType::Rgb16 if chip == ChipType::Hd108 => {
                let idx = (frac * 255.0).round().clamp(0.0, 255.0) as usize;
                hd108_lut()[i][idx] as u32
            }
            NativeType::Rgb16 => {
                let v8 = (frac * 255.0).round().clamp(0.0, 255.0) as u16;
                let v16 = (v8 << 8) | v8;
                let corrected = if chip == ChipType::Ws2816 {
                    ws2816_correct(v16)
                } else {
                    v16
                };
                corrected as u32
            }
        };
    }

    let reordered: Vec<u32> = match chip.reorder() {
        Reorder::Three(idx) => idx.iter().map(|&i| raw_vals[i]).collect(),
        Reorder::Four(idx) => idx.iter().map(|&i| raw_vals[i]).collect(),
    };

    let mut out = Vec::with_capacity(reordered.len() * if native == NativeType::Rgb16 { 2 } else { 1 });
    for v in reordered {
        if native == NativeType::Rgb16 {
            out.extend_from_slice(&(v as u16).to_be_bytes());
        } else {
            out.push(v as u8);
        }
    }
    out
}

/// Full per-pixel conversion: input DMX bytes -> native chip bytes, using
/// the strip's own configured input format.
pub fn convert_pixel(cfg: &StripConfig, raw: &[u8]) -> Vec<u8> {
    convert_pixel_as(cfg, raw, cfg.input_format)
}

/// Same conversion, but with the input format supplied explicitly rather
/// than read from `cfg` — each universe write carries its own format byte,
/// which need not match the strip's resting configuration until applied.
pub fn convert_pixel_as(cfg: &StripConfig, raw: &[u8], input: InputFormat) -> Vec<u8> {
    let (r, g, b, w) = decode_input_pixel(input, raw);
    let limit = cfg.component_limit.clamp(0.0, 1.0);
    let comps = reconcile_white(cfg.chip.native_type(), limit, r, g, b, w);
    to_native_bytes(cfg.chip, comps)
}
