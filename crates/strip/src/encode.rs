//! Line encoders: native component bytes -> the wire format each chip
//! family actually expects. Four families, selected by [`types::ChipType`]:
//! self-clocked NRZ bit expansion, clocked start/header/end framing,
//! raw/7-high-bit byte framing, and Manchester-coded TLS3001.

use std::sync::OnceLock;

use types::{ChipType, NativeType};

/// Idle bytes emitted before and after a self-clocked NRZ line, split evenly
/// between the leading and trailing latch run.
const NRZ_LATCH_BYTES: usize = 64;

static NRZ_TABLE: OnceLock<[u32; 256]> = OnceLock::new();

/// Every input bit expands to a 3-bit line code (`0b110` for a 1, `0b100`
/// for a 0), eight bits packed MSB-first into the high 24 bits of a 32-bit
/// word.
fn build_nrz_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    for (byte, slot) in table.iter_mut().enumerate() {
        let mut code: u32 = 0;
        for bit_idx in (0..8).rev() {
            let bit = (byte >> bit_idx) & 1;
            let pattern: u32 = if bit == 1 { 0b110 } else { 0b100 };
            code = (code << 3) | pattern;
        }
        *slot = code << 8;
    }
    table
}

fn nrz_table() -> &'static [u32; 256] {
    NRZ_TABLE.get_or_init(build_nrz_table)
}

fn encode_nrz(native: &[u8]) -> Vec<u8> {
    let table = nrz_table();
    let half_latch = NRZ_LATCH_BYTES / 2;
    let mut out = Vec::with_capacity(native.len() * 4 + NRZ_LATCH_BYTES);
    out.resize(half_latch, 0);
    for &b in native {
        out.extend_from_slice(&table[b as usize].to_be_bytes());
    }
    out.resize(out.len() + half_latch, 0);
    out
}

/// Five-bit global illumination field used by the APA102-style header byte.
fn illum5(global_illum: f32) -> u8 {
    (global_illum.clamp(0.0, 1.0) * 31.0).round() as u8 & 0x1F
}

/// Fifteen-bit global illumination field used by HD108's 16-bit header.
fn illum15(global_illum: f32) -> u16 {
    (global_illum.clamp(0.0, 1.0) * 32767.0).round() as u16 & 0x7FFF
}

fn encode_clocked_frame(chip: ChipType, global_illum: f32, native: &[u8]) -> Vec<u8> {
    let bpp = chip.native_type().bytes_per_pixel();
    let pixel_count = if bpp == 0 { 0 } else { native.len() / bpp };

    let mut out = Vec::new();
    out.extend_from_slice(&[0u8; 4]);

    if chip.native_type() == NativeType::Rgb16 {
        let header = 0x8000u16 | illum15(global_illum);
        for chunk in native.chunks(bpp) {
            out.extend_from_slice(&header.to_be_bytes());
            out.extend_from_slice(chunk);
        }
    } else {
        let header = 0b1110_0000u8 | illum5(global_illum);
        for chunk in native.chunks(bpp) {
            out.push(header);
            out.extend_from_slice(chunk);
        }
    }

    let end_len = (pixel_count / 2 + 7) / 8;
    out.extend(std::iter::repeat(0xFFu8).take(end_len));
    out
}

fn encode_raw_or_sevenbit(chip: ChipType, native: &[u8]) -> Vec<u8> {
    match chip {
        ChipType::Lpd8806 => {
            let mut out = Vec::with_capacity(native.len() + 2);
            out.push(0x00);
            for &b in native {
                out.push(0x80 | (b >> 1));
            }
            out.push(0x00);
            out
        }
        // WS2801 has no line framing at all: raw native bytes over the wire.
        _ => native.to_vec(),
    }
}

/// MSB-first bit accumulator for the Manchester TLS3001 bitstream.
struct BitWriter {
    bytes: Vec<u8>,
    cur: u8,
    nbits: u8,
}

impl BitWriter {
    fn new() -> Self {
        Self {
            bytes: Vec::new(),
            cur: 0,
            nbits: 0,
        }
    }

    fn push_bit(&mut self, bit: bool) {
        self.cur = (self.cur << 1) | bit as u8;
        self.nbits += 1;
        if self.nbits == 8 {
            self.bytes.push(self.cur);
            self.cur = 0;
            self.nbits = 0;
        }
    }

    fn push_bits_msb(&mut self, value: u64, width: u32) {
        for i in (0..width).rev() {
            self.push_bit((value >> i) & 1 != 0);
        }
    }

    fn push_zero_bits(&mut self, count: u32) {
        for _ in 0..count {
            self.push_bit(false);
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.nbits > 0 {
            self.cur <<= 8 - self.nbits;
            self.bytes.push(self.cur);
        }
        self.bytes
    }
}

/// Each data bit is carried by two "half-bits", the first the bit XORed
/// against the running line parity and the second its complement — a true
/// Manchester transition that keeps the line DC-balanced across pixels.
fn push_manchester_bit(w: &mut BitWriter, bit: bool, parity: &mut bool) {
    let first = bit ^ *parity;
    let second = !first;
    w.push_bit(first);
    w.push_bit(second);
    *parity = second;
}

const TLS_RESET_PATTERN: u64 = 0xFFFE80000 >> 13;
const TLS_SYNC_WORD: u64 = 0xFFFE2000_0000 >> 14;
const TLS_START_WORD: u64 = 0xFFFE4000 >> 13;

/// `first_transmission` selects the reset + sync preamble (sent once per
/// power-up) versus the lighter per-frame start word used on every
/// subsequent transfer.
fn encode_manchester(native: &[u8], first_transmission: bool) -> Vec<u8> {
    let mut w = BitWriter::new();
    let mut parity = false;

    if first_transmission {
        w.push_bits_msb(TLS_RESET_PATTERN, 19);
        w.push_zero_bits(4000);
        w.push_bits_msb(TLS_SYNC_WORD, 30);
        w.push_zero_bits(12 * native.len() as u32);
    } else {
        w.push_bits_msb(TLS_START_WORD, 19);
    }

    for &p in native {
        let word = ((p as u32) << 19) | ((p as u32) << 11);
        let top13 = (word >> 19) as u64 & 0x1FFF;
        for bit_idx in (0..13).rev() {
            let bit = (top13 >> bit_idx) & 1 != 0;
            push_manchester_bit(&mut w, bit, &mut parity);
        }
        w.push_zero_bits(100);
        w.push_bits_msb(TLS_START_WORD, 19);
    }

    w.finish()
}

/// Encode one full strip line, given its already-converted native component
/// bytes. `first_transmission` only affects the TLS3001 Manchester encoder;
/// every other family ignores it.
pub fn encode_line(
    chip: ChipType,
    global_illum: f32,
    native: &[u8],
    first_transmission: bool,
) -> Vec<u8> {
    match chip {
        ChipType::Ws2812
        | ChipType::Sk6812
        | ChipType::Tm1804
        | ChipType::Ucs1904
        | ChipType::Gs8202
        | ChipType::Ws2816
        | ChipType::Sk6812Rgbw
        | ChipType::Tm1829 => encode_nrz(native),

        ChipType::Apa102
        | ChipType::Apa107
        | ChipType::Sk9822
        | ChipType::Hds107s
        | ChipType::P9813
        | ChipType::Hd108 => encode_clocked_frame(chip, global_illum, native),

        ChipType::Ws2801 | ChipType::Lpd8806 => encode_raw_or_sevenbit(chip, native),

        ChipType::Tls3001 => encode_manchester(native, first_transmission),
    }
}
