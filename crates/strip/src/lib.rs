//! Per-output-channel pixel store: input-format demux, per-chip line
//! encoding, and DMA buffer hand-off.
//!
//! `Strip` is a leaf component — it knows nothing about topology or
//! universe routing policy. Something above it (the control layer) decides
//! which universe feeds which strip and when to call [`Strip::transfer`].

pub mod encode;
pub mod format;

use iface::DmaChannel;
use types::{ChipType, InputFormat, StripConfig};

/// Universe slots a strip can be fed from, matching [`types::UniverseTargets`].
pub const UNIVERSES_PER_STRIP: usize = 6;

/// DMX512 payload size per universe.
pub const BYTES_PER_UNIVERSE: usize = 512;

/// Encoded buffers are split into a head this size or smaller and the
/// remaining tail when burst mode is enabled.
const BURST_HEAD_MAX: usize = 128;

fn pixels_per_universe(input_bpp: usize) -> usize {
    if input_bpp == 0 {
        0
    } else {
        BYTES_PER_UNIVERSE / input_bpp
    }
}

/// True iff universe slot `universe_index`'s first pixel byte falls within
/// `[0, pixel_count)` in `input_format`. Free function so [`model`] can
/// answer the same question from a bare config without a live [`Strip`].
pub fn is_universe_active_for(
    pixel_count: u16,
    universe_index: usize,
    input_format: InputFormat,
) -> bool {
    if universe_index >= UNIVERSES_PER_STRIP {
        return false;
    }
    let per_universe = pixels_per_universe(input_format.bytes_per_pixel());
    if per_universe == 0 {
        return false;
    }
    let first_pixel = universe_index * per_universe;
    first_pixel < pixel_count as usize
}

/// Diagnostic snapshot of a strip's recent activity, exposed through the
/// settings/status surface.
#[derive(Debug, Default, Clone, Copy)]
pub struct StripStats {
    pub transfer_count: u64,
    pub last_transfer_len: usize,
    pub dropped_writes: u64,
    pub schedule_dma_pending: bool,
}

/// One physical output channel's pixel store and encoder.
pub struct Strip {
    cfg: StripConfig,
    component_buf: Vec<u8>,
    burst: bool,
    first_transmission: bool,
    stats: StripStats,
}

impl Strip {
    pub fn new(cfg: StripConfig) -> Self {
        let native_bpp = cfg.chip.native_type().bytes_per_pixel();
        let component_buf = vec![0u8; cfg.pixel_count as usize * native_bpp];
        Self {
            cfg,
            component_buf,
            burst: false,
            first_transmission: true,
            stats: StripStats::default(),
        }
    }

    pub fn config(&self) -> &StripConfig {
        &self.cfg
    }

    pub fn set_burst_mode(&mut self, burst: bool) {
        self.burst = burst;
    }

    pub fn needs_clock(&self) -> bool {
        self.cfg.chip.needs_clock()
    }

    pub fn chip(&self) -> ChipType {
        self.cfg.chip
    }

    pub fn stats(&self) -> StripStats {
        self.stats
    }

    /// Largest pixel count this strip's native format can hold across all
    /// six universe slots.
    pub fn get_max_pixel_count(&self) -> u16 {
        let native_bpp = self.cfg.chip.native_type().bytes_per_pixel();
        ((UNIVERSES_PER_STRIP * BYTES_PER_UNIVERSE) / native_bpp) as u16
    }

    pub fn set_pixel_count(&mut self, n: u16) {
        let n = n.min(self.get_max_pixel_count());
        self.cfg.pixel_count = n;
        let native_bpp = self.cfg.chip.native_type().bytes_per_pixel();
        self.component_buf.resize(n as usize * native_bpp, 0);
    }

    /// True iff the given universe slot's first pixel byte falls within
    /// this strip's configured pixel length in `input_format`.
    pub fn is_universe_active(&self, universe_index: usize, input_format: InputFormat) -> bool {
        is_universe_active_for(self.cfg.pixel_count, universe_index, input_format)
    }

    /// Copy one DMX payload into the component buffer region owned by
    /// `universe_index`. No-ops silently if the slot is inactive.
    pub fn set_universe_data(&mut self, universe_index: usize, bytes: &[u8], input_type: InputFormat) {
        if !self.is_universe_active(universe_index, input_type) {
            self.stats.dropped_writes += 1;
            return;
        }

        let in_bpp = input_type.bytes_per_pixel();
        let per_universe = pixels_per_universe(in_bpp);
        let first_pixel = universe_index * per_universe;
        let native_bpp = self.cfg.chip.native_type().bytes_per_pixel();
        let pixel_count = self.cfg.pixel_count as usize;

        for (i, chunk) in bytes.chunks(in_bpp).enumerate() {
            if chunk.len() < in_bpp {
                break;
            }
            let pixel_idx = first_pixel + i;
            if pixel_idx >= pixel_count {
                break;
            }
            let native = format::convert_pixel_as(&self.cfg, chunk, input_type);
            let offset = pixel_idx * native_bpp;
            if offset + native_bpp <= self.component_buf.len() {
                self.component_buf[offset..offset + native_bpp].copy_from_slice(&native);
            }
        }
    }

    /// Split a contiguous payload across universe slots and apply each
    /// slice via [`Strip::set_universe_data`].
    pub fn set_data(&mut self, bytes: &[u8], input_type: InputFormat) {
        let in_bpp = input_type.bytes_per_pixel();
        let per_universe = pixels_per_universe(in_bpp);
        if per_universe == 0 {
            return;
        }
        let stride = per_universe * in_bpp;
        for (idx, chunk) in bytes.chunks(stride).enumerate() {
            if idx >= UNIVERSES_PER_STRIP {
                break;
            }
            self.set_universe_data(idx, chunk, input_type);
        }
    }

    /// Encode the current component buffer and hand it to `dma`. If the
    /// channel is already busy, sets the pending-retry flag instead of
    /// re-entering the hardware call; the caller's update loop is expected
    /// to call `transfer` again on its next tick.
    pub fn transfer(&mut self, dma: &mut dyn DmaChannel) {
        if dma.is_busy() {
            self.stats.schedule_dma_pending = true;
            return;
        }
        self.stats.schedule_dma_pending = false;

        let line = encode::encode_line(
            self.cfg.chip,
            self.cfg.global_illum,
            &self.component_buf,
            self.first_transmission,
        );
        self.first_transmission = false;

        if self.burst && line.len() > BURST_HEAD_MAX {
            let (head, tail) = line.split_at(BURST_HEAD_MAX);
            dma.begin_transfer(head);
            dma.begin_transfer(tail);
        } else {
            dma.begin_transfer(&line);
        }

        self.stats.last_transfer_len = line.len();
        self.stats.transfer_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{ChipType, StartupMode};

    struct FakeDma {
        busy: bool,
        transfers: Vec<Vec<u8>>,
    }

    impl FakeDma {
        fn new() -> Self {
            Self {
                busy: false,
                transfers: Vec::new(),
            }
        }
    }

    impl DmaChannel for FakeDma {
        fn begin_transfer(&mut self, buf: &[u8]) {
            self.transfers.push(buf.to_vec());
        }

        fn is_busy(&self) -> bool {
            self.busy
        }
    }

    fn strip_cfg(chip: ChipType, pixel_count: u16) -> StripConfig {
        StripConfig {
            name: "a".into(),
            chip,
            input_format: InputFormat::Rgb8,
            startup_mode: StartupMode::Color,
            startup_color: Default::default(),
            component_limit: 1.0,
            global_illum: 1.0,
            pixel_count,
            artnet_universes: [0; 6],
            e131_universes: [0; 6],
        }
    }

    #[test]
    fn max_pixel_count_divides_by_native_bpp() {
        let strip = Strip::new(strip_cfg(ChipType::Ws2812, 0));
        assert_eq!(strip.get_max_pixel_count(), (6 * 512 / 3) as u16);
        let hd108 = Strip::new(strip_cfg(ChipType::Hd108, 0));
        assert_eq!(hd108.get_max_pixel_count(), (6 * 512 / 6) as u16);
    }

    #[test]
    fn universe_zero_is_active_when_pixel_count_nonzero() {
        let strip = Strip::new(strip_cfg(ChipType::Ws2812, 10));
        assert!(strip.is_universe_active(0, InputFormat::Rgb8));
        // 512 bytes / 3 bytes-per-pixel = 170 pixels per universe; slot 1
        // starts at pixel 170, past a 10-pixel strip.
        assert!(!strip.is_universe_active(1, InputFormat::Rgb8));
    }

    #[test]
    fn inactive_universe_write_is_a_silent_noop() {
        let mut strip = Strip::new(strip_cfg(ChipType::Ws2812, 10));
        let before = strip.stats().dropped_writes;
        strip.set_universe_data(1, &[1, 2, 3], InputFormat::Rgb8);
        assert_eq!(strip.stats().dropped_writes, before + 1);
    }

    #[test]
    fn set_universe_data_writes_reordered_bytes() {
        let mut strip = Strip::new(strip_cfg(ChipType::Ws2812, 2));
        strip.set_universe_data(0, &[10, 20, 30, 40, 50, 60], InputFormat::Rgb8);
        assert_eq!(strip.component_buf, vec![20, 10, 30, 50, 40, 60]);
    }

    #[test]
    fn set_data_splits_across_universe_slots() {
        let mut strip = Strip::new(strip_cfg(ChipType::Ws2812, 200));
        // 170 pixels (510 bytes) fill universe slot 0; slot 1 starts right
        // after, at byte 510.
        let mut payload = vec![0u8; 510 + 3];
        payload[510] = 9; // R
        payload[511] = 8; // G
        payload[512] = 7; // B
        strip.set_data(&payload, InputFormat::Rgb8);
        let offset = 170 * 3; // first pixel of universe slot 1
        assert_eq!(
            &strip.component_buf[offset..offset + 3],
            &[8, 9, 7] // (G,R,B) reorder of [9,8,7]
        );
    }

    #[test]
    fn transfer_kicks_dma_with_encoded_line() {
        let mut strip = Strip::new(strip_cfg(ChipType::Ws2812, 1));
        strip.set_universe_data(0, &[1, 2, 3], InputFormat::Rgb8);
        let mut dma = FakeDma::new();
        strip.transfer(&mut dma);
        assert_eq!(dma.transfers.len(), 1);
        assert_eq!(strip.stats().transfer_count, 1);
        assert_eq!(strip.stats().last_transfer_len, dma.transfers[0].len());
    }

    #[test]
    fn transfer_defers_when_dma_busy() {
        let mut strip = Strip::new(strip_cfg(ChipType::Ws2812, 1));
        let mut dma = FakeDma::new();
        dma.busy = true;
        strip.transfer(&mut dma);
        assert_eq!(dma.transfers.len(), 0);
        assert!(strip.stats().schedule_dma_pending);
    }

    #[test]
    fn burst_mode_splits_into_two_dma_calls() {
        let mut strip = Strip::new(strip_cfg(ChipType::Ws2812, 100));
        strip.set_burst_mode(true);
        let mut dma = FakeDma::new();
        strip.transfer(&mut dma);
        assert_eq!(dma.transfers.len(), 2);
        assert!(dma.transfers[0].len() <= 128);
    }

    #[test]
    fn needs_clock_matches_chip_family() {
        assert!(Strip::new(strip_cfg(ChipType::Apa102, 0)).needs_clock());
        assert!(!Strip::new(strip_cfg(ChipType::Ws2812, 0)).needs_clock());
    }
}
