//! Shared data types for ledspan: output topology, per-channel configuration,
//! chip/format enums, and the small value types that cross crate boundaries.

use serde::{Deserialize, Serialize};

/// The current output topology: fixes the role of two serial channels and
/// two analog triples. Exactly one variant is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputTopology {
    /// Both serial channels drive addressable strips.
    #[default]
    DualStrip,
    /// Channel 0 is an analog RGB terminal, channel 1 drives a strip.
    RgbStrip,
    /// Both channels drive strips, plus an RGB analog terminal.
    RgbDualStrip,
    /// Channel 0 is an analog RGBW terminal, channel 1 drives a strip.
    RgbwStrip,
    /// Both analog terminals drive independent RGB triples, no strips.
    RgbRgb,
    /// A single analog terminal drives RGB + W + WW, no strips.
    Rgbwww,
}

impl OutputTopology {
    pub const ALL: [OutputTopology; 6] = [
        OutputTopology::DualStrip,
        OutputTopology::RgbStrip,
        OutputTopology::RgbDualStrip,
        OutputTopology::RgbwStrip,
        OutputTopology::RgbRgb,
        OutputTopology::Rgbwww,
    ];

    /// Does this topology use the given serial channel (0 or 1) for a strip?
    pub fn channel_is_strip(self, channel: usize) -> bool {
        match (self, channel) {
            (OutputTopology::DualStrip, 0 | 1) => true,
            (OutputTopology::RgbStrip, 1) => true,
            (OutputTopology::RgbDualStrip, 0 | 1) => true,
            (OutputTopology::RgbwStrip, 1) => true,
            _ => false,
        }
    }

    /// Number of analog terminals this topology drives (0, 1, or 2).
    pub fn analog_terminal_count(self) -> usize {
        match self {
            OutputTopology::DualStrip => 0,
            OutputTopology::RgbStrip
            | OutputTopology::RgbDualStrip
            | OutputTopology::RgbwStrip
            | OutputTopology::Rgbwww => 1,
            OutputTopology::RgbRgb => 2,
        }
    }

    /// Number of live components (r,g,b,w,ww order) on analog terminal `term`
    /// (0 or 1) under this topology. Zero if the terminal is unused.
    pub fn analog_component_count(self, term: usize) -> usize {
        match (self, term) {
            (OutputTopology::RgbStrip, 0) => 3,
            (OutputTopology::RgbDualStrip, 0) => 3,
            (OutputTopology::RgbwStrip, 0) => 4,
            (OutputTopology::RgbRgb, 0 | 1) => 3,
            (OutputTopology::Rgbwww, 0) => 5,
            _ => 0,
        }
    }
}

/// Bit depth / component layout a chip consumes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeType {
    Rgb8,
    Rgbw8,
    Rgb16,
}

impl NativeType {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            NativeType::Rgb8 => 3,
            NativeType::Rgbw8 => 4,
            NativeType::Rgb16 => 6,
        }
    }
}

/// DMX payload layout for one input pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputFormat {
    Rgb8,
    Rgbw8,
    Rgb8Srgb,
    RgbwSrgb,
    Rgb16Lsb,
    Rgb16Msb,
    Rgbw16Lsb,
    Rgbw16Msb,
}

impl InputFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            InputFormat::Rgb8 | InputFormat::Rgb8Srgb => 3,
            InputFormat::Rgbw8 | InputFormat::RgbwSrgb => 4,
            InputFormat::Rgb16Lsb | InputFormat::Rgb16Msb => 6,
            InputFormat::Rgbw16Lsb | InputFormat::Rgbw16Msb => 8,
        }
    }

    pub fn has_white(self) -> bool {
        matches!(
            self,
            InputFormat::Rgbw8
                | InputFormat::RgbwSrgb
                | InputFormat::Rgbw16Lsb
                | InputFormat::Rgbw16Msb
        )
    }

    pub fn is_srgb(self) -> bool {
        matches!(self, InputFormat::Rgb8Srgb | InputFormat::RgbwSrgb)
    }

    pub fn is_16bit(self) -> bool {
        matches!(
            self,
            InputFormat::Rgb16Lsb
                | InputFormat::Rgb16Msb
                | InputFormat::Rgbw16Lsb
                | InputFormat::Rgbw16Msb
        )
    }

    /// True if 16-bit components are big-endian (MSB first) on the wire.
    pub fn is_msb(self) -> bool {
        matches!(self, InputFormat::Rgb16Msb | InputFormat::Rgbw16Msb)
    }
}

/// Component reorder applied when copying a native-format pixel into the
/// chip's wire order. Indices reference (r=0,g=1,b=2,w=3) of the source.
#[derive(Debug, Clone, Copy)]
pub enum Reorder {
    Three([usize; 3]),
    Four([usize; 4]),
}

/// Addressable-strip chip family. Determines clocking, native bit depth, and
/// component reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChipType {
    Ws2812,
    Sk6812,
    Tm1804,
    Ucs1904,
    Gs8202,
    Ws2816,
    Sk6812Rgbw,
    Apa102,
    Apa107,
    Tm1829,
    Sk9822,
    Hds107s,
    P9813,
    Hd108,
    Tls3001,
    Lpd8806,
    Ws2801,
}

impl ChipType {
    pub fn needs_clock(self) -> bool {
        matches!(
            self,
            ChipType::Apa102
                | ChipType::Apa107
                | ChipType::Sk9822
                | ChipType::Hds107s
                | ChipType::P9813
                | ChipType::Ws2801
                | ChipType::Lpd8806
                | ChipType::Hd108
        )
    }

    pub fn native_type(self) -> NativeType {
        match self {
            ChipType::Sk6812Rgbw => NativeType::Rgbw8,
            ChipType::Hd108 | ChipType::Ws2816 => NativeType::Rgb16,
            _ => NativeType::Rgb8,
        }
    }

    pub fn reorder(self) -> Reorder {
        match self {
            ChipType::Ws2812
            | ChipType::Sk6812
            | ChipType::Tm1804
            | ChipType::Ucs1904
            | ChipType::Gs8202
            | ChipType::Sk9822
            | ChipType::Hds107s
            | ChipType::P9813
            | ChipType::Ws2816
            | ChipType::Ws2801 => Reorder::Three([1, 0, 2]), // (G,R,B)
            ChipType::Apa102 | ChipType::Apa107 | ChipType::Tm1829 => Reorder::Three([2, 1, 0]), // (B,G,R)
            ChipType::Hd108 | ChipType::Tls3001 => Reorder::Three([0, 1, 2]), // (R,G,B)
            ChipType::Lpd8806 => Reorder::Three([2, 0, 1]), // (B,R,G)
            ChipType::Sk6812Rgbw => Reorder::Four([1, 0, 2, 3]), // (G,R,B,W)
        }
    }
}

/// Which lighting protocol supplied a given universe write. Strip and
/// analog configs carry independent universe-target arrays per protocol
/// (spec §3), so the fan-out path needs to know which array to consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolKind {
    ArtNet,
    E131,
}

/// Startup pattern shown before any data packet has been received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartupMode {
    Color,
    Rainbow,
    Tracer,
    SolidTracer,
    NoData,
}

/// 8-bit RGB triple.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Linear RGBWW quintuple in [0,1], as stored by the analog driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rgbww {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub w: f32,
    pub ww: f32,
}

impl Rgbww {
    pub fn component(&self, i: usize) -> f32 {
        match i {
            0 => self.r,
            1 => self.g,
            2 => self.b,
            3 => self.w,
            4 => self.ww,
            _ => 0.0,
        }
    }

    pub fn set_component(&mut self, i: usize, v: f32) {
        match i {
            0 => self.r = v,
            1 => self.g = v,
            2 => self.b = v,
            3 => self.w = v,
            4 => self.ww = v,
            _ => {}
        }
    }
}

/// Per-channel (Art-Net or sACN) universe target for one universe slot.
pub type UniverseTargets = [u16; 6];

/// Configuration for one addressable-strip channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripConfig {
    pub name: String,
    pub chip: ChipType,
    pub input_format: InputFormat,
    pub startup_mode: StartupMode,
    pub startup_color: Rgb8,
    /// Per-component clamp in [0,1], applied pre-encode.
    pub component_limit: f32,
    /// Global illumination multiplier in [0,1].
    pub global_illum: f32,
    pub pixel_count: u16,
    pub artnet_universes: UniverseTargets,
    pub e131_universes: UniverseTargets,
}

impl Default for StripConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            chip: ChipType::Ws2812,
            input_format: InputFormat::Rgb8,
            startup_mode: StartupMode::Color,
            startup_color: Rgb8::default(),
            component_limit: 1.0,
            global_illum: 1.0,
            pixel_count: 0,
            artnet_universes: [0; 6],
            e131_universes: [0; 6],
        }
    }
}

/// One component's universe/channel routing for an analog terminal.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AnalogComponentConfig {
    pub artnet_universe: u16,
    /// 1-based DMX channel within the Art-Net universe.
    pub artnet_channel: u16,
    pub e131_universe: u16,
    /// 1-based DMX channel within the sACN universe.
    pub e131_channel: u16,
}

/// Configuration for one analog (PWM) terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalogConfig {
    pub name: String,
    pub pwm_limit: f32,
    pub components: [AnalogComponentConfig; 6],
}

impl Default for AnalogConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            pwm_limit: 1.0,
            components: [AnalogComponentConfig::default(); 6],
        }
    }
}

/// Device identity computed once at boot: hostname, MAC, and an optional
/// operator-assigned tag. Shared by the Art-Net poll-reply path and the
/// settings defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub hostname: String,
    pub mac: [u8; 6],
    pub tag: String,
}

impl DeviceIdentity {
    /// Short name used in ArtPollReply: "lk-" + hex of the last 3 MAC bytes.
    pub fn short_name(&self) -> String {
        format!(
            "lk-{:02x}{:02x}{:02x}",
            self.mac[3], self.mac[4], self.mac[5]
        )
    }

    /// Long name used in ArtPollReply: hostname, optionally suffixed with tag.
    pub fn long_name(&self) -> String {
        if self.tag.is_empty() {
            self.hostname.clone()
        } else {
            let tag: String = self.tag.chars().take(16).collect();
            format!("{} - {}", self.hostname, tag)
        }
    }
}
