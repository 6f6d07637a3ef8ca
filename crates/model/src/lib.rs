//! Current output topology and per-strip/per-analog configuration, plus the
//! universe-to-target routing map.
//!
//! `Model` is config-only: it has no live pixel buffers or DMA handles.
//! [`control`] reads it to decide where inbound universe data goes and
//! holds the live [`strip::Strip`] / [`analogdrv::AnalogDriver`] entities
//! that actually carry the data.

use strip::is_universe_active_for;
use types::{AnalogConfig, OutputTopology, StripConfig};

/// Two physical serial channels, matching spec §3's topology table.
pub const STRIP_CHANNELS: usize = 2;
/// Two analog terminals, matching spec §3's topology table.
pub const ANALOG_TERMINALS: usize = 2;

/// Current topology plus the two strip and two analog configurations it
/// selects among. Exactly one topology is active at a time (spec §3
/// invariant); channels/terminals the active topology doesn't use simply
/// go unread by [`control`].
#[derive(Debug, Clone)]
pub struct Model {
    topology: OutputTopology,
    strips: [StripConfig; STRIP_CHANNELS],
    analogs: [AnalogConfig; ANALOG_TERMINALS],
}

impl Model {
    pub fn new() -> Self {
        Self {
            topology: OutputTopology::default(),
            strips: [StripConfig::default(), StripConfig::default()],
            analogs: [AnalogConfig::default(), AnalogConfig::default()],
        }
    }

    pub fn topology(&self) -> OutputTopology {
        self.topology
    }

    pub fn set_topology(&mut self, topology: OutputTopology) {
        self.topology = topology;
    }

    pub fn strip(&self, channel: usize) -> &StripConfig {
        &self.strips[channel]
    }

    pub fn strip_mut(&mut self, channel: usize) -> &mut StripConfig {
        &mut self.strips[channel]
    }

    pub fn analog(&self, terminal: usize) -> &AnalogConfig {
        &self.analogs[terminal]
    }

    pub fn analog_mut(&mut self, terminal: usize) -> &mut AnalogConfig {
        &mut self.analogs[terminal]
    }

    /// The Art-Net universe ID assigned to `(channel, universe_idx)`.
    pub fn artnet_strip(&self, channel: usize, universe_idx: usize) -> u16 {
        self.strips[channel].artnet_universes[universe_idx]
    }

    /// The sACN universe ID assigned to `(channel, universe_idx)`.
    pub fn e131_strip(&self, channel: usize, universe_idx: usize) -> u16 {
        self.strips[channel].e131_universes[universe_idx]
    }

    /// Every Art-Net universe this topology would actually act on, from
    /// strip slots whose first pixel is in range and from live analog
    /// components, deduplicated and in first-seen order (spec §8:
    /// `collect_all_active_<protocol>_universes` is dedup'd and
    /// order-stable across calls).
    pub fn collect_all_active_artnet_universes(&self) -> Vec<u16> {
        self.collect_active(true)
    }

    /// sACN counterpart of [`Model::collect_all_active_artnet_universes`].
    pub fn collect_all_active_e131_universes(&self) -> Vec<u16> {
        self.collect_active(false)
    }

    fn collect_active(&self, artnet: bool) -> Vec<u16> {
        let mut seen = Vec::new();
        let mut push = |u: u16| {
            if !seen.contains(&u) {
                seen.push(u);
            }
        };

        for channel in 0..STRIP_CHANNELS {
            if !self.topology.channel_is_strip(channel) {
                continue;
            }
            let cfg = &self.strips[channel];
            let targets = if artnet {
                &cfg.artnet_universes
            } else {
                &cfg.e131_universes
            };
            for (idx, &universe) in targets.iter().enumerate() {
                if is_universe_active_for(cfg.pixel_count, idx, cfg.input_format) {
                    push(universe);
                }
            }
        }

        for terminal in 0..ANALOG_TERMINALS {
            let n = self.topology.analog_component_count(terminal);
            if n == 0 {
                continue;
            }
            let cfg = &self.analogs[terminal];
            for comp in cfg.components.iter().take(n) {
                let universe = if artnet {
                    comp.artnet_universe
                } else {
                    comp.e131_universe
                };
                push(universe);
            }
        }

        seen
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}
