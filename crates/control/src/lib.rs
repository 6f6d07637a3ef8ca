//! Topology-aware fan-out from inbound universe writes to strips and analog
//! terminals, sync-mode arbitration, and startup-pattern playback.
//!
//! `Control` is the only topology-aware mutator in the workspace (spec §9):
//! it owns the live [`strip::Strip`] and [`analogdrv::AnalogDriver`]
//! entities plus the [`model::Model`] describing how to route to them.
//! [`model::Model`] itself never touches live pixel state; [`strip::Strip`]
//! never knows why a byte landed where it did.

pub mod startup;

use analogdrv::AnalogDriver;
use iface::{DmaChannel, PwmTimer};
use model::{Model, ANALOG_TERMINALS, STRIP_CHANNELS};
use strip::{Strip, UNIVERSES_PER_STRIP};
use tracing::debug;
use types::ProtocolKind;

/// Live hardware handles for one fan-out call: two serial DMA channels and
/// two analog PWM timers, indexed the same way as [`model::Model`]'s
/// channel/terminal slots. Bundling them avoids a five-argument call at
/// every dispatch site.
pub struct Outputs<'a> {
    pub dma: [&'a mut dyn DmaChannel; STRIP_CHANNELS],
    pub pwm: [&'a mut dyn PwmTimer; ANALOG_TERMINALS],
}

/// Topology-aware router owning the live strip and analog entities.
pub struct Control {
    model: Model,
    strips: [Strip; STRIP_CHANNELS],
    driver: AnalogDriver,
    sync_mode: bool,
    /// True until the first data packet is handled; gates startup-pattern
    /// playback (spec §4.5).
    startup_active: bool,
}

impl Control {
    pub fn new(model: Model) -> Self {
        let strips = [
            Strip::new(model.strip(0).clone()),
            Strip::new(model.strip(1).clone()),
        ];
        Self {
            model,
            strips,
            driver: AnalogDriver::new(),
            sync_mode: false,
            startup_active: true,
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn strip(&self, channel: usize) -> &Strip {
        &self.strips[channel]
    }

    pub fn driver(&self) -> &AnalogDriver {
        &self.driver
    }

    pub fn is_startup_active(&self) -> bool {
        self.startup_active
    }

    pub fn sync_mode(&self) -> bool {
        self.sync_mode
    }

    /// Rebuild the live strip pixel stores from the model's current
    /// configuration. Called after settings mutations are applied.
    pub fn reload_from_model(&mut self) {
        for channel in 0..STRIP_CHANNELS {
            self.strips[channel] = Strip::new(self.model.strip(channel).clone());
        }
    }

    pub fn set_enable_sync_mode(&mut self, enabled: bool) {
        self.sync_mode = enabled;
    }

    /// Explicit sync-opcode latch: flush every strip and drive every analog
    /// terminal the current topology uses.
    pub fn sync(&mut self, outputs: &mut Outputs) {
        let topology = self.model.topology();
        for (channel, dma) in outputs.dma.iter_mut().enumerate() {
            if topology.channel_is_strip(channel) {
                self.strips[channel].transfer(*dma);
            }
        }
        for (terminal, pwm) in outputs.pwm.iter_mut().enumerate() {
            if topology.analog_component_count(terminal) > 0 {
                self.driver.sync(terminal, *pwm);
            }
        }
    }

    pub fn set_artnet_universe_output_data(
        &mut self,
        universe: u16,
        payload: &[u8],
        outputs: &mut Outputs,
    ) {
        self.dispatch(ProtocolKind::ArtNet, universe, payload, outputs);
    }

    pub fn set_e131_universe_output_data(
        &mut self,
        universe: u16,
        payload: &[u8],
        outputs: &mut Outputs,
    ) {
        self.dispatch(ProtocolKind::E131, universe, payload, outputs);
    }

    fn dispatch(
        &mut self,
        proto: ProtocolKind,
        universe: u16,
        payload: &[u8],
        outputs: &mut Outputs,
    ) {
        let topology = self.model.topology();

        for channel in 0..STRIP_CHANNELS {
            if !topology.channel_is_strip(channel) {
                continue;
            }
            let input_format = self.model.strip(channel).input_format;
            for idx in 0..UNIVERSES_PER_STRIP {
                let target = match proto {
                    ProtocolKind::ArtNet => self.model.artnet_strip(channel, idx),
                    ProtocolKind::E131 => self.model.e131_strip(channel, idx),
                };
                if target != universe {
                    continue;
                }
                self.strips[channel].set_universe_data(idx, payload, input_format);
                self.startup_active = false;
                debug!(channel, idx, universe, "strip universe write");
                if !self.sync_mode {
                    self.strips[channel].transfer(outputs.dma[channel]);
                }
            }
        }

        for terminal in 0..ANALOG_TERMINALS {
            let comp_count = topology.analog_component_count(terminal);
            if comp_count == 0 {
                continue;
            }
            // Entering the driver path clears the startup flag unconditionally
            // for any topology that drives an analog terminal (spec §4.5).
            self.startup_active = false;

            let mut tuple = self.driver.current_rgbww(terminal);
            for k in 0..comp_count {
                let comp_cfg = self.model.analog(terminal).components[k];
                let (comp_universe, comp_channel) = match proto {
                    ProtocolKind::ArtNet => (comp_cfg.artnet_universe, comp_cfg.artnet_channel),
                    ProtocolKind::E131 => (comp_cfg.e131_universe, comp_cfg.e131_channel),
                };
                let channel_idx = comp_channel.saturating_sub(1).min(511) as usize;
                if payload.len() > channel_idx && comp_universe == universe {
                    tuple.set_component(k, payload[channel_idx] as f32 / 255.0);
                }
            }
            self.driver.set_rgbww(terminal, tuple);
            if !self.sync_mode {
                self.driver.sync(terminal, outputs.pwm[terminal]);
            }
        }
    }

    /// Paint and flush one startup-pattern tick for every strip channel the
    /// current topology drives, while no data has yet been received.
    pub fn tick_startup(&mut self, elapsed_ms: u64, outputs: &mut Outputs) {
        if !self.startup_active {
            return;
        }
        let topology = self.model.topology();
        for channel in 0..STRIP_CHANNELS {
            if !topology.channel_is_strip(channel) {
                continue;
            }
            let frame = startup::render(self.model.strip(channel), elapsed_ms);
            self.strips[channel].set_data(&frame, types::InputFormat::Rgb8);
            self.strips[channel].transfer(outputs.dma[channel]);
        }
    }
}
