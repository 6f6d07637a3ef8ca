//! Effects of a parsed packet on the rest of the system: Art-Net dispatch
//! table (spec §4.6), sACN hand-off, and DDP's intentionally-unwired drop
//! path.

use control::{Control, Outputs};
use syncarb::Watchdog;

use crate::artnet::ArtPacket;
use crate::sacn::SacnData;

/// What the caller (the UDP listener task) should do after a dispatch
/// call. Everything except poll-reply scheduling is applied synchronously
/// inside [`dispatch_artnet`]/[`dispatch_sacn`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtNetEffect {
    None,
    /// Schedule one delayed `ArtPollReply` per universe (spec §4.9: up to
    /// 8 pending slots, deduplicated active-universe set per §8 scenario 4).
    SchedulePollReplies(Vec<u16>),
}

/// Apply one parsed Art-Net packet. `is_broadcast`/`broadcast_enabled`
/// implement spec §4.6's "broadcast packets are accepted only when
/// `broadcast_enabled` is true" rule.
pub fn dispatch_artnet(
    control: &mut Control,
    watchdog: &mut Watchdog,
    packet: ArtPacket,
    is_broadcast: bool,
    broadcast_enabled: bool,
    outputs: &mut Outputs,
) -> ArtNetEffect {
    if is_broadcast && !broadcast_enabled {
        return ArtNetEffect::None;
    }

    match packet {
        ArtPacket::Poll => {
            let universes = control.model().collect_all_active_artnet_universes();
            ArtNetEffect::SchedulePollReplies(universes)
        }
        ArtPacket::Sync => {
            control.set_enable_sync_mode(true);
            control.sync(outputs);
            watchdog.feed();
            ArtNetEffect::None
        }
        ArtPacket::Output { universe, data } | ArtPacket::Nzs { universe, data } => {
            control.set_artnet_universe_output_data(universe, &data, outputs);
            if control.sync_mode() && watchdog.starved() {
                control.sync(outputs);
                control.set_enable_sync_mode(false);
            }
            ArtNetEffect::None
        }
        ArtPacket::Other(_) => ArtNetEffect::None,
    }
}

/// Apply one parsed sACN data packet.
pub fn dispatch_sacn(control: &mut Control, packet: SacnData, outputs: &mut Outputs) {
    control.set_e131_universe_output_data(packet.universe, &packet.data, outputs);
}

#[cfg(test)]
mod tests {
    use super::*;
    use iface::{DmaChannel, PwmTimer};
    use model::Model;
    use std::time::Duration;
    use types::{ChipType, OutputTopology};

    struct FakeDma;
    impl DmaChannel for FakeDma {
        fn begin_transfer(&mut self, _buf: &[u8]) {}
        fn is_busy(&self) -> bool {
            false
        }
    }
    struct FakePwm;
    impl PwmTimer for FakePwm {
        fn write_pulses(&mut self, _values: [u16; 6]) {}
    }

    fn model_with_universe(universe: u16) -> Model {
        let mut m = Model::new();
        m.set_topology(OutputTopology::DualStrip);
        m.strip_mut(0).chip = ChipType::Ws2812;
        m.strip_mut(0).pixel_count = 10;
        m.strip_mut(0).artnet_universes = [universe, 0, 0, 0, 0, 0];
        m
    }

    #[test]
    fn poll_schedules_reply_for_each_active_universe() {
        let mut control = Control::new(model_with_universe(7));
        let mut watchdog = Watchdog::new(Duration::from_millis(4));
        let (mut d0, mut d1) = (FakeDma, FakeDma);
        let (mut p0, mut p1) = (FakePwm, FakePwm);
        let mut outputs = Outputs {
            dma: [&mut d0, &mut d1],
            pwm: [&mut p0, &mut p1],
        };
        let effect = dispatch_artnet(
            &mut control,
            &mut watchdog,
            ArtPacket::Poll,
            false,
            true,
            &mut outputs,
        );
        assert_eq!(effect, ArtNetEffect::SchedulePollReplies(vec![7]));
    }

    #[test]
    fn broadcast_dropped_when_disabled() {
        let mut control = Control::new(model_with_universe(7));
        let mut watchdog = Watchdog::new(Duration::from_millis(4));
        let (mut d0, mut d1) = (FakeDma, FakeDma);
        let (mut p0, mut p1) = (FakePwm, FakePwm);
        let mut outputs = Outputs {
            dma: [&mut d0, &mut d1],
            pwm: [&mut p0, &mut p1],
        };
        let effect = dispatch_artnet(
            &mut control,
            &mut watchdog,
            ArtPacket::Poll,
            true,
            false,
            &mut outputs,
        );
        assert_eq!(effect, ArtNetEffect::None);
    }

    #[test]
    fn sync_then_output_batches_until_next_sync() {
        let mut control = Control::new(model_with_universe(7));
        let mut watchdog = Watchdog::new(Duration::from_millis(4));
        let (mut d0, mut d1) = (FakeDma, FakeDma);
        let (mut p0, mut p1) = (FakePwm, FakePwm);
        let mut outputs = Outputs {
            dma: [&mut d0, &mut d1],
            pwm: [&mut p0, &mut p1],
        };
        dispatch_artnet(&mut control, &mut watchdog, ArtPacket::Sync, false, true, &mut outputs);
        assert!(control.sync_mode());
        dispatch_artnet(
            &mut control,
            &mut watchdog,
            ArtPacket::Output {
                universe: 7,
                data: vec![1, 2, 3],
            },
            false,
            true,
            &mut outputs,
        );
        assert!(control.sync_mode());
    }
}
