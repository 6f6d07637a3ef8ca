//! UDP listener tasks: one per wire protocol, each bound for the lifetime
//! of the process and driven by a `tokio::net::UdpSocket` receive loop,
//! matching `teleop::video::VideoServer`'s bind-then-`recv_from`-loop shape.

use std::net::Ipv4Addr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tracing::{debug, info, trace, warn};

use control::Outputs;
use protocol::artnet::{self, ArtPacket};
use protocol::ddp;
use protocol::dispatch::{dispatch_artnet, dispatch_sacn, ArtNetEffect};
use protocol::sacn;

use crate::System;

const RECV_BUF_LEN: usize = 2048;

/// Spacing between successive poll-reply slots so a burst of Art-Net
/// `OpPoll`s from several controllers doesn't answer every universe in the
/// same tick (spec gives no exact value; this mirrors real nodes jittering
/// `ArtPollReply` transmission, see DESIGN.md).
const POLL_REPLY_SLOT_SPACING_TICKS: u32 = 20;

/// Art-Net reception (port 6454): validates and routes `OpOutput`/`OpNzs`
/// through [`dispatch_artnet`], answers `OpPoll` via scheduled poll-reply
/// slots, and latches sync mode on `OpSync`.
pub async fn run_artnet(system: Arc<System>) -> std::io::Result<()> {
    let socket = UdpSocket::bind(("0.0.0.0", artnet::ART_NET_PORT)).await?;
    socket.set_broadcast(true)?;
    info!(port = artnet::ART_NET_PORT, "Art-Net listener up");

    let mut buf = [0u8; RECV_BUF_LEN];
    loop {
        let (len, sender) = match socket.recv_from(&mut buf).await {
            Ok(v) => v,
            Err(e) => {
                warn!(?e, "Art-Net recv failed");
                continue;
            }
        };

        let packet = match artnet::parse(&buf[..len]) {
            Ok(p) => p,
            Err(e) => {
                trace!(?e, %sender, "dropped malformed Art-Net packet");
                continue;
            }
        };

        // `tokio::net::UdpSocket` doesn't surface whether the datagram was
        // addressed to the broadcast address (no IP_PKTINFO exposed); an
        // `OpPoll` is broadcast by Art-Net convention, everything else is
        // treated as unicast (see DESIGN.md).
        let is_broadcast = matches!(packet, ArtPacket::Poll);
        let is_data = matches!(packet, ArtPacket::Output { .. } | ArtPacket::Nzs { .. });

        let effect = {
            let mut hw = system.hardware.lock().await;
            let mut watchdog = system.watchdog.lock().await;
            let crate::Hardware { control, dma, pwm } = &mut *hw;
            let [dma0, dma1] = dma;
            let [pwm0, pwm1] = pwm;
            let mut outputs = Outputs {
                dma: [dma0.as_mut(), dma1.as_mut()],
                pwm: [pwm0.as_mut(), pwm1.as_mut()],
            };
            dispatch_artnet(
                control,
                &mut watchdog,
                packet,
                is_broadcast,
                system.broadcast_enabled,
                &mut outputs,
            )
        };

        if is_data {
            system.scheduler.lock().await.note_data_received();
        }

        if let ArtNetEffect::SchedulePollReplies(universes) = effect {
            let mut scheduler = system.scheduler.lock().await;
            for (i, universe) in universes.into_iter().enumerate() {
                let delay = POLL_REPLY_SLOT_SPACING_TICKS * (i as u32 + 1);
                if !scheduler.schedule_poll_reply(sender, universe, delay) {
                    debug!(%sender, "poll-reply queue full, dropping reply");
                    break;
                }
            }
        }
    }
}

/// sACN (E1.31) reception (port 5568, multicast): joins the multicast
/// group for every e131 universe this device's current topology uses, then
/// authenticates and routes data packets through [`dispatch_sacn`].
pub async fn run_sacn(system: Arc<System>) -> std::io::Result<()> {
    let socket = UdpSocket::bind(("0.0.0.0", sacn::SACN_PORT)).await?;

    let universes = {
        let hw = system.hardware.lock().await;
        hw.control.model().collect_all_active_e131_universes()
    };
    for universe in &universes {
        let group = e131_multicast_group(*universe);
        if let Err(e) = socket.join_multicast_v4(group, Ipv4Addr::UNSPECIFIED) {
            warn!(?e, universe, "failed to join sACN multicast group");
        }
    }
    info!(port = sacn::SACN_PORT, universes = universes.len(), "sACN listener up");

    let mut buf = [0u8; RECV_BUF_LEN];
    loop {
        let (len, sender) = match socket.recv_from(&mut buf).await {
            Ok(v) => v,
            Err(e) => {
                warn!(?e, "sACN recv failed");
                continue;
            }
        };

        let packet = match sacn::parse_data_packet(&buf[..len]) {
            Ok(p) => p,
            Err(e) => {
                trace!(?e, %sender, "dropped malformed sACN packet");
                continue;
            }
        };

        {
            let mut hw = system.hardware.lock().await;
            let crate::Hardware { control, dma, pwm } = &mut *hw;
            let [dma0, dma1] = dma;
            let [pwm0, pwm1] = pwm;
            let mut outputs = Outputs {
                dma: [dma0.as_mut(), dma1.as_mut()],
                pwm: [pwm0.as_mut(), pwm1.as_mut()],
            };
            dispatch_sacn(control, packet, &mut outputs);
        }
        system.scheduler.lock().await.note_data_received();
    }
}

/// The standard E1.31 mapping from universe number to multicast group:
/// `239.255.<hi>.<lo>` where `<hi>:<lo>` is the universe's big-endian bytes.
fn e131_multicast_group(universe: u16) -> Ipv4Addr {
    let [hi, lo] = universe.to_be_bytes();
    Ipv4Addr::new(239, 255, hi, lo)
}

/// DDP reception (port 4048): parsed and logged only. [`ddp::DdpPacket::verify`]
/// always returns `false`, so no frame is ever routed to a strip or analog
/// terminal (see `protocol::ddp` module docs).
pub async fn run_ddp(_system: Arc<System>) -> std::io::Result<()> {
    let socket = UdpSocket::bind(("0.0.0.0", ddp::DDP_PORT)).await?;
    info!(port = ddp::DDP_PORT, "DDP listener up (parse-only, no output path)");

    let mut buf = [0u8; RECV_BUF_LEN];
    loop {
        let (len, sender) = match socket.recv_from(&mut buf).await {
            Ok(v) => v,
            Err(e) => {
                warn!(?e, "DDP recv failed");
                continue;
            }
        };
        match ddp::parse(&buf[..len]) {
            Ok(packet) => trace!(%sender, bytes = packet.data.len(), "DDP frame received, not applied"),
            Err(e) => trace!(?e, %sender, "dropped malformed DDP packet"),
        }
    }
}
