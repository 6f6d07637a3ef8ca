//! ledspand — networked LED-lighting controller daemon.
//!
//! Wires the workspace's crates into one process: [`control::Control`] routes
//! inbound universes to [`strip::Strip`]/[`analogdrv::AnalogDriver`] behind a
//! [`tokio::sync::Mutex`]-guarded [`Hardware`] bundle, [`udp`] runs the
//! Art-Net/sACN/DDP listener tasks, [`http`] exposes the settings surface,
//! and a 1kHz [`scheduler::Scheduler`] tick task drives startup-color
//! refresh, sACN discovery, and poll-reply delivery.

mod config;
mod http;
mod identity;
mod udp;

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use control::Control;
use iface::{DmaChannel, FlashRegion, MdnsAdvertiser, NullDma, NullMdns, NullPwm, PwmTimer};
use model::{ANALOG_TERMINALS, STRIP_CHANNELS};
use scheduler::{Scheduler, SchedulerAction};
use settings::{FileFlash, SettingsStore};
use syncarb::Watchdog;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use types::DeviceIdentity;

/// Delay, in 1kHz scheduler ticks, between `POST /reset` and the actual
/// hard reset, giving in-flight packets and multicast memberships time to
/// drain cleanly (spec §5).
const RESET_COUNTDOWN_TICKS: u32 = 200;

#[derive(Parser)]
#[command(name = "ledspand", about = "Networked LED-lighting controller daemon")]
struct Args {
    /// Path to the journaled settings log.
    #[arg(long, default_value = "ledspand-settings.log")]
    settings_path: PathBuf,

    /// HTTP settings server bind port.
    #[arg(long, default_value = "80")]
    http_port: u16,

    /// Accept broadcast Art-Net packets. Disable on networks shared with
    /// other Art-Net nodes you don't want to answer on behalf of.
    #[arg(long, default_value_t = true)]
    broadcast: bool,
}

/// Live hardware handles bundled with the topology-aware router, all behind
/// one lock so a single acquisition can build a [`control::Outputs`] (spec
/// §9: `Control` is the only topology-aware mutator).
pub struct Hardware {
    pub control: Control,
    pub dma: [Box<dyn DmaChannel>; STRIP_CHANNELS],
    pub pwm: [Box<dyn PwmTimer>; ANALOG_TERMINALS],
}

impl Hardware {
    fn new(model: model::Model) -> Self {
        Self {
            control: Control::new(model),
            dma: [Box::new(NullDma::default()), Box::new(NullDma::default())],
            pwm: [Box::new(NullPwm::default()), Box::new(NullPwm::default())],
        }
    }
}

/// Shared daemon state reached by every task: UDP listeners, the HTTP
/// settings router, and the scheduler tick loop.
pub struct System {
    pub identity: DeviceIdentity,
    pub bind_ip: Ipv4Addr,
    pub broadcast_enabled: bool,
    pub hardware: Mutex<Hardware>,
    pub watchdog: Mutex<Watchdog>,
    pub settings: Mutex<SettingsStore>,
    pub scheduler: Mutex<Scheduler>,
    pub mdns: Box<dyn MdnsAdvertiser>,
}

impl System {
    /// Re-derive [`model::Model`] from whatever is currently persisted and
    /// rebuild [`Hardware::control`] from it. Called after a settings PUT or
    /// DELETE is applied (spec §1: "mutations are applied... at next apply
    /// cycle").
    async fn reload_from_settings(&self) {
        let model = {
            let store = self.settings.lock().await;
            config::load_model(&store)
        };
        let mut hw = self.hardware.lock().await;
        hw.control = Control::new(model);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("ledspand=info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    let flash: Box<dyn FlashRegion> =
        Box::new(FileFlash::open(&args.settings_path).context("opening settings log")?);
    let mut store = SettingsStore::open(flash).context("replaying settings log")?;
    let boot_count = settings::ensure_defaults(&mut store).context("applying settings defaults")?;

    let identity = identity::load_or_create(&mut store).context("deriving device identity")?;
    info!(hostname = %identity.hostname, mac = %format_mac(identity.mac), boot_count, "ledspand starting");

    let model = config::load_model(&store);
    let bind_ip = local_ipv4().unwrap_or(Ipv4Addr::UNSPECIFIED);

    let system = Arc::new(System {
        identity,
        bind_ip,
        broadcast_enabled: args.broadcast,
        hardware: Mutex::new(Hardware::new(model)),
        watchdog: Mutex::new(Watchdog::default()),
        settings: Mutex::new(store),
        scheduler: Mutex::new(Scheduler::new()),
        mdns: Box::new(NullMdns),
    });

    system.mdns.advertise(&system.identity);

    {
        let system = system.clone();
        tokio::spawn(async move {
            if let Err(e) = udp::run_artnet(system).await {
                error!(?e, "Art-Net listener exited");
            }
        });
    }
    {
        let system = system.clone();
        tokio::spawn(async move {
            if let Err(e) = udp::run_sacn(system).await {
                error!(?e, "sACN listener exited");
            }
        });
    }
    {
        let system = system.clone();
        tokio::spawn(async move {
            if let Err(e) = udp::run_ddp(system).await {
                error!(?e, "DDP listener exited");
            }
        });
    }
    {
        let system = system.clone();
        tokio::spawn(async move {
            if let Err(e) = run_http(system, args.http_port).await {
                error!(?e, "HTTP server exited");
            }
        });
    }

    tokio::spawn(run_scheduler(system.clone()));

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    info!("shutting down");
    Ok(())
}

async fn run_http(system: Arc<System>, port: u16) -> Result<()> {
    let router = http::router(system);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "HTTP settings server up");
    axum::serve(listener, router).await?;
    Ok(())
}

/// Drives the 1kHz scheduler, translating each tick's [`SchedulerAction`]s
/// into the corresponding startup-color refresh, sACN discovery multicast,
/// poll-reply send, or hard reset (spec §4.9).
async fn run_scheduler(system: Arc<System>) {
    let mut interval = tokio::time::interval(Duration::from_millis(1));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let discovery_socket = match tokio::net::UdpSocket::bind("0.0.0.0:0").await {
        Ok(s) => Some(s),
        Err(e) => {
            warn!(?e, "could not open discovery socket, discovery disabled");
            None
        }
    };
    let poll_reply_socket = match tokio::net::UdpSocket::bind("0.0.0.0:0").await {
        Ok(s) => Some(s),
        Err(e) => {
            warn!(?e, "could not open poll-reply socket, poll replies disabled");
            None
        }
    };
    let mut elapsed_ms: u64 = 0;

    loop {
        interval.tick().await;
        elapsed_ms += 1;
        let actions = system.scheduler.lock().await.tick();

        for action in actions {
            match action {
                SchedulerAction::RefreshStartupColor => {
                    let mut hw = system.hardware.lock().await;
                    let Hardware { control, dma, pwm } = &mut *hw;
                    let [dma0, dma1] = dma;
                    let [pwm0, pwm1] = pwm;
                    let mut outputs = control::Outputs {
                        dma: [dma0.as_mut(), dma1.as_mut()],
                        pwm: [pwm0.as_mut(), pwm1.as_mut()],
                    };
                    control.tick_startup(elapsed_ms, &mut outputs);
                }
                SchedulerAction::EmitSacnDiscovery => {
                    if let Some(socket) = &discovery_socket {
                        let universes = {
                            let hw = system.hardware.lock().await;
                            hw.control.model().collect_all_active_e131_universes()
                        };
                        let pages = protocol::discovery::build_discovery_packets(
                            &system.identity.hostname,
                            &universes,
                        );
                        for page in pages {
                            let dest = (UNIVERSE_DISCOVERY_GROUP, protocol::sacn::SACN_PORT);
                            if let Err(e) = socket.send_to(&page, dest).await {
                                warn!(?e, "failed to send sACN discovery page");
                            }
                        }
                    }
                }
                SchedulerAction::SendPollReply(sender, universe) => {
                    if let Some(socket) = &poll_reply_socket {
                        let reply = protocol::artnet::build_poll_reply(
                            &system.identity,
                            system.bind_ip.octets(),
                            universe,
                        );
                        if let Err(e) = socket.send_to(&reply, sender).await {
                            warn!(?e, %sender, "failed to send ArtPollReply");
                        }
                    }
                }
                SchedulerAction::HardReset => {
                    warn!("scheduled hard reset reached, exiting");
                    std::process::exit(0);
                }
            }
        }
    }
}

/// sACN Universe Discovery multicast group (`239.255.250.214`, universe
/// 64214 under the standard E1.31 universe-to-group mapping).
const UNIVERSE_DISCOVERY_GROUP: Ipv4Addr = Ipv4Addr::new(239, 255, 250, 214);

fn format_mac(mac: [u8; 6]) -> String {
    mac.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(":")
}

/// Best-effort local IPv4 address to advertise in `ArtPollReply` frames: the
/// address a UDP socket would use to reach a public host, without actually
/// sending anything (the standard connect-then-inspect trick).
fn local_ipv4() -> Option<Ipv4Addr> {
    let socket = std::net::UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    match socket.local_addr().ok()?.ip() {
        std::net::IpAddr::V4(addr) => Some(addr),
        std::net::IpAddr::V6(_) => None,
    }
}
