//! Art-Net / sACN (E1.31) / DDP packet validation, opcode routing, and
//! `ArtPollReply` assembly.
//!
//! Each wire protocol gets its own parse module producing a tagged-sum
//! packet type; [`dispatch`] applies the parsed packet to [`control::Control`]
//! and the global [`syncarb::Watchdog`].

pub mod artnet;
pub mod ddp;
pub mod discovery;
pub mod dispatch;
pub mod sacn;

pub use artnet::{ArtNetError, ArtPacket};
pub use ddp::{DdpError, DdpPacket};
pub use dispatch::{dispatch_artnet, dispatch_sacn, ArtNetEffect};
pub use sacn::{SacnData, SacnError};
