//! Art-Net packet validation, parsing, and `ArtPollReply` assembly.
//!
//! Packet validity is a discriminated sum (spec §9 design note): a single
//! parse step returns [`ArtPacket`], and everything downstream matches on
//! it instead of touching a shared mutable parser/virtual-base hierarchy.

use thiserror::Error;
use types::DeviceIdentity;

pub const ART_NET_PORT: u16 = 6454;
const SIGNATURE: &[u8; 8] = b"Art-Net\0";
const MIN_PROTOCOL_VERSION: u16 = 14;

const OP_POLL: u16 = 0x2000;
const OP_POLL_REPLY: u16 = 0x2100;
const OP_DIAG_DATA: u16 = 0x2300;
const OP_COMMAND: u16 = 0x2400;
const OP_DATA_REQUEST: u16 = 0x2700;
const OP_DATA_REPLY: u16 = 0x2800;
const OP_OUTPUT: u16 = 0x5000;
const OP_NZS: u16 = 0x5100;
const OP_SYNC: u16 = 0x5200;
const OP_ADDRESS: u16 = 0x6000;
const OP_INPUT: u16 = 0x7000;
const OP_TOD_REQUEST: u16 = 0x8000;
const OP_TOD_DATA: u16 = 0x8100;
const OP_TOD_CONTROL: u16 = 0x8200;
const OP_RDM: u16 = 0x8300;
const OP_RDM_SUB: u16 = 0x8400;
const OP_VIDEO_SETUP: u16 = 0xa010;
const OP_VIDEO_PALETTE: u16 = 0xa020;
const OP_VIDEO_DATA: u16 = 0xa040;
const OP_MEDIA: u16 = 0x9000;
const OP_MEDIA_PATCH: u16 = 0x9100;
const OP_MEDIA_CONTROL: u16 = 0x9200;
const OP_MEDIA_CONTROL_REPLY: u16 = 0x9300;
const OP_MAC_MASTER: u16 = 0xf000;
const OP_MAC_SLAVE: u16 = 0xf100;
const OP_FIRMWARE_MASTER: u16 = 0xf200;
const OP_FIRMWARE_REPLY: u16 = 0xf300;
const OP_FILE_TN_MASTER: u16 = 0xf400;
const OP_FILE_FN_MASTER: u16 = 0xf500;
const OP_FILE_FN_REPLY: u16 = 0xf600;
const OP_IP_PROG: u16 = 0xf800;
const OP_IP_PROG_REPLY: u16 = 0xf900;

/// Every opcode this node recognizes, whether or not it acts on it. An
/// opcode outside this set is rejected outright (spec §4.6).
const KNOWN_OPCODES: &[u16] = &[
    OP_POLL,
    OP_POLL_REPLY,
    OP_DIAG_DATA,
    OP_COMMAND,
    OP_DATA_REQUEST,
    OP_DATA_REPLY,
    OP_OUTPUT,
    OP_NZS,
    OP_SYNC,
    OP_ADDRESS,
    OP_INPUT,
    OP_TOD_REQUEST,
    OP_TOD_DATA,
    OP_TOD_CONTROL,
    OP_RDM,
    OP_RDM_SUB,
    OP_VIDEO_SETUP,
    OP_VIDEO_PALETTE,
    OP_VIDEO_DATA,
    OP_MEDIA,
    OP_MEDIA_PATCH,
    OP_MEDIA_CONTROL,
    OP_MEDIA_CONTROL_REPLY,
    OP_MAC_MASTER,
    OP_MAC_SLAVE,
    OP_FIRMWARE_MASTER,
    OP_FIRMWARE_REPLY,
    OP_FILE_TN_MASTER,
    OP_FILE_FN_MASTER,
    OP_FILE_FN_REPLY,
    OP_IP_PROG,
    OP_IP_PROG_REPLY,
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArtNetError {
    #[error("packet too short")]
    Truncated,
    #[error("bad signature")]
    BadSignature,
    #[error("unrecognized opcode")]
    UnknownOpcode,
    #[error("protocol version below 14")]
    BadVersion,
    #[error("data length out of range or odd")]
    BadLength,
    #[error("universe out of range")]
    BadUniverse,
    #[error("non-zero start code on OpNzs")]
    BadStartCode,
}

/// The subset of opcodes the node actually acts on (spec §4.6), as a
/// discriminated sum rather than a virtual-base packet hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtPacket {
    Poll,
    Sync,
    Output { universe: u16, data: Vec<u8> },
    Nzs { universe: u16, data: Vec<u8> },
    /// Recognized but not acted on by this node (e.g. `OpAddress`).
    Other(u16),
}

fn validate_header(buf: &[u8]) -> Result<u16, ArtNetError> {
    if buf.len() < 12 {
        return Err(ArtNetError::Truncated);
    }
    if &buf[0..8] != SIGNATURE {
        return Err(ArtNetError::BadSignature);
    }
    let opcode = u16::from_le_bytes([buf[8], buf[9]]);
    if !KNOWN_OPCODES.contains(&opcode) {
        return Err(ArtNetError::UnknownOpcode);
    }
    let version = u16::from_be_bytes([buf[10], buf[11]]);
    if version < MIN_PROTOCOL_VERSION {
        return Err(ArtNetError::BadVersion);
    }
    Ok(opcode)
}

fn parse_output_like(buf: &[u8], require_zero_start_code: bool) -> Result<(u16, Vec<u8>), ArtNetError> {
    if buf.len() < 18 {
        return Err(ArtNetError::Truncated);
    }
    if require_zero_start_code && buf[13] != 0 {
        return Err(ArtNetError::BadStartCode);
    }
    let universe = u16::from_le_bytes([buf[14], buf[15]]);
    if universe >= 32768 {
        return Err(ArtNetError::BadUniverse);
    }
    let len = u16::from_be_bytes([buf[16], buf[17]]) as usize;
    if len % 2 != 0 || !(2..=512).contains(&len) {
        return Err(ArtNetError::BadLength);
    }
    if buf.len() < 18 + len {
        return Err(ArtNetError::Truncated);
    }
    Ok((universe, buf[18..18 + len].to_vec()))
}

/// Parse and validate a raw UDP payload received on the Art-Net port.
pub fn parse(buf: &[u8]) -> Result<ArtPacket, ArtNetError> {
    let opcode = validate_header(buf)?;
    match opcode {
        OP_POLL => Ok(ArtPacket::Poll),
        OP_SYNC => Ok(ArtPacket::Sync),
        OP_OUTPUT => {
            let (universe, data) = parse_output_like(buf, false)?;
            Ok(ArtPacket::Output { universe, data })
        }
        OP_NZS => {
            let (universe, data) = parse_output_like(buf, true)?;
            Ok(ArtPacket::Nzs { universe, data })
        }
        other => Ok(ArtPacket::Other(other)),
    }
}

/// Byte layout of a built `ArtPollReply`: fixed 239-byte frame (spec §4.6).
pub const POLL_REPLY_LEN: usize = 239;

fn push_padded(buf: &mut Vec<u8>, s: &str, width: usize) {
    let bytes = s.as_bytes();
    let take = bytes.len().min(width);
    buf.extend_from_slice(&bytes[..take]);
    buf.resize(buf.len() + (width - take), 0);
}

/// Build one `ArtPollReply` frame advertising `universe` as this node's
/// bound net/sub-switch.
pub fn build_poll_reply(identity: &DeviceIdentity, ip: [u8; 4], universe: u16) -> Vec<u8> {
    let mut out = Vec::with_capacity(POLL_REPLY_LEN);
    out.extend_from_slice(SIGNATURE);
    out.extend_from_slice(&OP_POLL_REPLY.to_le_bytes());
    out.extend_from_slice(&ip); // device IPv4, big-endian octet order
    out.extend_from_slice(&ART_NET_PORT.to_le_bytes());
    out.push((universe >> 8) as u8); // NetSwitch
    out.push((universe & 0xFF) as u8); // SubSwitch
    out.extend_from_slice(&0x1ED5u16.to_be_bytes()); // OEM
    out.extend_from_slice(&0x1ED5u16.to_be_bytes()); // ESTA
    push_padded(&mut out, &identity.short_name(), 18);
    push_padded(&mut out, &identity.long_name(), 64);
    out.extend_from_slice(&identity.mac);
    out.extend_from_slice(&ip); // bind IP
    out.resize(POLL_REPLY_LEN, 0);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output_packet(opcode: u16, universe: u16, len: u16, start_code: u8, data_len: usize) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(SIGNATURE);
        buf.extend_from_slice(&opcode.to_le_bytes());
        buf.extend_from_slice(&14u16.to_be_bytes());
        buf.push(0); // sequence
        buf.push(start_code);
        buf.extend_from_slice(&universe.to_le_bytes());
        buf.extend_from_slice(&len.to_be_bytes());
        buf.resize(18 + data_len, 0);
        buf
    }

    #[test]
    fn rejects_bad_signature() {
        let mut buf = output_packet(OP_OUTPUT, 0, 2, 0, 2);
        buf[0] = b'X';
        assert_eq!(parse(&buf), Err(ArtNetError::BadSignature));
    }

    #[test]
    fn rejects_unknown_opcode() {
        let buf = output_packet(0x1234, 0, 2, 0, 2);
        assert_eq!(parse(&buf), Err(ArtNetError::UnknownOpcode));
    }

    #[test]
    fn output_len_two_is_accepted() {
        let buf = output_packet(OP_OUTPUT, 7, 2, 0, 2);
        assert_eq!(
            parse(&buf),
            Ok(ArtPacket::Output {
                universe: 7,
                data: vec![0, 0]
            })
        );
    }

    #[test]
    fn output_len_one_is_rejected() {
        let buf = output_packet(OP_OUTPUT, 7, 1, 0, 1);
        assert_eq!(parse(&buf), Err(ArtNetError::BadLength));
    }

    #[test]
    fn output_len_513_is_rejected() {
        let buf = output_packet(OP_OUTPUT, 7, 513, 0, 513);
        assert_eq!(parse(&buf), Err(ArtNetError::BadLength));
    }

    #[test]
    fn odd_len_is_rejected() {
        let buf = output_packet(OP_OUTPUT, 7, 3, 0, 3);
        assert_eq!(parse(&buf), Err(ArtNetError::BadLength));
    }

    #[test]
    fn universe_32768_is_rejected() {
        let buf = output_packet(OP_OUTPUT, 32768, 2, 0, 2);
        assert_eq!(parse(&buf), Err(ArtNetError::BadUniverse));
    }

    #[test]
    fn nzs_with_nonzero_start_code_is_rejected() {
        let buf = output_packet(OP_NZS, 7, 2, 1, 2);
        assert_eq!(parse(&buf), Err(ArtNetError::BadStartCode));
    }

    #[test]
    fn nzs_with_zero_start_code_is_accepted() {
        let buf = output_packet(OP_NZS, 7, 2, 0, 2);
        assert!(matches!(parse(&buf), Ok(ArtPacket::Nzs { universe: 7, .. })));
    }

    #[test]
    fn poll_and_sync_parse_with_minimal_header() {
        let mut poll = Vec::new();
        poll.extend_from_slice(SIGNATURE);
        poll.extend_from_slice(&OP_POLL.to_le_bytes());
        poll.extend_from_slice(&14u16.to_be_bytes());
        assert_eq!(parse(&poll), Ok(ArtPacket::Poll));

        let mut sync = Vec::new();
        sync.extend_from_slice(SIGNATURE);
        sync.extend_from_slice(&OP_SYNC.to_le_bytes());
        sync.extend_from_slice(&14u16.to_be_bytes());
        assert_eq!(parse(&sync), Ok(ArtPacket::Sync));
    }

    #[test]
    fn poll_reply_is_fixed_239_bytes() {
        let identity = DeviceIdentity {
            hostname: "lk-abc123".into(),
            mac: [0x1E, 0xD5, 1, 2, 3, 4],
            tag: "room-5".into(),
        };
        let reply = build_poll_reply(&identity, [192, 168, 1, 50], 7);
        assert_eq!(reply.len(), POLL_REPLY_LEN);
        assert_eq!(&reply[0..8], SIGNATURE);
        assert_eq!(u16::from_le_bytes([reply[8], reply[9]]), OP_POLL_REPLY);
        assert_eq!(&reply[10..14], &[192, 168, 1, 50]);
        assert_eq!(reply[18], 0); // NetSwitch for universe 7
        assert_eq!(reply[19], 7); // SubSwitch
    }
}
