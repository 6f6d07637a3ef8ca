//! DDP (Distributed Display Protocol) packet parsing.
//!
//! The parser is complete and tested, but DDP frames are never routed to
//! output buffers — [`DdpPacket::verify`] always returns `false`, matching
//! the source design's behavior exactly (spec §9 Open Questions: the
//! intent of DDP data was unclear there and no output path was wired).
//! Preserved literally rather than guessed at.

use thiserror::Error;

pub const DDP_PORT: u16 = 4048;

const HEADER_LEN: usize = 10;
const TIMECODE_LEN: usize = 4;
const VERSION_MASK: u8 = 0b1100_0000;
const VERSION_1: u8 = 0b0100_0000;
const TIMECODE_FLAG: u8 = 0b0001_0000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DdpError {
    #[error("packet too short")]
    Truncated,
    #[error("unrecognized DDP version")]
    BadVersion,
    #[error("declared length does not match packet size")]
    LengthMismatch,
}

/// One parsed DDP frame. Never routed to strip buffers (see module docs).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdpPacket {
    pub has_timecode: bool,
    pub data_type: u8,
    pub destination_id: u8,
    pub offset: u32,
    pub data: Vec<u8>,
}

impl DdpPacket {
    /// Always `false`: DDP output routing is not implemented. Preserved as
    /// a named seam rather than deleting the parser, since a future
    /// implementation only needs to replace this one function.
    pub fn verify(&self) -> bool {
        false
    }
}

pub fn parse(buf: &[u8]) -> Result<DdpPacket, DdpError> {
    if buf.len() < HEADER_LEN {
        return Err(DdpError::Truncated);
    }
    let flags = buf[0];
    if flags & VERSION_MASK != VERSION_1 {
        return Err(DdpError::BadVersion);
    }
    let has_timecode = flags & TIMECODE_FLAG != 0;
    let data_type = buf[2];
    let destination_id = buf[3];
    let offset = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
    let declared_len = u16::from_be_bytes([buf[8], buf[9]]) as usize;

    let data_start = HEADER_LEN + if has_timecode { TIMECODE_LEN } else { 0 };
    if buf.len() != data_start + declared_len {
        return Err(DdpError::LengthMismatch);
    }

    Ok(DdpPacket {
        has_timecode,
        data_type,
        destination_id,
        offset,
        data: buf[data_start..].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(flags: u8, data: &[u8], declared_len: u16) -> Vec<u8> {
        let mut buf = vec![flags, 0, 1, 0];
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.extend_from_slice(&declared_len.to_be_bytes());
        if flags & TIMECODE_FLAG != 0 {
            buf.extend_from_slice(&[0u8; 4]);
        }
        buf.extend_from_slice(data);
        buf
    }

    #[test]
    fn parses_minimal_frame() {
        let buf = build(VERSION_1, &[1, 2, 3], 3);
        let pkt = parse(&buf).unwrap();
        assert_eq!(pkt.data, vec![1, 2, 3]);
        assert!(!pkt.has_timecode);
    }

    #[test]
    fn timecode_flag_adds_four_bytes() {
        let buf = build(VERSION_1 | TIMECODE_FLAG, &[9, 9], 2);
        let pkt = parse(&buf).unwrap();
        assert!(pkt.has_timecode);
        assert_eq!(pkt.data, vec![9, 9]);
    }

    #[test]
    fn rejects_bad_version() {
        let buf = build(0, &[1], 1);
        assert_eq!(parse(&buf), Err(DdpError::BadVersion));
    }

    #[test]
    fn rejects_length_mismatch() {
        let buf = build(VERSION_1, &[1, 2, 3], 99);
        assert_eq!(parse(&buf), Err(DdpError::LengthMismatch));
    }

    #[test]
    fn verify_is_always_false() {
        let buf = build(VERSION_1, &[1], 1);
        let pkt = parse(&buf).unwrap();
        assert!(!pkt.verify());
    }
}
