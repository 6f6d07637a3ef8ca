//! sACN (E1.31) data-packet parsing: ACN root-layer authentication, then
//! pulling `(universe, dmp_data)` out of the framing/DMP layers. Discovery
//! packet construction lives in [`crate::discovery`] since it is emitted
//! by the scheduler, not received here.

use thiserror::Error;

pub const SACN_PORT: u16 = 5568;

pub(crate) const ACN_PACKET_IDENTIFIER: &[u8; 12] = b"ASC-E1.17\0\0\0";
const VECTOR_ROOT_E131_DATA: u32 = 0x0000_0004;
const VECTOR_E131_DATA_PACKET: u32 = 0x0000_0002;

const ACN_ID_OFFSET: usize = 4;
const ROOT_VECTOR_OFFSET: usize = 18;
const FRAMING_VECTOR_OFFSET: usize = 40;
const UNIVERSE_OFFSET: usize = 113;
const PROPERTY_COUNT_OFFSET: usize = 123;
const DMP_START_CODE_OFFSET: usize = 125;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SacnError {
    #[error("packet too short")]
    Truncated,
    #[error("not an ACN E1.31 packet")]
    BadIdentifier,
    #[error("unrecognized root or framing vector")]
    BadVector,
}

/// One parsed sACN data packet: target universe and its DMX payload
/// (start code already stripped).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SacnData {
    pub universe: u16,
    pub data: Vec<u8>,
}

pub fn parse_data_packet(buf: &[u8]) -> Result<SacnData, SacnError> {
    if buf.len() < DMP_START_CODE_OFFSET + 1 {
        return Err(SacnError::Truncated);
    }
    if &buf[ACN_ID_OFFSET..ACN_ID_OFFSET + 12] != ACN_PACKET_IDENTIFIER {
        return Err(SacnError::BadIdentifier);
    }
    let root_vector = u32::from_be_bytes(buf[ROOT_VECTOR_OFFSET..ROOT_VECTOR_OFFSET + 4].try_into().unwrap());
    if root_vector != VECTOR_ROOT_E131_DATA {
        return Err(SacnError::BadVector);
    }
    let framing_vector = u32::from_be_bytes(
        buf[FRAMING_VECTOR_OFFSET..FRAMING_VECTOR_OFFSET + 4]
            .try_into()
            .unwrap(),
    );
    if framing_vector != VECTOR_E131_DATA_PACKET {
        return Err(SacnError::BadVector);
    }

    let universe = u16::from_be_bytes([buf[UNIVERSE_OFFSET], buf[UNIVERSE_OFFSET + 1]]);
    let property_count =
        u16::from_be_bytes([buf[PROPERTY_COUNT_OFFSET], buf[PROPERTY_COUNT_OFFSET + 1]]) as usize;
    // property_count includes the DMX start code; the rest is lighting data.
    let data_len = property_count.saturating_sub(1);
    let data_start = DMP_START_CODE_OFFSET + 1;
    let data_end = (data_start + data_len).min(buf.len());
    let data = buf.get(data_start..data_end).unwrap_or(&[]).to_vec();

    Ok(SacnData { universe, data })
}
