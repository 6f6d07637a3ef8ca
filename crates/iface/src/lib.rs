//! Collaborator interfaces for the hardware and network concerns this
//! workspace treats as external: DMA transfer, journaled flash storage, and
//! mDNS advertisement. Real hardware/network backends live outside this
//! workspace; test and host-dev builds use the stub implementations here.
//!
//! Per the re-architecture notes: these replace the source design's virtual
//! base classes (`PwmTimer`, `SPI`, flash driver) with plain traits that a
//! concrete capability record implements, not a `dyn` hierarchy.

use thiserror::Error;

/// A DMA-driven output channel (clocked or unclocked serial line).
///
/// `begin_transfer` is non-blocking: it kicks off the hardware transfer and
/// returns immediately. `is_busy` is polled cooperatively by the owning
/// strip's scheduler tick, matching the "lock-free flag" design in spec
/// §9 — the only state shared between the DMA completion callback and the
/// producer is the busy flag.
pub trait DmaChannel: Send {
    fn begin_transfer(&mut self, buf: &[u8]);
    fn is_busy(&self) -> bool;
}

/// A PWM timer capability backing one analog terminal's pulse registers.
pub trait PwmTimer: Send {
    /// Write six pulse register values, each in `[0, u16::MAX]`.
    fn write_pulses(&mut self, values: [u16; 6]);
}

/// Host-dev stand-in for a serial DMA channel: accepts transfers
/// immediately and never reports busy. Used where this workspace runs
/// without the real peripheral behind it.
#[derive(Debug, Default)]
pub struct NullDma {
    pub last_transfer_len: usize,
}

impl DmaChannel for NullDma {
    fn begin_transfer(&mut self, buf: &[u8]) {
        self.last_transfer_len = buf.len();
    }
    fn is_busy(&self) -> bool {
        false
    }
}

/// Host-dev stand-in for a PWM timer: records the last pulse write.
#[derive(Debug, Default)]
pub struct NullPwm {
    pub last_pulses: [u16; 6],
}

impl PwmTimer for NullPwm {
    fn write_pulses(&mut self, values: [u16; 6]) {
        self.last_pulses = values;
    }
}

#[derive(Debug, Error)]
pub enum FlashError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt record at offset {0}")]
    Corrupt(u64),
}

/// A journaled flash region: append-only record log, scanned on read.
/// Backed in this workspace by a local file standing in for the flash
/// sector a real device would journal to.
pub trait FlashRegion: Send {
    /// Append one record (caller-defined framing). Must be durable before
    /// returning `Ok`.
    fn append(&mut self, record: &[u8]) -> Result<(), FlashError>;
    /// Read every record currently in the log, oldest first.
    fn read_all(&self) -> Result<Vec<Vec<u8>>, FlashError>;
    /// Erase the region (used to compact and to implement `erase()`).
    fn erase(&mut self) -> Result<(), FlashError>;
}

/// Advertises this device's services over mDNS. The network stack and mDNS
/// responder are external collaborators (see spec §1); this trait exists so
/// the rest of the system can depend on "a device got advertised" without
/// owning the responder.
pub trait MdnsAdvertiser: Send + Sync {
    fn advertise(&self, identity: &types::DeviceIdentity);
}

/// No-op advertiser used in tests and whenever mDNS is unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMdns;

impl MdnsAdvertiser for NullMdns {
    fn advertise(&self, _identity: &types::DeviceIdentity) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_dma_never_busy_and_records_length() {
        let mut dma = NullDma::default();
        dma.begin_transfer(&[1, 2, 3]);
        assert_eq!(dma.last_transfer_len, 3);
        assert!(!dma.is_busy());
    }

    #[test]
    fn null_pwm_records_last_write() {
        let mut pwm = NullPwm::default();
        pwm.write_pulses([1, 2, 3, 4, 5, 6]);
        assert_eq!(pwm.last_pulses, [1, 2, 3, 4, 5, 6]);
    }
}
