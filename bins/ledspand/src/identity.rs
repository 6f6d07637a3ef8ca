//! Device identity: MAC derivation and hostname assignment (spec §6).
//!
//! The real firmware reads a 96-bit chip-unique-ID register; this host port
//! has no such register, so the identity is computed once from host entropy
//! on first boot and persisted in the settings store (`mac_address`,
//! `hostname`) so it stays stable across restarts, the way the rest of
//! spec §6's "persistent state" keys are stable.

use settings::SettingsStore;
use types::DeviceIdentity;

const MURMUR_SEED: u32 = 0x66CF_8031;

/// MurmurHash3 (x86_32), matching the original firmware's bit-for-bit
/// implementation: 4-byte blocks XORed and mixed into `h`, then a tail of
/// up to 3 remaining bytes, then the finalization avalanche.
fn murmur3_32(key: &[u8], seed: u32) -> u32 {
    let mut h = seed;
    let chunks = key.chunks_exact(4);
    let tail = chunks.remainder();

    for chunk in chunks {
        let mut k = u32::from_le_bytes(chunk.try_into().unwrap());
        k = k.wrapping_mul(0xcc9e_2d51);
        k = k.rotate_left(15);
        k = k.wrapping_mul(0x1b87_3593);
        h ^= k;
        h = h.rotate_left(13);
        h = h.wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    if !tail.is_empty() {
        let mut k: u32 = 0;
        for &byte in tail.iter().rev() {
            k = (k << 8) | byte as u32;
        }
        k = k.wrapping_mul(0xcc9e_2d51);
        k = k.rotate_left(15);
        k = k.wrapping_mul(0x1b87_3593);
        h ^= k;
    }

    h ^= key.len() as u32;
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

/// MAC address for a given murmur3 digest: `1E:D5` + the digest's 4 bytes
/// big-endian (spec §6: "bytes 0..1 fixed 0x1E, 0xD5; bytes 2..5 are the
/// top 32 bits of a MurmurHash3_32... with seed 0x66CF8031").
fn mac_from_digest(digest: u32) -> [u8; 6] {
    let d = digest.to_be_bytes();
    [0x1E, 0xD5, d[0], d[1], d[2], d[3]]
}

/// `"lk-" + 8 hex chars` derived from the digest (spec §6 mDNS instance
/// name). The 8 hex digits are the digest itself, which is exactly the
/// big-endian byte sequence that became MAC bytes 2..5.
fn hostname_from_digest(digest: u32) -> String {
    format!("lk-{digest:08x}")
}

fn mac_to_string(mac: [u8; 6]) -> String {
    mac.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(":")
}

fn mac_from_string(s: &str) -> Option<[u8; 6]> {
    let mut out = [0u8; 6];
    let mut parts = s.split(':');
    for slot in out.iter_mut() {
        *slot = u8::from_str_radix(parts.next()?, 16).ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(out)
}

/// Host entropy standing in for the chip's 96-bit unique ID register: not
/// required to be stable across reruns, only to exist once per boot (the
/// identity that's derived from it is then persisted and reused).
fn sample_host_entropy() -> [u8; 12] {
    let pid = std::process::id();
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let addr_entropy = &sample_host_entropy as *const _ as u64;

    let mut out = [0u8; 12];
    out[0..4].copy_from_slice(&pid.to_le_bytes());
    out[4..12].copy_from_slice(&(now ^ addr_entropy).to_le_bytes());
    out
}

/// Load the persisted identity if present, otherwise derive and persist a
/// fresh one. `boot_count`'s own persistence is handled separately by
/// [`settings::ensure_defaults`].
pub fn load_or_create(store: &mut SettingsStore) -> anyhow::Result<DeviceIdentity> {
    let mac = match mac_from_string(&store.get_string("mac_address", "")) {
        Some(mac) => mac,
        None => {
            let digest = murmur3_32(&sample_host_entropy(), MURMUR_SEED);
            let mac = mac_from_digest(digest);
            store.set_string("mac_address", &mac_to_string(mac))?;
            mac
        }
    };

    let hostname = if store.has_string("hostname") {
        store.get_string("hostname", "")
    } else {
        let digest = u32::from_be_bytes([mac[2], mac[3], mac[4], mac[5]]);
        let hostname = hostname_from_digest(digest);
        store.set_string("hostname", &hostname)?;
        hostname
    };

    let tag = store.get_string("tag", "");

    Ok(DeviceIdentity { hostname, mac, tag })
}

#[cfg(test)]
mod tests {
    use super::*;
    use iface::FlashRegion;
    use settings::FileFlash;
    use std::env;
    use std::sync::atomic::{AtomicU64, Ordering};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    fn scratch_store() -> SettingsStore {
        let id = COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = env::temp_dir().join(format!("ledspand-identity-test-{id}.log"));
        let _ = std::fs::remove_file(&path);
        let flash: Box<dyn FlashRegion> = Box::new(FileFlash::open(&path).unwrap());
        SettingsStore::open(flash).unwrap()
    }

    #[test]
    fn murmur3_32_matches_known_vector() {
        // "" with seed 0 hashes to 0 under the canonical x86_32 algorithm.
        assert_eq!(murmur3_32(b"", 0), 0);
    }

    #[test]
    fn hostname_has_expected_shape() {
        let mut store = scratch_store();
        let identity = load_or_create(&mut store).unwrap();
        assert!(identity.hostname.starts_with("lk-"));
        assert_eq!(identity.hostname.len(), "lk-".len() + 8);
        assert_eq!(identity.mac[0], 0x1E);
        assert_eq!(identity.mac[1], 0xD5);
    }

    #[test]
    fn identity_is_stable_across_reload() {
        let mut store = scratch_store();
        let first = load_or_create(&mut store).unwrap();
        let second = load_or_create(&mut store).unwrap();
        assert_eq!(first.mac, second.mac);
        assert_eq!(first.hostname, second.hostname);
    }

    #[test]
    fn mac_string_round_trips() {
        let mac = [0x1E, 0xD5, 0xAA, 0xBB, 0xCC, 0xDD];
        assert_eq!(mac_from_string(&mac_to_string(mac)).unwrap(), mac);
    }
}
