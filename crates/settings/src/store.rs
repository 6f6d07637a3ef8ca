//! Journaled KV store: append-only records over an [`iface::FlashRegion`],
//! replayed latest-value-wins on open. Mirrors the teacher's journaled
//! config store (`bvrd::config::ConfigStore`), generalized from a fixed
//! struct to an open-ended typed KV.

use std::net::IpAddr;

use iface::{FlashError, FlashRegion};
use serde_json::Value;
use thiserror::Error;

use crate::kind::{split_key, SettingKind};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("flash error: {0}")]
    Flash(#[from] FlashError),
    #[error("record truncated")]
    Truncated,
}

/// One journal record op. `Set` carries the value as JSON bytes; `Del`
/// carries none. Encoded as `[op:1][key_len:u32 BE][key][value_json]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Set = 0,
    Del = 1,
}

fn encode(op: Op, key: &str, value_json: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(1 + 4 + key.len() + value_json.len());
    buf.push(op as u8);
    buf.extend_from_slice(&(key.len() as u32).to_be_bytes());
    buf.extend_from_slice(key.as_bytes());
    buf.extend_from_slice(value_json);
    buf
}

fn decode(record: &[u8]) -> Result<(Op, String, &[u8]), SettingsError> {
    if record.len() < 5 {
        return Err(SettingsError::Truncated);
    }
    let op = match record[0] {
        0 => Op::Set,
        1 => Op::Del,
        _ => return Err(SettingsError::Truncated),
    };
    let key_len = u32::from_be_bytes(record[1..5].try_into().unwrap()) as usize;
    let key_start = 5;
    let key_end = key_start + key_len;
    if record.len() < key_end {
        return Err(SettingsError::Truncated);
    }
    let key = std::str::from_utf8(&record[key_start..key_end])
        .map_err(|_| SettingsError::Truncated)?
        .to_string();
    Ok((op, key, &record[key_end..]))
}

/// Flat KV mapping `name` to a typed value, journaled over flash.
///
/// Entries are kept in insertion order (first `set` wins the slot;
/// subsequent `set`s of the same key update it in place) so [`Self::dump`]
/// is stable for logging and for `GET /settings`.
pub struct SettingsStore {
    flash: Box<dyn FlashRegion>,
    entries: Vec<(String, Value)>,
}

impl SettingsStore {
    /// Open a store over `flash`, replaying its journal. Does not apply
    /// defaults; see [`crate::defaults::ensure_defaults`].
    pub fn open(flash: Box<dyn FlashRegion>) -> Result<Self, SettingsError> {
        let records = flash.read_all()?;
        let mut entries: Vec<(String, Value)> = Vec::new();
        for record in &records {
            match decode(record) {
                Ok((Op::Set, key, value_json)) => {
                    let value: Value = serde_json::from_slice(value_json).unwrap_or(Value::Null);
                    if let Some(slot) = entries.iter_mut().find(|(k, _)| *k == key) {
                        slot.1 = value;
                    } else {
                        entries.push((key, value));
                    }
                }
                Ok((Op::Del, key, _)) => {
                    entries.retain(|(k, _)| *k != key);
                }
                Err(_) => {
                    tracing::warn!("skipping corrupt settings record");
                }
            }
        }
        Ok(Self { flash, entries })
    }

    fn raw_get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    fn raw_has(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    fn raw_set(&mut self, key: &str, value: Value) -> Result<(), SettingsError> {
        let value_json = serde_json::to_vec(&value).unwrap_or_default();
        self.flash.append(&encode(Op::Set, key, &value_json))?;
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key.to_string(), value));
        }
        Ok(())
    }

    fn raw_del(&mut self, key: &str) -> Result<(), SettingsError> {
        self.flash.append(&encode(Op::Del, key, &[]))?;
        self.entries.retain(|(k, _)| k != key);
        Ok(())
    }

    /// Wipe the whole region. The in-memory cache is cleared too; callers
    /// that need defaults re-applied must call
    /// [`crate::defaults::ensure_defaults`] again afterward.
    pub fn erase(&mut self) -> Result<(), SettingsError> {
        self.flash.erase()?;
        self.entries.clear();
        Ok(())
    }

    /// All live KV pairs, stored-key (with tag) to value, insertion order.
    pub fn dump(&self) -> &[(String, Value)] {
        &self.entries
    }

    pub fn get_string(&self, name: &str, default: &str) -> String {
        self.raw_get(&SettingKind::Str.key(name))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| default.to_string())
    }
    pub fn set_string(&mut self, name: &str, value: &str) -> Result<(), SettingsError> {
        self.raw_set(&SettingKind::Str.key(name), Value::String(value.to_string()))
    }
    pub fn has_string(&self, name: &str) -> bool {
        self.raw_has(&SettingKind::Str.key(name))
    }
    pub fn del_string(&mut self, name: &str) -> Result<(), SettingsError> {
        self.raw_del(&SettingKind::Str.key(name))
    }

    pub fn get_bool(&self, name: &str, default: bool) -> bool {
        self.raw_get(&SettingKind::Bool.key(name))
            .and_then(Value::as_bool)
            .unwrap_or(default)
    }
    pub fn set_bool(&mut self, name: &str, value: bool) -> Result<(), SettingsError> {
        self.raw_set(&SettingKind::Bool.key(name), Value::Bool(value))
    }
    pub fn has_bool(&self, name: &str) -> bool {
        self.raw_has(&SettingKind::Bool.key(name))
    }
    pub fn del_bool(&mut self, name: &str) -> Result<(), SettingsError> {
        self.raw_del(&SettingKind::Bool.key(name))
    }

    pub fn get_number(&self, name: &str, default: f32) -> f32 {
        self.raw_get(&SettingKind::Number.key(name))
            .and_then(Value::as_f64)
            .map(|v| v as f32)
            .unwrap_or(default)
    }
    pub fn set_number(&mut self, name: &str, value: f32) -> Result<(), SettingsError> {
        let num = serde_json::Number::from_f64(value as f64).unwrap_or_else(|| 0.into());
        self.raw_set(&SettingKind::Number.key(name), Value::Number(num))
    }
    pub fn has_number(&self, name: &str) -> bool {
        self.raw_has(&SettingKind::Number.key(name))
    }
    pub fn del_number(&mut self, name: &str) -> Result<(), SettingsError> {
        self.raw_del(&SettingKind::Number.key(name))
    }

    pub fn get_null(&self, name: &str) -> bool {
        self.raw_has(&SettingKind::Null.key(name))
    }
    pub fn set_null(&mut self, name: &str) -> Result<(), SettingsError> {
        self.raw_set(&SettingKind::Null.key(name), Value::Null)
    }
    pub fn has_null(&self, name: &str) -> bool {
        self.raw_has(&SettingKind::Null.key(name))
    }
    pub fn del_null(&mut self, name: &str) -> Result<(), SettingsError> {
        self.raw_del(&SettingKind::Null.key(name))
    }

    pub fn get_ip_address(&self, name: &str) -> Option<IpAddr> {
        self.raw_get(&SettingKind::IpAddress.key(name))
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    }
    pub fn set_ip_address(&mut self, name: &str, value: IpAddr) -> Result<(), SettingsError> {
        self.raw_set(&SettingKind::IpAddress.key(name), Value::String(value.to_string()))
    }
    pub fn has_ip_address(&self, name: &str) -> bool {
        self.raw_has(&SettingKind::IpAddress.key(name))
    }
    pub fn del_ip_address(&mut self, name: &str) -> Result<(), SettingsError> {
        self.raw_del(&SettingKind::IpAddress.key(name))
    }

    pub fn get_object(&self, name: &str) -> Option<Value> {
        self.raw_get(&SettingKind::Object.key(name)).cloned()
    }
    pub fn set_object(&mut self, name: &str, value: Value) -> Result<(), SettingsError> {
        self.raw_set(&SettingKind::Object.key(name), value)
    }
    pub fn has_object(&self, name: &str) -> bool {
        self.raw_has(&SettingKind::Object.key(name))
    }
    pub fn del_object(&mut self, name: &str) -> Result<(), SettingsError> {
        self.raw_del(&SettingKind::Object.key(name))
    }

    pub fn get_number_vec(&self, name: &str) -> Vec<f32> {
        self.raw_get(&SettingKind::NumberVec.key(name))
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(|v| v.as_f64()).map(|v| v as f32).collect())
            .unwrap_or_default()
    }
    pub fn set_number_vec(&mut self, name: &str, value: &[f32]) -> Result<(), SettingsError> {
        let arr: Vec<Value> = value
            .iter()
            .map(|&v| Value::Number(serde_json::Number::from_f64(v as f64).unwrap_or_else(|| 0.into())))
            .collect();
        self.raw_set(&SettingKind::NumberVec.key(name), Value::Array(arr))
    }
    pub fn has_number_vec(&self, name: &str) -> bool {
        self.raw_has(&SettingKind::NumberVec.key(name))
    }
    pub fn del_number_vec(&mut self, name: &str) -> Result<(), SettingsError> {
        self.raw_del(&SettingKind::NumberVec.key(name))
    }

    pub fn get_number_vec2(&self, name: &str) -> Vec<Vec<f32>> {
        self.raw_get(&SettingKind::NumberVec2.key(name))
            .and_then(Value::as_array)
            .map(|rows| {
                rows.iter()
                    .filter_map(Value::as_array)
                    .map(|row| row.iter().filter_map(|v| v.as_f64()).map(|v| v as f32).collect())
                    .collect()
            })
            .unwrap_or_default()
    }
    pub fn set_number_vec2(&mut self, name: &str, value: &[Vec<f32>]) -> Result<(), SettingsError> {
        let rows: Vec<Value> = value
            .iter()
            .map(|row| {
                Value::Array(
                    row.iter()
                        .map(|&v| Value::Number(serde_json::Number::from_f64(v as f64).unwrap_or_else(|| 0.into())))
                        .collect(),
                )
            })
            .collect();
        self.raw_set(&SettingKind::NumberVec2.key(name), Value::Array(rows))
    }
    pub fn has_number_vec2(&self, name: &str) -> bool {
        self.raw_has(&SettingKind::NumberVec2.key(name))
    }
    pub fn del_number_vec2(&mut self, name: &str) -> Result<(), SettingsError> {
        self.raw_del(&SettingKind::NumberVec2.key(name))
    }

    pub fn get_string_vec(&self, name: &str) -> Vec<String> {
        self.raw_get(&SettingKind::StringVec.key(name))
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(|v| v.as_str()).map(str::to_string).collect())
            .unwrap_or_default()
    }
    pub fn set_string_vec(&mut self, name: &str, value: &[String]) -> Result<(), SettingsError> {
        let arr: Vec<Value> = value.iter().map(|s| Value::String(s.clone())).collect();
        self.raw_set(&SettingKind::StringVec.key(name), Value::Array(arr))
    }
    pub fn has_string_vec(&self, name: &str) -> bool {
        self.raw_has(&SettingKind::StringVec.key(name))
    }
    pub fn del_string_vec(&mut self, name: &str) -> Result<(), SettingsError> {
        self.raw_del(&SettingKind::StringVec.key(name))
    }

    pub fn get_bool_vec(&self, name: &str) -> Vec<bool> {
        self.raw_get(&SettingKind::BoolVec.key(name))
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_bool).collect())
            .unwrap_or_default()
    }
    pub fn set_bool_vec(&mut self, name: &str, value: &[bool]) -> Result<(), SettingsError> {
        let arr: Vec<Value> = value.iter().map(|&b| Value::Bool(b)).collect();
        self.raw_set(&SettingKind::BoolVec.key(name), Value::Array(arr))
    }
    pub fn has_bool_vec(&self, name: &str) -> bool {
        self.raw_has(&SettingKind::BoolVec.key(name))
    }
    pub fn del_bool_vec(&mut self, name: &str) -> Result<(), SettingsError> {
        self.raw_del(&SettingKind::BoolVec.key(name))
    }

    /// `boot_count`'s dedicated monotonic counter kind.
    pub fn get_counter(&self, name: &str, default: u32) -> u32 {
        self.raw_get(&SettingKind::Counter.key(name))
            .and_then(Value::as_u64)
            .map(|v| v as u32)
            .unwrap_or(default)
    }
    pub fn set_counter(&mut self, name: &str, value: u32) -> Result<(), SettingsError> {
        self.raw_set(&SettingKind::Counter.key(name), Value::from(value))
    }
    pub fn has_counter(&self, name: &str) -> bool {
        self.raw_has(&SettingKind::Counter.key(name))
    }

    /// Set a value of whichever kind the JSON shape implies, used by the
    /// JSON PUT path (spec §4.8). Returns the kind it dispatched to.
    ///
    /// `boot_count` is special-cased to the dedicated `Counter` kind rather
    /// than `Number`, so a PUT against it lands on the same `@i` key
    /// [`crate::defaults::ensure_defaults`] reads and increments at the next
    /// boot instead of shadowing it with a disjoint `@f` entry.
    pub(crate) fn set_by_value(&mut self, name: &str, value: &Value) -> Result<SettingKind, SettingsError> {
        match value {
            Value::String(s) => {
                self.set_string(name, s)?;
                Ok(SettingKind::Str)
            }
            Value::Bool(b) => {
                self.set_bool(name, *b)?;
                Ok(SettingKind::Bool)
            }
            Value::Null => {
                self.set_null(name)?;
                Ok(SettingKind::Null)
            }
            Value::Number(n) if name == "boot_count" => {
                self.set_counter(name, n.as_u64().unwrap_or(0) as u32)?;
                Ok(SettingKind::Counter)
            }
            Value::Number(n) => {
                self.set_number(name, n.as_f64().unwrap_or(0.0) as f32)?;
                Ok(SettingKind::Number)
            }
            Value::Object(_) => {
                self.set_object(name, value.clone())?;
                Ok(SettingKind::Object)
            }
            Value::Array(items) => match items.first() {
                None => {
                    self.set_number_vec(name, &[])?;
                    Ok(SettingKind::NumberVec)
                }
                Some(Value::Bool(_)) => {
                    let v: Vec<bool> = items.iter().filter_map(Value::as_bool).collect();
                    self.set_bool_vec(name, &v)?;
                    Ok(SettingKind::BoolVec)
                }
                Some(Value::String(_)) => {
                    let v: Vec<String> = items.iter().filter_map(|i| i.as_str()).map(str::to_string).collect();
                    self.set_string_vec(name, &v)?;
                    Ok(SettingKind::StringVec)
                }
                Some(Value::Array(_)) => {
                    let rows: Vec<Vec<f32>> = items
                        .iter()
                        .filter_map(Value::as_array)
                        .map(|row| row.iter().filter_map(|v| v.as_f64()).map(|v| v as f32).collect())
                        .collect();
                    self.set_number_vec2(name, &rows)?;
                    Ok(SettingKind::NumberVec2)
                }
                Some(_) => {
                    let v: Vec<f32> = items.iter().filter_map(|i| i.as_f64()).map(|v| v as f32).collect();
                    self.set_number_vec(name, &v)?;
                    Ok(SettingKind::NumberVec)
                }
            },
        }
    }

    /// Delete whichever kind of `name` is currently stored, trying each
    /// permitted kind in turn. Used by the JSON DELETE path, which (unlike
    /// PUT) carries no type-bearing value to infer a kind from.
    pub(crate) fn del_by_name(&mut self, name: &str) -> Result<(), SettingsError> {
        for kind in SettingKind::ALL {
            let key = kind.key(name);
            if self.raw_has(&key) {
                return self.raw_del(&key);
            }
        }
        Ok(())
    }
}

/// JSON value for one dumped entry, keyed by bare name (tag stripped).
pub fn dump_as_json(store: &SettingsStore) -> Value {
    let mut map = serde_json::Map::new();
    for (stored_key, value) in store.dump() {
        if let Some((name, _kind)) = split_key(stored_key) {
            map.insert(name.to_string(), value.clone());
        }
    }
    Value::Object(map)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Arc, Mutex};

    use iface::{FlashError, FlashRegion};

    /// In-memory stand-in for a journaled flash sector, used by this
    /// crate's own tests (no filesystem or hardware access). Cloning shares
    /// the backing log, so re-`open`ing a clone simulates a reboot.
    #[derive(Default, Clone)]
    pub struct MemFlash {
        records: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl FlashRegion for MemFlash {
        fn append(&mut self, record: &[u8]) -> Result<(), FlashError> {
            self.records.lock().unwrap().push(record.to_vec());
            Ok(())
        }
        fn read_all(&self) -> Result<Vec<Vec<u8>>, FlashError> {
            Ok(self.records.lock().unwrap().clone())
        }
        fn erase(&mut self) -> Result<(), FlashError> {
            self.records.lock().unwrap().clear();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::MemFlash;
    use super::*;

    fn empty_store() -> SettingsStore {
        SettingsStore::open(Box::new(MemFlash::default())).unwrap()
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut store = empty_store();
        store.set_string("hostname", "lk-aabbcc").unwrap();
        assert_eq!(store.get_string("hostname", ""), "lk-aabbcc");
    }

    #[test]
    fn later_set_overwrites_earlier_value() {
        let mut store = empty_store();
        store.set_number("boot_count", 1.0).unwrap();
        store.set_number("boot_count", 2.0).unwrap();
        store.set_number("boot_count", 3.0).unwrap();
        assert_eq!(store.get_number("boot_count", 0.0), 3.0);
    }

    #[test]
    fn del_makes_has_false() {
        let mut store = empty_store();
        store.set_bool("dhcp", true).unwrap();
        assert!(store.has_bool("dhcp"));
        store.del_bool("dhcp").unwrap();
        assert!(!store.has_bool("dhcp"));
    }

    #[test]
    fn replay_from_journal_reconstructs_latest_state() {
        let flash = MemFlash::default();
        {
            let mut store = SettingsStore::open(Box::new(flash.clone())).unwrap();
            store.set_string("tag", "room-5").unwrap();
            store.set_number("boot_count", 42.0).unwrap();
            store.set_string("tag", "room-6").unwrap();
            store.set_bool("ghost", true).unwrap();
            store.del_bool("ghost").unwrap();
        }
        let reopened = SettingsStore::open(Box::new(flash)).unwrap();
        assert_eq!(reopened.get_string("tag", ""), "room-6");
        assert_eq!(reopened.get_number("boot_count", 0.0), 42.0);
        assert!(!reopened.has_bool("ghost"));
    }

    #[test]
    fn erase_clears_everything() {
        let mut store = empty_store();
        store.set_string("tag", "x").unwrap();
        store.erase().unwrap();
        assert!(!store.has_string("tag"));
        assert_eq!(store.dump().len(), 0);
    }

    #[test]
    fn dump_as_json_strips_tags() {
        let mut store = empty_store();
        store.set_string("tag", "room-5").unwrap();
        store.set_number("boot_count", 42.0).unwrap();
        let json = dump_as_json(&store);
        assert_eq!(json["tag"], "room-5");
        assert_eq!(json["boot_count"], 42.0);
    }

    #[test]
    fn set_by_value_infers_kind_from_json_token() {
        let mut store = empty_store();
        store.set_by_value("a", &Value::String("x".into())).unwrap();
        store.set_by_value("b", &Value::Bool(true)).unwrap();
        store.set_by_value("c", &Value::from(1.5)).unwrap();
        store.set_by_value("d", &Value::Null).unwrap();
        store.set_by_value("e", &Value::Array(vec![Value::from(1), Value::from(2)])).unwrap();
        assert!(store.has_string("a"));
        assert!(store.has_bool("b"));
        assert!(store.has_number("c"));
        assert!(store.has_null("d"));
        assert!(store.has_number_vec("e"));
    }

    #[test]
    fn del_by_name_removes_whichever_kind_is_present() {
        let mut store = empty_store();
        store.set_bool("dhcp", true).unwrap();
        store.del_by_name("dhcp").unwrap();
        assert!(!store.has_bool("dhcp"));
    }
}
