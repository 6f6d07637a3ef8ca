//! JSON transaction semantics for the settings HTTP surface (spec §4.8 /
//! §6). Transport-agnostic: the `bins/` daemon's Axum handlers translate
//! [`PutOutcome`]/[`DeleteOutcome`] into actual status codes, and own the
//! receive-timeout (`408`) that this module has no visibility into.

use serde_json::Value;

use crate::store::{dump_as_json, SettingsError, SettingsStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
    /// Applied; maps to `200`.
    Applied,
    /// Body was empty; maps to `204`.
    EmptyBody,
    /// Not a JSON object, or malformed JSON; maps to `400`.
    ParseError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Applied,
    EmptyBody,
    ParseError,
}

/// `GET /settings`: every persisted key, tag stripped, as one JSON object.
/// The caller serializes this to a `String` first (so `Content-Length` is
/// known before the body is written), matching the "size known before
/// headers" requirement without a true streaming encoder.
pub fn get(store: &SettingsStore) -> Value {
    dump_as_json(store)
}

/// `PUT`/`POST /settings`: apply a JSON object body as a patch. Each
/// top-level member dispatches to `set_<kind>` by its JSON token type.
pub fn put(store: &mut SettingsStore, body: &[u8]) -> Result<PutOutcome, SettingsError> {
    if body.is_empty() {
        return Ok(PutOutcome::EmptyBody);
    }
    let parsed: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(_) => return Ok(PutOutcome::ParseError),
    };
    let Value::Object(map) = parsed else {
        return Ok(PutOutcome::ParseError);
    };
    for (name, value) in &map {
        store.set_by_value(name, value)?;
    }
    Ok(PutOutcome::Applied)
}

/// `DELETE /settings`: body is a JSON object whose top-level member names
/// are the keys to delete (values are ignored — the kind to remove is
/// inferred from whichever kind is currently stored under that name).
pub fn delete(store: &mut SettingsStore, body: &[u8]) -> Result<DeleteOutcome, SettingsError> {
    if body.is_empty() {
        return Ok(DeleteOutcome::EmptyBody);
    }
    let parsed: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(_) => return Ok(DeleteOutcome::ParseError),
    };
    let Value::Object(map) = parsed else {
        return Ok(DeleteOutcome::ParseError);
    };
    for name in map.keys() {
        store.del_by_name(name)?;
    }
    Ok(DeleteOutcome::Applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::MemFlash;

    fn store() -> SettingsStore {
        SettingsStore::open(Box::new(MemFlash::default())).unwrap()
    }

    #[test]
    fn put_empty_body_is_no_op() {
        let mut s = store();
        assert_eq!(put(&mut s, b"").unwrap(), PutOutcome::EmptyBody);
    }

    #[test]
    fn put_malformed_json_is_parse_error() {
        let mut s = store();
        assert_eq!(put(&mut s, b"{not json").unwrap(), PutOutcome::ParseError);
    }

    #[test]
    fn put_applies_patch_and_get_reflects_it() {
        let mut s = store();
        let outcome = put(&mut s, br#"{"tag":"room-5","boot_count":42}"#).unwrap();
        assert_eq!(outcome, PutOutcome::Applied);
        let dumped = get(&s);
        assert_eq!(dumped["tag"], "room-5");
        assert_eq!(dumped["boot_count"], 42.0);
    }

    #[test]
    fn put_non_object_root_is_parse_error() {
        let mut s = store();
        assert_eq!(put(&mut s, b"[1,2,3]").unwrap(), PutOutcome::ParseError);
    }

    #[test]
    fn delete_removes_named_keys() {
        let mut s = store();
        put(&mut s, br#"{"tag":"room-5"}"#).unwrap();
        assert!(s.has_string("tag"));
        let outcome = delete(&mut s, br#"{"tag":null}"#).unwrap();
        assert_eq!(outcome, DeleteOutcome::Applied);
        assert!(!s.has_string("tag"));
    }

    #[test]
    fn delete_empty_body_is_no_op() {
        let mut s = store();
        assert_eq!(delete(&mut s, b"").unwrap(), DeleteOutcome::EmptyBody);
    }
}
