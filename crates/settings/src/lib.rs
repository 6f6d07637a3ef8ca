//! Typed KV settings store: journaled log over [`iface::FlashRegion`],
//! type-tagged keys, and the JSON GET/PUT/DELETE transaction semantics the
//! HTTP settings surface is built on.

mod defaults;
mod file_flash;
mod json;
mod kind;
mod store;

pub use defaults::ensure_defaults;
pub use file_flash::FileFlash;
pub use json::{delete as json_delete, get as json_get, put as json_put, DeleteOutcome, PutOutcome};
pub use kind::{split_key, SettingKind};
pub use store::{dump_as_json, SettingsError, SettingsStore};
