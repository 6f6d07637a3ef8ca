//! Maps the topology/strip/analog [`model::Model`] onto the generic
//! settings KV (spec §6's "vectorized strip/analog config keys"), using
//! [`settings::SettingKind::Object`] since [`types::StripConfig`] and
//! [`types::AnalogConfig`] already derive `Serialize`/`Deserialize`.

use model::{Model, ANALOG_TERMINALS, STRIP_CHANNELS};
use settings::{SettingsError, SettingsStore};
use types::OutputTopology;

fn strip_key(channel: usize) -> String {
    format!("strip_config_{channel}")
}

fn analog_key(terminal: usize) -> String {
    format!("analog_config_{terminal}")
}

/// Build a [`Model`] from whatever topology/strip/analog objects are
/// currently persisted, falling back to defaults for anything absent
/// (first boot, or a settings store that predates a given key).
pub fn load_model(store: &SettingsStore) -> Model {
    let mut model = Model::new();

    if let Some(topology) = store
        .get_object("topology")
        .and_then(|v| serde_json::from_value::<OutputTopology>(v).ok())
    {
        model.set_topology(topology);
    }

    for channel in 0..STRIP_CHANNELS {
        if let Some(cfg) = store
            .get_object(&strip_key(channel))
            .and_then(|v| serde_json::from_value(v).ok())
        {
            *model.strip_mut(channel) = cfg;
        }
    }

    for terminal in 0..ANALOG_TERMINALS {
        if let Some(cfg) = store
            .get_object(&analog_key(terminal))
            .and_then(|v| serde_json::from_value(v).ok())
        {
            *model.analog_mut(terminal) = cfg;
        }
    }

    model
}

/// Persist the full model so the next boot reconstructs the same
/// configuration via [`load_model`].
pub fn save_model(store: &mut SettingsStore, model: &Model) -> Result<(), SettingsError> {
    store.set_object("topology", serde_json::to_value(model.topology()).unwrap_or_default())?;
    for channel in 0..STRIP_CHANNELS {
        let value = serde_json::to_value(model.strip(channel)).unwrap_or_default();
        store.set_object(&strip_key(channel), value)?;
    }
    for terminal in 0..ANALOG_TERMINALS {
        let value = serde_json::to_value(model.analog(terminal)).unwrap_or_default();
        store.set_object(&analog_key(terminal), value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use iface::FlashRegion;
    use settings::FileFlash;
    use std::env;
    use std::sync::atomic::{AtomicU64, Ordering};
    use types::ChipType;

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    fn scratch_store() -> SettingsStore {
        let id = COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = env::temp_dir().join(format!("ledspand-config-test-{id}.log"));
        let _ = std::fs::remove_file(&path);
        let flash: Box<dyn FlashRegion> = Box::new(FileFlash::open(&path).unwrap());
        SettingsStore::open(flash).unwrap()
    }

    #[test]
    fn save_then_load_round_trips_topology_and_strip_config() {
        let mut store = scratch_store();
        let mut model = Model::new();
        model.set_topology(OutputTopology::RgbStrip);
        model.strip_mut(1).chip = ChipType::Apa102;
        model.strip_mut(1).pixel_count = 144;
        model.strip_mut(1).name = "porch".to_string();

        save_model(&mut store, &model).unwrap();
        let reloaded = load_model(&store);

        assert_eq!(reloaded.topology(), OutputTopology::RgbStrip);
        assert_eq!(reloaded.strip(1).chip, ChipType::Apa102);
        assert_eq!(reloaded.strip(1).pixel_count, 144);
        assert_eq!(reloaded.strip(1).name, "porch");
    }

    #[test]
    fn load_with_nothing_persisted_returns_defaults() {
        let store = scratch_store();
        let model = load_model(&store);
        assert_eq!(model.topology(), OutputTopology::default());
    }
}
