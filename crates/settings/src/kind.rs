//! Type-suffix tags (spec §3/§6: "keys ending in a 2-char type tag").

/// The permitted value kinds, each carrying its own 2-character key suffix.
///
/// `Counter` (`@i`) is not one of the JSON-shaped kinds spec §3 enumerates
/// for general use; it is a dedicated tag for `boot_count`, which needs a
/// monotonic unsigned counter rather than an `f32` (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKind {
    Str,
    Bool,
    Number,
    Null,
    IpAddress,
    Object,
    NumberVec,
    NumberVec2,
    StringVec,
    BoolVec,
    Counter,
}

impl SettingKind {
    pub const ALL: [SettingKind; 11] = [
        SettingKind::Str,
        SettingKind::Bool,
        SettingKind::Number,
        SettingKind::Null,
        SettingKind::IpAddress,
        SettingKind::Object,
        SettingKind::NumberVec,
        SettingKind::NumberVec2,
        SettingKind::StringVec,
        SettingKind::BoolVec,
        SettingKind::Counter,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            SettingKind::Str => "@s",
            SettingKind::Bool => "@b",
            SettingKind::Number => "@f",
            SettingKind::Null => "@n",
            SettingKind::IpAddress => "@a",
            SettingKind::Object => "@o",
            SettingKind::NumberVec => "@F",
            SettingKind::NumberVec2 => "@2",
            SettingKind::StringVec => "@S",
            SettingKind::BoolVec => "@B",
            SettingKind::Counter => "@i",
        }
    }

    /// Stored key for a given bare name under this kind.
    pub fn key(self, name: &str) -> String {
        format!("{name}{}", self.tag())
    }

    /// Recover a kind from its 2-character tag, if recognized.
    pub fn from_tag(tag: &str) -> Option<SettingKind> {
        Self::ALL.into_iter().find(|k| k.tag() == tag)
    }
}

/// Split a stored key (`name + tag`) back into its bare name and kind.
/// Returns `None` if the key doesn't end in a recognized tag.
pub fn split_key(stored: &str) -> Option<(&str, SettingKind)> {
    if stored.len() < 2 {
        return None;
    }
    let (name, tag) = stored.split_at(stored.len() - 2);
    SettingKind::from_tag(tag).map(|kind| (name, kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_key_and_split() {
        for kind in SettingKind::ALL {
            let stored = kind.key("hostname");
            let (name, parsed) = split_key(&stored).unwrap();
            assert_eq!(name, "hostname");
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn unrecognized_tag_is_none() {
        assert!(split_key("hostname@z").is_none());
        assert!(split_key("x").is_none());
    }
}
