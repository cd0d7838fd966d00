//! The secondary settings control surface: out of scope for
//! *ownership* — persistence, the UI that edits these values, and engine
//! discovery all live elsewhere — but the scheduler must know the current
//! values in order to resolve `(language = "default", voice_type = Auto)`
//! requests and to pick an engine at the first `initialize`.
//!
//! Shaped like `gglib_core::settings::Settings`: a plain, `serde`-friendly
//! struct with a `with_defaults` constructor, owned by whatever adapter
//! reads the daemon's persisted configuration and handed to the scheduler
//! at construction and via `Scheduler::apply_settings` on change.

use serde::{Deserialize, Serialize};

use crate::domain::VoiceType;

/// Snapshot of the settings the scheduler reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    /// Engine id to load at the first `initialize` if none is loaded yet.
    pub default_engine_id: String,
    /// Resolved language used for `(language = "default", ...)` requests.
    pub default_language: String,
    /// Resolved voice type used for `(..., voice_type = Auto)` requests.
    pub default_voice_type: VoiceType,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl SchedulerSettings {
    /// Sensible out-of-the-box values: the reference engine id, American
    /// English, and an automatically-chosen voice.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            default_engine_id: "default".to_owned(),
            default_language: "en_US".to_owned(),
            default_voice_type: VoiceType::Auto,
        }
    }
}

// `VoiceType` needs to round-trip through settings persistence even
// though it is not a wire DTO; a hand-written impl keeps `serde::Serialize`
// off `crate::domain::VoiceType` itself, since nothing else requires the
// domain type to be serializable.
impl Serialize for VoiceType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let label = match self {
            Self::Auto => "auto".to_owned(),
            Self::Male => "male".to_owned(),
            Self::Female => "female".to_owned(),
            Self::Child => "child".to_owned(),
            Self::UserDefined(slot) => format!("user_defined:{slot}"),
        };
        serializer.serialize_str(&label)
    }
}

impl<'de> Deserialize<'de> for VoiceType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let label = String::deserialize(deserializer)?;
        match label.as_str() {
            "auto" => Ok(Self::Auto),
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            "child" => Ok(Self::Child),
            other => other
                .strip_prefix("user_defined:")
                .and_then(|n| n.parse().ok())
                .map(Self::UserDefined)
                .ok_or_else(|| serde::de::Error::custom(format!("unknown voice type: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_the_b3_pair() {
        let settings = SchedulerSettings::with_defaults();
        assert_eq!(settings.default_voice_type, VoiceType::Auto);
        assert!(!settings.default_language.is_empty());
    }

    #[test]
    fn voice_type_round_trips_through_json() {
        for vt in [
            VoiceType::Auto,
            VoiceType::Male,
            VoiceType::Female,
            VoiceType::Child,
            VoiceType::UserDefined(2),
        ] {
            let json = serde_json::to_string(&vt).unwrap();
            let back: VoiceType = serde_json::from_str(&json).unwrap();
            assert_eq!(vt, back);
        }
    }
}
