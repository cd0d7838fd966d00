//! The request side of a client's FIFO: text queued for synthesis.

use super::{DEFAULT_SPEED_OR_PITCH, UtteranceId, VoiceType};

/// A single queued synthesis request, immutable once inserted into a
/// client's request queue.
///
/// `language` is a BCP-47–style two-letter tag, or the literal string
/// `"default"` meaning "use the daemon default" (this combination,
/// together with `voice_type == VoiceType::Auto`, must always resolve
/// rather than being rejected as `InvalidVoice`).
#[derive(Debug, Clone)]
pub struct RequestItem {
    pub utt_id: UtteranceId,
    pub text: String,
    pub language: String,
    pub voice_type: VoiceType,
    /// Engine-reported range; `0` means "use engine default".
    pub speed: i32,
    /// Engine-reported range; `0` means "use engine default". Engines
    /// that report no pitch-control capability reject any non-default
    /// value with `NotSupportedFeature`.
    pub pitch: i32,
}

impl RequestItem {
    /// Build a request using the daemon-default speed and pitch sentinels.
    #[must_use]
    pub fn new(utt_id: UtteranceId, text: String, language: String, voice_type: VoiceType) -> Self {
        Self {
            utt_id,
            text,
            language,
            voice_type,
            speed: DEFAULT_SPEED_OR_PITCH,
            pitch: DEFAULT_SPEED_OR_PITCH,
        }
    }

    /// `true` if the text is the literal default-language/auto-voice pair
    /// that must never be rejected as an unsupported voice.
    #[must_use]
    pub fn wants_daemon_default_voice(&self) -> bool {
        self.language == "default" && matches!(self.voice_type, VoiceType::Auto)
    }
}
