//! Synthesis engine plugin contract.
//!
//! Generalizes `gglib_voice::backend::TtsBackend` (one `synthesize(&self,
//! text) -> TtsAudio` call returning a single buffer) to the streaming
//! `result_sink` model the distilled spec requires: an engine may deliver
//! any number of `Start`/`Continue` events before a single terminal event,
//! and delivery may happen synchronously (on the caller's stack, inside
//! `start`) or asynchronously from a thread the engine owns. The driver in
//! `ttsd-scheduler::engine_driver` is the only caller of this trait.

use async_trait::async_trait;

use crate::domain::{AudioEvent, AudioFormat, ClientId, UtteranceId, VoiceType};
use crate::error::SchedulerError;

/// One synthesis request handed to [`EnginePort::start`].
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub client: ClientId,
    pub utt_id: UtteranceId,
    pub text: String,
    pub language: String,
    pub voice_type: VoiceType,
    /// `0` means "use engine default".
    pub speed: i32,
    /// `0` means "use engine default".
    pub pitch: i32,
}

/// A single voice the engine can synthesize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceDescriptor {
    pub language: String,
    pub voice_type: VoiceType,
}

/// Static engine metadata returned by [`EnginePort::load`].
#[derive(Debug, Clone)]
pub struct EngineInfo {
    pub engine_id: String,
    pub name: String,
    pub needs_network: bool,
    pub supports_pitch: bool,
}

/// The callback an engine invokes — zero or more times, synchronously or
/// from its own thread — to deliver `(event, bytes)` for the utterance
/// passed to the most recent [`EnginePort::start`] call.
///
/// The driver, not the engine, is responsible for tagging each delivery
/// with the right `(ClientId, UtteranceId)`: because only one `start` may
/// be in flight at a time, the driver closes over the pair at `start` time
/// and the engine only ever needs to supply the event and the bytes.
pub type EngineResultSink = std::sync::Arc<dyn Fn(AudioEvent, Vec<u8>) + Send + Sync>;

/// Trait object surface for a dynamically-loaded synthesis engine.
///
/// Implementations must uphold the key engine-driver invariant: between a
/// `start` call and that utterance's terminal event, the driver will not
/// issue another `start`; an implementation that receives one anyway
/// should treat it as a programming error in the driver, not something to
/// defend against by queuing.
#[async_trait]
pub trait EnginePort: Send + Sync {
    /// Resolve and initialize the engine, returning its static metadata.
    /// Runs at most once per daemon lifetime per engine id (switching
    /// engines requires [`EnginePort::unload`] first).
    async fn load(&self) -> Result<EngineInfo, SchedulerError>;

    /// Idempotent teardown.
    async fn unload(&self) -> Result<(), SchedulerError>;

    /// Begin synthesizing `request`, delivering results through `sink`.
    /// Precondition: no other utterance is in flight on this engine.
    async fn start(
        &self,
        request: SynthesisRequest,
        sink: EngineResultSink,
    ) -> Result<(), SchedulerError>;

    /// Ask the engine to abandon the in-flight utterance. Fire-and-forget:
    /// the caller does not wait for a `Cancel` event before proceeding.
    async fn cancel(&self) -> Result<(), SchedulerError>;

    /// Visit every voice the engine supports; stop early if `visitor`
    /// returns `false`.
    fn foreach_voice(&self, visitor: &mut dyn FnMut(&VoiceDescriptor) -> bool);

    /// The engine's notion of "daemon default" voice.
    fn default_voice(&self) -> VoiceDescriptor;

    /// `true` if `(language, voice_type)` is one the engine can serve, or
    /// if it is the daemon-default pair, which must never be rejected.
    fn is_valid_voice(&self, language: &str, voice_type: VoiceType) -> bool;

    /// Sample format produced by every chunk of every utterance, queried
    /// once per session at setup.
    fn audio_format(&self) -> AudioFormat;
}
