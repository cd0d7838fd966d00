//! Hand-rolled test doubles for the engine and audio-backend ports.
//!
//! Grounded in `gglib_voice/tests/pipeline_state_machine.rs`'s mock
//! STT/TTS backends: plain structs behind `Arc<Mutex<_>>` rather than a
//! mocking framework, because both ports here are driven by asynchronous
//! callback delivery that is easier to script by hand (call `emit` exactly
//! when the test wants the "engine" to produce a chunk) than to express as
//! a sequence of `mockall` expectations. Exposed unconditionally (not
//! `#[cfg(test)]`-gated) so both this crate's unit tests and
//! `tests/*.rs` integration tests can share one implementation.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use ttsd_core::{
    AudioBackendPort, AudioChunk, AudioFormat, AudioKind, ClientId, ClientState, EngineInfo,
    EnginePort, EngineResultSink, ErrorKind, SchedulerError, SlotState, SynthesisRequest,
    UtteranceId, VoiceDescriptor, VoiceType,
};
use ttsd_core::ports::ClientNotifier;

/// A synthesis engine double that records every `start`/`cancel` call and
/// lets the test drive the result sink of the most recent `start` by hand
/// via [`RecordingEngine::emit`].
#[derive(Default)]
pub struct RecordingEngine {
    pub started: Mutex<Vec<SynthesisRequest>>,
    pub cancelled: Mutex<u32>,
    last_sink: Mutex<Option<EngineResultSink>>,
    fail_next_start: Mutex<bool>,
    voices: Vec<VoiceDescriptor>,
    supports_pitch: bool,
}

impl RecordingEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            voices: vec![
                VoiceDescriptor {
                    language: "en_US".into(),
                    voice_type: VoiceType::Female,
                },
                VoiceDescriptor {
                    language: "en_US".into(),
                    voice_type: VoiceType::Male,
                },
            ],
            supports_pitch: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn without_pitch_support() -> Self {
        Self {
            supports_pitch: false,
            ..Self::new()
        }
    }

    /// Make the next `start` call return `OperationFailed` instead of
    /// succeeding, used by the engine-failure-mid-utterance scenario test.
    pub fn fail_next_start(&self) {
        *self.fail_next_start.lock().unwrap() = true;
    }

    /// Invoke the sink captured from the most recent `start` call, as if
    /// the engine had produced `(event, bytes)` asynchronously.
    pub fn emit(&self, event: ttsd_core::AudioEvent, bytes: Vec<u8>) {
        let sink = self.last_sink.lock().unwrap().clone();
        if let Some(sink) = sink {
            sink(event, bytes);
        }
    }

    #[must_use]
    pub fn start_count(&self) -> usize {
        self.started.lock().unwrap().len()
    }
}

#[async_trait]
impl EnginePort for RecordingEngine {
    async fn load(&self) -> Result<EngineInfo, SchedulerError> {
        Ok(EngineInfo {
            engine_id: "recording-mock".into(),
            name: "Recording Mock Engine".into(),
            needs_network: false,
            supports_pitch: self.supports_pitch,
        })
    }

    async fn unload(&self) -> Result<(), SchedulerError> {
        Ok(())
    }

    async fn start(
        &self,
        request: SynthesisRequest,
        sink: EngineResultSink,
    ) -> Result<(), SchedulerError> {
        self.started.lock().unwrap().push(request);
        *self.last_sink.lock().unwrap() = Some(sink);
        let mut fail = self.fail_next_start.lock().unwrap();
        if *fail {
            *fail = false;
            return Err(SchedulerError::new(
                ErrorKind::OperationFailed,
                "forced test failure",
            ));
        }
        Ok(())
    }

    async fn cancel(&self) -> Result<(), SchedulerError> {
        *self.cancelled.lock().unwrap() += 1;
        Ok(())
    }

    fn foreach_voice(&self, visitor: &mut dyn FnMut(&VoiceDescriptor) -> bool) {
        for voice in &self.voices {
            if !visitor(voice) {
                break;
            }
        }
    }

    fn default_voice(&self) -> VoiceDescriptor {
        VoiceDescriptor {
            language: "en_US".into(),
            voice_type: VoiceType::Auto,
        }
    }

    fn is_valid_voice(&self, language: &str, voice_type: VoiceType) -> bool {
        if language == "default" && matches!(voice_type, VoiceType::Auto) {
            return true;
        }
        self.voices
            .iter()
            .any(|v| v.language == language && v.voice_type == voice_type)
    }

    fn audio_format(&self) -> AudioFormat {
        AudioFormat {
            kind: AudioKind::Pcm16Mono,
            sample_rate_hz: 22_050,
            channel_count: 1,
        }
    }
}

/// An audio backend double that records every slot operation and reports
/// whatever state was last set on it.
#[derive(Default)]
pub struct MockAudioBackend {
    pub slots: Mutex<HashMap<ClientId, SlotState>>,
    pub played: Mutex<Vec<(ClientId, AudioChunk)>>,
    pub paused: Mutex<Vec<ClientId>>,
    pub resumed: Mutex<Vec<ClientId>>,
    pub stopped: Mutex<Vec<ClientId>>,
}

impl MockAudioBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AudioBackendPort for MockAudioBackend {
    async fn create_slot(&self, client: ClientId) -> Result<(), SchedulerError> {
        self.slots.lock().unwrap().insert(client, SlotState::Idle);
        Ok(())
    }

    async fn destroy_slot(&self, client: ClientId) -> Result<(), SchedulerError> {
        self.slots.lock().unwrap().remove(&client);
        Ok(())
    }

    async fn play(
        &self,
        client: ClientId,
        _format: AudioFormat,
        chunk: AudioChunk,
    ) -> Result<(), SchedulerError> {
        self.slots.lock().unwrap().insert(client, SlotState::Playing);
        self.played.lock().unwrap().push((client, chunk));
        Ok(())
    }

    async fn pause(&self, client: ClientId) -> Result<(), SchedulerError> {
        self.slots.lock().unwrap().insert(client, SlotState::Paused);
        self.paused.lock().unwrap().push(client);
        Ok(())
    }

    async fn resume(&self, client: ClientId) -> Result<(), SchedulerError> {
        self.slots.lock().unwrap().insert(client, SlotState::Playing);
        self.resumed.lock().unwrap().push(client);
        Ok(())
    }

    async fn stop(&self, client: ClientId) -> Result<(), SchedulerError> {
        self.slots.lock().unwrap().insert(client, SlotState::Idle);
        self.stopped.lock().unwrap().push(client);
        Ok(())
    }

    async fn get_state(&self, client: ClientId) -> Result<SlotState, SchedulerError> {
        Ok(self
            .slots
            .lock()
            .unwrap()
            .get(&client)
            .copied()
            .unwrap_or(SlotState::Idle))
    }
}

/// One recorded call to a [`ClientNotifier`] method, kept in delivery order
/// so ordering properties can be asserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    StateChanged {
        client: ClientId,
        before: ClientState,
        current: ClientState,
    },
    UtteranceStarted {
        client: ClientId,
        utt_id: UtteranceId,
    },
    UtteranceCompleted {
        client: ClientId,
        utt_id: UtteranceId,
    },
    Error {
        client: ClientId,
        utt_id: UtteranceId,
        reason: ErrorKind,
    },
}

/// A [`ClientNotifier`] that records every call instead of transporting it.
#[derive(Default, Clone)]
pub struct RecordingNotifier {
    log: std::sync::Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn all(&self) -> Vec<Notification> {
        self.log.lock().unwrap().clone()
    }

    #[must_use]
    pub fn for_client(&self, client: ClientId) -> Vec<Notification> {
        self.all()
            .into_iter()
            .filter(|n| {
                matches!(n,
                    Notification::StateChanged { client: c, .. }
                    | Notification::UtteranceStarted { client: c, .. }
                    | Notification::UtteranceCompleted { client: c, .. }
                    | Notification::Error { client: c, .. } if *c == client)
            })
            .collect()
    }
}

impl ClientNotifier for RecordingNotifier {
    fn utterance_started(&self, client: ClientId, utt_id: UtteranceId) {
        self.log
            .lock()
            .unwrap()
            .push(Notification::UtteranceStarted { client, utt_id });
    }

    fn utterance_completed(&self, client: ClientId, utt_id: UtteranceId) {
        self.log
            .lock()
            .unwrap()
            .push(Notification::UtteranceCompleted { client, utt_id });
    }

    fn state_changed(&self, client: ClientId, before: ClientState, current: ClientState) {
        self.log.lock().unwrap().push(Notification::StateChanged {
            client,
            before,
            current,
        });
    }

    fn error(&self, client: ClientId, utt_id: UtteranceId, reason: ErrorKind) {
        self.log.lock().unwrap().push(Notification::Error {
            client,
            utt_id,
            reason,
        });
    }

    fn clone_box(&self) -> Box<dyn ClientNotifier> {
        Box::new(self.clone())
    }
}
