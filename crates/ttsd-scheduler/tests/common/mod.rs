//! Shared scaffolding for the scheduler's integration tests: a harness that
//! spawns a real `Scheduler` event loop wired to the hand-rolled test
//! doubles in `ttsd_scheduler::testutil`, plus the couple of helpers every
//! scenario test in this directory reaches for.
//!
//! Grounded in `gglib_voice/tests/pipeline_state_machine.rs`'s mock-backend
//! pattern, generalized from one pipeline under test to a spawned actor
//! reached only through its `SchedulerHandle` — the tests never see the
//! `Scheduler` value itself, matching how nothing outside this crate does.

#![allow(dead_code)]

use std::sync::Arc;

use ttsd_core::{AudioEvent, ClientId, ClientNotifier, SchedulerSettings};
use ttsd_scheduler::testutil::{MockAudioBackend, RecordingEngine, RecordingNotifier};
use ttsd_scheduler::{Scheduler, SchedulerHandle};

pub struct Harness {
    pub handle: SchedulerHandle,
    pub engine: Arc<RecordingEngine>,
    pub audio: Arc<MockAudioBackend>,
    pub notifier: RecordingNotifier,
    _join: tokio::task::JoinHandle<()>,
}

impl Harness {
    /// Spawn a fresh scheduler loop with the default (pitch-capable)
    /// recording engine.
    pub fn new() -> Self {
        Self::with_engine(Arc::new(RecordingEngine::new()))
    }

    /// Spawn a scheduler loop wired to a caller-supplied engine double, for
    /// tests that need `RecordingEngine::without_pitch_support` or a
    /// pre-armed `fail_next_start`.
    pub fn with_engine(engine: Arc<RecordingEngine>) -> Self {
        let audio = Arc::new(MockAudioBackend::new());
        let notifier = RecordingNotifier::new();
        let notifier_dyn: Arc<dyn ClientNotifier> = Arc::new(notifier.clone());
        let (handle, join) = Scheduler::spawn(
            engine.clone(),
            audio.clone(),
            notifier_dyn,
            SchedulerSettings::with_defaults(),
        );
        Self {
            handle,
            engine,
            audio,
            notifier,
            _join: join,
        }
    }

    /// Round-trip a cheap, harmless call through the scheduler loop and
    /// wait for its reply. Because the loop processes `Command`s strictly
    /// in the order they were enqueued, this is enough to guarantee
    /// every fire-and-forget notification issued before it — an engine
    /// callback delivered via `RecordingEngine::emit`, an
    /// `AudioBackendEvent` sent via `notify_audio_backend_event` — has
    /// already been applied to scheduler state by the time it returns.
    pub async fn flush(&self, client: ClientId) {
        let _ = self.handle.get_default_voice(client).await;
    }

    /// Simulate the engine delivering one `(event, bytes)` pair for
    /// whatever utterance is currently in flight, then flush so the
    /// scheduler has applied it before the caller asserts anything.
    pub async fn emit(&self, client: ClientId, event: AudioEvent, bytes: Vec<u8>) {
        self.engine.emit(event, bytes);
        self.flush(client).await;
    }

    /// Simulate the audio backend finishing the chunk most recently handed
    /// to it for `client`, then flush.
    pub async fn end_of_stream(&self, client: ClientId, utt_id: ttsd_core::UtteranceId) {
        self.handle
            .notify_audio_backend_event(ttsd_core::AudioBackendEvent::EndOfStream { client, utt_id });
        self.flush(client).await;
    }

    /// Drive one utterance from the head of an already-`Playing` client's
    /// request queue all the way to `utterance_completed`, assuming the
    /// audio backend is otherwise idle for this client (nothing already in
    /// `now_playing`). Used by the scenario tests that only care about one
    /// utterance flowing cleanly end to end.
    pub async fn complete_one_utterance(&self, client: ClientId, utt_id: ttsd_core::UtteranceId) {
        self.emit(client, AudioEvent::Start, b"pcm-start".to_vec()).await;
        self.end_of_stream(client, utt_id).await;
        self.emit(client, AudioEvent::Finish, Vec::new()).await;
        self.end_of_stream(client, utt_id).await;
    }
}

/// `add_text` with the daemon-default language/voice pair, the
/// combination every test that isn't specifically exercising voice
/// validation should use so a missing voice in the mock engine never gets
/// in the way of the scenario under test.
pub async fn default_text(
    handle: &SchedulerHandle,
    client: ClientId,
    text: &str,
) -> Result<ttsd_core::UtteranceId, ttsd_core::SchedulerError> {
    handle
        .add_text(client, text.to_owned(), "default".to_owned(), ttsd_core::VoiceType::Auto, 0, 0)
        .await
}
