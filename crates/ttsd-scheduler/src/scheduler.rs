//! Session Scheduler (C5) — the single cooperative event loop: one task
//! owns every piece of mutable state (the [`ClientRegistry`],
//! `active_audio_client`, `engine_busy`), and everything else — RPC
//! ingress, engine callbacks, audio-backend callbacks, the cleanup probe —
//! reaches it only by sending a [`Command`] down an `mpsc` channel.
//!
//! Grounded in `gglib_voice::pipeline::VoicePipeline`'s single owned state
//! machine plus its internal `mpsc::unbounded_channel` for outbound
//! events, generalized here to also carry *inbound* requests so the one
//! mutable [`Scheduler`] value never needs a lock — the actor pattern is
//! the idiomatic Rust answer to "one cooperative loop owns all state."

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};

use ttsd_core::{
    AudioBackendEvent, AudioBackendPort, AudioChunk, AudioEvent, ClientId, ClientNotifier,
    ClientState, EnginePort, ErrorKind, MAX_TEXT_LEN, Mode, RequestItem, SchedulerError,
    SchedulerSettings, SynthesisRequest, UtteranceId, VoiceDescriptor, VoiceType,
};

use crate::client::{ClientRegistry, TransitionEvent};
use crate::engine_driver::EngineDriver;

type Reply<T> = oneshot::Sender<Result<T, SchedulerError>>;

/// The synthesis channel's state. `DoneAwaitingPickup` and `Cancelled`
/// are carried for literal fidelity with the distilled spec's state list;
/// see `DESIGN.md` for why every transition this scheduler performs
/// resolves straight back to `Idle` rather than lingering in them — the
/// alternative would leave the single shared engine slot stuck whenever a
/// stale callback for a stopped client is discarded before reaching the
/// step that would otherwise clear it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineBusy {
    Idle,
    InFlight { client: ClientId, utt_id: UtteranceId },
    DoneAwaitingPickup { client: ClientId, utt_id: UtteranceId },
    Cancelled { client: ClientId, utt_id: UtteranceId },
}

impl EngineBusy {
    fn targets(self, client: ClientId) -> bool {
        matches!(
            self,
            Self::InFlight { client: c, .. }
                | Self::DoneAwaitingPickup { client: c, .. }
                | Self::Cancelled { client: c, .. }
            if c == client
        )
    }
}

/// Everything a caller outside the scheduler loop can ask for. One
/// variant per RPC method plus the internal marshalling points (engine
/// events, audio-backend events, liveness verdicts from the RPC layer).
pub enum Command {
    Initialize {
        client: ClientId,
        pid: u32,
        mode: Mode,
        reply: Reply<()>,
    },
    Prepare {
        client: ClientId,
        reply: Reply<()>,
    },
    Play {
        client: ClientId,
        reply: Reply<()>,
    },
    Pause {
        client: ClientId,
        reply: Reply<()>,
    },
    Stop {
        client: ClientId,
        reply: Reply<()>,
    },
    AddText {
        client: ClientId,
        text: String,
        language: String,
        voice_type: VoiceType,
        speed: i32,
        pitch: i32,
        reply: Reply<UtteranceId>,
    },
    Finalize {
        client: ClientId,
        reply: Reply<()>,
    },
    GetSupportedVoices {
        client: ClientId,
        reply: Reply<Vec<VoiceDescriptor>>,
    },
    GetDefaultVoice {
        client: ClientId,
        reply: Reply<VoiceDescriptor>,
    },
    /// Marshalled engine result-sink delivery; the only place an
    /// `EngineResultSink` closure touches the scheduler.
    EngineEvent {
        client: ClientId,
        utt_id: UtteranceId,
        event: AudioEvent,
        bytes: Vec<u8>,
    },
    /// Marshalled audio-backend notification.
    AudioBackendEvent(AudioBackendEvent),
    /// The RPC layer received a definitive "client gone" indication for
    /// `client` (never raised merely because a liveness ping was slow).
    ClientUnreachable { client: ClientId },
    /// The RPC layer learned that the OS process `pid` exited; finalize
    /// every session it owns in one pass.
    ProcessGone { pid: u32 },
    /// The external settings owner pushed a new snapshot after the
    /// default engine id or default voice changed. The scheduler does not
    /// poll for this itself.
    ApplySettings(SchedulerSettings),
    Shutdown,
}

/// Cheaply-`Clone`-able send half of the scheduler's command channel —
/// the only thing an RPC adapter, the engine driver, or a test needs.
#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl SchedulerHandle {
    async fn call<T>(&self, build: impl FnOnce(Reply<T>) -> Command) -> Result<T, SchedulerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .map_err(|_| SchedulerError::new(ErrorKind::OperationFailed, "scheduler loop is gone"))?;
        reply_rx
            .await
            .map_err(|_| SchedulerError::new(ErrorKind::OperationFailed, "scheduler dropped the reply"))?
    }

    pub async fn initialize(&self, client: ClientId, pid: u32, mode: Mode) -> Result<(), SchedulerError> {
        self.call(|reply| Command::Initialize { client, pid, mode, reply }).await
    }

    pub async fn prepare(&self, client: ClientId) -> Result<(), SchedulerError> {
        self.call(|reply| Command::Prepare { client, reply }).await
    }

    pub async fn play(&self, client: ClientId) -> Result<(), SchedulerError> {
        self.call(|reply| Command::Play { client, reply }).await
    }

    pub async fn pause(&self, client: ClientId) -> Result<(), SchedulerError> {
        self.call(|reply| Command::Pause { client, reply }).await
    }

    pub async fn stop(&self, client: ClientId) -> Result<(), SchedulerError> {
        self.call(|reply| Command::Stop { client, reply }).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn add_text(
        &self,
        client: ClientId,
        text: String,
        language: String,
        voice_type: VoiceType,
        speed: i32,
        pitch: i32,
    ) -> Result<UtteranceId, SchedulerError> {
        self.call(|reply| Command::AddText {
            client,
            text,
            language,
            voice_type,
            speed,
            pitch,
            reply,
        })
        .await
    }

    pub async fn finalize(&self, client: ClientId) -> Result<(), SchedulerError> {
        self.call(|reply| Command::Finalize { client, reply }).await
    }

    pub async fn get_supported_voices(&self, client: ClientId) -> Result<Vec<VoiceDescriptor>, SchedulerError> {
        self.call(|reply| Command::GetSupportedVoices { client, reply }).await
    }

    pub async fn get_default_voice(&self, client: ClientId) -> Result<VoiceDescriptor, SchedulerError> {
        self.call(|reply| Command::GetDefaultVoice { client, reply }).await
    }

    /// Called by the RPC layer once it has a definitive "client gone"
    /// indication (never on a merely-slow ping).
    pub fn notify_client_unreachable(&self, client: ClientId) {
        let _ = self.tx.send(Command::ClientUnreachable { client });
    }

    /// Called by the RPC layer when it learns an OS process exited.
    pub fn notify_process_gone(&self, pid: u32) {
        let _ = self.tx.send(Command::ProcessGone { pid });
    }

    /// Push a new settings snapshot. The scheduler applies it to
    /// future default-resolution lookups; in-flight utterances are
    /// unaffected.
    pub fn apply_settings(&self, settings: SchedulerSettings) {
        let _ = self.tx.send(Command::ApplySettings(settings));
    }

    /// Marshal an asynchronous notification from the audio playback
    /// backend onto the scheduler loop: it must be marshalled onto the
    /// scheduler loop before touching any scheduler state. This is the
    /// only way `AudioBackendEvent`s reach the scheduler; the backend
    /// adapter calls this from whatever thread it owns.
    pub fn notify_audio_backend_event(&self, event: AudioBackendEvent) {
        let _ = self.tx.send(Command::AudioBackendEvent(event));
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
    }

    pub(crate) fn command_sender(&self) -> mpsc::UnboundedSender<Command> {
        self.tx.clone()
    }
}

/// The scheduler's full mutable state — global, and owned exclusively by
/// the task running [`Scheduler::run`].
pub struct Scheduler {
    registry: ClientRegistry,
    active_audio_client: Option<ClientId>,
    engine_busy: EngineBusy,
    engine: EngineDriver,
    engine_loaded: bool,
    supports_pitch: bool,
    audio: Arc<dyn AudioBackendPort>,
    notifier: Arc<dyn ClientNotifier>,
    settings: SchedulerSettings,
    /// The chunk most recently handed to the audio backend for each
    /// client, awaiting that backend's `EndOfStream` event.
    now_playing: HashMap<ClientId, AudioChunk>,
}

impl Scheduler {
    /// Build the scheduler and spawn its event loop as a background task,
    /// returning the handle every other part of the system talks through.
    pub fn spawn(
        engine: Arc<dyn EnginePort>,
        audio: Arc<dyn AudioBackendPort>,
        notifier: Arc<dyn ClientNotifier>,
        settings: SchedulerSettings,
    ) -> (SchedulerHandle, tokio::task::JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = SchedulerHandle { tx: tx.clone() };
        let driver = EngineDriver::new(engine, tx);
        let scheduler = Self {
            registry: ClientRegistry::new(),
            active_audio_client: None,
            engine_busy: EngineBusy::Idle,
            engine: driver,
            engine_loaded: false,
            supports_pitch: true,
            audio,
            notifier,
            settings,
            now_playing: HashMap::new(),
        };
        let join = tokio::spawn(scheduler.run(rx));
        (handle, join)
    }

    /// The event loop itself: pull one [`Command`] at a time and run it to
    /// completion on this loop without yielding before looking at the
    /// next one.
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = rx.recv().await {
            match command {
                Command::Initialize { client, pid, mode, reply } => {
                    let _ = reply.send(self.handle_initialize(client, pid, mode).await);
                }
                Command::Prepare { client, reply } => {
                    let _ = reply.send(self.handle_prepare(client));
                }
                Command::Play { client, reply } => {
                    let _ = reply.send(self.handle_play(client).await);
                }
                Command::Pause { client, reply } => {
                    let _ = reply.send(self.handle_pause(client).await);
                }
                Command::Stop { client, reply } => {
                    let _ = reply.send(self.handle_stop(client).await);
                }
                Command::AddText { client, text, language, voice_type, speed, pitch, reply } => {
                    let _ = reply.send(self.handle_add_text(client, text, language, voice_type, speed, pitch).await);
                }
                Command::Finalize { client, reply } => {
                    let _ = reply.send(self.handle_finalize(client).await);
                }
                Command::GetSupportedVoices { client, reply } => {
                    let _ = reply.send(self.handle_get_supported_voices(client));
                }
                Command::GetDefaultVoice { client, reply } => {
                    let _ = reply.send(self.handle_get_default_voice(client));
                }
                Command::EngineEvent { client, utt_id, event, bytes } => {
                    self.handle_engine_event(client, utt_id, event, bytes).await;
                }
                Command::AudioBackendEvent(event) => {
                    self.handle_audio_backend_event(event).await;
                }
                Command::ClientUnreachable { client } => {
                    let _ = self.handle_finalize(client).await;
                }
                Command::ProcessGone { pid } => {
                    for client in self.registry.clients_for_pid(pid) {
                        let _ = self.handle_finalize(client).await;
                    }
                }
                Command::ApplySettings(settings) => {
                    debug!(default_engine_id = %settings.default_engine_id, "settings applied");
                    self.settings = settings;
                }
                Command::Shutdown => break,
            }
        }
    }

    // ── initialize ────────────────────────────────────────────────────

    async fn handle_initialize(&mut self, client: ClientId, pid: u32, mode: Mode) -> Result<(), SchedulerError> {
        if self.registry.contains(client) {
            return Err(SchedulerError::new(
                ErrorKind::InvalidParameter,
                format!("client {client} is already registered"),
            ));
        }
        if !self.engine_loaded {
            let info = self.engine.load().await?;
            self.supports_pitch = info.supports_pitch;
            self.engine_loaded = true;
        }
        self.registry.insert(client, pid, mode)?;
        self.audio.create_slot(client).await?;
        debug!(%client, pid, "client initialized");
        Ok(())
    }

    // ── prepare ───────────────────────────────────────────────────────

    fn handle_prepare(&mut self, client: ClientId) -> Result<(), SchedulerError> {
        let session = self
            .registry
            .get_mut(client)
            .ok_or_else(|| SchedulerError::new(ErrorKind::InvalidParameter, "unknown client"))?;
        match session.transition(TransitionEvent::Prepare) {
            Ok((before, after)) => {
                debug!(%client, %before, %after, "state transition");
                self.notifier.state_changed(client, before, after);
                Ok(())
            }
            Err(err) => {
                warn!(%client, ?err.kind, "rejected prepare");
                Err(err)
            }
        }
    }

    // ── play ──────────────────────────────────────────────────────────

    async fn handle_play(&mut self, client: ClientId) -> Result<(), SchedulerError> {
        if !self.registry.contains(client) {
            return Err(SchedulerError::new(ErrorKind::InvalidParameter, "unknown client"));
        }
        let mode = self.registry.get(client).unwrap().mode;
        let had_now_playing = self.now_playing.contains_key(&client);

        let (before, after) = {
            let session = self.registry.get_mut(client).unwrap();
            session.transition(TransitionEvent::Play).map_err(|err| {
                warn!(%client, ?err.kind, "rejected play");
                err
            })?
        };
        debug!(%client, %before, %after, "state transition");
        self.notifier.state_changed(client, before, after);
        let was_paused = before == ClientState::Paused;

        if let Some(other) = self.active_audio_client {
            if other != client {
                if mode == Mode::ScreenReader {
                    debug!(%client, preempted = %other, "screen-reader preemption: stopping");
                    let _ = self.handle_stop(other).await;
                } else {
                    debug!(%client, preempted = %other, "preemption: pausing");
                    if let Some(other_session) = self.registry.get_mut(other) {
                        if let Ok((b, a)) = other_session.transition(TransitionEvent::Pause) {
                            self.notifier.state_changed(other, b, a);
                        }
                    }
                    let _ = self.audio.pause(other).await;
                }
            }
        }
        self.active_audio_client = Some(client);

        if was_paused && had_now_playing {
            let _ = self.audio.resume(client).await;
        } else {
            self.maybe_feed_audio_backend(client).await;
        }
        self.advance_synthesis().await;
        Ok(())
    }

    // ── pause ─────────────────────────────────────────────────────────

    async fn handle_pause(&mut self, client: ClientId) -> Result<(), SchedulerError> {
        let (before, after) = {
            let session = self
                .registry
                .get_mut(client)
                .ok_or_else(|| SchedulerError::new(ErrorKind::InvalidParameter, "unknown client"))?;
            session.transition(TransitionEvent::Pause)?
        };
        debug!(%client, %before, %after, "state transition");
        self.notifier.state_changed(client, before, after);
        let _ = self.audio.pause(client).await;
        // The engine is not asked to pause: it keeps producing chunks into
        // the audio queue until resume or stop.
        Ok(())
    }

    // ── stop ──────────────────────────────────────────────────────────

    /// Validates the transition first so a rejected stop (e.g. a `Created`
    /// client, which has no `(Created, Stop)` row) has no side effects;
    /// only an accepted transition triggers `release_resources`.
    async fn handle_stop(&mut self, client: ClientId) -> Result<(), SchedulerError> {
        if !self.registry.contains(client) {
            return Err(SchedulerError::new(ErrorKind::InvalidParameter, "unknown client"));
        }
        let (before, after) = {
            let session = self.registry.get_mut(client).unwrap();
            session.transition(TransitionEvent::Stop)?
        };
        self.release_resources(client).await;
        debug!(%client, %before, %after, "state transition");
        self.notifier.state_changed(client, before, after);
        Ok(())
    }

    /// Shared draining effect of `stop` and `finalize`: clear both FIFOs,
    /// stop the audio slot, cancel the engine if it was working on this
    /// client's behalf, and release the audio slot pointer. Does not touch
    /// `client.state` — callers decide what happens to it.
    async fn release_resources(&mut self, client: ClientId) {
        let engine_targets_client = self.engine_busy.targets(client);
        if let Some(session) = self.registry.get_mut(client) {
            session.requests.clear();
            session.audio.clear();
            session.last_stopped_utt = session.max_allocated_utt();
            session.started_utts.clear();
        }
        self.now_playing.remove(&client);
        let _ = self.audio.stop(client).await;
        if engine_targets_client {
            // Fire-and-forget: we do not wait for the engine's own Cancel
            // event before freeing the slot — the next `add_text` +
            // `play` elsewhere must not find the shared engine wedged.
            let _ = self.engine.cancel().await;
            self.engine.clear_in_flight();
            self.engine_busy = EngineBusy::Idle;
        }
        if self.active_audio_client == Some(client) {
            self.active_audio_client = None;
        }
    }

    // ── add_text ──────────────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    async fn handle_add_text(
        &mut self,
        client: ClientId,
        text: String,
        language: String,
        voice_type: VoiceType,
        speed: i32,
        pitch: i32,
    ) -> Result<UtteranceId, SchedulerError> {
        let session = self
            .registry
            .get(client)
            .ok_or_else(|| SchedulerError::new(ErrorKind::InvalidParameter, "unknown client"))?;
        if session.state == ClientState::Created {
            return Err(SchedulerError::new(ErrorKind::InvalidState, "add_text before prepare"));
        }
        if text.chars().count() > MAX_TEXT_LEN {
            return Err(SchedulerError::new(
                ErrorKind::InvalidParameter,
                format!("text exceeds {MAX_TEXT_LEN} characters"),
            ));
        }

        let wants_default = language == "default" && matches!(voice_type, VoiceType::Auto);
        if !wants_default && !self.engine.is_valid_voice(&language, voice_type) {
            return Err(SchedulerError::new(ErrorKind::InvalidVoice, format!("unsupported voice {language}/{voice_type:?}")));
        }
        if pitch != 0 && !self.supports_pitch {
            return Err(SchedulerError::new(
                ErrorKind::NotSupportedFeature,
                "active engine does not support pitch control",
            ));
        }

        let playing = session.state == ClientState::Playing;
        let session = self.registry.get_mut(client).unwrap();
        let utt_id = session
            .allocate_utt_id()
            .ok_or_else(|| SchedulerError::new(ErrorKind::InvalidParameter, "utterance id wrap collision"))?;
        session.requests.push_back(RequestItem {
            utt_id,
            text,
            language,
            voice_type,
            speed,
            pitch,
        });

        if playing && self.engine_busy == EngineBusy::Idle {
            self.advance_synthesis().await;
        }
        Ok(utt_id)
    }

    // ── finalize ──────────────────────────────────────────────────────

    async fn handle_finalize(&mut self, client: ClientId) -> Result<(), SchedulerError> {
        if !self.registry.contains(client) {
            return Err(SchedulerError::new(ErrorKind::InvalidParameter, "unknown client"));
        }
        self.release_resources(client).await;
        let _ = self.audio.destroy_slot(client).await;
        self.registry.remove(client);
        debug!(%client, "client finalized");
        // No terminal state_changed is sent — destruction is itself the
        // terminal event.
        Ok(())
    }

    fn handle_get_supported_voices(&self, client: ClientId) -> Result<Vec<VoiceDescriptor>, SchedulerError> {
        if !self.registry.contains(client) {
            return Err(SchedulerError::new(ErrorKind::InvalidParameter, "unknown client"));
        }
        let mut voices = Vec::new();
        self.engine.foreach_voice(&mut |voice| {
            voices.push(voice.clone());
            true
        });
        Ok(voices)
    }

    fn handle_get_default_voice(&self, client: ClientId) -> Result<VoiceDescriptor, SchedulerError> {
        if !self.registry.contains(client) {
            return Err(SchedulerError::new(ErrorKind::InvalidParameter, "unknown client"));
        }
        Ok(self.engine.default_voice())
    }

    // ── advance_synthesis ─────────────────────────────────────────────

    async fn advance_synthesis(&mut self) {
        if self.engine_busy != EngineBusy::Idle {
            return;
        }
        let Some(client) = self.active_audio_client else {
            return;
        };
        let Some(session) = self.registry.get(client) else {
            return;
        };
        if session.state != ClientState::Playing {
            return;
        }
        if session.requests.is_empty() {
            return;
        }

        let request_item = {
            let session = self.registry.get_mut(client).unwrap();
            session.requests.pop_front().unwrap()
        };

        let (language, voice_type) = if request_item.wants_daemon_default_voice() {
            (self.settings.default_language.clone(), self.settings.default_voice_type)
        } else {
            (request_item.language.clone(), request_item.voice_type)
        };
        let synth_request = SynthesisRequest {
            client,
            utt_id: request_item.utt_id,
            text: request_item.text.clone(),
            language,
            voice_type,
            speed: request_item.speed,
            pitch: request_item.pitch,
        };

        self.engine_busy = EngineBusy::InFlight { client, utt_id: request_item.utt_id };
        debug!(%client, utt_id = %request_item.utt_id, "engine start");
        if let Err(err) = self.engine.start(client, request_item.utt_id, synth_request).await {
            self.engine_busy = EngineBusy::Idle;
            self.engine.clear_in_flight();
            self.notifier.error(client, request_item.utt_id, err.kind);
            let _ = self.handle_stop(client).await;
        }
    }

    // ── engine result-sink delivery ───────────────────────────────────

    async fn handle_engine_event(&mut self, client: ClientId, utt_id: UtteranceId, event: AudioEvent, bytes: Vec<u8>) {
        let Some(session) = self.registry.get(client) else {
            trace!(%client, %utt_id, "discard: unknown client");
            return;
        };
        if session.is_stopped(utt_id) {
            trace!(%client, %utt_id, "discard: stopped utterance");
            return;
        }
        if self.engine_busy != (EngineBusy::InFlight { client, utt_id }) {
            trace!(%client, %utt_id, ?self.engine_busy, "discard: stale or busy-slot mismatch");
            return;
        }

        if event == AudioEvent::Fail {
            self.engine_busy = EngineBusy::Idle;
            self.engine.clear_in_flight();
            self.notifier.error(client, utt_id, ErrorKind::OperationFailed);
            let _ = self.handle_stop(client).await;
            self.advance_synthesis().await;
            return;
        }

        let chunk = AudioChunk { utt_id, event, payload: bytes };
        if let Some(session) = self.registry.get_mut(client) {
            session.audio.push_back(chunk);
        }
        self.maybe_feed_audio_backend(client).await;

        if event.is_terminal() {
            self.engine_busy = EngineBusy::Idle;
            self.engine.clear_in_flight();
            self.advance_synthesis().await;
        }
    }

    /// Hand the next queued chunk to the audio backend if nothing is
    /// already in flight there for this client (the "wake the scheduler"
    /// half, run from both the engine side and the audio side).
    async fn maybe_feed_audio_backend(&mut self, client: ClientId) {
        if self.now_playing.contains_key(&client) {
            return;
        }
        let Some(session) = self.registry.get(client) else {
            return;
        };
        if session.state != ClientState::Playing {
            return;
        }
        let next = {
            let session = self.registry.get_mut(client).unwrap();
            session.audio.pop_front()
        };
        let Some(chunk) = next else {
            return;
        };
        let format = self.engine.audio_format();
        if self.audio.play(client, format, chunk.clone()).await.is_ok() {
            self.now_playing.insert(client, chunk);
        }
    }

    // ── audio-backend events ──────────────────────────────────────────

    async fn handle_audio_backend_event(&mut self, event: AudioBackendEvent) {
        match event {
            AudioBackendEvent::BeginOfStream { client, utt_id } => {
                trace!(%client, %utt_id, "backend began rendering");
            }
            AudioBackendEvent::EndOfStream { client, .. } => {
                let Some(finished) = self.now_playing.remove(&client) else {
                    trace!(%client, "discard: end-of-stream with no tracked chunk");
                    return;
                };
                self.on_audio_chunk_played(client, finished);
                self.maybe_feed_audio_backend(client).await;
                self.advance_synthesis().await;
            }
            AudioBackendEvent::Interrupted { client } => {
                warn!(%client, "audio output interrupted by OS policy");
                if let Some(utt_id) = self.current_or_pending_utt(client) {
                    self.notifier.error(client, utt_id, ErrorKind::AudioPolicyBlocked);
                }
                let _ = self.handle_stop(client).await;
            }
            AudioBackendEvent::Error { client, message } => {
                warn!(%client, message, "audio backend error");
                if let Some(utt_id) = self.current_or_pending_utt(client) {
                    self.notifier.error(client, utt_id, ErrorKind::OperationFailed);
                }
                let _ = self.handle_stop(client).await;
            }
        }
    }

    fn current_or_pending_utt(&self, client: ClientId) -> Option<UtteranceId> {
        self.now_playing
            .get(&client)
            .map(|c| c.utt_id)
            .or_else(|| self.registry.get(client).and_then(|s| s.requests.front().map(|r| r.utt_id)))
    }

    // ── on_audio_chunk_played ─────────────────────────────────────────

    fn on_audio_chunk_played(&mut self, client: ClientId, chunk: AudioChunk) {
        let Some(session) = self.registry.get_mut(client) else {
            return;
        };
        if matches!(chunk.event, AudioEvent::Start) || !session.started_utts.contains(&chunk.utt_id) {
            session.started_utts.insert(chunk.utt_id);
            self.notifier.utterance_started(client, chunk.utt_id);
        }
        if chunk.event == AudioEvent::Finish {
            self.notifier.utterance_completed(client, chunk.utt_id);
            session.last_completed_request_utt = Some(chunk.utt_id);
            session.started_utts.remove(&chunk.utt_id);
        }
        // If both queues are now empty and the engine isn't working on this
        // client, the stream has simply drained — state stays Playing; the
        // slot is only released by an explicit `stop`.
    }
}
