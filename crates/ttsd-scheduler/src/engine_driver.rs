//! Engine Driver (C4) — serializes calls into the synthesis engine and owns
//! the single in-flight slot at the FFI-adjacent boundary.
//!
//! The authoritative `engine_busy` value the rest of the scheduler reasons
//! about lives on [`crate::scheduler::Scheduler`] itself, updated only from
//! the scheduler loop: the engine driver's terminal-event handler
//! transitions `engine_busy` to `Idle` by posting a message to the loop,
//! not by writing directly. This module's own `in_flight` field is a
//! narrower, driver-local mirror used only for the program-error assertion
//! in [`EngineDriver::start`]: "no other `start` is issued" between a start
//! and its terminal event. Two separate pieces of state, one scheduler-
//! owned and authoritative, one driver-local and advisory, exactly as
//! `gglib_voice::audio_thread::AudioThreadHandle` keeps its own command
//! channel distinct from the pipeline-level `VoiceState` it reports into.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use ttsd_core::{
    AudioEvent, ClientId, EngineInfo, EnginePort, EngineResultSink, SchedulerError,
    SynthesisRequest, UtteranceId, VoiceDescriptor,
};

use crate::scheduler::Command;

/// Driver around one loaded [`EnginePort`], emitting [`Command::EngineEvent`]
/// onto the scheduler loop for every `(event, bytes)` the engine delivers.
pub struct EngineDriver {
    engine: Arc<dyn EnginePort>,
    commands: mpsc::UnboundedSender<Command>,
    in_flight: Mutex<Option<(ClientId, UtteranceId)>>,
}

impl EngineDriver {
    #[must_use]
    pub fn new(engine: Arc<dyn EnginePort>, commands: mpsc::UnboundedSender<Command>) -> Self {
        Self {
            engine,
            commands,
            in_flight: Mutex::new(None),
        }
    }

    /// Resolve and initialize the engine. Runs at most once per daemon
    /// lifetime per engine id.
    pub async fn load(&self) -> Result<EngineInfo, SchedulerError> {
        self.engine.load().await
    }

    /// Idempotent teardown.
    pub async fn unload(&self) -> Result<(), SchedulerError> {
        self.engine.unload().await
    }

    /// Begin synthesizing `request`. Precondition: no other utterance is
    /// currently in flight on this engine; violating it is a scheduler
    /// bug and panics rather than silently queuing.
    pub async fn start(
        &self,
        client: ClientId,
        utt_id: UtteranceId,
        request: SynthesisRequest,
    ) -> Result<(), SchedulerError> {
        {
            let mut guard = self.in_flight.lock().expect("in_flight mutex poisoned");
            assert!(
                guard.is_none(),
                "engine driver: start({client}, {utt_id}) issued while {:?} is still in flight",
                *guard
            );
            *guard = Some((client, utt_id));
        }

        let commands = self.commands.clone();
        let sink: EngineResultSink = Arc::new(move |event: AudioEvent, bytes: Vec<u8>| {
            // A synchronous callback on the same stack as `start` is handled
            // correctly here: we've already recorded `in_flight` above, so a
            // scheduler processing this command sees the expected state.
            let _ = commands.send(Command::EngineEvent {
                client,
                utt_id,
                event,
                bytes,
            });
        });

        if let Err(err) = self.engine.start(request, sink).await {
            *self.in_flight.lock().expect("in_flight mutex poisoned") = None;
            return Err(err);
        }
        Ok(())
    }

    /// Fire-and-forget cancel of whatever is in flight, if anything.
    pub async fn cancel(&self) -> Result<(), SchedulerError> {
        self.engine.cancel().await
    }

    /// Release the driver-local in-flight mirror; called by the scheduler
    /// after it has observed a terminal event for the current utterance.
    pub fn clear_in_flight(&self) {
        *self.in_flight.lock().expect("in_flight mutex poisoned") = None;
    }

    pub fn foreach_voice(&self, visitor: &mut dyn FnMut(&VoiceDescriptor) -> bool) {
        self.engine.foreach_voice(visitor);
    }

    #[must_use]
    pub fn default_voice(&self) -> VoiceDescriptor {
        self.engine.default_voice()
    }

    #[must_use]
    pub fn is_valid_voice(&self, language: &str, voice_type: ttsd_core::VoiceType) -> bool {
        self.engine.is_valid_voice(language, voice_type)
    }

    #[must_use]
    pub fn audio_format(&self) -> ttsd_core::AudioFormat {
        self.engine.audio_format()
    }
}
