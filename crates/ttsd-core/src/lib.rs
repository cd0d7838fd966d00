//! Shared vocabulary and port traits for the TTS daemon's Session &
//! Synthesis Scheduler.
//!
//! This crate defines what the scheduler *talks about* — client ids,
//! utterance numbering, requests, audio chunks, the closed error
//! taxonomy — and the trait seams it talks *through* — the client
//! notification sink, the synthesis engine plugin, and the audio
//! playback backend. It contains no scheduling logic; that lives in
//! `ttsd-scheduler`, which depends on this crate the way an adapter
//! depends on its ports.

#![deny(unsafe_code)]

pub mod domain;
pub mod error;
pub mod ports;
pub mod settings;

pub use domain::{
    AudioChunk, AudioEvent, AudioFormat, AudioKind, ClientId, ClientState, MAX_TEXT_LEN,
    MAX_UTTERANCE_ID, MIN_UTTERANCE_ID, Mode, RequestItem, UtteranceCounter, UtteranceId,
    VoiceType, DEFAULT_SPEED_OR_PITCH,
};
pub use error::{ErrorKind, SchedulerError};
pub use ports::{
    AudioBackendEvent, AudioBackendPort, ClientNotifier, EngineInfo, EnginePort, EngineResultSink,
    NoopNotifier, SlotState, SynthesisRequest, VoiceDescriptor,
};
pub use settings::SchedulerSettings;

#[cfg(test)]
use serde_json as _;
