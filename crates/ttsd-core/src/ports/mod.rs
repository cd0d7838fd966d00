//! Port definitions (trait abstractions) for the scheduler's external
//! collaborators: the RPC layer's notification sink, the synthesis engine
//! plugin, and the audio playback backend.
//!
//! # Design rules
//!
//! - No transport types (no RPC framing, no audio-device handles) in any
//!   signature — only the domain types in [`crate::domain`].
//! - `ttsd-scheduler` depends on these traits and never on a concrete
//!   implementation; concrete implementations and their dependencies live
//!   outside this workspace (an RPC crate, an audio-device crate).

pub mod audio_backend;
pub mod engine;
pub mod notifier;

pub use audio_backend::{AudioBackendEvent, AudioBackendPort, SlotState};
pub use engine::{EngineInfo, EnginePort, EngineResultSink, SynthesisRequest, VoiceDescriptor};
pub use notifier::{ClientNotifier, NoopNotifier};
