//! Audio playback backend contract.
//!
//! Grounded in `gglib_voice::playback::AudioPlayback`'s sink-management
//! pattern (create a sink on demand, append streaming chunks to it,
//! tear it down on stop) generalized from one process-wide sink to one
//! slot per client id, since the scheduler may hold a paused slot open
//! for a preempted client while another client plays.

use async_trait::async_trait;

use crate::domain::{AudioChunk, AudioFormat, ClientId, UtteranceId};
use crate::error::SchedulerError;

/// Playback state of one client's audio slot, as last reported by
/// [`AudioBackendPort::get_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Idle,
    Playing,
    Paused,
}

/// Asynchronous notifications the backend raises about a client's slot.
/// Delivered to the scheduler loop the same way engine events are —
/// marshalled as a command, never touching scheduler state directly.
#[derive(Debug, Clone)]
pub enum AudioBackendEvent {
    /// The backend started rendering the first chunk of `utt_id`.
    BeginOfStream { client: ClientId, utt_id: UtteranceId },
    /// The backend finished rendering the chunk most recently handed to
    /// it via [`AudioBackendPort::play`]; the scheduler should feed the
    /// next queued chunk, if any.
    EndOfStream { client: ClientId, utt_id: UtteranceId },
    /// Another process took the audio device out from under this slot
    /// (an OS-level policy decision, not a scheduler preemption).
    Interrupted { client: ClientId },
    /// The backend failed to play/render for this slot.
    Error { client: ClientId, message: String },
}

/// Trait object surface for the audio playback backend.
#[async_trait]
pub trait AudioBackendPort: Send + Sync {
    /// Reserve a playback slot for a newly-initialized client.
    async fn create_slot(&self, client: ClientId) -> Result<(), SchedulerError>;

    /// Release a client's slot; idempotent.
    async fn destroy_slot(&self, client: ClientId) -> Result<(), SchedulerError>;

    /// Hand the backend the next chunk to render for this client,
    /// established format, and the chunk itself. Called once per chunk;
    /// the backend signals completion via [`AudioBackendEvent::EndOfStream`].
    async fn play(
        &self,
        client: ClientId,
        format: AudioFormat,
        chunk: AudioChunk,
    ) -> Result<(), SchedulerError>;

    /// Suspend rendering without discarding the currently-playing chunk.
    async fn pause(&self, client: ClientId) -> Result<(), SchedulerError>;

    /// Resume a paused slot from where it left off.
    async fn resume(&self, client: ClientId) -> Result<(), SchedulerError>;

    /// Stop and discard any in-progress rendering for this client;
    /// idempotent.
    async fn stop(&self, client: ClientId) -> Result<(), SchedulerError>;

    /// Best-effort current state; used for diagnostics, not for the
    /// scheduler's own bookkeeping (the scheduler tracks `active_audio_client`
    /// itself).
    async fn get_state(&self, client: ClientId) -> Result<SlotState, SchedulerError>;
}
