//! Outbound notification port — the scheduler's half of the RPC contract.
//!
//! This mirrors the gglib event-emitter split: the scheduler calls one
//! trait method per notification kind and never touches a transport. An
//! RPC adapter implements [`ClientNotifier`] by serializing these calls
//! onto whatever wire format it speaks; tests use [`NoopNotifier`] or a
//! recording double.

use crate::domain::{ClientId, ClientState, UtteranceId};
use crate::error::ErrorKind;

/// One-way notifications the scheduler sends to a client.
///
/// Implementations must not block: the scheduler loop calls these
/// synchronously from within `Scheduler::run` and a slow implementation
/// stalls every other client.
pub trait ClientNotifier: Send + Sync {
    /// `utterance_started(uid, utt_id)` — emitted exactly once per
    /// utterance, the first time any chunk for it is handed to the audio
    /// backend.
    fn utterance_started(&self, client: ClientId, utt_id: UtteranceId);

    /// `utterance_completed(uid, utt_id)` — emitted when the `Finish`
    /// chunk for an utterance has been played. Never emitted without a
    /// preceding `utterance_started` for the same id, and never emitted
    /// twice for the same id.
    fn utterance_completed(&self, client: ClientId, utt_id: UtteranceId);

    /// `state_changed(uid, before, current)` — emitted by the single state
    /// mutator in `ClientSession::transition`, never by any other code
    /// path.
    fn state_changed(&self, client: ClientId, before: ClientState, current: ClientState);

    /// `error(uid, utt_id, reason)` — emitted alongside the stop-and-return
    /// -to-`Ready` sequence described in the error propagation policy.
    fn error(&self, client: ClientId, utt_id: UtteranceId, reason: ErrorKind);

    /// Clone this notifier into a boxed trait object, so `Arc<dyn
    /// ClientNotifier>` can be cloned without the concrete type
    /// implementing `Clone`.
    fn clone_box(&self) -> Box<dyn ClientNotifier>;
}

/// A notifier that discards every call. Used by tests that only assert on
/// scheduler-internal state and by any context with no attached RPC layer.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl NoopNotifier {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ClientNotifier for NoopNotifier {
    fn utterance_started(&self, _client: ClientId, _utt_id: UtteranceId) {}
    fn utterance_completed(&self, _client: ClientId, _utt_id: UtteranceId) {}
    fn state_changed(&self, _client: ClientId, _before: ClientState, _current: ClientState) {}
    fn error(&self, _client: ClientId, _utt_id: UtteranceId, _reason: ErrorKind) {}

    fn clone_box(&self) -> Box<dyn ClientNotifier> {
        Box::new(self.clone())
    }
}
