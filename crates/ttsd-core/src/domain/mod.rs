//! Shared vocabulary for the scheduler core: client identity, utterance
//! numbering, session state, and the request/audio payload shapes that
//! flow between the scheduler, the engine driver, and the playback backend.
//!
//! These are pure domain types — no `tokio`, no locking, no I/O. Anything
//! that needs to cross an `.await` point or a channel send lives in
//! `ttsd-scheduler`; this module only defines what that data *is*.

mod audio;
mod request;

pub use audio::{AudioChunk, AudioEvent, AudioFormat, AudioKind};
pub use request::RequestItem;

use std::fmt;

/// Maximum number of UTF-8 characters accepted by a single `add_text` call.
///
/// Enforced at the wire level by well-behaved clients; the scheduler
/// re-checks it on ingress and rejects oversize requests with
/// [`crate::error::ErrorKind::InvalidParameter`].
pub const MAX_TEXT_LEN: usize = 1000;

/// Smallest valid [`UtteranceId`].
pub const MIN_UTTERANCE_ID: u16 = 1;

/// Largest valid [`UtteranceId`]; the counter wraps back to [`MIN_UTTERANCE_ID`]
/// after this value (the wire protocol carries only four-digit ids).
pub const MAX_UTTERANCE_ID: u16 = 9999;

/// Sentinel speed/pitch value meaning "use the engine's default".
pub const DEFAULT_SPEED_OR_PITCH: i32 = 0;

/// Process-local handle for a client session.
///
/// Opaque, stable for the life of the session, unique across all live
/// sessions, and never reused while that session exists. The scheduler
/// does not interpret the value; it is whatever the RPC layer hands in
/// at `initialize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientId(pub i32);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A per-client, monotonically increasing utterance counter.
///
/// Wraps at [`MAX_UTTERANCE_ID`] back to [`MIN_UTTERANCE_ID`] rather than
/// overflowing; see [`UtteranceCounter`] for the wrap-and-reject logic a
/// client session uses to assign these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtteranceId(u16);

impl UtteranceId {
    /// Build an `UtteranceId` from a raw wire value already known to be in
    /// range. Used when validating a client-supplied `utt_id` on ingress.
    #[must_use]
    pub const fn new(raw: u16) -> Option<Self> {
        if raw >= MIN_UTTERANCE_ID && raw <= MAX_UTTERANCE_ID {
            Some(Self(raw))
        } else {
            None
        }
    }

    /// The raw wire value.
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }
}

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-client generator of [`UtteranceId`]s.
///
/// Owns the wrap-at-10000 arithmetic and the "reject if the old id is
/// still live" collision rule (the original source wraps unconditionally
/// and never checks for collisions; this implementation promotes that
/// into a checked, rejectable operation).
#[derive(Debug, Clone, Copy)]
pub struct UtteranceCounter {
    next: u16,
}

impl Default for UtteranceCounter {
    fn default() -> Self {
        Self {
            next: MIN_UTTERANCE_ID,
        }
    }
}

impl UtteranceCounter {
    /// Create a fresh counter starting at [`MIN_UTTERANCE_ID`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next id, wrapping at [`MAX_UTTERANCE_ID`].
    ///
    /// `still_live` is called with the candidate id before it is handed
    /// out; if it returns `true` (a request with that id, wrapped back
    /// around, is still queued or mid-flight) the allocation is rejected
    /// rather than silently colliding.
    pub fn allocate(&mut self, still_live: impl FnOnce(UtteranceId) -> bool) -> Option<UtteranceId> {
        let candidate = UtteranceId(self.next);
        if still_live(candidate) {
            return None;
        }
        self.next = if self.next >= MAX_UTTERANCE_ID {
            MIN_UTTERANCE_ID
        } else {
            self.next + 1
        };
        Some(candidate)
    }
}

/// State machine position of a [`ClientId`]'s session.
///
/// Transitions are validated exclusively by
/// `ttsd_scheduler::client::ClientSession::transition`; nothing else may
/// write this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Session exists but has not yet called `prepare`.
    Created,
    /// Prepared, not currently playing or paused.
    Ready,
    /// Holds the audio slot and is actively driving synthesis/playback.
    Playing,
    /// Holds the audio slot but playback is suspended.
    Paused,
}

impl ClientState {
    /// Wire-friendly label, used in `state_changed` notifications and logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Ready => "ready",
            Self::Playing => "playing",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-session classification fixed at `initialize` time.
///
/// Affects arbitration only (`ttsd_scheduler::scheduler::Scheduler::play`);
/// cannot change once the session leaves [`ClientState::Created`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Ordinary client: preemption by another client pauses this one.
    Default,
    /// Same pause-on-preemption behavior as `Default`; kept distinct
    /// because some engines apply different ducking/volume policy by mode
    /// (a detail of the audio backend, not the scheduler).
    Notification,
    /// Accessibility client: when *this* mode calls `play` and preempts
    /// another client, that client is stopped outright rather than paused.
    ScreenReader,
}

/// One of the voice categories an engine may support for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceType {
    /// Let the engine pick.
    Auto,
    Male,
    Female,
    Child,
    /// Engine-specific voice slot, numbered 1 through 3.
    UserDefined(u8),
}
