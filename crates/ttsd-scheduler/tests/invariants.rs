//! Properties that must hold across every scenario: at most one `Playing`
//! client at a time, started/completed pairing, strictly increasing ids
//! with completions a prefix up to `stop`, late callbacks after `stop`
//! staying silent, and the engine slot never wedging.

mod common;

use common::Harness;

use ttsd_core::{AudioEvent, ClientId, ClientState, Mode};
use ttsd_scheduler::testutil::Notification;

fn id(n: i32) -> ClientId {
    ClientId(n)
}

/// Arbitration on `play` guarantees at most one client is `Playing`:
/// a second `Default`-mode client taking the slot pauses (never leaves
/// both) the incumbent.
#[tokio::test]
async fn at_most_one_client_playing_at_once() {
    let h = Harness::new();
    let a = id(1);
    let b = id(2);
    h.handle.initialize(a, 10, Mode::Default).await.unwrap();
    h.handle.prepare(a).await.unwrap();
    h.handle.initialize(b, 20, Mode::Default).await.unwrap();
    h.handle.prepare(b).await.unwrap();

    h.handle.play(a).await.unwrap();
    h.handle.play(b).await.unwrap();

    let a_log = h.notifier.for_client(a);
    assert!(a_log.contains(&Notification::StateChanged {
        client: a,
        before: ClientState::Playing,
        current: ClientState::Paused,
    }));
    let b_log = h.notifier.for_client(b);
    assert!(b_log.contains(&Notification::StateChanged {
        client: b,
        before: ClientState::Ready,
        current: ClientState::Playing,
    }));
    // a's last recorded state is Paused, never re-entering Playing while b
    // still holds the slot.
    assert_eq!(a_log.last(), Some(&Notification::StateChanged {
        client: a,
        before: ClientState::Playing,
        current: ClientState::Paused,
    }));
}

/// Every delivered `utterance_completed` was preceded by exactly one
/// `utterance_started` for the same id, and no second completion follows.
#[tokio::test]
async fn completed_always_follows_exactly_one_started() {
    let h = Harness::new();
    let client = id(2);
    h.handle.initialize(client, 10, Mode::Default).await.unwrap();
    h.handle.prepare(client).await.unwrap();
    let utt_id = common::default_text(&h.handle, client, "hi").await.unwrap();
    h.handle.play(client).await.unwrap();
    h.complete_one_utterance(client, utt_id).await;

    let log = h.notifier.for_client(client);
    let started_idx = log
        .iter()
        .position(|n| matches!(n, Notification::UtteranceStarted { utt_id: u, .. } if *u == utt_id));
    let completed_idx = log
        .iter()
        .position(|n| matches!(n, Notification::UtteranceCompleted { utt_id: u, .. } if *u == utt_id));
    assert!(started_idx.is_some() && completed_idx.is_some());
    assert!(started_idx.unwrap() < completed_idx.unwrap());
    assert_eq!(
        log.iter()
            .filter(|n| matches!(n, Notification::UtteranceStarted { utt_id: u, .. } if *u == utt_id))
            .count(),
        1
    );
    assert_eq!(
        log.iter()
            .filter(|n| matches!(n, Notification::UtteranceCompleted { utt_id: u, .. } if *u == utt_id))
            .count(),
        1
    );
}

/// Within one session, `add_text` yields strictly increasing ids, and
/// delivered completions are a prefix of that sequence up to any `stop`.
#[tokio::test]
async fn completions_are_a_prefix_up_to_stop() {
    let h = Harness::new();
    let client = id(3);
    h.handle.initialize(client, 10, Mode::Default).await.unwrap();
    h.handle.prepare(client).await.unwrap();
    let u1 = common::default_text(&h.handle, client, "one").await.unwrap();
    let u2 = common::default_text(&h.handle, client, "two").await.unwrap();
    let u3 = common::default_text(&h.handle, client, "three").await.unwrap();
    assert!(u1.get() < u2.get());
    assert!(u2.get() < u3.get());

    h.handle.play(client).await.unwrap();
    h.complete_one_utterance(client, u1).await;
    // u2 is now in flight; stop before it (or u3) ever completes.
    h.handle.stop(client).await.unwrap();

    let completed: Vec<_> = h
        .notifier
        .for_client(client)
        .into_iter()
        .filter_map(|n| match n {
            Notification::UtteranceCompleted { utt_id, .. } => Some(utt_id),
            _ => None,
        })
        .collect();
    assert_eq!(completed, vec![u1]);
}

/// After `stop`, no `utterance_started`/`utterance_completed` is ever
/// emitted for any utterance queued at or before the stop, no matter what
/// the engine delivers afterward.
#[tokio::test]
async fn stop_silences_every_queued_utterance_permanently() {
    let h = Harness::new();
    let client = id(4);
    h.handle.initialize(client, 10, Mode::Default).await.unwrap();
    h.handle.prepare(client).await.unwrap();
    let u1 = common::default_text(&h.handle, client, "one").await.unwrap();
    let _u2 = common::default_text(&h.handle, client, "two").await.unwrap();
    h.handle.play(client).await.unwrap();

    h.emit(client, AudioEvent::Start, b"x".to_vec()).await;
    h.handle.stop(client).await.unwrap();

    // Late delivery for the utterance that was in flight at stop time.
    h.emit(client, AudioEvent::Continue, b"late".to_vec()).await;
    h.emit(client, AudioEvent::Finish, Vec::new()).await;
    h.end_of_stream(client, u1).await;
    h.end_of_stream(client, u1).await;

    assert!(!h
        .notifier
        .for_client(client)
        .iter()
        .any(|n| matches!(n, Notification::UtteranceCompleted { .. })));
}

/// The single shared engine slot returns to idle within finite steps
/// of a terminal event: a second, unrelated client can start synthesizing
/// immediately after the first client's utterance finishes.
#[tokio::test]
async fn engine_slot_frees_promptly_after_a_terminal_event() {
    let h = Harness::new();
    let a = id(5);
    let b = id(6);
    h.handle.initialize(a, 10, Mode::Default).await.unwrap();
    h.handle.prepare(a).await.unwrap();
    let a1 = common::default_text(&h.handle, a, "a").await.unwrap();
    h.handle.play(a).await.unwrap();
    h.complete_one_utterance(a, a1).await;
    assert_eq!(h.engine.start_count(), 1);

    h.handle.initialize(b, 20, Mode::Default).await.unwrap();
    h.handle.prepare(b).await.unwrap();
    common::default_text(&h.handle, b, "b").await.unwrap();
    h.handle.play(b).await.unwrap();
    assert_eq!(h.engine.start_count(), 2, "engine must not be wedged on a's finished utterance");
}
