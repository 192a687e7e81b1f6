//! Registration barrier integration tests: debounced closing, fan-out of one
//! snapshot to every waiter, and late joiners starting a fresh session.
//!
//! Timer-driven cases run on a paused clock so the quiet period elapses
//! deterministically.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};

use debate_coordination::events::EventBusExt;
use debate_coordination::{
    Coordinator, DebateConfig, DebateError, EventBus, EventFilter, RegisterOutcome,
    RegisterRequest, SessionPhase, SharedCoordinator,
};

const QUIET: Duration = Duration::from_millis(500);

fn coordinator() -> SharedCoordinator {
    let config = DebateConfig::default().with_quiet_period(QUIET);
    Coordinator::new(config, EventBus::new().shared()).shared()
}

fn spawn_register(
    coordinator: &SharedCoordinator,
    connection: &str,
    identity: &str,
    topic: &str,
    text: &str,
) -> tokio::task::JoinHandle<Result<RegisterOutcome, DebateError>> {
    let coordinator = Arc::clone(coordinator);
    let connection = connection.to_string();
    let request = RegisterRequest::new(identity, topic, text);
    tokio::spawn(async move { coordinator.register(&connection, request).await })
}

// ── Debounce ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_second_registration_extends_quiet_period() {
    let coordinator = coordinator();
    let start = Instant::now();

    let a = spawn_register(&coordinator, "conn-a", "A", "X", "a opens");
    sleep(Duration::from_millis(100)).await;
    let b = spawn_register(&coordinator, "conn-b", "B", "X", "b opens");

    let a = a.await.unwrap().unwrap();
    let elapsed = start.elapsed();
    let b = b.await.unwrap().unwrap();

    // closes one quiet period after B, not after A
    assert!(elapsed >= Duration::from_millis(600), "closed at {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(700), "closed at {:?}", elapsed);

    assert_eq!(a.snapshot.participant_count, 2);
    assert_eq!(a.snapshot.phase, SessionPhase::Active);
    assert!(Arc::ptr_eq(&a.snapshot, &b.snapshot));

    let texts: Vec<&str> = a.snapshot.responses.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["a opens", "b opens"]);
}

#[tokio::test(start_paused = true)]
async fn test_lone_participant_resolves_alone() {
    let coordinator = coordinator();
    let start = Instant::now();

    let outcome = coordinator
        .register("conn-a", RegisterRequest::new("A", "X", "solo"))
        .await
        .unwrap();

    assert!(start.elapsed() >= QUIET);
    assert_eq!(outcome.snapshot.participant_count, 1);
    assert_eq!(outcome.snapshot.responses.len(), 1);
}

// ── Late joiners ───────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_late_joiner_starts_new_session() {
    let coordinator = coordinator();

    let a = spawn_register(&coordinator, "conn-a", "A", "X", "a");
    let b = spawn_register(&coordinator, "conn-b", "B", "X", "b");
    let first = a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    sleep(Duration::from_secs(2)).await;
    let late = coordinator
        .register("conn-c", RegisterRequest::new("C", "X", "c"))
        .await
        .unwrap();

    assert_ne!(late.snapshot.session_id, first.snapshot.session_id);
    assert_eq!(late.snapshot.participant_count, 1);
    assert_eq!(late.snapshot.responses[0].identity, "C");

    // the earlier session is still reachable through its bindings
    assert_eq!(coordinator.status("conn-a").unwrap().participant_count, 2);
    assert_eq!(coordinator.status("conn-c").unwrap().participant_count, 1);
    assert_eq!(coordinator.topic_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_topics_are_independent() {
    let coordinator = coordinator();

    let a = spawn_register(&coordinator, "conn-a", "A", "X", "a");
    let b = spawn_register(&coordinator, "conn-b", "B", "Y", "b");

    let a = a.await.unwrap().unwrap();
    let b = b.await.unwrap().unwrap();
    assert_ne!(a.snapshot.session_id, b.snapshot.session_id);
    assert_eq!(a.snapshot.participant_count, 1);
    assert_eq!(b.snapshot.participant_count, 1);
    assert_eq!(coordinator.topic_count(), 2);
}

// ── Re-registration ────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_reregistration_is_not_a_duplicate() {
    let coordinator = coordinator();

    let first = spawn_register(&coordinator, "conn-a", "A", "X", "draft");
    sleep(Duration::from_millis(50)).await;
    let second = spawn_register(&coordinator, "conn-a2", "A", "X", "revised");

    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();

    assert!(first.is_new);
    assert!(!second.is_new);
    assert_eq!(first.snapshot.participant_count, 1);
    // both texts are kept
    assert_eq!(first.snapshot.responses.len(), 2);
    assert_eq!(
        coordinator.participant("conn-a", "A").unwrap().rounds_completed,
        1
    );
}

// ── Readers ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_read_while_registering_waits_for_same_snapshot() {
    let coordinator = coordinator();

    let a = spawn_register(&coordinator, "conn-a", "A", "X", "a");
    sleep(Duration::from_millis(10)).await;

    let reader = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.read("conn-a").await })
    };
    sleep(Duration::from_millis(10)).await;
    assert_eq!(coordinator.status("conn-a").unwrap().pending_waiters, 2);

    let registered = a.await.unwrap().unwrap();
    let read = reader.await.unwrap().unwrap();
    assert!(Arc::ptr_eq(&registered.snapshot, &read));
    assert_eq!(coordinator.status("conn-a").unwrap().pending_waiters, 0);
}

#[tokio::test(start_paused = true)]
async fn test_read_after_close_is_immediate() {
    let coordinator = coordinator();
    coordinator
        .register("conn-a", RegisterRequest::new("A", "X", "a"))
        .await
        .unwrap();

    let start = Instant::now();
    let snapshot = coordinator.read("conn-a").await.unwrap();
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(snapshot.responses.len(), 1);
}

#[tokio::test]
async fn test_read_on_unbound_connection() {
    let coordinator = coordinator();
    assert_eq!(
        coordinator.read("stranger").await.unwrap_err(),
        DebateError::SessionNotFound
    );
}

// ── Abandoned waiters ──────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_abandoned_waiter_does_not_block_others() {
    let coordinator = coordinator();

    let a = spawn_register(&coordinator, "conn-a", "A", "X", "a");
    sleep(Duration::from_millis(10)).await;
    a.abort();

    let b = spawn_register(&coordinator, "conn-b", "B", "X", "b");
    let b = b.await.unwrap().unwrap();

    // A's contribution stays even though its caller went away
    assert_eq!(b.snapshot.participant_count, 2);
    assert_eq!(b.snapshot.responses.len(), 2);
}

// ── Concurrency ────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registrations_share_one_snapshot() {
    let config = DebateConfig::default().with_quiet_period(Duration::from_millis(200));
    let coordinator = Coordinator::new(config, EventBus::new().shared()).shared();

    let handles: Vec<_> = (0..10)
        .map(|i| {
            spawn_register(
                &coordinator,
                &format!("conn-{}", i),
                &format!("P{}", i),
                "shared topic",
                &format!("opening {}", i),
            )
        })
        .collect();

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap().unwrap());
    }

    let first = &outcomes[0].snapshot;
    assert_eq!(first.participant_count, 10);
    assert_eq!(first.responses.len(), 10);
    for outcome in &outcomes {
        assert!(Arc::ptr_eq(first, &outcome.snapshot));
    }
    assert!(first
        .responses
        .windows(2)
        .all(|pair| pair[0].timestamp <= pair[1].timestamp));
}

// ── Events ─────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_lifecycle_events() {
    let coordinator = coordinator();
    let mut events = coordinator.events().subscribe();

    let a = spawn_register(&coordinator, "conn-a", "A", "X", "a");
    let b = spawn_register(&coordinator, "conn-b", "B", "X", "b");
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();
    coordinator.submit("conn-a", None, "round two").unwrap();

    let mut types = Vec::new();
    while let Ok(event) = events.try_recv() {
        types.push(event.event_type());
    }
    assert_eq!(
        types,
        vec![
            "session_created",
            "participant_joined",
            "participant_joined",
            "registration_closed",
            "response_submitted",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_filtered_close_event_counts_waiters() {
    let coordinator = coordinator();
    let mut closed = coordinator
        .events()
        .subscribe_filtered(EventFilter::new().types(vec!["registration_closed"]));

    let a = spawn_register(&coordinator, "conn-a", "A", "X", "a");
    let b = spawn_register(&coordinator, "conn-b", "B", "X", "b");
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    match closed.recv().await.unwrap() {
        debate_coordination::DebateEvent::RegistrationClosed {
            participant_count,
            waiters_released,
            ..
        } => {
            assert_eq!(participant_count, 2);
            assert_eq!(waiters_released, 2);
        }
        other => panic!("unexpected event {:?}", other),
    }
}
