//! Integration tests for the coordinator actor.
//!
//! These tests drive the coordinator through its handle the way
//! connection handlers do, with real task concurrency, and verify the
//! consistency properties of the session and player maps.
//!
//! Tests CAN use `.unwrap()` and `.expect()` - the panic-free policy
//! applies to production code only.

use std::collections::HashSet;
use std::time::Duration;

use lobby_core::{LobbyError, PlayerId, SessionName, SessionView};
use lobbyd::coordinator::{
    spawn_coordinator, CoordinatorHandle, CreateOutcome, LeaveOutcome, Notice,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tokio::time::timeout;

// ============================================================================
// Test Helpers
// ============================================================================

/// A connected test player: identity plus mailbox consumer.
struct TestPlayer {
    id: PlayerId,
    mailbox: mpsc::UnboundedReceiver<Notice>,
}

/// Connects a player and keeps its mailbox.
async fn connect(handle: &CoordinatorHandle, name: &str) -> TestPlayer {
    let (tx, rx) = mpsc::unbounded_channel();
    let id = PlayerId::new(name);
    handle
        .connect(id.clone(), tx)
        .await
        .expect("connect should succeed");
    TestPlayer { id, mailbox: rx }
}

/// Creates a session, asserting the name was free.
async fn create(handle: &CoordinatorHandle, host: &TestPlayer, name: &str, capacity: usize) {
    let outcome = handle
        .create_session(
            host.id.clone(),
            SessionName::new(name),
            "highlands".to_string(),
            capacity,
        )
        .await
        .expect("create should succeed");
    assert!(matches!(outcome, CreateOutcome::Created(_)));
}

/// Asserts the cross-session consistency properties on a session list:
/// exactly one host per session, occupancy within capacity, and no
/// player seated in two sessions at once.
fn assert_consistent(sessions: &[SessionView]) {
    let mut seated: HashSet<&str> = HashSet::new();

    for session in sessions {
        assert!(
            session.len() <= session.capacity,
            "session {} over capacity: {}/{}",
            session.name,
            session.len(),
            session.capacity
        );

        let hosts = session
            .participants
            .iter()
            .filter(|p| p.is_host)
            .collect::<Vec<_>>();
        assert_eq!(hosts.len(), 1, "session {} host count", session.name);
        assert_eq!(hosts[0].player, session.host);

        for p in &session.participants {
            assert!(
                seated.insert(p.player.as_str()),
                "player {} seated in two sessions",
                p.player
            );
        }
    }
}

// ============================================================================
// Scenario Tests
// ============================================================================

/// The full happy path: Alice hosts, Bob and Carol join, everyone
/// configures, then the host ends it and both guests hear about it.
#[tokio::test]
async fn test_lobby_scenario() {
    let handle = spawn_coordinator();

    let alice = connect(&handle, "Alice").await;
    let mut bob = connect(&handle, "Bob").await;
    let mut carol = connect(&handle, "Carol").await;

    create(&handle, &alice, "Arena", 4).await;

    let view = handle
        .join_session(bob.id.clone(), SessionName::new("Arena"))
        .await
        .unwrap();
    assert_eq!(view.len(), 2);

    let view = handle
        .join_session(carol.id.clone(), SessionName::new("Arena"))
        .await
        .unwrap();
    assert_eq!(view.len(), 3);

    handle
        .update_participant(bob.id.clone(), "Celts".to_string(), 2, true)
        .await
        .unwrap();
    handle
        .update_participant(carol.id.clone(), "Vikings".to_string(), 2, false)
        .await
        .unwrap();

    let sessions = handle.list_sessions().await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_consistent(&sessions);
    assert!(sessions[0].participant(&bob.id).unwrap().ready);
    assert!(!sessions[0].participant(&carol.id).unwrap().ready);

    let outcome = handle
        .leave_session(alice.id.clone(), SessionName::new("Arena"))
        .await
        .unwrap();
    assert_eq!(outcome, LeaveOutcome::Closed);

    let expected = Notice::SessionClosedByHost {
        session: SessionName::new("Arena"),
    };
    for guest in [&mut bob, &mut carol] {
        let notice = timeout(Duration::from_secs(1), guest.mailbox.recv())
            .await
            .expect("notice within timeout")
            .expect("mailbox open");
        assert_eq!(notice, expected);
        // Exactly one notice per participant
        assert!(guest.mailbox.try_recv().is_err());
    }

    assert!(handle.list_sessions().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_nonhost_leave_produces_no_notice() {
    let handle = spawn_coordinator();

    let mut alice = connect(&handle, "Alice").await;
    let bob = connect(&handle, "Bob").await;

    create(&handle, &alice, "Arena", 4).await;
    handle
        .join_session(bob.id.clone(), SessionName::new("Arena"))
        .await
        .unwrap();

    let outcome = handle
        .leave_session(bob.id.clone(), SessionName::new("Arena"))
        .await
        .unwrap();
    assert_eq!(outcome, LeaveOutcome::Left);

    // Silence: nothing lands in the host's mailbox
    assert!(alice.mailbox.try_recv().is_err());

    let sessions = handle.list_sessions().await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].len(), 1);
    assert_consistent(&sessions);
}

#[tokio::test]
async fn test_list_is_read_only_and_repeatable() {
    let handle = spawn_coordinator();

    let alice = connect(&handle, "Alice").await;
    let bob = connect(&handle, "Bob").await;
    create(&handle, &alice, "Zulu", 4).await;
    create(&handle, &bob, "Arena", 4).await;

    let first = handle.list_sessions().await.unwrap();
    let second = handle.list_sessions().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
    // Sorted by name
    assert_eq!(first[0].name.as_str(), "Arena");
    assert_eq!(first[1].name.as_str(), "Zulu");
}

// ============================================================================
// Race Tests
// ============================================================================

/// Two players racing to create the same name: exactly one wins, the
/// other sees NameTaken and stays free to create elsewhere.
#[tokio::test]
async fn test_racing_creates_one_winner() {
    let handle = spawn_coordinator();

    let alice = connect(&handle, "Alice").await;
    let bob = connect(&handle, "Bob").await;

    let h1 = handle.clone();
    let a = alice.id.clone();
    let t1 = tokio::spawn(async move {
        h1.create_session(a, SessionName::new("Arena"), "highlands".to_string(), 4)
            .await
    });

    let h2 = handle.clone();
    let b = bob.id.clone();
    let t2 = tokio::spawn(async move {
        h2.create_session(b, SessionName::new("Arena"), "islands".to_string(), 4)
            .await
    });

    let r1 = t1.await.unwrap().unwrap();
    let r2 = t2.await.unwrap().unwrap();

    let created = usize::from(matches!(r1, CreateOutcome::Created(_)))
        + usize::from(matches!(r2, CreateOutcome::Created(_)));
    assert_eq!(created, 1, "exactly one create wins: {r1:?} / {r2:?}");

    let sessions = handle.list_sessions().await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_consistent(&sessions);

    // The loser was not pinned to anything and can host elsewhere
    let loser = if sessions[0].host == alice.id {
        bob.id.clone()
    } else {
        alice.id.clone()
    };
    let outcome = handle
        .create_session(
            loser,
            SessionName::new("Fallback"),
            "islands".to_string(),
            2,
        )
        .await
        .unwrap();
    assert!(matches!(outcome, CreateOutcome::Created(_)));
}

/// Many players racing into a small session: occupancy never exceeds
/// capacity and every loser gets SessionFull.
#[tokio::test]
async fn test_racing_joins_respect_capacity() {
    let handle = spawn_coordinator();

    let alice = connect(&handle, "Alice").await;
    create(&handle, &alice, "Arena", 3).await;

    let mut racers = Vec::new();
    for i in 0..8 {
        let player = connect(&handle, &format!("Racer-{i}")).await;
        let h = handle.clone();
        let id = player.id.clone();
        racers.push((
            player,
            tokio::spawn(async move { h.join_session(id, SessionName::new("Arena")).await }),
        ));
    }

    let mut joined = 0;
    let mut full = 0;
    for (_player, task) in racers {
        match task.await.unwrap() {
            Ok(view) => {
                assert!(view.len() <= 3);
                joined += 1;
            }
            Err(LobbyError::SessionFull { capacity, .. }) => {
                assert_eq!(capacity, 3);
                full += 1;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    // Host plus two joiners fill the session
    assert_eq!((joined, full), (2, 6));

    let sessions = handle.list_sessions().await.unwrap();
    assert_eq!(sessions[0].len(), 3);
    assert_consistent(&sessions);
}

/// Host leave racing against a guest join: whichever order the
/// coordinator picks, the final state is consistent and the guest either
/// joined before the close (and got the notice) or was told the session
/// is gone.
#[tokio::test]
async fn test_close_racing_join() {
    for _ in 0..20 {
        let handle = spawn_coordinator();

        let alice = connect(&handle, "Alice").await;
        let mut bob = connect(&handle, "Bob").await;
        create(&handle, &alice, "Arena", 4).await;

        let h1 = handle.clone();
        let a = alice.id.clone();
        let leave = tokio::spawn(async move {
            h1.leave_session(a, SessionName::new("Arena")).await
        });

        let h2 = handle.clone();
        let b = bob.id.clone();
        let join =
            tokio::spawn(async move { h2.join_session(b, SessionName::new("Arena")).await });

        assert_eq!(leave.await.unwrap().unwrap(), LeaveOutcome::Closed);

        match join.await.unwrap() {
            Ok(_) => {
                // Join landed first; the close must have notified Bob
                let notice = timeout(Duration::from_secs(1), bob.mailbox.recv())
                    .await
                    .expect("notice within timeout")
                    .expect("mailbox open");
                assert!(matches!(notice, Notice::SessionClosedByHost { .. }));
            }
            Err(LobbyError::SessionNotFound { .. }) => {
                // Close landed first; no notice for a player who never joined
                assert!(bob.mailbox.try_recv().is_err());
            }
            Err(other) => panic!("unexpected error: {other}"),
        }

        assert!(handle.list_sessions().await.unwrap().is_empty());
    }
}

// ============================================================================
// Randomized Consistency Test
// ============================================================================

/// Hammers the coordinator with random operations from many concurrent
/// players, then checks the cross-map consistency properties. Any
/// interleaving must leave the maps equivalent to some sequential order.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_randomized_operations_stay_consistent() {
    let handle = spawn_coordinator();
    let session_names = ["Arena", "Islands", "Highlands", "Tundra"];

    let mut tasks = Vec::new();
    for i in 0..12 {
        let h = handle.clone();
        tasks.push(tokio::spawn(async move {
            let me = PlayerId::new(format!("Player-{i}"));
            let (tx, rx) = mpsc::unbounded_channel();
            // Keep the mailbox open for the whole run
            let _mailbox = rx;
            h.connect(me.clone(), tx).await.expect("connect");

            // Seeded per worker; StdRng is Send so it can live across awaits
            let mut rng = StdRng::seed_from_u64(0xC0FFEE + i as u64);
            for _ in 0..50 {
                let name = SessionName::new(*session_names.choose(&mut rng).unwrap());
                match rng.gen_range(0..5) {
                    0 => {
                        let _ = h
                            .create_session(
                                me.clone(),
                                name,
                                "highlands".to_string(),
                                rng.gen_range(1..5),
                            )
                            .await;
                    }
                    1 => {
                        let _ = h.join_session(me.clone(), name).await;
                    }
                    2 => {
                        let _ = h
                            .update_participant(
                                me.clone(),
                                "Celts".to_string(),
                                rng.gen_range(1..5),
                                rng.gen_bool(0.5),
                            )
                            .await;
                    }
                    3 => {
                        let _ = h.leave_session(me.clone(), name).await;
                    }
                    _ => {
                        let sessions = h.list_sessions().await.expect("list");
                        // Snapshots must be internally consistent mid-run too
                        for s in &sessions {
                            assert!(s.len() <= s.capacity);
                        }
                    }
                }
            }
        }));
    }

    for task in tasks {
        task.await.expect("worker task");
    }

    let sessions = handle.list_sessions().await.unwrap();
    assert_consistent(&sessions);
}
