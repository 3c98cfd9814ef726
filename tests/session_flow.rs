//! End-to-end scenarios for session lifecycle and the set ledger, run
//! against the in-memory store.

use std::sync::Arc;

use anyhow::Result;
use liftlog::store::{MemoryStore, WorkoutStore};
use liftlog::{CoreError, SessionState, SetPatch, WorkoutCore};

fn core_over(store: &Arc<MemoryStore>) -> WorkoutCore {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    WorkoutCore::new(store.clone() as Arc<dyn WorkoutStore>)
}

#[tokio::test]
async fn empty_session_three_adds_number_sequentially() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let core = core_over(&store);
    let bench = core.catalog.create("Bench Press", "chest").await?;

    core.sessions.start_session("Treino A").await?;
    for _ in 0..3 {
        core.sessions.ledger().add_set(bench.id).await?;
    }

    let sets = core.sessions.ledger().sets().await;
    let orders: Vec<i32> = sets.iter().map(|s| s.row.set_order).collect();
    assert_eq!(orders, vec![1, 2, 3]);
    assert!(sets.iter().all(|s| s.row.exercise_id == bench.id));
    // No prior bench set existed in this session before the first add.
    assert!(sets.iter().all(|s| s.row.weight == 0.0));

    let groups = core.sessions.ledger().grouped().await;
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].sets.len(), 3);
    Ok(())
}

#[tokio::test]
async fn add_set_copies_last_weight_of_same_exercise() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let core = core_over(&store);
    let bench = core.catalog.create("Bench Press", "chest").await?;
    let squat = core.catalog.create("Squat", "legs").await?;

    core.sessions.start_session("Treino A").await?;
    let first = core.sessions.ledger().add_set(bench.id).await?;
    core.sessions
        .ledger()
        .update_set(
            first.row.id,
            SetPatch {
                weight: Some(10.0),
                ..Default::default()
            },
        )
        .await?;

    let second = core.sessions.ledger().add_set(bench.id).await?;
    assert_eq!(second.row.weight, 10.0);

    // No prior squat set in the session, so the default stays zero.
    let other = core.sessions.ledger().add_set(squat.id).await?;
    assert_eq!(other.row.weight, 0.0);
    Ok(())
}

#[tokio::test]
async fn at_most_one_active_session() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let core = core_over(&store);

    let first = core.sessions.start_session("Treino A").await?;
    let err = core.sessions.start_session("Treino B").await.unwrap_err();
    match err {
        CoreError::SessionAlreadyActive(id) => assert_eq!(id, first.id),
        other => panic!("expected SessionAlreadyActive, got {other}"),
    }

    // A second manager over the same store sees the persisted session even
    // with a fresh local pointer.
    let other = core_over(&store);
    assert!(matches!(
        other.sessions.start_session("Treino B").await,
        Err(CoreError::SessionAlreadyActive(_))
    ));

    core.sessions.finish_session().await?;
    core.sessions.start_session("Treino B").await?;
    Ok(())
}

#[tokio::test]
async fn concurrent_starts_admit_exactly_one_session() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let core = core_over(&store);

    // Both calls race the guard; the state lock held across check and
    // insert serializes them, so exactly one session is created.
    let (a, b) = tokio::join!(
        core.sessions.start_session("Treino A"),
        core.sessions.start_session("Treino B")
    );
    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(loser, Err(CoreError::SessionAlreadyActive(_))));

    let active = store.find_active_session().await?.expect("one active row");
    assert_eq!(core.sessions.active().await, SessionState::Active(active.id));
    Ok(())
}

#[tokio::test]
async fn finish_session_clears_pointer_and_feeds_history() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let core = core_over(&store);

    core.sessions.start_session("Treino A").await?;
    let finished = core.sessions.finish_session().await?;
    assert!(finished.ended_at.is_some());
    assert_eq!(core.sessions.active().await, SessionState::Idle);

    core.sessions.start_session("Treino B").await?;
    core.sessions.finish_session().await?;

    let recent = core.sessions.recent_sessions().await;
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].name, "Treino B");
    assert_eq!(recent[1].name, "Treino A");
    Ok(())
}

#[tokio::test]
async fn deleted_set_never_comes_back_after_reload() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let core = core_over(&store);
    let bench = core.catalog.create("Bench Press", "chest").await?;

    core.sessions.start_session("Treino A").await?;
    let doomed = core.sessions.ledger().add_set(bench.id).await?;
    core.sessions.ledger().add_set(bench.id).await?;

    core.sessions.ledger().delete_set(doomed.row.id).await?;
    core.sessions.ledger().reload().await?;

    let sets = core.sessions.ledger().sets().await;
    assert_eq!(sets.len(), 1);
    assert!(sets.iter().all(|s| s.row.id != doomed.row.id));
    Ok(())
}

#[tokio::test]
async fn history_oracle_excludes_the_active_session() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let core = core_over(&store);
    let bench = core.catalog.create("Bench Press", "chest").await?;

    core.sessions.start_session("last week").await?;
    let old = core.sessions.ledger().add_set(bench.id).await?;
    core.sessions
        .ledger()
        .update_set(
            old.row.id,
            SetPatch {
                weight: Some(60.0),
                reps: Some(8),
                ..Default::default()
            },
        )
        .await?;
    core.sessions.finish_session().await?;

    let current = core.sessions.start_session("today").await?;
    let fresh = core.sessions.ledger().add_set(bench.id).await?;
    core.sessions
        .ledger()
        .update_set(
            fresh.row.id,
            SetPatch {
                weight: Some(100.0),
                ..Default::default()
            },
        )
        .await?;

    // The 100 kg set belongs to the active session and must not surface.
    let history = core
        .history
        .exercise_history(bench.id, Some(current.id))
        .await?
        .expect("history exists outside the active session");
    assert_eq!(history.weight, 60.0);
    assert_eq!(history.reps, 8);
    Ok(())
}

#[tokio::test]
async fn history_oracle_empty_without_prior_sessions() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let core = core_over(&store);
    let bench = core.catalog.create("Bench Press", "chest").await?;

    let current = core.sessions.start_session("today").await?;
    core.sessions.ledger().add_set(bench.id).await?;

    let history = core
        .history
        .exercise_history(bench.id, Some(current.id))
        .await?;
    assert!(history.is_none());
    Ok(())
}

#[tokio::test]
async fn failed_update_restores_the_captured_original() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let core = core_over(&store);
    let bench = core.catalog.create("Bench Press", "chest").await?;

    core.sessions.start_session("Treino A").await?;
    let set = core.sessions.ledger().add_set(bench.id).await?;

    store.fail_once("update_set");
    let err = core
        .sessions
        .ledger()
        .update_set(
            set.row.id,
            SetPatch {
                weight: Some(42.0),
                ..Default::default()
            },
        )
        .await;
    assert!(err.is_err());

    let sets = core.sessions.ledger().sets().await;
    assert_eq!(sets[0].row.weight, 0.0);
    // The store was never touched either.
    let stored = store.sets_for_session(set.row.session_id).await?;
    assert_eq!(stored[0].row.weight, 0.0);
    Ok(())
}

#[tokio::test]
async fn failed_delete_recovers_by_reloading() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let core = core_over(&store);
    let bench = core.catalog.create("Bench Press", "chest").await?;

    core.sessions.start_session("Treino A").await?;
    let set = core.sessions.ledger().add_set(bench.id).await?;

    store.fail_once("delete_set");
    assert!(core.sessions.ledger().delete_set(set.row.id).await.is_err());

    // The optimistic removal was undone by the reload; the row is still
    // in the store, so it is back in the ledger.
    let sets = core.sessions.ledger().sets().await;
    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].row.id, set.row.id);
    Ok(())
}

#[tokio::test]
async fn concurrent_adds_get_distinct_orders() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let core = core_over(&store);
    let bench = core.catalog.create("Bench Press", "chest").await?;

    core.sessions.start_session("Treino A").await?;
    let ledger = core.sessions.ledger();
    let (a, b) = tokio::join!(ledger.add_set(bench.id), ledger.add_set(bench.id));
    let (a, b) = (a?, b?);

    // Sequence assignment lives in the store, so the race of two clients
    // computing max+1 from a stale snapshot cannot happen.
    assert_ne!(a.row.set_order, b.row.set_order);
    let mut orders = vec![a.row.set_order, b.row.set_order];
    orders.sort();
    assert_eq!(orders, vec![1, 2]);
    Ok(())
}

#[tokio::test]
async fn deleting_the_active_session_clears_everything() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let core = core_over(&store);
    let bench = core.catalog.create("Bench Press", "chest").await?;

    let session = core.sessions.start_session("Treino A").await?;
    core.sessions.ledger().add_set(bench.id).await?;

    core.sessions.delete_session(session.id).await?;
    assert_eq!(core.sessions.active().await, SessionState::Idle);
    assert!(core.sessions.ledger().sets().await.is_empty());
    assert!(store.get_session(session.id).await?.is_none());
    // Cascade: the session's sets are gone from the store too.
    assert!(store.sets_for_session(session.id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn opening_a_finished_session_is_review_only() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let core = core_over(&store);
    let bench = core.catalog.create("Bench Press", "chest").await?;

    let session = core.sessions.start_session("Treino A").await?;
    core.sessions.ledger().add_set(bench.id).await?;
    core.sessions.finish_session().await?;

    let view = core.sessions.open_session(session.id).await?;
    assert_eq!(view.sets.len(), 1);
    assert!(view.session.ended_at.is_some());
    // Reviewing does not resurrect the session as active.
    assert_eq!(core.sessions.active().await, SessionState::Idle);
    Ok(())
}

#[tokio::test]
async fn bootstrap_adopts_a_persisted_active_session() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let core = core_over(&store);
    let bench = core.catalog.create("Bench Press", "chest").await?;
    let session = core.sessions.start_session("Treino A").await?;
    core.sessions.ledger().add_set(bench.id).await?;

    // Fresh manager over the same store, as after an app restart.
    let restarted = core_over(&store);
    assert_eq!(restarted.sessions.active().await, SessionState::Idle);
    restarted.sessions.bootstrap().await;

    assert_eq!(
        restarted.sessions.active().await,
        SessionState::Active(session.id)
    );
    assert_eq!(restarted.sessions.ledger().sets().await.len(), 1);
    Ok(())
}
