//! Integration tests for the game room.
//!
//! These run a real room loop over its channels and verify the end-to-end
//! lifecycle: join, start, fixed-tick broadcast, game end, placements and
//! atomic rating persistence.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tiltball_server::config::ServerConfig;
use tiltball_server::ratings::{MemoryRatingStore, RatingError, RatingStore};
use tiltball_server::room::{run_game_room, JoinError, RoomCommand};
use tiltball_shared::protocol::{GameEventData, GameResult, RatingChange, RoomState};
use tiltball_shared::PlayerId;
use tokio::sync::{broadcast, mpsc, oneshot};

/// Rating store sharable with the test body for post-game inspection,
/// optionally failing the first N apply calls.
#[derive(Clone)]
struct SharedRatingStore {
    inner: Arc<Mutex<MemoryRatingStore>>,
    failures_left: Arc<Mutex<usize>>,
}

impl SharedRatingStore {
    fn new(default_rating: u32, failures: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryRatingStore::new(default_rating))),
            failures_left: Arc::new(Mutex::new(failures)),
        }
    }

    fn rating(&self, player_id: &str) -> Option<u32> {
        self.inner.lock().unwrap().rating(&player_id.to_string())
    }

    fn failures_left(&self) -> usize {
        *self.failures_left.lock().unwrap()
    }
}

impl RatingStore for SharedRatingStore {
    fn ensure(&mut self, player_id: &PlayerId) -> Result<u32, RatingError> {
        self.inner.lock().unwrap().ensure(player_id)
    }

    fn apply(&mut self, changes: &HashMap<PlayerId, RatingChange>) -> Result<(), RatingError> {
        let mut failures = self.failures_left.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(RatingError::Unavailable("injected failure".to_string()));
        }
        self.inner.lock().unwrap().apply(changes)
    }
}

fn test_config() -> ServerConfig {
    ServerConfig {
        game_duration_ms: 500.0,
        ..Default::default()
    }
}

fn start_room(
    config: ServerConfig,
    store: SharedRatingStore,
) -> (
    mpsc::Sender<RoomCommand>,
    broadcast::Receiver<RoomState>,
    tokio::task::JoinHandle<()>,
) {
    let (cmd_tx, cmd_rx) = mpsc::channel(256);
    let (state_tx, state_rx) = broadcast::channel(256);
    let handle = tokio::spawn(async move {
        run_game_room(config, Box::new(store), cmd_rx, state_tx).await;
    });
    (cmd_tx, state_rx, handle)
}

async fn join(cmd_tx: &mpsc::Sender<RoomCommand>, id: &str) -> Result<RoomState, JoinError> {
    let (response, rx) = oneshot::channel();
    cmd_tx
        .send(RoomCommand::Join {
            player_id: id.to_string(),
            response,
        })
        .await
        .expect("room closed");
    rx.await.expect("no join response")
}

/// Collect broadcast states until the channel closes, with a guard
/// timeout.
async fn collect_states(mut state_rx: broadcast::Receiver<RoomState>) -> Vec<RoomState> {
    let mut states = Vec::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(20);
    loop {
        match tokio::time::timeout_at(deadline, state_rx.recv()).await {
            Ok(Ok(state)) => states.push(state),
            Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
            Ok(Err(broadcast::error::RecvError::Closed)) => break,
            Err(_) => panic!("room did not finish in time"),
        }
    }
    states
}

fn game_ended_events(states: &[RoomState]) -> Vec<(Vec<tiltball_shared::protocol::Placement>, HashMap<PlayerId, RatingChange>)> {
    states
        .iter()
        .flat_map(|s| s.events.iter())
        .filter_map(|e| match &e.data {
            GameEventData::GameEnded {
                placements,
                rating_changes,
            } => Some((placements.clone(), rating_changes.clone())),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn two_player_game_runs_to_completion() {
    let store = SharedRatingStore::new(1000, 0);
    let (cmd_tx, state_rx, handle) = start_room(test_config(), store.clone());

    let welcome = join(&cmd_tx, "1").await.unwrap();
    assert!(welcome.players.contains_key("1"));
    assert!(matches!(
        welcome.events.first().map(|e| &e.data),
        Some(GameEventData::Init { .. })
    ));

    let welcome = join(&cmd_tx, "2").await.unwrap();
    assert_eq!(welcome.players.len(), 2);

    let states = collect_states(state_rx).await;
    handle.await.unwrap();

    // Exactly one terminal event.
    let ended = game_ended_events(&states);
    assert_eq!(ended.len(), 1);
    let (placements, rating_changes) = &ended[0];

    // Two placements, best score first.
    assert_eq!(placements.len(), 2);
    assert!(placements[0].score >= placements[1].score);
    assert_eq!(placements[0].result, GameResult::Won);
    assert_eq!(placements[1].result, GameResult::Lost);

    // Fixed-magnitude deltas, persisted atomically.
    let winner = &placements[0].player_id;
    let loser = &placements[1].player_id;
    assert_eq!(rating_changes[winner].change, 10);
    assert_eq!(rating_changes[loser].change, -10);
    assert_eq!(store.rating(winner), Some(1010));
    assert_eq!(store.rating(loser), Some(990));

    // A GameStarted was broadcast before any gameplay state.
    let started = states
        .iter()
        .flat_map(|s| s.events.iter())
        .filter(|e| matches!(e.data, GameEventData::GameStarted))
        .count();
    assert_eq!(started, 1);
}

#[tokio::test]
async fn room_state_is_broadcast_every_tick_with_both_subtrees() {
    let store = SharedRatingStore::new(1000, 0);
    let (cmd_tx, state_rx, handle) = start_room(test_config(), store);

    join(&cmd_tx, "1").await.unwrap();
    join(&cmd_tx, "2").await.unwrap();

    let states = collect_states(state_rx).await;
    handle.await.unwrap();

    let gameplay: Vec<&RoomState> = states.iter().filter(|s| s.frame > 0).collect();
    assert!(gameplay.len() > 10, "expected a stream of tick states");

    // Frames increase monotonically and both players are present.
    let mut last_frame = 0;
    for state in &gameplay {
        assert!(state.frame >= last_frame);
        last_frame = state.frame;
        assert_eq!(state.players.len(), 2);
        for player in state.players.values() {
            assert_eq!(player.pinballs.len(), 1);
        }
    }
}

#[tokio::test]
async fn extra_join_is_rejected() {
    let store = SharedRatingStore::new(1000, 0);
    let (cmd_tx, state_rx, handle) = start_room(test_config(), store);

    join(&cmd_tx, "1").await.unwrap();
    join(&cmd_tx, "2").await.unwrap();
    let rejected = join(&cmd_tx, "3").await;
    assert!(
        matches!(rejected, Err(JoinError::RoomFull) | Err(JoinError::GameInProgress)),
        "{rejected:?}"
    );

    drop(cmd_tx);
    collect_states(state_rx).await;
    handle.await.unwrap();
}

#[tokio::test]
async fn leave_before_start_emits_player_left() {
    let store = SharedRatingStore::new(1000, 0);
    let (cmd_tx, mut state_rx, handle) = start_room(test_config(), store);

    join(&cmd_tx, "1").await.unwrap();
    cmd_tx
        .send(RoomCommand::Leave {
            player_id: "1".to_string(),
        })
        .await
        .unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    let mut saw_left = false;
    while !saw_left {
        let state = tokio::time::timeout_at(deadline, state_rx.recv())
            .await
            .expect("no PlayerLeft broadcast")
            .unwrap();
        for event in &state.events {
            if matches!(event.data, GameEventData::PlayerLeft { .. }) {
                assert!(!state.players.contains_key("1"));
                saw_left = true;
            }
        }
    }

    drop(cmd_tx);
    handle.abort();
}

#[tokio::test]
async fn failed_persistence_blocks_game_end_until_resolved() {
    let store = SharedRatingStore::new(1000, 3);
    let (cmd_tx, state_rx, handle) = start_room(test_config(), store.clone());

    join(&cmd_tx, "1").await.unwrap();
    join(&cmd_tx, "2").await.unwrap();

    let states = collect_states(state_rx).await;
    handle.await.unwrap();

    // The injected failures were consumed before the end went out.
    assert_eq!(store.failures_left(), 0);

    let ended = game_ended_events(&states);
    assert_eq!(ended.len(), 1, "GameEnded must fire exactly once");

    // Ratings were still applied, atomically, after the retries.
    let (placements, _) = &ended[0];
    assert_eq!(store.rating(&placements[0].player_id), Some(1010));
    assert_eq!(store.rating(&placements[1].player_id), Some(990));
}
