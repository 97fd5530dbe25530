//! Headless demo: one room, two scripted players, a full game.
//!
//! The wire transport is an external collaborator; connections here are
//! the command/broadcast channels a transport adapter would use.

use std::time::Duration;

use anyhow::Context;
use tiltball_server::config::ServerConfig;
use tiltball_server::ratings::MemoryRatingStore;
use tiltball_server::room::{run_game_room, RoomCommand};
use tiltball_shared::maps::{PADDLE_BOTTOM_LEFT, PADDLE_BOTTOM_RIGHT};
use tiltball_shared::protocol::GameEventData;
use tokio::sync::{broadcast, mpsc, oneshot};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = ServerConfig {
        game_duration_ms: 10_000.0,
        ..Default::default()
    };
    if let Err(e) = config.validate() {
        eprintln!("Invalid server configuration: {e}");
        std::process::exit(1);
    }

    let (cmd_tx, cmd_rx) = mpsc::channel::<RoomCommand>(256);
    let (state_tx, mut state_rx) = broadcast::channel(64);

    let room_config = config.clone();
    let room = tokio::spawn(async move {
        run_game_room(
            room_config,
            Box::new(MemoryRatingStore::new(1000)),
            cmd_rx,
            state_tx,
        )
        .await;
    });

    for player_id in ["1", "2"] {
        let (response, welcome) = oneshot::channel();
        cmd_tx
            .send(RoomCommand::Join {
                player_id: player_id.to_string(),
                response,
            })
            .await
            .context("room closed before join")?;
        let state = welcome.await.context("no join response")??;
        tracing::info!(player = player_id, players = state.players.len(), "joined");
    }

    // Scripted input: player 1 flips both paddles in a steady rhythm.
    let input_tx = cmd_tx.clone();
    tokio::spawn(async move {
        let labels = vec![
            PADDLE_BOTTOM_LEFT.to_string(),
            PADDLE_BOTTOM_RIGHT.to_string(),
        ];
        loop {
            tokio::time::sleep(Duration::from_millis(500)).await;
            if input_tx
                .send(RoomCommand::ActivateObjects {
                    player_id: "1".to_string(),
                    labels: labels.clone(),
                })
                .await
                .is_err()
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
            if input_tx
                .send(RoomCommand::DeactivateObjects {
                    player_id: "1".to_string(),
                    labels: labels.clone(),
                })
                .await
                .is_err()
            {
                break;
            }
        }
    });

    loop {
        let state = match state_rx.recv().await {
            Ok(state) => state,
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(missed = n, "slow consumer, skipped states");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        if state.frame % 60 == 0 {
            for player in state.players.values() {
                tracing::debug!(
                    player = %player.id,
                    current = player.current_score,
                    high = player.high_score,
                    score = player.score,
                    "scores"
                );
            }
        }

        let ended = state.events.iter().find_map(|e| match &e.data {
            GameEventData::GameEnded {
                placements,
                rating_changes,
            } => Some((placements.clone(), rating_changes.clone())),
            _ => None,
        });
        if let Some((placements, rating_changes)) = ended {
            println!("Game over:");
            for placement in placements {
                let change = &rating_changes[&placement.player_id];
                println!(
                    "  {:?} player {} score {} (best round {}) rating {} ({:+})",
                    placement.result,
                    placement.player_id,
                    placement.score,
                    placement.high_score,
                    change.rating,
                    change.change,
                );
            }
            break;
        }
    }

    room.await.context("room task panicked")?;
    Ok(())
}
