//! Rollback-and-replay reconciliation.
//!
//! On each authoritative snapshot the predicted timeline is checked
//! against it; on divergence the reconciliation engine is hard-reset to
//! the server state and the recorded *input* events of every discarded
//! predicted tick are re-applied, one fixed tick per discarded snapshot,
//! until the engine catches back up to "now". Replaying events rather
//! than recorded positions keeps the replay physically consistent:
//! trajectories are recomputed from the corrected checkpoint, not copied
//! forward.

use tiltball_engine::snapshot::{
    are_snapshots_close, restore_engine_from_snapshot, RestoreOptions, Snapshot,
};
use tiltball_engine::TICK_DELTA_MS;
use tiltball_shared::protocol::{GameEvent, GameEventData};

use crate::ClientEngine;

impl ClientEngine {
    /// Reconcile the predicted timeline against one server snapshot.
    pub fn reconcile(&mut self, server_snapshot: Snapshot) {
        self.server_snapshots.add(server_snapshot.clone());

        if !self.initialized {
            // First authoritative state: seed both engines outright.
            restore_engine_from_snapshot(
                &mut self.reconciliation_engine,
                &server_snapshot,
                RestoreOptions {
                    restore_non_server_controlled: true,
                },
            );
            restore_engine_from_snapshot(
                &mut self.render_engine,
                &server_snapshot,
                RestoreOptions {
                    restore_non_server_controlled: true,
                },
            );
            self.initialized = true;
            tracing::debug!(
                frame = server_snapshot.frame,
                "seeded from first server snapshot"
            );
            return;
        }

        let close = {
            let Some(local) = self
                .reconciliation_engine
                .snapshots
                .closest(server_snapshot.timestamp)
            else {
                tracing::debug!("no local snapshot to reconcile against; skipping cycle");
                return;
            };
            are_snapshots_close(local, &server_snapshot)
        };
        if close {
            return;
        }

        if !self.reconciliation_engine.game.has_started
            || self.reconciliation_engine.game.has_ended
        {
            return;
        }

        // Everything newer than the server snapshot is unconfirmed
        // prediction; throw it away and rebuild from the checkpoint.
        let now = self.reconciliation_engine.timestamp;
        let discarded = self
            .reconciliation_engine
            .snapshots
            .drain_newer(server_snapshot.timestamp);

        restore_engine_from_snapshot(
            &mut self.reconciliation_engine,
            &server_snapshot,
            RestoreOptions {
                restore_non_server_controlled: true,
            },
        );

        let mut replayed = 0usize;
        while self.reconciliation_engine.timestamp + 1e-6 < now {
            match discarded.get(replayed) {
                Some(snapshot) => self.replay_recorded_events(&snapshot.events),
                None => {
                    tracing::warn!(
                        tick = replayed,
                        "local snapshot missing during replay; advancing without events"
                    );
                }
            }
            replayed += 1;

            match self.reconciliation_engine.update(TICK_DELTA_MS) {
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(error) => {
                    tracing::warn!(%error, "replay tick failed");
                    break;
                }
            }
        }

        tracing::debug!(
            frame = server_snapshot.frame,
            discarded = discarded.len(),
            replayed,
            "reconciliation replay complete"
        );
    }

    /// Re-apply the input-driven events recorded in a discarded predicted
    /// tick. Going through the game handlers re-records them, so the
    /// regenerated snapshots stay replayable for future rollbacks.
    fn replay_recorded_events(&mut self, events: &[GameEvent]) {
        let engine = &mut self.reconciliation_engine;
        let stamp = engine.stamp();
        for event in events {
            match &event.data {
                GameEventData::ActivateObjects { labels, .. } => {
                    engine.game.handle_activate_objects(stamp, labels.clone());
                }
                GameEventData::DeactivateObjects { labels, .. } => {
                    engine.game.handle_deactivate_objects(stamp, labels.clone());
                }
                GameEventData::PlayerLostRound { player_id } => {
                    if let Some(world_event) = engine.game.world.lose_round_for_player(player_id) {
                        engine.game.apply_world_events(stamp, vec![world_event]);
                    }
                }
                _ => {}
            }
        }
    }
}
