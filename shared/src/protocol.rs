//! Wire protocol: game events and the shared room-state document.
//!
//! Wire encoding/framing is an external concern; these types only define
//! the shape of what crosses the boundary, serde-serializable and exported
//! for the TypeScript presentation layer.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::map::GameMapName;
use crate::vec2::Vec2;

/// Protocol version - increment when making breaking changes.
pub const PROTOCOL_VERSION: u32 = 1;

pub type PlayerId = String;

/// Identity/rating info for a roster entry. Looked up by the identity
/// collaborator; only the fields the simulation cares about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../bindings/")]
#[serde(rename_all = "camelCase")]
pub struct PlayerProfile {
    pub id: PlayerId,
    pub rating: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../bindings/")]
#[serde(rename_all = "lowercase")]
pub enum GameResult {
    Won,
    Lost,
}

/// One row of the end-of-game standings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../bindings/")]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub player_id: PlayerId,
    pub score: u32,
    pub high_score: u32,
    pub result: GameResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../bindings/")]
#[serde(rename_all = "camelCase")]
pub struct RatingChange {
    pub change: i32,
    pub rating: u32,
}

/// Payload of a game event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../bindings/")]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEventData {
    Init {
        players: Vec<PlayerProfile>,
    },
    PlayerJoin {
        player_id: PlayerId,
        rating: u32,
    },
    PlayerLeft {
        player_id: PlayerId,
    },
    GameStarted,
    GameEnded {
        placements: Vec<Placement>,
        rating_changes: HashMap<PlayerId, RatingChange>,
    },
    ActivateObjects {
        player_id: PlayerId,
        labels: Vec<String>,
    },
    DeactivateObjects {
        player_id: PlayerId,
        labels: Vec<String>,
    },
    PingObject {
        player_id: PlayerId,
        label: String,
    },
    PlayerLostRound {
        player_id: PlayerId,
    },
    PlayerPinballRedeploy {
        player_id: PlayerId,
        pinball_id: String,
    },
}

/// A game event, stamped with the tick it happened on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../bindings/")]
#[serde(rename_all = "camelCase")]
pub struct GameEvent {
    pub frame: u64,
    pub timestamp: f64,
    pub data: GameEventData,
}

/// Kinematic state of one pinball as shared with clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../bindings/")]
#[serde(rename_all = "camelCase")]
pub struct RoomPinball {
    pub id: String,
    pub player_id: PlayerId,
    pub position: Vec2,
    pub velocity: Vec2,
}

/// Per-player subtree of the room state: score fields plus that player's
/// private board (active objects and pinball kinematics).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../bindings/")]
#[serde(rename_all = "camelCase")]
pub struct RoomPlayer {
    pub id: PlayerId,
    pub score: u32,
    pub current_score: u32,
    pub high_score: u32,
    pub active_objects: Vec<String>,
    pub pinballs: HashMap<String, RoomPinball>,
}

impl RoomPlayer {
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            score: 0,
            current_score: 0,
            high_score: 0,
            active_objects: Vec::new(),
            pinballs: HashMap::new(),
        }
    }
}

/// The shared room-state document, broadcast once per tick.
///
/// `events` is one-shot: it holds only the events of the tick being
/// broadcast and is cleared before the next tick is merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../bindings/")]
#[serde(rename_all = "camelCase")]
pub struct RoomState {
    pub frame: u64,
    pub timestamp: f64,
    pub map_name: GameMapName,
    pub events: Vec<GameEvent>,
    pub players: HashMap<PlayerId, RoomPlayer>,
}

impl RoomState {
    pub fn new(map_name: GameMapName) -> Self {
        Self {
            frame: 0,
            timestamp: 0.0,
            map_name,
            events: Vec::new(),
            players: HashMap::new(),
        }
    }
}
