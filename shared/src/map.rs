//! Static board layout data.
//!
//! A [`GameMapData`] is a pure value object: a list of reusable object
//! templates (shape + gameplay kind) and a list of field placements that
//! position those templates on the board. The engine turns it into
//! physics bodies; the presentation layer turns it into visuals.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::vec2::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../bindings/")]
#[serde(rename_all = "lowercase")]
pub enum GameMapName {
    Singleplayer,
    Multiplayer,
}

impl std::fmt::Display for GameMapName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameMapName::Singleplayer => write!(f, "singleplayer"),
            GameMapName::Multiplayer => write!(f, "multiplayer"),
        }
    }
}

/// How a template's geometry is obtained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../bindings/")]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectShape {
    Circle {
        radius: f32,
    },
    Rectangle {
        width: f32,
        height: f32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        chamfer_radius: Option<f32>,
    },
    /// Polygon derived from SVG path data (flattened by the engine).
    Path {
        path: String,
    },
    /// Explicit vertex list, in template-local coordinates.
    Vertices {
        points: Vec<Vec2>,
    },
}

/// Gameplay role of a template, with its role-specific data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../bindings/")]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectKind {
    Wall,
    /// Contact respawns the pinball at its spawn point and ends the round.
    Reset,
    /// Contact re-applies the pinball's initial velocity in place.
    RedeployBall,
    Bumper {
        /// Points awarded to the owning player on contact.
        points: u32,
    },
    Paddle {
        /// Pivot point, relative to the top-left of the template's shape.
        anchor: Vec2,
    },
}

/// Reusable board object template: shape + gameplay kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../bindings/")]
#[serde(rename_all = "camelCase")]
pub struct GameMapObject {
    pub id: String,
    pub kind: ObjectKind,
    pub shape: ObjectShape,
}

/// One placement of a template on the field.
///
/// `position` is the top-left corner of the placed shape's bounding box.
/// Paddles additionally carry their lever angle pair, in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../bindings/")]
#[serde(rename_all = "camelCase")]
pub struct FieldObject {
    pub label: String,
    pub object_id: String,
    pub position: Vec2,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<Vec2>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle_degrees: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inactive_angle_degrees: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_angle_degrees: Option<f32>,
}

/// Pinball spawn template: one per board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../bindings/")]
#[serde(rename_all = "camelCase")]
pub struct PinballTemplate {
    pub position: Vec2,
    pub radius: f32,
    pub fill: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../bindings/")]
#[serde(rename_all = "camelCase")]
pub struct GameMapData {
    pub name: GameMapName,
    pub background_fill: String,
    pub bounds: Vec2,
    pub pinball: PinballTemplate,
    pub objects: Vec<GameMapObject>,
    pub field: Vec<FieldObject>,
}

impl GameMapData {
    /// Look up a template by id.
    pub fn object(&self, id: &str) -> Option<&GameMapObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    /// Look up a field placement by label.
    pub fn field_object(&self, label: &str) -> Option<&FieldObject> {
        self.field.iter().find(|f| f.label == label)
    }
}
