//! Built-in board layouts.
//!
//! Boards are authored in code as [`GameMapData`] values. Coordinates are
//! pixels, y down, origin at the board's top-left corner.

use crate::map::{
    FieldObject, GameMapData, GameMapName, GameMapObject, ObjectKind, ObjectShape, PinballTemplate,
};
use crate::vec2::{vec2, Vec2};

pub const PADDLE_BOTTOM_LEFT: &str = "paddle_bottom_left";
pub const PADDLE_BOTTOM_RIGHT: &str = "paddle_bottom_right";

const BOARD_BOUNDS: Vec2 = Vec2 { x: 540.0, y: 960.0 };

/// Return the built-in board for a map name.
pub fn game_map(name: GameMapName) -> GameMapData {
    match name {
        GameMapName::Singleplayer => board(name, "#1d1d2b", 2),
        GameMapName::Multiplayer => board(name, "#10101c", 3),
    }
}

fn field(label: &str, object_id: &str, position: Vec2) -> FieldObject {
    FieldObject {
        label: label.to_string(),
        object_id: object_id.to_string(),
        position,
        scale: None,
        angle_degrees: None,
        fill: None,
        alpha: None,
        inactive_angle_degrees: None,
        active_angle_degrees: None,
    }
}

fn paddle_field(label: &str, position: Vec2, inactive: f32, active: f32) -> FieldObject {
    FieldObject {
        inactive_angle_degrees: Some(inactive),
        active_angle_degrees: Some(active),
        ..field(label, "paddle", position)
    }
}

fn board(name: GameMapName, background_fill: &str, bumpers: usize) -> GameMapData {
    let objects = vec![
        GameMapObject {
            id: "wall_side".to_string(),
            kind: ObjectKind::Wall,
            shape: ObjectShape::Rectangle {
                width: 20.0,
                height: 960.0,
                chamfer_radius: None,
            },
        },
        GameMapObject {
            id: "wall_top".to_string(),
            kind: ObjectKind::Wall,
            shape: ObjectShape::Rectangle {
                width: 540.0,
                height: 20.0,
                chamfer_radius: None,
            },
        },
        // Slanted guides funneling the ball toward the paddles.
        GameMapObject {
            id: "guide_left".to_string(),
            kind: ObjectKind::Wall,
            shape: ObjectShape::Vertices {
                points: vec![vec2(0.0, 0.0), vec2(120.0, 90.0), vec2(0.0, 90.0)],
            },
        },
        GameMapObject {
            id: "guide_right".to_string(),
            kind: ObjectKind::Wall,
            shape: ObjectShape::Vertices {
                points: vec![vec2(120.0, 0.0), vec2(120.0, 90.0), vec2(0.0, 90.0)],
            },
        },
        GameMapObject {
            id: "bumper_small".to_string(),
            kind: ObjectKind::Bumper { points: 100 },
            shape: ObjectShape::Circle { radius: 28.0 },
        },
        // Dome bumper traced as an SVG path; the engine flattens it.
        GameMapObject {
            id: "bumper_dome".to_string(),
            kind: ObjectKind::Bumper { points: 150 },
            shape: ObjectShape::Path {
                path: "M 0 48 Q 48 -48 96 48 Z".to_string(),
            },
        },
        GameMapObject {
            id: "paddle".to_string(),
            kind: ObjectKind::Paddle {
                anchor: vec2(10.0, 10.0),
            },
            shape: ObjectShape::Rectangle {
                width: 96.0,
                height: 20.0,
                chamfer_radius: Some(8.0),
            },
        },
        GameMapObject {
            id: "reset_floor".to_string(),
            kind: ObjectKind::Reset,
            shape: ObjectShape::Rectangle {
                width: 540.0,
                height: 40.0,
                chamfer_radius: None,
            },
        },
        GameMapObject {
            id: "kicker".to_string(),
            kind: ObjectKind::RedeployBall,
            shape: ObjectShape::Circle { radius: 22.0 },
        },
    ];

    let mut placements = vec![
        field("wall_left", "wall_side", vec2(0.0, 0.0)),
        field("wall_right", "wall_side", vec2(520.0, 0.0)),
        field("wall_top", "wall_top", vec2(0.0, 0.0)),
        field("guide_left", "guide_left", vec2(20.0, 770.0)),
        field("guide_right", "guide_right", vec2(400.0, 770.0)),
        paddle_field(PADDLE_BOTTOM_LEFT, vec2(120.0, 850.0), 25.0, -25.0),
        paddle_field(PADDLE_BOTTOM_RIGHT, vec2(400.0, 850.0), 155.0, 205.0),
        field("reset_floor", "reset_floor", vec2(0.0, 930.0)),
        field("kicker_left", "kicker", vec2(60.0, 560.0)),
        field("bumper_dome", "bumper_dome", vec2(222.0, 120.0)),
    ];

    let bumper_spots = [vec2(130.0, 300.0), vec2(354.0, 300.0), vec2(242.0, 420.0)];
    for (i, spot) in bumper_spots.iter().take(bumpers).enumerate() {
        placements.push(field(&format!("bumper_{}", i + 1), "bumper_small", *spot));
    }

    GameMapData {
        name,
        background_fill: background_fill.to_string(),
        bounds: BOARD_BOUNDS,
        pinball: PinballTemplate {
            position: vec2(254.0, 700.0),
            radius: 16.0,
            fill: "#f2f2f2".to_string(),
        },
        objects,
        field: placements,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_maps_have_unique_labels() {
        for name in [GameMapName::Singleplayer, GameMapName::Multiplayer] {
            let map = game_map(name);
            let mut labels: Vec<_> = map.field.iter().map(|f| f.label.clone()).collect();
            labels.sort();
            let before = labels.len();
            labels.dedup();
            assert_eq!(before, labels.len(), "duplicate label in {name}");
        }
    }

    #[test]
    fn multiplayer_board_has_more_bumpers() {
        let count = |name| {
            game_map(name)
                .field
                .iter()
                .filter(|f| f.object_id == "bumper_small")
                .count()
        };
        assert!(count(GameMapName::Multiplayer) > count(GameMapName::Singleplayer));
    }

    #[test]
    fn pinball_spawns_inside_bounds() {
        let map = game_map(GameMapName::Multiplayer);
        let p = map.pinball.position;
        assert!(p.x > 0.0 && p.x < map.bounds.x);
        assert!(p.y > 0.0 && p.y < map.bounds.y);
    }
}
