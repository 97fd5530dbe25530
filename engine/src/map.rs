//! Board construction from static map data.
//!
//! [`GameMap::load`] turns the value-object description into physics
//! bodies: each field placement instantiates its template's shape with the
//! material properties of its gameplay kind and registers a [`BodyTag`]
//! for collision dispatch. Paddles additionally get their lever
//! constraints wired up.

use std::collections::{HashMap, HashSet};

use rapier2d::prelude::*;
use thiserror::Error;
use tiltball_shared::map::{GameMapData, GameMapName, ObjectKind, ObjectShape};
use tiltball_shared::vec2::{degrees_to_radians, vec2, Vec2};

use crate::paddle::Paddle;
use crate::physics::{BodyTag, FieldKind, PhysicsWorld};

pub const BUMPER_RESTITUTION: f32 = 1.0;
pub const WALL_RESTITUTION: f32 = 0.0;
pub const PADDLE_RESTITUTION: f32 = 0.1;

/// Segments used when flattening one bezier curve of a path template.
const CURVE_SEGMENTS: usize = 12;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("field object \"{label}\" references unknown template \"{object_id}\"")]
    UnknownTemplate { label: String, object_id: String },
    #[error("paddle \"{label}\" is missing its active/inactive angle pair")]
    PaddleMissingAngles { label: String },
    #[error("shape for \"{label}\" is degenerate: {reason}")]
    InvalidShape { label: String, reason: String },
    #[error("invalid svg path in \"{label}\": {reason}")]
    InvalidPath { label: String, reason: String },
}

pub struct GameMap {
    pub name: GameMapName,
    pub data: GameMapData,
    pub paddles: HashMap<String, Paddle>,
    /// Labels of paddles currently held active by input.
    pub active_paddles: HashSet<String>,
    /// Static frame body the paddle pin joints attach to.
    ground: RigidBodyHandle,
}

impl GameMap {
    pub fn load(data: GameMapData, physics: &mut PhysicsWorld) -> Result<GameMap, MapError> {
        let ground = physics.insert_body(RigidBodyBuilder::fixed().build());
        let mut paddles = HashMap::new();

        for field in &data.field {
            let object = data
                .object(&field.object_id)
                .ok_or_else(|| MapError::UnknownTemplate {
                    label: field.label.clone(),
                    object_id: field.object_id.clone(),
                })?;
            let shape = build_shape(&object.shape, field.scale, &field.label)?;

            match &object.kind {
                ObjectKind::Paddle { anchor } => {
                    let paddle = Paddle::new(physics, ground, field, *anchor, shape)?;
                    paddles.insert(field.label.clone(), paddle);
                }
                kind => {
                    let (restitution, field_kind) = material(kind);
                    let aabb = shape.compute_local_aabb();
                    let translation = vec2(
                        field.position.x - aabb.mins.x,
                        field.position.y - aabb.mins.y,
                    );
                    let rotation = degrees_to_radians(field.angle_degrees.unwrap_or(0.0));

                    let body = physics.insert_body(
                        RigidBodyBuilder::fixed()
                            .translation(vector![translation.x, translation.y])
                            .rotation(rotation)
                            .build(),
                    );
                    physics.insert_collider(
                        ColliderBuilder::new(shape)
                            .restitution(restitution)
                            .friction(0.0)
                            .build(),
                        body,
                        Some(BodyTag::Field {
                            label: field.label.clone(),
                            kind: field_kind,
                        }),
                    );
                }
            }
        }

        tracing::debug!(map = %data.name, placements = data.field.len(), "map loaded");

        Ok(GameMap {
            name: data.name,
            data,
            paddles,
            active_paddles: HashSet::new(),
            ground,
        })
    }

    /// Sync paddle activation with the input set and advance their levers.
    pub fn update(&mut self, physics: &mut PhysicsWorld) {
        for (label, paddle) in self.paddles.iter_mut() {
            let should_be_active = self.active_paddles.contains(label);
            if should_be_active && !paddle.is_active {
                paddle.activate();
            } else if !should_be_active && paddle.is_active {
                paddle.deactivate();
            }
            paddle.update(physics);
        }
    }

    pub fn ground(&self) -> RigidBodyHandle {
        self.ground
    }
}

fn material(kind: &ObjectKind) -> (f32, FieldKind) {
    match kind {
        ObjectKind::Wall => (WALL_RESTITUTION, FieldKind::Wall),
        ObjectKind::Reset => (0.0, FieldKind::Reset),
        ObjectKind::RedeployBall => (0.0, FieldKind::RedeployBall),
        ObjectKind::Bumper { points } => (BUMPER_RESTITUTION, FieldKind::Bumper { points: *points }),
        // Paddles are handled separately.
        ObjectKind::Paddle { .. } => (PADDLE_RESTITUTION, FieldKind::Paddle),
    }
}

/// Build the (scaled) collider shape for a template.
pub(crate) fn build_shape(
    shape: &ObjectShape,
    scale: Option<Vec2>,
    label: &str,
) -> Result<SharedShape, MapError> {
    let s = scale.unwrap_or(vec2(1.0, 1.0));

    match shape {
        ObjectShape::Circle { radius } => Ok(SharedShape::ball(radius * s.x)),
        ObjectShape::Rectangle {
            width,
            height,
            chamfer_radius,
        } => {
            let hx = width * s.x / 2.0;
            let hy = height * s.y / 2.0;
            match chamfer_radius {
                Some(r) if *r > 0.0 && *r < hx && *r < hy => {
                    Ok(SharedShape::round_cuboid(hx - r, hy - r, *r))
                }
                _ => Ok(SharedShape::cuboid(hx, hy)),
            }
        }
        ObjectShape::Vertices { points } => {
            let scaled: Vec<Vec2> = points.iter().map(|p| vec2(p.x * s.x, p.y * s.y)).collect();
            polygon_shape(&scaled, label)
        }
        ObjectShape::Path { path } => {
            let points = flatten_svg_path(path).map_err(|reason| MapError::InvalidPath {
                label: label.to_string(),
                reason,
            })?;
            let scaled: Vec<Vec2> = points.iter().map(|p| vec2(p.x * s.x, p.y * s.y)).collect();
            polygon_shape(&scaled, label)
        }
    }
}

fn polygon_shape(points: &[Vec2], label: &str) -> Result<SharedShape, MapError> {
    if points.len() < 3 {
        return Err(MapError::InvalidShape {
            label: label.to_string(),
            reason: format!("polygon needs at least 3 vertices, got {}", points.len()),
        });
    }

    let vertices: Vec<Point<Real>> = points.iter().map(|p| point![p.x, p.y]).collect();
    let indices: Vec<[u32; 2]> = (0..vertices.len() as u32)
        .map(|i| [i, (i + 1) % vertices.len() as u32])
        .collect();

    Ok(SharedShape::convex_decomposition(&vertices, &indices))
}

/// Flatten SVG path data into a polygon outline.
///
/// Supports the command subset board templates are authored with:
/// M/L/H/V lines, Q/C beziers (sampled) and Z, in absolute or relative
/// form. Repeated coordinates after M are treated as line segments.
pub(crate) fn flatten_svg_path(path: &str) -> Result<Vec<Vec2>, String> {
    let mut points: Vec<Vec2> = Vec::new();
    let mut cursor = Vec2::ZERO;
    let mut command: Option<char> = None;

    let mut tokens = tokenize_path(path)?.into_iter();

    while let Some(token) = tokens.next() {
        let (cmd, first_number) = match token {
            PathToken::Command(c) => (c, None),
            PathToken::Number(n) => {
                // Implicit command repetition; M repeats as L.
                let cmd = match command {
                    Some('M') => 'L',
                    Some('m') => 'l',
                    Some(c) => c,
                    None => return Err("path starts with a number".to_string()),
                };
                (cmd, Some(n))
            }
        };
        command = Some(cmd);

        let mut next_number = |first: &mut Option<f32>| -> Result<f32, String> {
            if let Some(n) = first.take() {
                return Ok(n);
            }
            match tokens.next() {
                Some(PathToken::Number(n)) => Ok(n),
                _ => Err(format!("command '{cmd}' is missing coordinates")),
            }
        };
        let mut first = first_number;
        let relative = cmd.is_ascii_lowercase();
        let origin = if relative { cursor } else { Vec2::ZERO };

        match cmd.to_ascii_uppercase() {
            'M' | 'L' => {
                let x = next_number(&mut first)? + origin.x;
                let y = next_number(&mut first)? + origin.y;
                cursor = vec2(x, y);
                push_point(&mut points, cursor);
            }
            'H' => {
                let x = next_number(&mut first)? + origin.x;
                cursor = vec2(x, cursor.y);
                push_point(&mut points, cursor);
            }
            'V' => {
                let y = next_number(&mut first)? + origin.y;
                cursor = vec2(cursor.x, y);
                push_point(&mut points, cursor);
            }
            'Q' => {
                let c = vec2(
                    next_number(&mut first)? + origin.x,
                    next_number(&mut first)? + origin.y,
                );
                let end = vec2(
                    next_number(&mut first)? + origin.x,
                    next_number(&mut first)? + origin.y,
                );
                let start = cursor;
                for i in 1..=CURVE_SEGMENTS {
                    let t = i as f32 / CURVE_SEGMENTS as f32;
                    push_point(&mut points, quadratic_point(start, c, end, t));
                }
                cursor = end;
            }
            'C' => {
                let c1 = vec2(
                    next_number(&mut first)? + origin.x,
                    next_number(&mut first)? + origin.y,
                );
                let c2 = vec2(
                    next_number(&mut first)? + origin.x,
                    next_number(&mut first)? + origin.y,
                );
                let end = vec2(
                    next_number(&mut first)? + origin.x,
                    next_number(&mut first)? + origin.y,
                );
                let start = cursor;
                for i in 1..=CURVE_SEGMENTS {
                    let t = i as f32 / CURVE_SEGMENTS as f32;
                    push_point(&mut points, cubic_point(start, c1, c2, end, t));
                }
                cursor = end;
            }
            'Z' => {
                if let Some(&start) = points.first() {
                    cursor = start;
                }
            }
            other => return Err(format!("unsupported path command '{other}'")),
        }
    }

    // Drop an explicit closing point so the outline stays a simple ring.
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }

    Ok(points)
}

fn push_point(points: &mut Vec<Vec2>, p: Vec2) {
    if points.last() != Some(&p) {
        points.push(p);
    }
}

fn quadratic_point(start: Vec2, control: Vec2, end: Vec2, t: f32) -> Vec2 {
    let u = 1.0 - t;
    vec2(
        u * u * start.x + 2.0 * u * t * control.x + t * t * end.x,
        u * u * start.y + 2.0 * u * t * control.y + t * t * end.y,
    )
}

fn cubic_point(start: Vec2, c1: Vec2, c2: Vec2, end: Vec2, t: f32) -> Vec2 {
    let u = 1.0 - t;
    vec2(
        u * u * u * start.x + 3.0 * u * u * t * c1.x + 3.0 * u * t * t * c2.x + t * t * t * end.x,
        u * u * u * start.y + 3.0 * u * u * t * c1.y + 3.0 * u * t * t * c2.y + t * t * t * end.y,
    )
}

enum PathToken {
    Command(char),
    Number(f32),
}

fn tokenize_path(path: &str) -> Result<Vec<PathToken>, String> {
    let mut tokens = Vec::new();
    let mut chars = path.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() || c == ',' {
            chars.next();
        } else if c.is_ascii_alphabetic() {
            chars.next();
            tokens.push(PathToken::Command(c));
        } else {
            let mut number = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_ascii_digit() || d == '.' || d == 'e' || d == 'E' {
                    number.push(d);
                    chars.next();
                } else if (d == '-' || d == '+')
                    && (number.is_empty() || number.ends_with('e') || number.ends_with('E'))
                {
                    number.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            let value: f32 = number
                .parse()
                .map_err(|_| format!("invalid number \"{number}\""))?;
            tokens.push(PathToken::Number(value));
        }
    }

    Ok(tokens)
}
