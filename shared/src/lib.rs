//! Types shared between the tiltball engine, client and server:
//! map data value objects, the wire protocol and small math helpers.

pub mod map;
pub mod maps;
pub mod protocol;
pub mod vec2;

pub use map::{FieldObject, GameMapData, GameMapName, GameMapObject, ObjectKind, ObjectShape};
pub use protocol::{GameEvent, GameEventData, PlayerId, RoomState};
pub use vec2::Vec2;
