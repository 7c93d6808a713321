//! World entities as reported by the remote server.
//!
//! Field names follow the server's PascalCase JSON. Optional fields carry
//! `#[serde(default)]` so older server plugins that omit them still decode.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{GridId, PlayerId, VoxelId};
use crate::vector::{Quaternion, Vec3};

// ---------------------------------------------------------------------------
// Grid
// ---------------------------------------------------------------------------

/// A grid: any ship, station, or loose block structure in the world.
///
/// Identity is [`Grid::id`]. Between polls the position, block count, and
/// powered flag change; everything else is effectively fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "PascalCase")]
#[ts(export, export_to = "bindings/")]
pub struct Grid {
    /// Entity id.
    pub id: GridId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Display name of the owning player.
    #[serde(default)]
    pub owner: String,
    /// Owning faction name.
    #[serde(default)]
    pub faction: String,
    /// Short faction tag.
    #[serde(default)]
    pub faction_tag: String,
    /// Number of blocks in the grid.
    #[serde(default)]
    pub blocks: u32,
    /// Whether any power source on the grid is producing.
    #[serde(default)]
    pub is_powered: bool,
    /// Block edge length in meters (0.5 small grid, 2.5 large grid).
    #[serde(default)]
    pub grid_size: f64,
    /// Whether the grid is a static (station) structure.
    #[serde(default)]
    pub is_static: bool,
    /// Whether the grid is parked.
    #[serde(default)]
    pub is_parked: bool,
    /// Id of the grid this one is mechanically attached to, if any.
    #[serde(default)]
    pub parent_id: String,
    /// Performance cost units consumed by the grid.
    #[serde(default, rename = "PCU")]
    pub pcu: u32,
    /// World-space position.
    #[serde(flatten)]
    pub position: Vec3,
    /// Server-side counter bumped whenever the grid's blocks change.
    #[serde(default)]
    pub last_blocks_update: Option<u64>,
}

impl Grid {
    /// One-line human-readable description used in logs and tooling.
    pub fn summary(&self) -> String {
        format!(
            "{} - Blocks: {} - Owner: {:?} - PCU: {}",
            self.name, self.blocks, self.owner, self.pcu
        )
    }
}

/// All grids belonging to one owner, with their block counts summed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "PascalCase")]
#[ts(export, export_to = "bindings/")]
pub struct GridGroup {
    /// Display name of the owner shared by every grid in the group.
    pub owner: String,
    /// Faction tag of the first grid seen for this owner.
    pub tag: String,
    /// Total blocks across the group.
    pub blocks: u32,
    /// The grids, in the order they were reported.
    pub grids: Vec<Grid>,
}

impl GridGroup {
    /// Group `grids` by owner.
    ///
    /// Groups appear in the order their owner was first seen.
    pub fn by_owner(grids: Vec<Grid>) -> Vec<Self> {
        let mut groups: Vec<Self> = Vec::new();
        for grid in grids {
            match groups.iter_mut().find(|group| group.owner == grid.owner) {
                Some(group) => {
                    group.blocks = group.blocks.saturating_add(grid.blocks);
                    group.grids.push(grid);
                }
                None => groups.push(Self {
                    owner: grid.owner.clone(),
                    tag: grid.faction_tag.clone(),
                    blocks: grid.blocks,
                    grids: vec![grid],
                }),
            }
        }
        groups
    }
}

/// A single block inside a grid.
///
/// Fetched separately from the grid list because a large grid can hold
/// thousands of blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "PascalCase")]
#[ts(export, export_to = "bindings/")]
pub struct GridBlock {
    /// Block definition type id (e.g. `MyObjectBuilder_Reactor`).
    #[serde(rename = "Type")]
    pub block_type: String,
    /// Block definition subtype (e.g. `LargeBlockSmallGenerator`).
    #[serde(default)]
    pub subtype: String,
    /// Position in grid-local block coordinates.
    #[serde(flatten)]
    pub position: Vec3,
    /// Structural integrity ratio, 0.0 to 1.0.
    #[serde(default)]
    pub integrity: f64,
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// A player identity known to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "PascalCase")]
#[ts(export, export_to = "bindings/")]
pub struct Player {
    /// Identity id.
    pub id: PlayerId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Faction tag, empty when unaffiliated.
    #[serde(default)]
    pub faction: String,
    /// Platform account id.
    #[serde(default)]
    pub steam_id: String,
    /// Whether the player is currently connected.
    #[serde(default)]
    pub is_online: bool,
    /// World-space position of the player's character.
    #[serde(flatten)]
    pub position: Vec3,
    /// Orientation of the player's character.
    #[serde(default)]
    pub rotation: Quaternion,
}

// ---------------------------------------------------------------------------
// Faction
// ---------------------------------------------------------------------------

/// A player faction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "PascalCase")]
#[ts(export, export_to = "bindings/")]
pub struct Faction {
    /// Short tag, unique per world.
    pub tag: String,
    /// Full name.
    #[serde(default)]
    pub name: String,
    /// Public description.
    #[serde(default)]
    pub description: String,
    /// Display names of the members.
    #[serde(default)]
    pub members: Vec<String>,
}

// ---------------------------------------------------------------------------
// Voxel
// ---------------------------------------------------------------------------

/// A voxel body: planet, moon, or asteroid. Static after the initial load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "PascalCase")]
#[ts(export, export_to = "bindings/")]
pub struct Voxel {
    /// Entity id.
    pub id: VoxelId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Internal storage name.
    #[serde(default)]
    pub debug_name: String,
    /// Center of the body in world space.
    #[serde(flatten)]
    pub position: Vec3,
    /// Orientation of the body.
    #[serde(default)]
    pub rotation: Quaternion,
    /// Diameter in meters.
    #[serde(default)]
    pub size: f64,
    /// Whether the body has an atmosphere.
    #[serde(default)]
    pub has_atmosphere: bool,
    /// Altitude of the atmosphere ceiling in meters.
    #[serde(default)]
    pub atmosphere_altitude: f64,
    /// Terrain hill range, reported as `[min, max]`.
    #[serde(default)]
    pub hill_parameters: Vec<f64>,
}

impl Voxel {
    /// The `(min, max)` hill range, if the server reported one.
    pub fn hill_range(&self) -> Option<(f64, f64)> {
        match self.hill_parameters.as_slice() {
            [min, max, ..] => Some((*min, *max)),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// Opaque server-assigned chat timestamp.
///
/// Used only as a continuation token when polling the chat feed. It is not
/// a wall-clock time and must not be interpreted as one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ChatTimestamp(pub String);

impl ChatTimestamp {
    /// Borrow the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A chat message from the server's global chat feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "PascalCase")]
#[ts(export, export_to = "bindings/")]
pub struct ChatMessage {
    /// Sender display name.
    pub display_name: String,
    /// Sender platform account id.
    #[serde(default, rename = "SteamID")]
    pub steam_id: u64,
    /// Message text.
    pub content: String,
    /// Continuation token for this message.
    #[serde(default)]
    pub timestamp: ChatTimestamp,
}

// ---------------------------------------------------------------------------
// Global info
// ---------------------------------------------------------------------------

/// Environment scalars that apply to the whole world.
///
/// The sun fields are required: a body without them is not a global info
/// response and must fail to decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "PascalCase")]
#[ts(export, export_to = "bindings/")]
pub struct GlobalInfo {
    /// Sun direction, X component (normalized).
    pub sun_normalized_x: f64,
    /// Sun direction, Y component (normalized).
    pub sun_normalized_y: f64,
    /// Sun direction, Z component (normalized).
    pub sun_normalized_z: f64,
    /// Sun light intensity.
    pub sun_intensity: f64,
    /// Small-grid linear speed limit in m/s.
    #[serde(default)]
    pub small_ship_max_speed: f64,
    /// Small-grid angular speed limit in rad/s.
    #[serde(default)]
    pub small_ship_max_angular_speed: f64,
    /// Large-grid linear speed limit in m/s.
    #[serde(default)]
    pub large_ship_max_speed: f64,
    /// Large-grid angular speed limit in rad/s.
    #[serde(default)]
    pub large_ship_max_angular_speed: f64,
}

impl GlobalInfo {
    /// The normalized sun direction as a vector.
    pub const fn sun_direction(&self) -> Vec3 {
        Vec3::new(
            self.sun_normalized_x,
            self.sun_normalized_y,
            self.sun_normalized_z,
        )
    }

    /// Whether the sun parameters differ from `previous`.
    ///
    /// Only the sun intensity and direction are compared. Speed limits are
    /// deliberately ignored: a change to them alone does not count.
    #[allow(clippy::float_cmp)]
    pub fn changed_since(&self, previous: &Self) -> bool {
        self.sun_intensity != previous.sun_intensity
            || self.sun_normalized_x != previous.sun_normalized_x
            || self.sun_normalized_y != previous.sun_normalized_y
            || self.sun_normalized_z != previous.sun_normalized_z
    }
}
