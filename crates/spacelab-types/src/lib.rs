//! Shared type definitions for `SpaceLab` world tracking.
//!
//! This crate is the single source of truth for the entities polled from the
//! remote server and the change events derived from them. Types flow
//! downstream to `TypeScript` via `ts-rs` for the web viewer.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe wrappers for the server's string ids
//! - [`vector`] -- [`Vec3`] positions and [`Quaternion`] orientations
//! - [`entities`] -- Grids, blocks, players, factions, voxels, chat, global info
//! - [`events`] -- Typed change events and their topics

pub mod entities;
pub mod events;
pub mod ids;
pub mod vector;

// Re-export all public types at crate root for convenience.
pub use entities::{
    ChatMessage, ChatTimestamp, Faction, GlobalInfo, Grid, GridBlock, GridGroup, Player, Voxel,
};
pub use events::{Event, GridUpdate, PlayerUpdate, Topic};
pub use ids::{GridId, PlayerId, VoxelId};
pub use vector::{Quaternion, Vec3};
