//! Typed endpoint helpers.
//!
//! Each helper fixes the method, resource path, query parameters, and
//! [`ResponseShape`] of one server endpoint, then decodes the body into the
//! entity types from `spacelab-types`.

use serde::de::DeserializeOwned;
use spacelab_types::{
    ChatMessage, ChatTimestamp, Faction, GlobalInfo, Grid, GridBlock, GridGroup, GridId, Player,
    Voxel,
};
use tracing::debug;

use crate::client::SpaceApi;
use crate::decode::{ResponseShape, decode};
use crate::error::ApiError;
use crate::signer::QueryParams;

// ---------------------------------------------------------------------------
// Resource paths (relative to the path prefix)
// ---------------------------------------------------------------------------

/// Liveness probe.
pub const PING: &str = "/v1/server/ping";
/// All grids.
pub const GRIDS: &str = "/info/grids";
/// Blocks of one grid (`GridId` query parameter).
pub const GRID_BLOCKS: &str = "/info/grids/blocks";
/// All players.
pub const PLAYERS: &str = "/info/players";
/// All factions.
pub const FACTIONS: &str = "/info/factions";
/// All voxels (planets, asteroids).
pub const VOXELS: &str = "/info/voxels";
/// World-wide environment scalars.
pub const GLOBAL_INFO: &str = "/info/global";
/// Global chat feed; `POST` sends a message.
pub const CHAT: &str = "/v1/session/chat";
/// Grid management; `DELETE {GRIDS_SESSION}/{id}` removes a grid.
pub const GRIDS_SESSION: &str = "/v1/session/grids";

/// Envelope key holding chat messages.
const MESSAGES_KEY: &str = "Messages";

impl SpaceApi {
    /// Probe the server. The body is ignored.
    ///
    /// # Errors
    ///
    /// Any transport or status error from the request.
    pub async fn ping(&self) -> Result<(), ApiError> {
        self.get(PING, &QueryParams::new()).await?;
        Ok(())
    }

    /// Every grid currently in the world.
    pub async fn grids(&self) -> Result<Vec<Grid>, ApiError> {
        self.fetch(GRIDS, &QueryParams::new(), ResponseShape::Bare)
            .await
    }

    /// Every grid, grouped by owner with summed block counts.
    pub async fn grid_groups(&self) -> Result<Vec<GridGroup>, ApiError> {
        Ok(GridGroup::by_owner(self.grids().await?))
    }

    /// The block list of one grid.
    pub async fn grid_blocks(&self, id: &GridId) -> Result<Vec<GridBlock>, ApiError> {
        let mut params = QueryParams::new();
        params.insert("GridId".to_owned(), id.as_str().to_owned());
        self.fetch(GRID_BLOCKS, &params, ResponseShape::Bare).await
    }

    /// Every player known to the server, online or not.
    pub async fn players(&self) -> Result<Vec<Player>, ApiError> {
        self.fetch(PLAYERS, &QueryParams::new(), ResponseShape::Bare)
            .await
    }

    /// Every faction in the world.
    pub async fn factions(&self) -> Result<Vec<Faction>, ApiError> {
        self.fetch(FACTIONS, &QueryParams::new(), ResponseShape::Bare)
            .await
    }

    /// Every voxel body (planets and asteroids).
    pub async fn voxels(&self) -> Result<Vec<Voxel>, ApiError> {
        self.fetch(VOXELS, &QueryParams::new(), ResponseShape::Bare)
            .await
    }

    /// The current environment scalars.
    pub async fn global_info(&self) -> Result<GlobalInfo, ApiError> {
        self.fetch(GLOBAL_INFO, &QueryParams::new(), ResponseShape::Bare)
            .await
    }

    /// Up to `count` chat messages newer than `since`.
    ///
    /// With no token the server returns its most recent messages.
    pub async fn chat(
        &self,
        since: Option<&ChatTimestamp>,
        count: u32,
    ) -> Result<Vec<ChatMessage>, ApiError> {
        let mut params = QueryParams::new();
        if let Some(token) = since.filter(|t| !t.as_str().is_empty()) {
            params.insert("Date".to_owned(), token.as_str().to_owned());
        }
        params.insert("MessageCount".to_owned(), count.to_string());
        self.fetch(
            CHAT,
            &params,
            ResponseShape::Envelope { key: MESSAGES_KEY },
        )
        .await
    }

    /// Post `text` to global chat.
    ///
    /// Not retried; the caller sees the failure.
    pub async fn send_message(&self, text: &str) -> Result<(), ApiError> {
        let body =
            serde_json::to_string(text).map_err(|source| ApiError::Encode { source })?;
        self.post(CHAT, &QueryParams::new(), body).await?;
        Ok(())
    }

    /// Remove a grid from the world.
    ///
    /// The id is percent-encoded as one path segment. Not retried; the
    /// caller sees the failure.
    pub async fn delete_grid(&self, id: &GridId) -> Result<(), ApiError> {
        let resource = format!("{GRIDS_SESSION}/{}", urlencoding::encode(id.as_str()));
        self.delete(&resource, &QueryParams::new()).await?;
        Ok(())
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        resource: &str,
        params: &QueryParams,
        shape: ResponseShape,
    ) -> Result<T, ApiError> {
        let body = self.get(resource, params).await?;
        debug!(resource, bytes = body.len(), "Decoding response");
        decode(&body, shape)
    }
}
