//! The seam between the engine and the remote server.
//!
//! The engine only ever reads through [`WorldSource`]. [`SpaceApi`] is the
//! production implementation; tests substitute a scripted world.

use std::future::Future;

use spacelab_api::{ApiError, SpaceApi};
use spacelab_types::{ChatMessage, ChatTimestamp, GlobalInfo, Grid, GridBlock, GridId, Player, Voxel};

/// Read access to the remote world's full state.
///
/// Every method returns the complete current list for its entity class;
/// the engine derives changes by comparing successive results.
pub trait WorldSource: Send + Sync + 'static {
    /// Every grid in the world.
    fn grids(&self) -> impl Future<Output = Result<Vec<Grid>, ApiError>> + Send;

    /// The blocks of one grid.
    fn grid_blocks(
        &self,
        id: &GridId,
    ) -> impl Future<Output = Result<Vec<GridBlock>, ApiError>> + Send;

    /// Every player, online or not.
    fn players(&self) -> impl Future<Output = Result<Vec<Player>, ApiError>> + Send;

    /// Every voxel body.
    fn voxels(&self) -> impl Future<Output = Result<Vec<Voxel>, ApiError>> + Send;

    /// The current environment scalars.
    fn global_info(&self) -> impl Future<Output = Result<GlobalInfo, ApiError>> + Send;

    /// Up to `count` chat messages newer than `since`.
    fn chat(
        &self,
        since: Option<&ChatTimestamp>,
        count: u32,
    ) -> impl Future<Output = Result<Vec<ChatMessage>, ApiError>> + Send;
}

impl WorldSource for SpaceApi {
    async fn grids(&self) -> Result<Vec<Grid>, ApiError> {
        Self::grids(self).await
    }

    async fn grid_blocks(&self, id: &GridId) -> Result<Vec<GridBlock>, ApiError> {
        Self::grid_blocks(self, id).await
    }

    async fn players(&self) -> Result<Vec<Player>, ApiError> {
        Self::players(self).await
    }

    async fn voxels(&self) -> Result<Vec<Voxel>, ApiError> {
        Self::voxels(self).await
    }

    async fn global_info(&self) -> Result<GlobalInfo, ApiError> {
        Self::global_info(self).await
    }

    async fn chat(
        &self,
        since: Option<&ChatTimestamp>,
        count: u32,
    ) -> Result<Vec<ChatMessage>, ApiError> {
        Self::chat(self, since, count).await
    }
}
