//! The notification engine.
//!
//! A [`Notifier`] owns the snapshot stores, the [`EventBus`], and one
//! background task that polls the [`WorldSource`] at a fixed interval. Each
//! tick runs these steps in order:
//!
//! 1. **Global info** -- publish if the sun parameters changed.
//! 2. **Chat** -- publish messages newer than the continuation token.
//! 3. **Grids** -- reconcile, refresh block lists, publish changes.
//! 4. **Players** -- reconcile, publish changes.
//!
//! A fetch failure skips that step for the tick and leaves its store
//! untouched. The other steps still run, and the next tick retries.
//!
//! # Lifecycle
//!
//! `Stopped -> Running -> Stopped`. [`Notifier::start`] loads the voxel
//! bodies (a failure there is fatal) and spawns the task.
//! [`Notifier::stop`] signals the task and waits for it to exit, so no tick
//! is in flight once it returns.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use spacelab_api::{ApiError, SpaceApi};
use spacelab_types::{
    ChatMessage, ChatTimestamp, Event, GlobalInfo, Grid, GridBlock, GridId, GridUpdate, Player,
    PlayerId, PlayerUpdate, Topic, Voxel, VoxelId,
};
use tokio::sync::{Mutex, Notify, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::bus::{EventBus, SubscriptionHandle};
use crate::config::{EngineConfig, NotifyConfig};
use crate::error::NotifyError;
use crate::reconcile::{
    Changes, grid_is_tracked, needs_block_refresh, player_is_tracked, reconcile,
};
use crate::source::WorldSource;
use crate::store::Store;

/// Counts of changes derived for one entity class in one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeCounts {
    /// Entities seen for the first time.
    pub appeared: usize,
    /// Entities that moved past the threshold.
    pub updated: usize,
    /// Entities that are gone.
    pub disappeared: usize,
}

impl<T> From<&Changes<T>> for ChangeCounts {
    fn from(changes: &Changes<T>) -> Self {
        Self {
            appeared: changes.appeared.len(),
            updated: changes.updated.len(),
            disappeared: changes.disappeared.len(),
        }
    }
}

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Whether a global info event was published.
    pub global_info_changed: bool,
    /// Chat messages published.
    pub chat_messages: usize,
    /// Grid changes.
    pub grids: ChangeCounts,
    /// Grids whose block lists were fetched.
    pub block_refreshes: usize,
    /// Player changes.
    pub players: ChangeCounts,
    /// Steps whose fetch failed (`"global_info"`, `"chat"`, `"grids"`,
    /// `"players"`).
    pub failed: Vec<&'static str>,
}

/// Engine-private cursors carried between ticks.
#[derive(Debug, Default)]
struct TickState {
    /// Continuation token for the chat feed.
    chat_token: Option<ChatTimestamp>,
    /// Content of the last chat message seen.
    chat_marker: Option<String>,
    /// Block counter at the last successful block fetch, per grid.
    block_cursors: BTreeMap<GridId, u64>,
}

struct Inner<S> {
    source: S,
    config: EngineConfig,
    bus: EventBus,
    grids: Store<GridId, Grid>,
    players: Store<PlayerId, Player>,
    planets: Store<VoxelId, Voxel>,
    blocks: Store<GridId, Vec<GridBlock>>,
    global_info: RwLock<Option<GlobalInfo>>,
    /// Held for a whole tick; serialises manual refreshes with the loop.
    tick_state: Mutex<TickState>,
}

/// Stop signal for one run of the background task.
///
/// Created fresh by every `start`, so a wake-up left over from an earlier
/// `stop` can never cut short the first sleep of the next run.
#[derive(Debug, Default)]
struct RunControl {
    stop_requested: AtomicBool,
    wake: Notify,
}

impl RunControl {
    fn signal(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.wake.notify_one();
    }

    fn stopping(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }
}

struct Running {
    handle: JoinHandle<()>,
    control: Arc<RunControl>,
}

impl Running {
    fn is_alive(&self) -> bool {
        !self.handle.is_finished()
    }
}

/// Polls the remote world and publishes change events.
pub struct Notifier<S: WorldSource = SpaceApi> {
    inner: Arc<Inner<S>>,
    task: Mutex<Option<Running>>,
}

impl Notifier<SpaceApi> {
    /// Connect to the remote API described by `config` and build a stopped
    /// notifier on top of it.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Config`] for an invalid configuration, or
    /// [`NotifyError::Connect`] if the client cannot be built or the server
    /// does not answer the liveness probe.
    pub async fn connect(config: &NotifyConfig) -> Result<Self, NotifyError> {
        config.validate()?;
        let api = SpaceApi::connect(&config.api)
            .await
            .map_err(|source| NotifyError::Connect { source })?;
        Ok(Self::new(api, config.engine.clone()))
    }
}

impl<S: WorldSource> Notifier<S> {
    /// A stopped notifier reading from `source`.
    pub fn new(source: S, config: EngineConfig) -> Self {
        let bus = EventBus::new(config.slow_subscriber_warn());
        Self {
            inner: Arc::new(Inner {
                source,
                config,
                bus,
                grids: Store::new(),
                players: Store::new(),
                planets: Store::new(),
                blocks: Store::new(),
                global_info: RwLock::new(None),
                tick_state: Mutex::new(TickState::default()),
            }),
            task: Mutex::new(None),
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Load the voxel bodies and start polling.
    ///
    /// Does nothing if already running.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Bootstrap`] if the voxel fetch fails. The
    /// notifier stays stopped.
    pub async fn start(&self) -> Result<(), NotifyError> {
        let mut task = self.task.lock().await;
        if task.as_ref().is_some_and(Running::is_alive) {
            debug!("Notifier already running");
            return Ok(());
        }

        let planets = self
            .inner
            .load_planets()
            .await
            .map_err(|source| NotifyError::Bootstrap { source })?;

        let control = Arc::new(RunControl::default());
        let handle = tokio::spawn(run(Arc::clone(&self.inner), Arc::clone(&control)));
        *task = Some(Running { handle, control });

        info!(
            planets,
            tick_interval_ms = self.inner.config.tick_interval_ms,
            "Notifier started"
        );
        Ok(())
    }

    /// Stop polling and wait for the background task to exit.
    ///
    /// Does nothing if not running. Stores and subscriptions are kept, so
    /// the notifier can be started again.
    pub async fn stop(&self) {
        let Some(running) = self.task.lock().await.take() else {
            return;
        };
        running.control.signal();

        if let Err(e) = running.handle.await {
            error!(error = %e, "Notifier task ended abnormally");
        }
        info!("Notifier stopped");
    }

    /// Whether the background task is running.
    pub async fn is_running(&self) -> bool {
        self.task
            .lock()
            .await
            .as_ref()
            .is_some_and(Running::is_alive)
    }

    /// Run one tick now, whether or not the background task is running.
    ///
    /// Waits for an in-flight tick to finish first.
    pub async fn refresh(&self) -> TickSummary {
        self.inner.tick().await
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    /// Every tracked grid, keyed by id.
    pub async fn current_grids(&self) -> BTreeMap<GridId, Grid> {
        self.inner.grids.snapshot().await
    }

    /// Every tracked (online) player, keyed by id.
    pub async fn current_players(&self) -> BTreeMap<PlayerId, Player> {
        self.inner.players.snapshot().await
    }

    /// Every voxel body loaded at start, keyed by id.
    pub async fn current_planets(&self) -> BTreeMap<VoxelId, Voxel> {
        self.inner.planets.snapshot().await
    }

    /// The block list of a tracked grid, if it has been fetched.
    pub async fn grid_blocks(&self, id: &GridId) -> Option<Vec<GridBlock>> {
        self.inner.blocks.get(id).await
    }

    /// The latest global info, if any fetch has succeeded.
    pub async fn global_info(&self) -> Option<GlobalInfo> {
        *self.inner.global_info.read().await
    }

    // -----------------------------------------------------------------------
    // Subscriptions
    // -----------------------------------------------------------------------

    /// The underlying event bus.
    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    /// Receive every event on `topic`.
    pub fn subscribe<F>(&self, topic: Topic, callback: F) -> SubscriptionHandle
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.inner.bus.subscribe(topic, callback)
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool {
        self.inner.bus.unsubscribe(handle)
    }

    /// Receive grid appear/update/disappear events.
    pub fn subscribe_grid_updates<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&GridUpdate) + Send + Sync + 'static,
    {
        self.subscribe(Topic::GridUpdate, move |event| {
            if let Event::GridUpdate(update) = event {
                callback(update);
            }
        })
    }

    /// Receive player appear/update/disappear events.
    pub fn subscribe_player_updates<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&PlayerUpdate) + Send + Sync + 'static,
    {
        self.subscribe(Topic::PlayerUpdate, move |event| {
            if let Event::PlayerUpdate(update) = event {
                callback(update);
            }
        })
    }

    /// Receive new chat messages.
    pub fn subscribe_chat<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&ChatMessage) + Send + Sync + 'static,
    {
        self.subscribe(Topic::ChatMessage, move |event| {
            if let Event::ChatMessage(message) = event {
                callback(message);
            }
        })
    }

    /// Receive global info changes.
    pub fn subscribe_global_info<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&GlobalInfo) + Send + Sync + 'static,
    {
        self.subscribe(Topic::GlobalInfo, move |event| {
            if let Event::GlobalInfo(info) = event {
                callback(info);
            }
        })
    }
}

impl<S: WorldSource> Drop for Notifier<S> {
    fn drop(&mut self) {
        // The task holds its own Arc; make sure it exits.
        if let Some(running) = self.task.get_mut() {
            running.control.signal();
        }
    }
}

impl<S: WorldSource> core::fmt::Debug for Notifier<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Notifier")
            .field("config", &self.inner.config)
            .field("bus", &self.inner.bus)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Background task
// ---------------------------------------------------------------------------

async fn run<S: WorldSource>(inner: Arc<Inner<S>>, control: Arc<RunControl>) {
    let interval = inner.config.tick_interval();
    while !control.stopping() {
        let summary = inner.tick().await;
        debug!(
            global_info_changed = summary.global_info_changed,
            chat = summary.chat_messages,
            grids_new = summary.grids.appeared,
            grids_updated = summary.grids.updated,
            grids_deleted = summary.grids.disappeared,
            block_refreshes = summary.block_refreshes,
            players_new = summary.players.appeared,
            players_updated = summary.players.updated,
            players_deleted = summary.players.disappeared,
            failed = ?summary.failed,
            "Tick complete"
        );

        if control.stopping() {
            break;
        }
        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            () = control.wake.notified() => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Tick steps
// ---------------------------------------------------------------------------

impl<S: WorldSource> Inner<S> {
    async fn tick(&self) -> TickSummary {
        let mut state = self.tick_state.lock().await;
        let mut summary = TickSummary::default();

        match self.refresh_global_info().await {
            Ok(changed) => summary.global_info_changed = changed,
            Err(()) => summary.failed.push("global_info"),
        }
        match self.refresh_chat(&mut state).await {
            Ok(count) => summary.chat_messages = count,
            Err(()) => summary.failed.push("chat"),
        }
        match self.refresh_grids(&mut state).await {
            Ok((counts, refreshed)) => {
                summary.grids = counts;
                summary.block_refreshes = refreshed;
            }
            Err(()) => summary.failed.push("grids"),
        }
        match self.refresh_players().await {
            Ok(counts) => summary.players = counts,
            Err(()) => summary.failed.push("players"),
        }

        summary
    }

    async fn load_planets(&self) -> Result<usize, ApiError> {
        let voxels = self.source.voxels().await?;
        let count = voxels.len();
        let planets = voxels.into_iter().map(|v| (v.id.clone(), v)).collect();
        self.planets.replace(planets).await;
        Ok(count)
    }

    /// Publishes on the first successful fetch and whenever the sun
    /// parameters differ from the stored value.
    async fn refresh_global_info(&self) -> Result<bool, ()> {
        let info = self.source.global_info().await.map_err(|e| {
            error!(error = %e, "Failed to fetch global info");
        })?;

        let changed = {
            let mut current = self.global_info.write().await;
            let changed = current
                .as_ref()
                .is_none_or(|previous| info.changed_since(previous));
            *current = Some(info);
            changed
        };

        if changed {
            debug!(
                sun_intensity = info.sun_intensity,
                sun_direction = ?info.sun_direction(),
                "Global info changed"
            );
            self.bus.publish(&Event::GlobalInfo(info));
        }
        Ok(changed)
    }

    async fn refresh_chat(&self, state: &mut TickState) -> Result<usize, ()> {
        let messages = self
            .source
            .chat(state.chat_token.as_ref(), self.config.chat_batch_size)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch chat");
            })?;

        let Some(last) = messages.last() else {
            return Ok(0);
        };

        let fresh: Vec<&ChatMessage> = messages
            .iter()
            .filter(|m| state.chat_marker.as_deref() != Some(m.content.as_str()))
            .collect();
        for message in &fresh {
            info!(
                sender = %message.display_name,
                content = %message.content,
                "Chat message"
            );
            self.bus.publish(&Event::ChatMessage((*message).clone()));
        }

        state.chat_token = Some(last.timestamp.clone());
        state.chat_marker = Some(last.content.clone());
        Ok(fresh.len())
    }

    async fn refresh_grids(&self, state: &mut TickState) -> Result<(ChangeCounts, usize), ()> {
        let fetched = self.source.grids().await.map_err(|e| {
            error!(error = %e, "Failed to fetch grids");
        })?;

        let min_blocks = self.config.min_grid_blocks;
        let include = |grid: &Grid| grid_is_tracked(grid, min_blocks);
        let counters: Vec<(GridId, Option<u64>)> = fetched
            .iter()
            .filter(|&g| include(g))
            .map(|g| (g.id.clone(), g.last_blocks_update))
            .collect();

        let threshold = self.config.min_move_distance_sq;
        let changes = self
            .grids
            .update(|stored| reconcile(stored, fetched, include, threshold))
            .await;

        // Block lists go with their grid.
        let gone: Vec<&GridId> = changes.disappeared.iter().map(|g| &g.id).collect();
        for id in &gone {
            state.block_cursors.remove(*id);
        }
        self.blocks.remove_all(gone).await;

        let refreshed = self.refresh_blocks(state, counters).await;

        for grid in &changes.appeared {
            info!(grid_id = %grid.id, grid = %grid.summary(), "Grid appeared");
            self.bus
                .publish(&Event::GridUpdate(GridUpdate::appeared(grid.clone())));
        }
        for grid in &changes.updated {
            debug!(grid_id = %grid.id, position = ?grid.position, "Grid moved");
            self.bus
                .publish(&Event::GridUpdate(GridUpdate::updated(grid.clone())));
        }
        for grid in &changes.disappeared {
            info!(grid_id = %grid.id, grid = %grid.summary(), "Grid disappeared");
            self.bus
                .publish(&Event::GridUpdate(GridUpdate::disappeared(grid.clone())));
        }

        Ok((ChangeCounts::from(&changes), refreshed))
    }

    /// Fetch block lists for grids that never had them or whose block
    /// counter advanced past the configured delta. Failures are retried on a
    /// later tick because the cursor is only advanced on success.
    async fn refresh_blocks(
        &self,
        state: &mut TickState,
        counters: Vec<(GridId, Option<u64>)>,
    ) -> usize {
        let delta = self.config.blocks_refresh_delta;
        let mut refreshed = Vec::new();

        for (id, reported) in counters {
            let last = state.block_cursors.get(&id).copied();
            if !needs_block_refresh(last, reported, delta) {
                continue;
            }
            match self.source.grid_blocks(&id).await {
                Ok(blocks) => {
                    debug!(grid_id = %id, blocks = blocks.len(), "Grid blocks fetched");
                    self.blocks.insert(id.clone(), blocks).await;
                    state.block_cursors.insert(id.clone(), reported.unwrap_or(0));
                    refreshed.push(id);
                }
                Err(e) => {
                    warn!(grid_id = %id, error = %e, "Failed to fetch grid blocks");
                }
            }
        }
        refreshed.len()
    }

    async fn refresh_players(&self) -> Result<ChangeCounts, ()> {
        let fetched = self.source.players().await.map_err(|e| {
            error!(error = %e, "Failed to fetch players");
        })?;

        let threshold = self.config.min_move_distance_sq;
        let changes = self
            .players
            .update(|stored| reconcile(stored, fetched, player_is_tracked, threshold))
            .await;

        for player in &changes.appeared {
            info!(player_id = %player.id, name = %player.name, "Player appeared");
            self.bus
                .publish(&Event::PlayerUpdate(PlayerUpdate::appeared(player.clone())));
        }
        for player in &changes.updated {
            debug!(player_id = %player.id, position = ?player.position, "Player moved");
            self.bus
                .publish(&Event::PlayerUpdate(PlayerUpdate::updated(player.clone())));
        }
        for player in &changes.disappeared {
            info!(player_id = %player.id, name = %player.name, "Player disappeared");
            self.bus
                .publish(&Event::PlayerUpdate(PlayerUpdate::disappeared(player.clone())));
        }

        Ok(ChangeCounts::from(&changes))
    }
}
