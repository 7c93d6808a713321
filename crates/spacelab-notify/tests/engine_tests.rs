//! Integration tests for the notification engine.
//!
//! The engine is driven against a scripted in-memory world. Most tests call
//! [`Notifier::refresh`] directly so each tick is deterministic; the
//! lifecycle tests run the real background task with a short interval.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use spacelab_api::ApiError;
use spacelab_notify::{EngineConfig, Notifier, NotifyError, WorldSource};
use spacelab_types::{
    ChatMessage, ChatTimestamp, Event, GlobalInfo, Grid, GridBlock, GridId, Player, PlayerId,
    Quaternion, Topic, Vec3, Voxel, VoxelId,
};

// ---------------------------------------------------------------------------
// Scripted world
// ---------------------------------------------------------------------------

#[derive(Default)]
struct World {
    grids: Vec<Grid>,
    players: Vec<Player>,
    voxels: Vec<Voxel>,
    global: GlobalInfo,
    chat_batches: VecDeque<Vec<ChatMessage>>,
    failing: BTreeSet<&'static str>,
    calls: BTreeMap<&'static str, usize>,
    chat_requests: Vec<Option<String>>,
    block_requests: Vec<GridId>,
    /// Delay before the grid fetch answers.
    grid_latency: Duration,
}

#[derive(Clone, Default)]
struct ScriptedSource {
    world: Arc<Mutex<World>>,
}

impl ScriptedSource {
    fn edit(&self, f: impl FnOnce(&mut World)) {
        f(&mut self.world.lock().unwrap());
    }

    fn calls(&self, name: &str) -> usize {
        self.world.lock().unwrap().calls.get(name).copied().unwrap_or(0)
    }

    fn answer<T>(&self, name: &'static str, f: impl FnOnce(&mut World) -> T) -> Result<T, ApiError> {
        let mut world = self.world.lock().unwrap();
        *world.calls.entry(name).or_default() += 1;
        if world.failing.contains(name) {
            return Err(ApiError::ServerError {
                status: String::from("500 Internal Server Error"),
            });
        }
        Ok(f(&mut world))
    }
}

impl WorldSource for ScriptedSource {
    async fn grids(&self) -> Result<Vec<Grid>, ApiError> {
        let latency = self.world.lock().unwrap().grid_latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.answer("grids", |w| w.grids.clone())
    }

    async fn grid_blocks(&self, id: &GridId) -> Result<Vec<GridBlock>, ApiError> {
        let id = id.clone();
        self.answer("grid_blocks", move |w| {
            w.block_requests.push(id);
            vec![GridBlock {
                block_type: String::from("MyObjectBuilder_CubeBlock"),
                subtype: String::from("LargeBlockArmorBlock"),
                position: Vec3::ZERO,
                integrity: 1.0,
            }]
        })
    }

    async fn players(&self) -> Result<Vec<Player>, ApiError> {
        self.answer("players", |w| w.players.clone())
    }

    async fn voxels(&self) -> Result<Vec<Voxel>, ApiError> {
        self.answer("voxels", |w| w.voxels.clone())
    }

    async fn global_info(&self) -> Result<GlobalInfo, ApiError> {
        self.answer("global_info", |w| w.global)
    }

    async fn chat(
        &self,
        since: Option<&ChatTimestamp>,
        _count: u32,
    ) -> Result<Vec<ChatMessage>, ApiError> {
        let token = since.map(|t| t.as_str().to_owned());
        self.answer("chat", move |w| {
            w.chat_requests.push(token);
            w.chat_batches.pop_front().unwrap_or_default()
        })
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn grid(id: &str, blocks: u32, position: Vec3) -> Grid {
    Grid {
        id: GridId::new(id),
        name: format!("Grid {id}"),
        owner: String::from("Alice"),
        faction: String::new(),
        faction_tag: String::new(),
        blocks,
        is_powered: true,
        grid_size: 2.5,
        is_static: false,
        is_parked: false,
        parent_id: String::new(),
        pcu: 250,
        position,
        last_blocks_update: Some(0),
    }
}

fn player(id: &str, online: bool, position: Vec3) -> Player {
    Player {
        id: PlayerId::new(id),
        name: format!("Player {id}"),
        faction: String::new(),
        steam_id: String::from("76561198000000000"),
        is_online: online,
        position,
        rotation: Quaternion::IDENTITY,
    }
}

fn planet(id: &str) -> Voxel {
    Voxel {
        id: VoxelId::new(id),
        name: String::from("EarthLike"),
        debug_name: String::from("EarthLike-12345"),
        position: Vec3::ZERO,
        rotation: Quaternion::IDENTITY,
        size: 120_000.0,
        has_atmosphere: true,
        atmosphere_altitude: 40_000.0,
        hill_parameters: vec![-0.1, 0.4],
    }
}

fn message(sender: &str, content: &str, timestamp: &str) -> ChatMessage {
    ChatMessage {
        display_name: sender.to_owned(),
        steam_id: 1,
        content: content.to_owned(),
        timestamp: ChatTimestamp(timestamp.to_owned()),
    }
}

fn test_config() -> EngineConfig {
    EngineConfig {
        tick_interval_ms: 100,
        ..EngineConfig::default()
    }
}

fn notifier() -> (ScriptedSource, Notifier<ScriptedSource>) {
    let source = ScriptedSource::default();
    let notifier = Notifier::new(source.clone(), test_config());
    (source, notifier)
}

/// Record every event on `topic`.
fn record(notifier: &Notifier<ScriptedSource>, topic: Topic) -> Arc<Mutex<Vec<Event>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    notifier.subscribe(topic, move |event| sink.lock().unwrap().push(event.clone()));
    events
}

fn grid_flags(events: &Arc<Mutex<Vec<Event>>>) -> Vec<(String, bool, bool)> {
    events
        .lock()
        .unwrap()
        .iter()
        .filter_map(|e| match e {
            Event::GridUpdate(u) => Some((u.grid.id.to_string(), u.is_new, u.is_deleted)),
            _ => None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Grids
// ---------------------------------------------------------------------------

#[tokio::test]
async fn grid_appears_moves_and_disappears() {
    let (source, notifier) = notifier();
    let events = record(&notifier, Topic::GridUpdate);

    source.edit(|w| w.grids = vec![grid("A", 25, Vec3::ZERO)]);
    notifier.refresh().await;
    assert_eq!(notifier.current_grids().await.len(), 1);

    source.edit(|w| w.grids = vec![grid("A", 25, Vec3::new(0.0, 0.0, 11.0))]);
    notifier.refresh().await;
    assert_eq!(
        notifier.current_grids().await[&GridId::new("A")].position,
        Vec3::new(0.0, 0.0, 11.0)
    );

    source.edit(|w| w.grids.clear());
    notifier.refresh().await;
    assert!(notifier.current_grids().await.is_empty());

    assert_eq!(
        grid_flags(&events),
        vec![
            ("A".to_owned(), true, false),
            ("A".to_owned(), false, false),
            ("A".to_owned(), false, true),
        ]
    );
}

#[tokio::test]
async fn small_grid_is_never_tracked() {
    let (source, notifier) = notifier();
    let events = record(&notifier, Topic::GridUpdate);

    source.edit(|w| w.grids = vec![grid("B", 5, Vec3::ZERO)]);
    notifier.refresh().await;
    source.edit(|w| w.grids = vec![grid("B", 5, Vec3::new(500.0, 0.0, 0.0))]);
    notifier.refresh().await;

    assert!(events.lock().unwrap().is_empty());
    assert!(notifier.current_grids().await.is_empty());
    assert!(notifier.grid_blocks(&GridId::new("B")).await.is_none());
}

#[tokio::test]
async fn small_static_grid_is_tracked() {
    let (source, notifier) = notifier();
    let events = record(&notifier, Topic::GridUpdate);

    let mut station = grid("S", 4, Vec3::ZERO);
    station.is_static = true;
    source.edit(|w| w.grids = vec![station]);
    notifier.refresh().await;

    assert_eq!(grid_flags(&events), vec![("S".to_owned(), true, false)]);
}

#[tokio::test]
async fn small_moves_publish_nothing_and_keep_store() {
    let (source, notifier) = notifier();
    let events = record(&notifier, Topic::GridUpdate);

    source.edit(|w| w.grids = vec![grid("A", 25, Vec3::ZERO)]);
    notifier.refresh().await;
    source.edit(|w| w.grids = vec![grid("A", 25, Vec3::new(0.0, 3.0, 0.0))]);
    let summary = notifier.refresh().await;

    assert_eq!(summary.grids.updated, 0);
    assert_eq!(events.lock().unwrap().len(), 1);
    assert_eq!(notifier.current_grids().await[&GridId::new("A")].position, Vec3::ZERO);
}

#[tokio::test]
async fn grid_fetch_failure_keeps_store_and_other_classes_run() {
    let (source, notifier) = notifier();
    let grid_events = record(&notifier, Topic::GridUpdate);
    let player_events = record(&notifier, Topic::PlayerUpdate);

    source.edit(|w| w.grids = vec![grid("A", 25, Vec3::ZERO)]);
    notifier.refresh().await;

    source.edit(|w| {
        w.failing.insert("grids");
        w.grids.clear();
        w.players = vec![player("p1", true, Vec3::ZERO)];
    });
    let summary = notifier.refresh().await;

    assert_eq!(summary.failed, vec!["grids"]);
    assert_eq!(notifier.current_grids().await.len(), 1);
    assert_eq!(grid_events.lock().unwrap().len(), 1);
    assert_eq!(player_events.lock().unwrap().len(), 1);

    // Recovery: the absence is noticed once the fetch works again.
    source.edit(|w| {
        w.failing.clear();
    });
    notifier.refresh().await;
    assert!(notifier.current_grids().await.is_empty());
    assert!(grid_flags(&grid_events).last().unwrap().2);
}

// ---------------------------------------------------------------------------
// Grid blocks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn blocks_fetched_for_new_grid_and_after_large_counter_advance() {
    let (source, notifier) = notifier();
    let id = GridId::new("A");

    let mut tracked = grid("A", 25, Vec3::ZERO);
    tracked.last_blocks_update = Some(100);
    source.edit(|w| w.grids = vec![tracked.clone()]);
    let summary = notifier.refresh().await;
    assert_eq!(summary.block_refreshes, 1);
    assert_eq!(notifier.grid_blocks(&id).await.unwrap().len(), 1);

    // Advanced by exactly the delta: no fetch.
    tracked.last_blocks_update = Some(130);
    source.edit(|w| w.grids = vec![tracked.clone()]);
    assert_eq!(notifier.refresh().await.block_refreshes, 0);

    // Advanced past it.
    tracked.last_blocks_update = Some(131);
    source.edit(|w| w.grids = vec![tracked.clone()]);
    assert_eq!(notifier.refresh().await.block_refreshes, 1);

    source.edit(|w| assert_eq!(w.block_requests.len(), 2));
}

#[tokio::test]
async fn block_fetch_failure_is_retried_next_tick() {
    let (source, notifier) = notifier();
    let id = GridId::new("A");

    source.edit(|w| {
        w.grids = vec![grid("A", 25, Vec3::ZERO)];
        w.failing.insert("grid_blocks");
    });
    let summary = notifier.refresh().await;
    assert_eq!(summary.grids.appeared, 1);
    assert_eq!(summary.block_refreshes, 0);
    assert!(notifier.grid_blocks(&id).await.is_none());

    source.edit(|w| {
        w.failing.clear();
    });
    assert_eq!(notifier.refresh().await.block_refreshes, 1);
    assert!(notifier.grid_blocks(&id).await.is_some());
}

#[tokio::test]
async fn blocks_are_dropped_with_their_grid() {
    let (source, notifier) = notifier();
    let id = GridId::new("A");

    source.edit(|w| w.grids = vec![grid("A", 25, Vec3::ZERO)]);
    notifier.refresh().await;
    assert!(notifier.grid_blocks(&id).await.is_some());

    source.edit(|w| w.grids.clear());
    notifier.refresh().await;
    assert!(notifier.grid_blocks(&id).await.is_none());

    // Coming back counts as new and fetches blocks again.
    source.edit(|w| w.grids = vec![grid("A", 25, Vec3::ZERO)]);
    assert_eq!(notifier.refresh().await.block_refreshes, 1);
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

#[tokio::test]
async fn players_tracked_while_online() {
    let (source, notifier) = notifier();
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    notifier.subscribe_player_updates(move |u| {
        sink.lock()
            .unwrap()
            .push((u.player.id.to_string(), u.is_new, u.is_deleted));
    });

    source.edit(|w| {
        w.players = vec![
            player("p1", true, Vec3::ZERO),
            player("p2", false, Vec3::ZERO),
        ];
    });
    notifier.refresh().await;
    let online = notifier.current_players().await;
    assert_eq!(online.len(), 1);
    assert!(online.contains_key(&PlayerId::new("p1")));

    source.edit(|w| w.players = vec![player("p1", true, Vec3::new(20.0, 0.0, 0.0))]);
    notifier.refresh().await;

    source.edit(|w| w.players = vec![player("p1", false, Vec3::new(20.0, 0.0, 0.0))]);
    notifier.refresh().await;
    assert!(notifier.current_players().await.is_empty());

    assert_eq!(
        *events.lock().unwrap(),
        vec![
            ("p1".to_owned(), true, false),
            ("p1".to_owned(), false, false),
            ("p1".to_owned(), false, true),
        ]
    );
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[tokio::test]
async fn chat_advances_token_and_skips_repeated_marker() {
    let (source, notifier) = notifier();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    notifier.subscribe_chat(move |m| sink.lock().unwrap().push(m.content.clone()));

    source.edit(|w| {
        w.chat_batches = VecDeque::from([
            vec![message("Alice", "hello", "100"), message("Bob", "hi", "101")],
            // The server returns the last message again alongside the new one.
            vec![message("Bob", "hi", "101"), message("Alice", "bye", "102")],
            Vec::new(),
        ]);
    });

    assert_eq!(notifier.refresh().await.chat_messages, 2);
    assert_eq!(notifier.refresh().await.chat_messages, 1);
    assert_eq!(notifier.refresh().await.chat_messages, 0);
    // An empty batch leaves the token where it was.
    notifier.refresh().await;

    assert_eq!(*seen.lock().unwrap(), vec!["hello", "hi", "bye"]);
    source.edit(|w| {
        assert_eq!(
            w.chat_requests,
            vec![
                None,
                Some("101".to_owned()),
                Some("102".to_owned()),
                Some("102".to_owned()),
            ]
        );
    });
}

#[tokio::test]
async fn chat_failure_keeps_token() {
    let (source, notifier) = notifier();

    source.edit(|w| w.chat_batches = VecDeque::from([vec![message("Alice", "hello", "100")]]));
    notifier.refresh().await;

    source.edit(|w| {
        w.failing.insert("chat");
    });
    let summary = notifier.refresh().await;
    assert_eq!(summary.failed, vec!["chat"]);

    source.edit(|w| {
        w.failing.clear();
    });
    notifier.refresh().await;
    source.edit(|w| {
        assert_eq!(w.chat_requests.last().unwrap().as_deref(), Some("100"));
    });
}

// ---------------------------------------------------------------------------
// Global info
// ---------------------------------------------------------------------------

#[tokio::test]
async fn global_info_publishes_first_fetch_and_sun_changes_only() {
    let (source, notifier) = notifier();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    notifier.subscribe_global_info(move |info| sink.lock().unwrap().push(*info));

    let mut info = GlobalInfo {
        sun_intensity: 1.0,
        sun_normalized_y: 1.0,
        small_ship_max_speed: 100.0,
        ..GlobalInfo::default()
    };
    source.edit(|w| w.global = info);
    assert!(notifier.refresh().await.global_info_changed);

    // Speed limits alone do not count.
    info.small_ship_max_speed = 150.0;
    info.large_ship_max_angular_speed = 2.0;
    source.edit(|w| w.global = info);
    assert!(!notifier.refresh().await.global_info_changed);

    // The sun moved.
    info.sun_normalized_x = 0.1;
    source.edit(|w| w.global = info);
    assert!(notifier.refresh().await.global_info_changed);

    assert_eq!(seen.lock().unwrap().len(), 2);
    let latest = notifier.global_info().await.unwrap();
    assert!((latest.small_ship_max_speed - 150.0).abs() < f64::EPSILON);
}

// ---------------------------------------------------------------------------
// Subscriptions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unsubscribe_stops_delivery_to_that_callback_only() {
    let (source, notifier) = notifier();
    let kept = record(&notifier, Topic::GridUpdate);
    let dropped = Arc::new(Mutex::new(0_usize));
    let counter = Arc::clone(&dropped);
    let handle = notifier.subscribe_grid_updates(move |_| *counter.lock().unwrap() += 1);

    source.edit(|w| w.grids = vec![grid("A", 25, Vec3::ZERO)]);
    notifier.refresh().await;
    assert!(notifier.unsubscribe(&handle));

    source.edit(|w| w.grids.clear());
    notifier.refresh().await;

    assert_eq!(*dropped.lock().unwrap(), 1);
    assert_eq!(kept.lock().unwrap().len(), 2);
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn start_bootstraps_planets_and_is_idempotent() {
    let (source, notifier) = notifier();
    source.edit(|w| w.voxels = vec![planet("v1"), planet("v2")]);

    notifier.start().await.unwrap();
    notifier.start().await.unwrap();
    assert!(notifier.is_running().await);
    assert_eq!(source.calls("voxels"), 1);
    let planets = notifier.current_planets().await;
    assert_eq!(planets.len(), 2);
    assert!(planets.contains_key(&VoxelId::new("v2")));

    notifier.stop().await;
    assert!(!notifier.is_running().await);
}

#[tokio::test]
async fn bootstrap_failure_leaves_engine_stopped() {
    let (source, notifier) = notifier();
    source.edit(|w| {
        w.failing.insert("voxels");
    });

    let result = notifier.start().await;
    assert!(matches!(result, Err(NotifyError::Bootstrap { .. })));
    assert!(!notifier.is_running().await);
    assert_eq!(source.calls("grids"), 0);
}

#[tokio::test]
async fn background_task_polls_until_stopped() {
    let (source, notifier) = notifier();
    let events = record(&notifier, Topic::GridUpdate);
    source.edit(|w| w.grids = vec![grid("A", 25, Vec3::ZERO)]);

    notifier.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(350)).await;
    notifier.stop().await;

    let polls = source.calls("grids");
    assert!(polls >= 2, "expected several ticks, got {polls}");
    // One appearance, no repeats while the grid sits still.
    assert_eq!(grid_flags(&events), vec![("A".to_owned(), true, false)]);

    // Nothing runs after stop returns.
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(source.calls("grids"), polls);
}

#[tokio::test]
async fn restart_after_stop() {
    let (source, notifier) = notifier();

    notifier.start().await.unwrap();
    notifier.stop().await;
    notifier.stop().await;

    notifier.start().await.unwrap();
    assert!(notifier.is_running().await);
    notifier.stop().await;
    assert_eq!(source.calls("voxels"), 2);
}

#[tokio::test]
async fn stop_during_tick_does_not_shorten_next_run() {
    let source = ScriptedSource::default();
    let config = EngineConfig {
        tick_interval_ms: 1000,
        ..EngineConfig::default()
    };
    let notifier = Notifier::new(source.clone(), config);
    source.edit(|w| w.grid_latency = Duration::from_millis(150));

    notifier.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    // The first tick is still waiting on the grid fetch.
    notifier.stop().await;
    assert_eq!(source.calls("grids"), 1);

    source.edit(|w| w.grid_latency = Duration::ZERO);
    notifier.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    notifier.stop().await;

    // One immediate tick on restart, the next is a full interval away.
    assert_eq!(source.calls("grids"), 2);
}
