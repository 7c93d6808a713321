//! Snapshot reconciliation.
//!
//! [`reconcile`] compares a freshly fetched full list against the stored
//! snapshot and derives three disjoint change sets:
//!
//! - **appeared** -- included now, not stored before; inserted.
//! - **updated** -- stored and included now, moved further than the
//!   threshold; the stored value is replaced.
//! - **disappeared** -- stored before, not included now (gone from the
//!   server or no longer passing the filter); removed.
//!
//! Tracked entities that moved less than the threshold produce nothing and
//! the stored value is left untouched, so the stored position is always the
//! last *published* position. Small drifts therefore accumulate until they
//! cross the threshold.
//!
//! This module is pure: no I/O, no locks, no logging.

use std::collections::{BTreeMap, BTreeSet};

use spacelab_types::{Grid, GridId, Player, PlayerId, Vec3};

/// An entity the engine tracks by id and position.
pub trait Tracked: Clone {
    /// Identity type.
    type Id: Ord + Clone;

    /// Identity of this entity.
    fn id(&self) -> &Self::Id;

    /// Current world position.
    fn position(&self) -> Vec3;
}

impl Tracked for Grid {
    type Id = GridId;

    fn id(&self) -> &GridId {
        &self.id
    }

    fn position(&self) -> Vec3 {
        self.position
    }
}

impl Tracked for Player {
    type Id = PlayerId;

    fn id(&self) -> &PlayerId {
        &self.id
    }

    fn position(&self) -> Vec3 {
        self.position
    }
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Changes<T> {
    /// Entities seen for the first time.
    pub appeared: Vec<T>,
    /// Tracked entities that moved past the threshold (new state).
    pub updated: Vec<T>,
    /// Entities no longer present (last stored state).
    pub disappeared: Vec<T>,
}

impl<T> Changes<T> {
    /// Whether nothing changed.
    pub fn is_empty(&self) -> bool {
        self.appeared.is_empty() && self.updated.is_empty() && self.disappeared.is_empty()
    }
}

impl<T> Default for Changes<T> {
    fn default() -> Self {
        Self {
            appeared: Vec::new(),
            updated: Vec::new(),
            disappeared: Vec::new(),
        }
    }
}

/// Reconcile `fetched` into `stored`.
///
/// Entities for which `include` returns `false` are treated as absent. If
/// the same id appears twice in `fetched`, the first occurrence wins.
pub fn reconcile<T, F>(
    stored: &mut BTreeMap<T::Id, T>,
    fetched: Vec<T>,
    include: F,
    min_move_distance_sq: f64,
) -> Changes<T>
where
    T: Tracked,
    F: Fn(&T) -> bool,
{
    use std::collections::btree_map::Entry;

    let mut changes = Changes::default();
    let mut seen = BTreeSet::new();

    for entity in fetched.into_iter().filter(|e| include(e)) {
        if !seen.insert(entity.id().clone()) {
            continue;
        }
        match stored.entry(entity.id().clone()) {
            Entry::Vacant(slot) => {
                slot.insert(entity.clone());
                changes.appeared.push(entity);
            }
            Entry::Occupied(mut slot) => {
                let moved = slot.get().position().distance_squared(&entity.position());
                if moved > min_move_distance_sq {
                    slot.insert(entity.clone());
                    changes.updated.push(entity);
                }
            }
        }
    }

    let (kept, gone): (BTreeMap<_, _>, BTreeMap<_, _>) = std::mem::take(stored)
        .into_iter()
        .partition(|(id, _)| seen.contains(id));
    *stored = kept;
    changes.disappeared = gone.into_values().collect();

    changes
}

/// Grids are tracked when static or at least `min_blocks` large.
pub const fn grid_is_tracked(grid: &Grid, min_blocks: u32) -> bool {
    grid.is_static || grid.blocks >= min_blocks
}

/// Players are tracked while online.
pub const fn player_is_tracked(player: &Player) -> bool {
    player.is_online
}

/// Whether a grid's blocks should be fetched.
///
/// `last_fetched` is the block counter recorded at the last successful
/// fetch, `None` if the blocks were never fetched. `reported` is the
/// counter in the latest grid list. A counter that went backwards (server
/// restart) also triggers a fetch.
pub fn needs_block_refresh(last_fetched: Option<u64>, reported: Option<u64>, delta: u64) -> bool {
    match (last_fetched, reported) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(previous), Some(current)) => current
            .checked_sub(previous)
            .is_none_or(|advanced| advanced > delta),
    }
}
