//! Change events published to subscribers.
//!
//! Every event belongs to exactly one [`Topic`]. The payload set is closed:
//! [`Event`] has one variant per topic and nothing else can be published.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::entities::{ChatMessage, GlobalInfo, Grid, Player};

/// A grid appeared, moved, or disappeared.
///
/// At most one of `is_new` and `is_deleted` is set. When neither is set the
/// event is a plain update carrying the grid's latest state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "PascalCase")]
#[ts(export, export_to = "bindings/")]
pub struct GridUpdate {
    /// Grid state at the time of the event (last known state for deletions).
    pub grid: Grid,
    /// First time the grid was observed.
    pub is_new: bool,
    /// The grid is gone from the server (or no longer tracked).
    pub is_deleted: bool,
}

impl GridUpdate {
    /// A grid seen for the first time.
    pub const fn appeared(grid: Grid) -> Self {
        Self {
            grid,
            is_new: true,
            is_deleted: false,
        }
    }

    /// A tracked grid whose state changed.
    pub const fn updated(grid: Grid) -> Self {
        Self {
            grid,
            is_new: false,
            is_deleted: false,
        }
    }

    /// A tracked grid absent from the latest poll.
    pub const fn disappeared(grid: Grid) -> Self {
        Self {
            grid,
            is_new: false,
            is_deleted: true,
        }
    }
}

/// A player came online, moved, or went offline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "PascalCase")]
#[ts(export, export_to = "bindings/")]
pub struct PlayerUpdate {
    /// Player state at the time of the event.
    pub player: Player,
    /// First time the player was observed online.
    pub is_new: bool,
    /// The player went offline or left.
    pub is_deleted: bool,
}

impl PlayerUpdate {
    /// A player seen for the first time.
    pub const fn appeared(player: Player) -> Self {
        Self {
            player,
            is_new: true,
            is_deleted: false,
        }
    }

    /// A tracked player who moved.
    pub const fn updated(player: Player) -> Self {
        Self {
            player,
            is_new: false,
            is_deleted: false,
        }
    }

    /// A tracked player absent from the latest poll.
    pub const fn disappeared(player: Player) -> Self {
        Self {
            player,
            is_new: false,
            is_deleted: true,
        }
    }
}

/// Event categories. Each has its own subscriber list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum Topic {
    /// [`GridUpdate`] events.
    GridUpdate,
    /// [`PlayerUpdate`] events.
    PlayerUpdate,
    /// New chat messages.
    ChatMessage,
    /// Sun and environment changes.
    GlobalInfo,
}

impl Topic {
    /// Every topic, in a fixed order.
    pub const ALL: [Self; 4] = [
        Self::GridUpdate,
        Self::PlayerUpdate,
        Self::ChatMessage,
        Self::GlobalInfo,
    ];

    /// Wire name of the topic, as used by viewer transports.
    pub const fn name(self) -> &'static str {
        match self {
            Self::GridUpdate => "gridUpdate",
            Self::PlayerUpdate => "playerUpdate",
            Self::ChatMessage => "chatMessage",
            Self::GlobalInfo => "globalInfo",
        }
    }
}

impl core::fmt::Display for Topic {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// A published event. One variant per [`Topic`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "content", rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum Event {
    /// See [`Topic::GridUpdate`].
    GridUpdate(GridUpdate),
    /// See [`Topic::PlayerUpdate`].
    PlayerUpdate(PlayerUpdate),
    /// See [`Topic::ChatMessage`].
    ChatMessage(ChatMessage),
    /// See [`Topic::GlobalInfo`].
    GlobalInfo(GlobalInfo),
}

impl Event {
    /// The topic this event is delivered on.
    pub const fn topic(&self) -> Topic {
        match self {
            Self::GridUpdate(_) => Topic::GridUpdate,
            Self::PlayerUpdate(_) => Topic::PlayerUpdate,
            Self::ChatMessage(_) => Topic::ChatMessage,
            Self::GlobalInfo(_) => Topic::GlobalInfo,
        }
    }
}

impl From<GridUpdate> for Event {
    fn from(update: GridUpdate) -> Self {
        Self::GridUpdate(update)
    }
}

impl From<PlayerUpdate> for Event {
    fn from(update: PlayerUpdate) -> Self {
        Self::PlayerUpdate(update)
    }
}

impl From<ChatMessage> for Event {
    fn from(message: ChatMessage) -> Self {
        Self::ChatMessage(message)
    }
}

impl From<GlobalInfo> for Event {
    fn from(info: GlobalInfo) -> Self {
        Self::GlobalInfo(info)
    }
}
