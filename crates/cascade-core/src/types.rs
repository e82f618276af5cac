//! Core item types and enumerations.
//!
//! This module defines the fundamental vocabulary of the engine:
//! - `ItemState`: Where an item is in its open/close cycle
//! - `ItemKey`: The two transition directions (closed / opened)
//! - `ActivationMode`: Request shapes accepted by the activation engine
//! - `ChainDirection`: Ordering policy for staggered child delays
//! - `UpdatePhase`: Which host update phase drives an item
//! - `Keyed<T>`: A pair of values indexed by `ItemKey`

use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// Current state of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    /// Fully closed, `time == 0`.
    Closed,
    /// Running the open arc (or waiting for its open delay).
    Opening,
    /// Fully opened, `time == 1`.
    Opened,
    /// Running the close arc (or waiting for its close delay).
    Closing,
    /// Driven externally through evaluation; excluded from the child census.
    Slave,
}

impl Default for ItemState {
    fn default() -> Self {
        Self::Closed
    }
}

impl ItemState {
    /// All census-tracked states, in census slot order.
    pub const COUNTED: [ItemState; 4] = [
        ItemState::Closed,
        ItemState::Opening,
        ItemState::Opened,
        ItemState::Closing,
    ];

    /// Census slot of this state, `None` for `Slave`.
    pub fn census_slot(self) -> Option<usize> {
        match self {
            Self::Closed => Some(0),
            Self::Opening => Some(1),
            Self::Opened => Some(2),
            Self::Closing => Some(3),
            Self::Slave => None,
        }
    }

    /// Whether interaction surfaces are enabled in this state.
    pub fn surface_enabled(self) -> bool {
        matches!(self, Self::Opening | Self::Opened)
    }

    /// Direction an item in this state is heading, `None` for `Slave`.
    pub fn key(self) -> Option<ItemKey> {
        match self {
            Self::Opening | Self::Opened => Some(ItemKey::Opened),
            Self::Closing | Self::Closed => Some(ItemKey::Closed),
            Self::Slave => None,
        }
    }
}

/// Transition direction, also used to index per-direction configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKey {
    Closed,
    Opened,
}

impl Default for ItemKey {
    fn default() -> Self {
        Self::Opened
    }
}

impl ItemKey {
    pub const BOTH: [ItemKey; 2] = [ItemKey::Closed, ItemKey::Opened];

    pub fn opposite(self) -> ItemKey {
        match self {
            Self::Closed => Self::Opened,
            Self::Opened => Self::Closed,
        }
    }

    /// Terminal state reached when a transition in this direction completes.
    pub fn terminal_state(self) -> ItemState {
        match self {
            Self::Closed => ItemState::Closed,
            Self::Opened => ItemState::Opened,
        }
    }

    /// In-flight state for a transition in this direction.
    pub fn transient_state(self) -> ItemState {
        match self {
            Self::Closed => ItemState::Closing,
            Self::Opened => ItemState::Opening,
        }
    }

    /// Progress value at the end of a transition in this direction.
    pub fn bound(self) -> f32 {
        match self {
            Self::Closed => 0.0,
            Self::Opened => 1.0,
        }
    }
}

/// A pair of values, one per transition direction.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Keyed<T> {
    pub closed: T,
    pub opened: T,
}

impl<T> Keyed<T> {
    pub const fn new(closed: T, opened: T) -> Self {
        Self { closed, opened }
    }
}

impl<T: Copy> Keyed<T> {
    /// Same value for both directions.
    pub const fn splat(value: T) -> Self {
        Self {
            closed: value,
            opened: value,
        }
    }

    pub fn get(&self, key: ItemKey) -> T {
        self[key]
    }
}

impl<T> Index<ItemKey> for Keyed<T> {
    type Output = T;

    fn index(&self, key: ItemKey) -> &T {
        match key {
            ItemKey::Closed => &self.closed,
            ItemKey::Opened => &self.opened,
        }
    }
}

impl<T> IndexMut<ItemKey> for Keyed<T> {
    fn index_mut(&mut self, key: ItemKey) -> &mut T {
        match key {
            ItemKey::Closed => &mut self.closed,
            ItemKey::Opened => &mut self.opened,
        }
    }
}

/// Request shape accepted by the activation engine.
///
/// Single modes touch only the item, branch modes also recurse into every
/// descendant, toggle modes pick open or close from the current state, and
/// `…Immediately` modes skip the delay and the timed arc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationMode {
    Disabled,
    Open,
    Close,
    OpenClose,
    OpenBranch,
    CloseBranch,
    OpenCloseBranch,
    OpenImmediately,
    CloseImmediately,
    OpenCloseImmediately,
    OpenBranchImmediately,
    CloseBranchImmediately,
    OpenCloseBranchImmediately,
}

impl Default for ActivationMode {
    fn default() -> Self {
        Self::Disabled
    }
}

impl ActivationMode {
    /// Whether descendants are activated as well.
    pub fn is_branch(self) -> bool {
        matches!(
            self,
            Self::OpenBranch
                | Self::CloseBranch
                | Self::OpenCloseBranch
                | Self::OpenBranchImmediately
                | Self::CloseBranchImmediately
                | Self::OpenCloseBranchImmediately
        )
    }

    /// Whether the delay and timed arc are skipped.
    pub fn is_immediate(self) -> bool {
        matches!(
            self,
            Self::OpenImmediately
                | Self::CloseImmediately
                | Self::OpenCloseImmediately
                | Self::OpenBranchImmediately
                | Self::CloseBranchImmediately
                | Self::OpenCloseBranchImmediately
        )
    }

    /// Whether the direction depends on the current state.
    pub fn is_toggle(self) -> bool {
        matches!(
            self,
            Self::OpenClose
                | Self::OpenCloseBranch
                | Self::OpenCloseImmediately
                | Self::OpenCloseBranchImmediately
        )
    }

    /// Whether this is one of the immediate close variants used for fast loops.
    pub fn is_immediate_close(self) -> bool {
        matches!(self, Self::CloseImmediately | Self::CloseBranchImmediately)
    }

    /// Resolve the direction of this mode for an item in `state`.
    ///
    /// Toggle modes open items that are closing or closed and close anything
    /// else. Returns `None` for `Disabled`.
    pub fn direction(self, state: ItemState) -> Option<ItemKey> {
        match self {
            Self::Disabled => None,
            Self::Open | Self::OpenBranch | Self::OpenImmediately | Self::OpenBranchImmediately => {
                Some(ItemKey::Opened)
            }
            Self::Close
            | Self::CloseBranch
            | Self::CloseImmediately
            | Self::CloseBranchImmediately => Some(ItemKey::Closed),
            Self::OpenClose
            | Self::OpenCloseBranch
            | Self::OpenCloseImmediately
            | Self::OpenCloseBranchImmediately => {
                if matches!(state, ItemState::Closing | ItemState::Closed) {
                    Some(ItemKey::Opened)
                } else {
                    Some(ItemKey::Closed)
                }
            }
        }
    }
}

/// Order in which a parent's children receive their chain delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainDirection {
    /// First child starts first.
    FirstToLast,
    /// Last child starts first.
    LastToFirst,
    /// Center children start first, spreading outwards.
    MiddleToEnds,
    /// Outer children start first, converging on the center.
    EndsToMiddle,
    /// Seeded shuffle of the child order.
    Random,
}

impl Default for ChainDirection {
    fn default() -> Self {
        Self::FirstToLast
    }
}

/// Host update phase that owns an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdatePhase {
    /// Per-frame update.
    Update,
    /// Fixed-rate update.
    FixedUpdate,
    /// Post update, after every normal update of the frame.
    LateUpdate,
}

impl Default for UpdatePhase {
    fn default() -> Self {
        Self::Update
    }
}

impl UpdatePhase {
    pub const ALL: [UpdatePhase; 3] = [
        UpdatePhase::Update,
        UpdatePhase::FixedUpdate,
        UpdatePhase::LateUpdate,
    ];
}

/// Which item state is shown as the pressed button state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonDirection {
    /// Press animates from the opened look towards the closed look and back.
    OpenToClose,
    /// Press animates from the closed look towards the opened look and back.
    CloseToOpen,
}

impl Default for ButtonDirection {
    fn default() -> Self {
        Self::OpenToClose
    }
}

/// How an item's material handle is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialMode {
    /// Share the material asset directly.
    Direct,
    /// Use a per-item instance (live mode only).
    Instance,
}

impl Default for MaterialMode {
    fn default() -> Self {
        Self::Direct
    }
}
