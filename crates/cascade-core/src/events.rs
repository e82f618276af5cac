//! Item lifecycle events.
//!
//! Every state write that starts or finishes a transition produces one
//! [`ItemEvent`]. Events go to the item's observers in subscription order and,
//! for items that opted in, to the tree's [`EventQueue`], which hosts poll
//! after each tick to react (for example by activating other items).
//!
//! # Usage
//!
//! ```ignore
//! engine.tick(UpdatePhase::Update, delta, &mut host);
//!
//! for event in engine.drain_events() {
//!     match event {
//!         ItemEvent::Opened { name, .. } => println!("{name} is open"),
//!         ItemEvent::Closed { item, .. } => engine.despawn(item),
//!         _ => {}
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::id::ItemId;
use crate::types::ItemState;

/// Event emitted when an item changes lifecycle state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemEvent {
    /// The item started its open arc (or its open delay).
    Opening {
        /// The item that changed state.
        item: ItemId,
        /// Name of the item.
        name: String,
    },
    /// The item and every non-looping child reached the opened state.
    Opened { item: ItemId, name: String },
    /// The item started its close arc (or its close delay).
    Closing { item: ItemId, name: String },
    /// The item and every non-looping child reached the closed state.
    Closed { item: ItemId, name: String },
}

impl ItemEvent {
    /// Event for an item entering `state`, `None` for the slave state.
    pub fn for_state(state: ItemState, item: ItemId, name: &str) -> Option<Self> {
        let name = name.to_string();
        match state {
            ItemState::Opening => Some(Self::Opening { item, name }),
            ItemState::Opened => Some(Self::Opened { item, name }),
            ItemState::Closing => Some(Self::Closing { item, name }),
            ItemState::Closed => Some(Self::Closed { item, name }),
            ItemState::Slave => None,
        }
    }

    /// Get the item handle for this event.
    pub fn item(&self) -> ItemId {
        match self {
            Self::Opening { item, .. }
            | Self::Opened { item, .. }
            | Self::Closing { item, .. }
            | Self::Closed { item, .. } => *item,
        }
    }

    /// Get the item name for this event.
    pub fn name(&self) -> &str {
        match self {
            Self::Opening { name, .. }
            | Self::Opened { name, .. }
            | Self::Closing { name, .. }
            | Self::Closed { name, .. } => name,
        }
    }

    /// State the item entered.
    pub fn state(&self) -> ItemState {
        match self {
            Self::Opening { .. } => ItemState::Opening,
            Self::Opened { .. } => ItemState::Opened,
            Self::Closing { .. } => ItemState::Closing,
            Self::Closed { .. } => ItemState::Closed,
        }
    }

    /// Check if this is a "started" event.
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Opening { .. } | Self::Closing { .. })
    }

    /// Check if this is a "completed" event.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Opened { .. } | Self::Closed { .. })
    }
}

/// Callback invoked with every lifecycle event of one item.
pub type Observer = Box<dyn FnMut(&ItemEvent)>;

/// Ordered observer list of one item.
#[derive(Default)]
pub struct Observers {
    list: Vec<Observer>,
}

impl Observers {
    pub fn push(&mut self, observer: Observer) {
        self.list.push(observer);
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn clear(&mut self) {
        self.list.clear();
    }

    pub(crate) fn notify(&mut self, event: &ItemEvent) {
        for observer in self.list.iter_mut() {
            observer(event);
        }
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("len", &self.list.len())
            .finish()
    }
}

/// Events waiting for the host, oldest first.
///
/// The queue is unbounded by default. With a limit set, pushing onto a full
/// queue discards the oldest event and counts it in [`EventQueue::dropped`],
/// so a host that never drains cannot grow it without bound.
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: VecDeque<ItemEvent>,
    limit: Option<usize>,
    dropped: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue that keeps at most `limit` events (at least one).
    pub fn bounded(limit: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(limit.clamp(1, 256)),
            limit: Some(limit.max(1)),
            dropped: 0,
        }
    }

    pub fn push(&mut self, event: ItemEvent) {
        if let Some(limit) = self.limit {
            while self.pending.len() >= limit {
                self.pending.pop_front();
                self.dropped += 1;
            }
        }
        self.pending.push_back(event);
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Events discarded because the limit was reached.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn pop(&mut self) -> Option<ItemEvent> {
        self.pending.pop_front()
    }

    /// Take every pending event in delivery order.
    pub fn drain(&mut self) -> impl Iterator<Item = ItemEvent> + '_ {
        self.pending.drain(..)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemEvent> {
        self.pending.iter()
    }

    /// Pending events of one item, without consuming them.
    pub fn pending_for(&self, item: ItemId) -> impl Iterator<Item = &ItemEvent> {
        self.pending.iter().filter(move |event| event.item() == item)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
