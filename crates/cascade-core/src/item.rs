//! Items: the nodes of the animation tree.
//!
//! An [`Item`] pairs designer configuration ([`ItemValues`], tweens) with the
//! runtime state the engine drives: the open/close state, progress, pending
//! delay, cached parent/child links, the child census and loop bookkeeping.
//!
//! Runtime fields are only written by the tree, the activation engine and the
//! scheduler. Hosts read them through accessors.

use serde::{Deserialize, Serialize};

use crate::events::{Observer, Observers};
use crate::host::{Capabilities, MaterialHandle};
use crate::id::ItemId;
use crate::tween::Tween;
use crate::types::{
    ActivationMode, ButtonDirection, ChainDirection, ItemKey, ItemState, Keyed, MaterialMode,
    UpdatePhase,
};

/// Designer configuration of an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemValues {
    /// Pre-activation delay per direction, in seconds.
    pub delay: Keyed<f32>,
    /// Arc duration per direction, in seconds.
    pub duration: Keyed<f32>,

    /// Delay step between consecutive children along the chain.
    pub chain_delay: Keyed<f32>,
    /// Base delay added before the first child of the chain.
    pub first_child_delay: Keyed<f32>,
    /// Children start their branch activation together with this item's delay
    /// instead of after it.
    pub child_before: Keyed<bool>,
    /// Chain ordering per direction.
    pub chain_direction: Keyed<ChainDirection>,
    /// Children use the chain delays computed by this item instead of their
    /// own delays.
    pub child_chain_mode: bool,
    /// Reversing an in-flight branch transition starts descendants without
    /// delay.
    pub brake_chain_delay: bool,
    /// Seed for the random chain ordering.
    pub chain_seed: u64,

    /// Loop count: 0 disables looping, negative loops forever.
    pub loops: i32,
    /// Activation applied on every loop iteration from the opened state.
    pub loop_mode: ActivationMode,

    /// Activation applied once by `start`.
    pub start_action: ActivationMode,
    /// Activation used by `open`.
    pub activation_open: ActivationMode,
    /// Activation used by `close`.
    pub activation_close: ActivationMode,

    /// Detach this item's children from the tree above it.
    pub ignore_childs: bool,
    /// Do not attach to the parent item.
    pub ignore_parent: bool,
    /// Use the scaled delta time of the phase.
    pub time_scaled: bool,
    /// Scheduler phase driving this item.
    pub updating_type: UpdatePhase,

    /// Toggle the interactable surface with the state.
    pub interactions: bool,
    /// Toggle raycast blocking with the state.
    pub block_raycasting: bool,
    /// Start and stop the audio resource with the state.
    pub sound_control: bool,
    /// Stop (instead of pause) audio on close, so it restarts on open.
    pub sound_restart: bool,
    /// Start and stop the video resource with the state.
    pub video_control: bool,
    /// Stop (instead of pause) video on close, so it restarts on open.
    pub video_restart: bool,

    /// Length of the press afterglow in seconds.
    pub button_duration: f32,
    pub button_direction: ButtonDirection,
    /// Key names that press this item's button.
    pub on_keyboard: Vec<String>,

    pub material_mode: MaterialMode,
}

impl Default for ItemValues {
    fn default() -> Self {
        Self {
            delay: Keyed::splat(0.0),
            duration: Keyed::splat(1.0),
            chain_delay: Keyed::splat(0.0),
            first_child_delay: Keyed::splat(0.0),
            child_before: Keyed::splat(false),
            chain_direction: Keyed::splat(ChainDirection::FirstToLast),
            child_chain_mode: false,
            brake_chain_delay: false,
            chain_seed: 0,
            loops: 0,
            loop_mode: ActivationMode::OpenClose,
            start_action: ActivationMode::CloseBranchImmediately,
            activation_open: ActivationMode::OpenBranch,
            activation_close: ActivationMode::CloseBranch,
            ignore_childs: false,
            ignore_parent: false,
            time_scaled: true,
            updating_type: UpdatePhase::Update,
            interactions: true,
            block_raycasting: true,
            sound_control: false,
            sound_restart: false,
            video_control: false,
            video_restart: false,
            button_duration: 0.0,
            button_direction: ButtonDirection::OpenToClose,
            on_keyboard: Vec::new(),
            material_mode: MaterialMode::Direct,
        }
    }
}

impl ItemValues {
    /// Whether the item loops at all.
    pub fn is_looping(&self) -> bool {
        self.loops != 0
    }
}

static_assertions::assert_impl_all!(ItemValues: Send, Sync);

/// A node of the animation tree.
#[derive(Debug)]
pub struct Item {
    pub name: String,
    pub values: ItemValues,
    pub tweens: Vec<Tween>,

    // Scene mirror
    pub(crate) enabled: bool,
    pub(crate) scene_parent: Option<ItemId>,
    pub(crate) scene_children: Vec<ItemId>,

    // Cached adjacency, rebuilt by refresh
    pub(crate) sibling_id: u32,
    pub(crate) parent: Option<ItemId>,
    pub(crate) children: Vec<ItemId>,
    pub(crate) child_counts: [u32; 4],
    pub(crate) child_count_without_loops: u32,
    pub(crate) chain_delay: Keyed<f32>,

    // State machine
    pub(crate) state: ItemState,
    pub(crate) time: f32,
    pub(crate) state_chg_time: f32,
    pub(crate) state_chg_branch_mode: bool,
    pub(crate) state_chg_brake: bool,
    pub(crate) loop_activated: bool,
    pub(crate) current_loops: i32,
    pub(crate) button_evaluation: f32,

    // Host lookups
    pub(crate) capabilities: Capabilities,
    pub(crate) material: Option<MaterialHandle>,

    pub(crate) observers: Observers,
    pub(crate) queue_events: bool,
}

impl Item {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_values(name, ItemValues::default())
    }

    pub fn with_values(name: impl Into<String>, values: ItemValues) -> Self {
        Self {
            name: name.into(),
            values,
            tweens: Vec::new(),
            enabled: true,
            scene_parent: None,
            scene_children: Vec::new(),
            sibling_id: 1,
            parent: None,
            children: Vec::new(),
            child_counts: [0; 4],
            child_count_without_loops: 0,
            chain_delay: Keyed::splat(0.0),
            state: ItemState::Closed,
            time: 0.0,
            state_chg_time: -1.0,
            state_chg_branch_mode: false,
            state_chg_brake: false,
            loop_activated: false,
            current_loops: 0,
            button_evaluation: 0.0,
            capabilities: Capabilities::default(),
            material: None,
            observers: Observers::default(),
            queue_events: false,
        }
    }

    pub fn with_tween(mut self, tween: Tween) -> Self {
        self.tweens.push(tween);
        self
    }

    pub fn with_tweens(mut self, tweens: impl IntoIterator<Item = Tween>) -> Self {
        self.tweens.extend(tweens);
        self
    }

    pub fn state(&self) -> ItemState {
        self.state
    }

    /// Progress within the current arc, `0.0` closed to `1.0` opened.
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Remaining pre-activation delay; negative when not waiting.
    pub fn state_chg_time(&self) -> f32 {
        self.state_chg_time
    }

    /// Whether the pending transition includes descendants.
    pub fn state_chg_branch_mode(&self) -> bool {
        self.state_chg_branch_mode
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Position among the parent's children, starting at 1.
    pub fn sibling_id(&self) -> u32 {
        self.sibling_id
    }

    pub fn parent(&self) -> Option<ItemId> {
        self.parent
    }

    pub fn children(&self) -> &[ItemId] {
        &self.children
    }

    pub fn scene_parent(&self) -> Option<ItemId> {
        self.scene_parent
    }

    pub fn scene_children(&self) -> &[ItemId] {
        &self.scene_children
    }

    /// Number of direct children in `state`. Always 0 for the slave state.
    pub fn child_count(&self, state: ItemState) -> u32 {
        state.census_slot().map_or(0, |slot| self.child_counts[slot])
    }

    pub fn child_counts(&self) -> [u32; 4] {
        self.child_counts
    }

    pub fn child_count_without_loops(&self) -> u32 {
        self.child_count_without_loops
    }

    /// Delay assigned to this item by its parent's chain.
    pub fn chain_delay(&self, key: ItemKey) -> f32 {
        self.chain_delay[key]
    }

    pub fn loop_activated(&self) -> bool {
        self.loop_activated
    }

    pub fn current_loops(&self) -> i32 {
        self.current_loops
    }

    /// Remaining press afterglow in seconds.
    pub fn button_evaluation(&self) -> f32 {
        self.button_evaluation
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn material(&self) -> Option<MaterialHandle> {
        self.material
    }

    /// Register a lifecycle observer. Observers run in subscription order.
    pub fn subscribe(&mut self, observer: Observer) {
        self.observers.push(observer);
    }

    pub fn clear_observers(&mut self) {
        self.observers.clear();
    }

    /// Mirror lifecycle events into the tree's event queue.
    pub fn set_queue_events(&mut self, enabled: bool) {
        self.queue_events = enabled;
    }

    pub(crate) fn has_subscribers(&self) -> bool {
        self.queue_events || !self.observers.is_empty()
    }

    /// Whether every non-looping child reached the terminal state of `key`.
    pub(crate) fn children_reached(&self, key: ItemKey) -> bool {
        self.child_count(key.terminal_state()) == self.child_count_without_loops
    }

    /// Whether a transition has no pending delay left.
    pub(crate) fn delay_elapsed(&self) -> bool {
        self.state_chg_time < 0.0
    }
}
