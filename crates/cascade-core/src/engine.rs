//! Engine facade.
//!
//! [`Engine`] owns the item tree and the scheduler and is what a host
//! integration holds on to. Every call that may touch host collaborators
//! takes the host as an argument; the engine never stores it.
//!
//! # Usage
//!
//! ```
//! use cascade_core::{Engine, Item, ItemState, NullHost, PhaseDelta, UpdatePhase};
//!
//! let mut host = NullHost;
//! let mut engine = Engine::default();
//!
//! let panel = engine.spawn(Item::new("panel"));
//! let button = engine.spawn(Item::new("button"));
//! engine.attach(button, panel, &mut host);
//!
//! engine.start(panel, &mut host);
//! engine.open(panel, &mut host);
//!
//! for _ in 0..10 {
//!     engine.tick(UpdatePhase::Update, PhaseDelta::uniform(0.25), &mut host);
//! }
//! assert_eq!(engine.item(panel).unwrap().state(), ItemState::Opened);
//! ```

use cascade_config::SchedulerConfig;
use tracing::debug;

use crate::activation::{self, Ctx};
use crate::events::{EventQueue, ItemEvent, Observer};
use crate::host::Host;
use crate::id::ItemId;
use crate::item::Item;
use crate::roots::CoreRoot;
use crate::scheduler::{FrameTimes, PhaseDelta, Scheduler};
use crate::tree::ItemTree;
use crate::types::{ActivationMode, ChainDirection, ItemKey, MaterialMode, UpdatePhase};

macro_rules! activation_shortcuts {
    ($($name:ident => $mode:ident),* $(,)?) => {
        $(
            #[doc = concat!("Activate with [`ActivationMode::", stringify!($mode), "`].")]
            pub fn $name(&mut self, id: ItemId, host: &mut dyn Host) {
                self.activate(id, ActivationMode::$mode, host);
            }
        )*
    };
}

/// Item tree plus scheduler.
#[derive(Debug)]
pub struct Engine {
    tree: ItemTree,
    scheduler: Scheduler,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl Engine {
    pub fn new(config: SchedulerConfig) -> Self {
        let mut tree = ItemTree::new();
        tree.set_live(config.live);
        if let Some(limit) = config.event_queue_limit {
            *tree.events_mut() = EventQueue::bounded(limit);
        }
        Self {
            tree,
            scheduler: Scheduler::new(config),
        }
    }

    pub fn tree(&self) -> &ItemTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut ItemTree {
        &mut self.tree
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.tree.get(id)
    }

    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.tree.get_mut(id)
    }

    pub fn find(&self, name: &str) -> Option<ItemId> {
        self.tree.find(name)
    }

    /// Switch live execution mode. Loops only run while live.
    pub fn set_live(&mut self, live: bool) {
        self.tree.set_live(live);
        self.scheduler.set_live(live);
    }

    fn ctx<'a>(&'a mut self, host: &'a mut dyn Host) -> Ctx<'a> {
        self.scheduler.ctx(&mut self.tree, host)
    }

    // -- Hierarchy --

    pub fn spawn(&mut self, item: Item) -> ItemId {
        self.tree.spawn(item)
    }

    /// Re-parent `child` under `parent` and refresh both old and new ancestry.
    pub fn attach(&mut self, child: ItemId, parent: ItemId, host: &mut dyn Host) -> bool {
        let old_parent = self.tree.get(child).and_then(|item| item.scene_parent);
        if !self.tree.attach(child, parent) {
            return false;
        }
        if let Some(old) = old_parent.filter(|old| *old != parent) {
            self.tree.refresh(old, host);
        }
        self.tree.refresh(child, host);
        true
    }

    /// Make `child` a scene root and refresh both sides.
    pub fn detach(&mut self, child: ItemId, host: &mut dyn Host) {
        let old_parent = self.tree.get(child).and_then(|item| item.scene_parent);
        self.tree.detach(child);
        if let Some(old) = old_parent {
            self.tree.refresh(old, host);
        }
        self.tree.refresh(child, host);
    }

    pub fn set_enabled(&mut self, id: ItemId, enabled: bool, host: &mut dyn Host) {
        self.tree.set_enabled(id, enabled);
        self.tree.refresh(id, host);
    }

    /// Remove an item and its subtree from the tree and the scheduler.
    pub fn despawn(&mut self, id: ItemId, host: &mut dyn Host) {
        let old_parent = self.tree.get(id).and_then(|item| item.scene_parent);
        for removed in self.tree.despawn(id) {
            self.scheduler.unregister_item(removed);
        }
        if let Some(old) = old_parent {
            self.tree.refresh(old, host);
        }
    }

    pub fn refresh(&mut self, id: ItemId, host: &mut dyn Host) {
        self.tree.refresh(id, host);
    }

    pub fn refresh_all(&mut self, host: &mut dyn Host) {
        self.tree.refresh_all(host);
    }

    pub fn set_chain_direction(&mut self, id: ItemId, key: ItemKey, direction: ChainDirection) {
        self.tree.set_chain_direction(id, key, direction);
    }

    pub fn set_material_mode(&mut self, id: ItemId, mode: MaterialMode, host: &mut dyn Host) {
        self.tree.set_material_mode(id, mode, host);
    }

    // -- Activation --

    /// Apply the item's start action.
    pub fn start(&mut self, id: ItemId, host: &mut dyn Host) {
        activation::start(&mut self.ctx(host), id);
    }

    /// Apply the start action of every scene root.
    pub fn start_all(&mut self, host: &mut dyn Host) {
        for root in self.tree.roots() {
            self.start(root, host);
        }
    }

    pub fn activate(&mut self, id: ItemId, mode: ActivationMode, host: &mut dyn Host) {
        activation::activate(&mut self.ctx(host), id, mode);
    }

    pub fn open(&mut self, id: ItemId, host: &mut dyn Host) {
        activation::open(&mut self.ctx(host), id);
    }

    pub fn close(&mut self, id: ItemId, host: &mut dyn Host) {
        activation::close(&mut self.ctx(host), id);
    }

    pub fn open_close(&mut self, id: ItemId, host: &mut dyn Host) {
        activation::open_close(&mut self.ctx(host), id);
    }

    activation_shortcuts! {
        open_single => Open,
        close_single => Close,
        toggle_single => OpenClose,
        open_branch => OpenBranch,
        close_branch => CloseBranch,
        toggle_branch => OpenCloseBranch,
        open_immediately => OpenImmediately,
        close_immediately => CloseImmediately,
        toggle_immediately => OpenCloseImmediately,
        open_branch_immediately => OpenBranchImmediately,
        close_branch_immediately => CloseBranchImmediately,
        toggle_branch_immediately => OpenCloseBranchImmediately,
    }

    /// Drive an item at `value` with its open-direction tweens.
    pub fn evaluate(&mut self, id: ItemId, value: f32, host: &mut dyn Host) {
        self.evaluate_with(id, value, ItemKey::Opened, host);
    }

    pub fn evaluate_with(&mut self, id: ItemId, value: f32, key: ItemKey, host: &mut dyn Host) {
        activation::evaluate(&mut self.ctx(host), id, value, key);
    }

    pub fn evaluate_branch(&mut self, id: ItemId, value: f32, host: &mut dyn Host) {
        self.evaluate_branch_with(id, value, ItemKey::Opened, host);
    }

    pub fn evaluate_branch_with(
        &mut self,
        id: ItemId,
        value: f32,
        key: ItemKey,
        host: &mut dyn Host,
    ) {
        activation::evaluate_branch(&mut self.ctx(host), id, value, key);
    }

    pub fn press(&mut self, id: ItemId, host: &mut dyn Host) {
        activation::press(&mut self.ctx(host), id);
    }

    // -- Events --

    /// Add a lifecycle observer. Returns `false` for a stale handle.
    pub fn subscribe(&mut self, id: ItemId, observer: Observer) -> bool {
        match self.tree.get_mut(id) {
            Some(item) => {
                item.subscribe(observer);
                true
            }
            None => false,
        }
    }

    /// Mirror an item's lifecycle events into the event queue.
    pub fn set_queue_events(&mut self, id: ItemId, enabled: bool) {
        if let Some(item) = self.tree.get_mut(id) {
            item.set_queue_events(enabled);
        }
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = ItemEvent> + '_ {
        self.tree.drain_events()
    }

    // -- Roots and scene boundaries --

    pub fn register_root(&mut self, root: CoreRoot) {
        self.scheduler.register_root(root);
    }

    pub fn select_state(&mut self, root: &str, state: &str, host: &mut dyn Host) -> bool {
        self.scheduler.select_state(&mut self.tree, host, root, state)
    }

    pub fn scene_loaded(&mut self, host: &mut dyn Host) {
        debug!(items = self.tree.len(), "scene loaded");
        self.scheduler.scene_loaded(&mut self.tree, host);
    }

    pub fn scene_unloaded(&mut self) {
        debug!("scene unloaded");
        self.scheduler.scene_unloaded();
    }

    // -- Ticking --

    pub fn tick(&mut self, phase: UpdatePhase, delta: PhaseDelta, host: &mut dyn Host) {
        self.scheduler.tick(&mut self.tree, host, phase, delta);
    }

    /// One host frame: normal phase, every fixed step, then the post phase.
    pub fn frame(&mut self, times: &FrameTimes, host: &mut dyn Host) {
        self.tick(UpdatePhase::Update, times.update, host);
        for _ in 0..times.fixed_steps {
            self.tick(UpdatePhase::FixedUpdate, times.fixed, host);
        }
        self.tick(UpdatePhase::LateUpdate, times.update, host);
    }
}
