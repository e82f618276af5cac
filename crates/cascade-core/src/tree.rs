//! Item arena and hierarchy.
//!
//! Items live in slots addressed by generational [`ItemId`] handles. Despawned
//! slots are recycled through a free list; the generation counter makes old
//! handles fail every lookup instead of aliasing the new occupant.
//!
//! The tree keeps two views of the hierarchy:
//! - the scene mirror (`attach`/`detach`/`set_enabled`), which follows the
//!   host's object hierarchy exactly
//! - the cached adjacency (`parent`, `children`, census), which `refresh`
//!   derives from the scene mirror honoring `enabled`, `ignore_parent` and
//!   `ignore_childs`
//!
//! Only the cached view is used by activation and the scheduler. Any edit to
//! the scene mirror must be followed by a `refresh` of the touched items.

use tracing::{debug, warn};

use crate::chain;
use crate::events::{EventQueue, ItemEvent};
use crate::host::{Host, switch_media};
use crate::id::ItemId;
use crate::item::Item;
use crate::types::{ChainDirection, ItemKey, ItemState, MaterialMode};

#[derive(Debug)]
struct Slot {
    generation: u32,
    item: Option<Item>,
}

/// Arena of every item known to the engine.
#[derive(Debug)]
pub struct ItemTree {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    events: EventQueue,
    live: bool,
}

impl Default for ItemTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemTree {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            events: EventQueue::new(),
            live: true,
        }
    }

    /// Whether the host runs in live execution mode.
    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn set_live(&mut self, live: bool) {
        self.live = live;
    }

    // -- Allocation --

    /// Add an item to the arena as an unattached root.
    pub fn spawn(&mut self, mut item: Item) -> ItemId {
        item.scene_parent = None;
        item.scene_children.clear();

        let idx = if let Some(idx) = self.free_list.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.item = Some(item);
            idx
        } else {
            let idx = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                item: Some(item),
            });
            idx
        };

        ItemId {
            idx,
            generation: self.slots[idx as usize].generation,
        }
    }

    /// Remove an item and its whole scene subtree.
    ///
    /// Returns every removed handle, root first. The caller is responsible for
    /// unregistering them from the scheduler and refreshing the old parent.
    pub fn despawn(&mut self, id: ItemId) -> Vec<ItemId> {
        if !self.is_alive(id) {
            warn!(item = %id, "despawn of a stale item handle");
            return Vec::new();
        }

        self.detach(id);

        let mut removed = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let slot = &mut self.slots[current.idx as usize];
            if let Some(item) = slot.item.take() {
                stack.extend(item.scene_children.iter().rev().copied());
                slot.generation = slot.generation.wrapping_add(1);
                self.free_list.push(current.idx);
                removed.push(current);
            }
        }

        debug!(item = %id, count = removed.len(), "despawned subtree");
        removed
    }

    /// Returns whether the given handle refers to a live item.
    pub fn is_alive(&self, id: ItemId) -> bool {
        self.slots
            .get(id.idx as usize)
            .is_some_and(|slot| slot.generation == id.generation && slot.item.is_some())
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.slots
            .get(id.idx as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.item.as_ref())
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.slots
            .get_mut(id.idx as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.item.as_mut())
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Handles of every live item, in slot order.
    pub fn ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| {
            slot.item.as_ref().map(|_| ItemId {
                idx: idx as u32,
                generation: slot.generation,
            })
        })
    }

    /// Items without a scene parent.
    pub fn roots(&self) -> Vec<ItemId> {
        self.ids()
            .filter(|id| self.get(*id).is_some_and(|item| item.scene_parent.is_none()))
            .collect()
    }

    /// First live item with the given name.
    pub fn find(&self, name: &str) -> Option<ItemId> {
        self.ids()
            .find(|id| self.get(*id).is_some_and(|item| item.name == name))
    }

    // -- Scene mirror --

    /// Make `child` the last scene child of `parent`.
    ///
    /// Returns `false` (and changes nothing) when either handle is stale or
    /// the edit would create a cycle.
    pub fn attach(&mut self, child: ItemId, parent: ItemId) -> bool {
        if !self.is_alive(child) || !self.is_alive(parent) {
            warn!(item = %child, parent = %parent, "attach with a stale item handle");
            return false;
        }
        if self.is_scene_ancestor(child, parent) {
            warn!(item = %child, parent = %parent, "attach would create a cycle");
            return false;
        }

        self.detach(child);
        if let Some(item) = self.get_mut(child) {
            item.scene_parent = Some(parent);
        }
        if let Some(item) = self.get_mut(parent) {
            item.scene_children.push(child);
        }
        true
    }

    /// Remove `child` from its scene parent, making it a scene root.
    pub fn detach(&mut self, child: ItemId) {
        let Some(parent) = self.get(child).and_then(|item| item.scene_parent) else {
            return;
        };
        if let Some(item) = self.get_mut(parent) {
            item.scene_children.retain(|c| *c != child);
        }
        if let Some(item) = self.get_mut(child) {
            item.scene_parent = None;
        }
    }

    /// Toggle whether the item takes part in its parent's children.
    pub fn set_enabled(&mut self, id: ItemId, enabled: bool) {
        if let Some(item) = self.get_mut(id) {
            item.enabled = enabled;
        }
    }

    /// Whether `ancestor` is `id` or one of its scene ancestors.
    fn is_scene_ancestor(&self, ancestor: ItemId, id: ItemId) -> bool {
        let mut current = Some(id);
        let mut remaining = self.slots.len();
        while let Some(cur) = current {
            if cur == ancestor {
                return true;
            }
            if remaining == 0 {
                break;
            }
            remaining -= 1;
            current = self.get(cur).and_then(|item| item.scene_parent);
        }
        false
    }

    // -- Events --

    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventQueue {
        &mut self.events
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = ItemEvent> + '_ {
        self.events.drain()
    }

    // -- State --

    /// Parent whose census this item takes part in.
    fn census_parent(&self, id: ItemId) -> Option<ItemId> {
        let item = self.get(id)?;
        if item.values.loops != 0 || item.values.ignore_parent {
            return None;
        }
        let parent = item.parent?;
        let parent_item = self.get(parent)?;
        (!parent_item.values.ignore_childs).then_some(parent)
    }

    /// Write an item's state.
    ///
    /// Surfaces and media follow the new state first. Then the parent's census
    /// count for the old state is decremented, the state is assigned and
    /// observers are notified, and finally the census count for the new state
    /// is incremented. Writing the current state again is a no-op.
    pub fn set_state(&mut self, id: ItemId, state: ItemState, host: &mut dyn Host) {
        let Some(item) = self.get(id) else {
            warn!(item = %id, ?state, "state write on a stale item handle");
            return;
        };
        let old = item.state;
        if old == state {
            return;
        }

        apply_surface_state(id, item, state, host);

        let census_parent = self.census_parent(id);
        if let (Some(parent), Some(slot)) = (census_parent, old.census_slot()) {
            if let Some(parent) = self.get_mut(parent) {
                parent.child_counts[slot] = parent.child_counts[slot].saturating_sub(1);
            }
        }

        let Some(item) = self.get_mut(id) else {
            return;
        };
        item.state = state;
        debug!(item = %id, name = %item.name, from = ?old, to = ?state, "state change");

        let mut queued = None;
        if item.has_subscribers() {
            if let Some(event) = ItemEvent::for_state(state, id, &item.name) {
                item.observers.notify(&event);
                if item.queue_events {
                    queued = Some(event);
                }
            }
        }
        if let Some(event) = queued {
            self.events.push(event);
        }

        if let (Some(parent), Some(slot)) = (census_parent, state.census_slot()) {
            if let Some(parent) = self.get_mut(parent) {
                parent.child_counts[slot] += 1;
            }
        }
    }

    /// Delay an item waits before a transition towards `key`.
    ///
    /// Children of a parent in chain mode use the delay the parent's chain
    /// assigned them; everyone else uses their own configured delay.
    pub fn effective_delay(&self, id: ItemId, key: ItemKey) -> f32 {
        let Some(item) = self.get(id) else {
            return 0.0;
        };
        let chained = item
            .parent
            .and_then(|parent| self.get(parent))
            .is_some_and(|parent| parent.values.child_chain_mode);

        if chained {
            item.chain_delay[key]
        } else {
            item.values.delay[key]
        }
    }

    /// Change the chain ordering for one direction and recompute the delays.
    pub fn set_chain_direction(&mut self, id: ItemId, key: ItemKey, direction: ChainDirection) {
        let Some(item) = self.get_mut(id) else {
            return;
        };
        item.values.chain_direction[key] = direction;
        chain::update_item_delays_in_chain(self, id, key);
    }

    /// Change the material mode and re-resolve the material.
    pub fn set_material_mode(&mut self, id: ItemId, mode: MaterialMode, host: &mut dyn Host) {
        let live = self.live;
        let Some(item) = self.get_mut(id) else {
            return;
        };
        if item.values.material_mode == mode {
            return;
        }
        item.values.material_mode = mode;
        item.material = host.material(id, mode, live);
    }

    // -- Refresh --

    /// Rebuild the cached adjacency of an item and of every ancestor.
    ///
    /// Children are re-enumerated, numbered from 1 and re-linked, the census
    /// is recounted from their current states, chain delays are recomputed
    /// for both directions and host capabilities are probed again. The pass
    /// then continues with the scene parent, so the whole ancestor path ends
    /// up consistent. Calling it again without scene edits changes nothing.
    pub fn refresh(&mut self, id: ItemId, host: &mut dyn Host) {
        if !self.is_alive(id) {
            warn!(item = %id, "refresh of a stale item handle");
            return;
        }

        let mut current = Some(id);
        let mut remaining = self.slots.len();
        while let Some(cur) = current {
            if remaining == 0 || !self.is_alive(cur) {
                break;
            }
            remaining -= 1;

            self.refresh_children(cur);
            for key in ItemKey::BOTH {
                chain::update_item_delays_in_chain(self, cur, key);
            }
            self.resolve_capabilities(cur, host);
            current = self.refresh_parent_link(cur);
        }
    }

    /// Refresh every live item.
    pub fn refresh_all(&mut self, host: &mut dyn Host) {
        let ids: Vec<ItemId> = self.ids().collect();
        for id in ids {
            self.refresh(id, host);
        }
    }

    fn refresh_children(&mut self, id: ItemId) {
        let Some(item) = self.get(id) else {
            return;
        };
        let scene_children = item.scene_children.clone();
        let opaque = item.values.ignore_childs;

        let mut adopted = Vec::with_capacity(scene_children.len());
        let mut counts = [0u32; 4];
        let mut without_loops = 0;

        for child in scene_children {
            let Some(c) = self.get_mut(child) else {
                continue;
            };
            if opaque || !c.enabled || c.values.ignore_parent {
                c.parent = None;
                c.sibling_id = 1;
                continue;
            }

            adopted.push(child);
            c.sibling_id = adopted.len() as u32;
            c.parent = Some(id);

            if c.values.loops == 0 {
                without_loops += 1;
                if let Some(slot) = c.state.census_slot() {
                    counts[slot] += 1;
                }
            }
        }

        if let Some(item) = self.get_mut(id) {
            item.children = adopted;
            item.child_counts = counts;
            item.child_count_without_loops = without_loops;
        }
    }

    /// Returns the scene parent to continue the upward pass with.
    fn refresh_parent_link(&mut self, id: ItemId) -> Option<ItemId> {
        let item = self.get_mut(id)?;
        let scene_parent = item.scene_parent;
        if scene_parent.is_none() {
            item.parent = None;
            item.sibling_id = 1;
        }
        scene_parent.filter(|parent| self.is_alive(*parent))
    }

    fn resolve_capabilities(&mut self, id: ItemId, host: &mut dyn Host) {
        let live = self.live;
        let Some(item) = self.get_mut(id) else {
            return;
        };

        let capabilities = host.probe(id);
        item.material = host.material(id, item.values.material_mode, live);
        if capabilities.path {
            if let Some(path) = host.path(id) {
                path.refresh();
            }
        }
        item.capabilities = capabilities;
    }
}

/// Forward the surface state to the host collaborators the item opted into.
fn apply_surface_state(id: ItemId, item: &Item, state: ItemState, host: &mut dyn Host) {
    let enabled = state.surface_enabled();
    let caps = item.capabilities;
    let values = &item.values;

    if values.interactions && caps.interactable {
        host.set_interactable(id, enabled);
    }
    if values.block_raycasting && caps.raycast_target {
        host.set_raycast_target(id, enabled);
    }
    if values.sound_control && caps.audio {
        if let Some(player) = host.audio(id) {
            switch_media(player, state, values.sound_restart);
        }
    }
    if values.video_control && caps.video {
        if let Some(player) = host.video(id) {
            switch_media(player, state, values.video_restart);
        }
    }
}
