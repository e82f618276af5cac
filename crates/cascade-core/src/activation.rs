//! Activation engine.
//!
//! Stateless algorithms that start transitions on items:
//! - `activate` dispatches an [`ActivationMode`] (single or branch, open,
//!   close or toggle, timed or immediate)
//! - `evaluate` / `evaluate_branch` put items under external control
//! - `press` arms the button afterglow
//! - `start` applies an item's configured start action
//!
//! Timed activations only set the pending delay, the branch flag and the
//! transient state, then register the item; the scheduler does the rest.
//! Immediate activations complete synchronously, children first, so every
//! parent census is already correct when the parent snaps to its bound.
//!
//! The latest call always wins: activating an item that is mid-transition
//! overrides its pending delay, direction and state.

use tracing::{debug, trace, warn};

use crate::host::Host;
use crate::id::ItemId;
use crate::scheduler::Registry;
use crate::tree::ItemTree;
use crate::tween::TweenDirection;
use crate::types::{ActivationMode, ItemKey, ItemState};

/// Mutable view of everything an activation touches.
pub struct Ctx<'a> {
    pub tree: &'a mut ItemTree,
    pub registry: &'a mut Registry,
    pub host: &'a mut dyn Host,
}

impl<'a> Ctx<'a> {
    pub fn new(tree: &'a mut ItemTree, registry: &'a mut Registry, host: &'a mut dyn Host) -> Self {
        Self {
            tree,
            registry,
            host,
        }
    }

    /// Register an item with the scheduler phase it is configured for.
    pub fn register(&mut self, id: ItemId) {
        if let Some(item) = self.tree.get(id) {
            self.registry.register(item.values.updating_type, id);
        }
    }
}

/// Activate an item with `mode`.
///
/// An external activation ends any loop the item was running; the loop is
/// armed again the next time the item settles opened.
pub fn activate(ctx: &mut Ctx<'_>, id: ItemId, mode: ActivationMode) {
    let Some(item) = ctx.tree.get_mut(id) else {
        warn!(item = %id, ?mode, "activation of a stale item handle");
        return;
    };
    item.loop_activated = false;
    item.current_loops = 0;
    dispatch(ctx, id, mode);
}

/// Activation issued by the loop logic; keeps the loop bookkeeping intact.
pub(crate) fn activate_from_loop(ctx: &mut Ctx<'_>, id: ItemId, mode: ActivationMode) {
    dispatch(ctx, id, mode);
}

fn dispatch(ctx: &mut Ctx<'_>, id: ItemId, mode: ActivationMode) {
    let Some(item) = ctx.tree.get(id) else {
        return;
    };
    let Some(key) = mode.direction(item.state) else {
        return;
    };

    debug!(item = %id, name = %item.name, ?mode, "activate");
    if mode.is_immediate() {
        activate_immediate(ctx, id, key, mode.is_branch());
    } else {
        activate_timed(ctx, id, key, mode.is_branch(), false);
    }
}

/// Open with the item's configured open activation.
pub fn open(ctx: &mut Ctx<'_>, id: ItemId) {
    if let Some(mode) = ctx.tree.get(id).map(|item| item.values.activation_open) {
        activate(ctx, id, mode);
    }
}

/// Close with the item's configured close activation.
pub fn close(ctx: &mut Ctx<'_>, id: ItemId) {
    if let Some(mode) = ctx.tree.get(id).map(|item| item.values.activation_close) {
        activate(ctx, id, mode);
    }
}

/// Open closing or closed items, close everything else.
pub fn open_close(ctx: &mut Ctx<'_>, id: ItemId) {
    match ctx.tree.get(id).map(|item| item.state) {
        Some(ItemState::Closing | ItemState::Closed) => open(ctx, id),
        Some(_) => close(ctx, id),
        None => warn!(item = %id, "toggle of a stale item handle"),
    }
}

/// Emit the closed look of every tween, then apply the start action.
pub fn start(ctx: &mut Ctx<'_>, id: ItemId) {
    let Some(item) = ctx.tree.get_mut(id) else {
        warn!(item = %id, "start of a stale item handle");
        return;
    };

    for tween in item.tweens.iter_mut() {
        if tween.enabled && tween.direction != TweenDirection::Button {
            let value = tween.evaluate(0.0, ItemKey::Closed);
            ctx.host.apply_effect(id, tween.effect, value);
        }
    }

    let mode = item.values.start_action;
    activate(ctx, id, mode);
}

fn activate_timed(ctx: &mut Ctx<'_>, id: ItemId, key: ItemKey, branch: bool, brake: bool) {
    let delay = if brake {
        0.0
    } else {
        ctx.tree.effective_delay(id, key)
    };
    let Some(item) = ctx.tree.get_mut(id) else {
        return;
    };

    let reversing = item.state == key.opposite().transient_state();
    let brake_children = brake || (branch && reversing && item.values.brake_chain_delay);
    let child_before = item.values.child_before[key];

    item.state_chg_time = delay;
    item.state_chg_branch_mode = branch;
    item.state_chg_brake = brake_children;

    ctx.tree.set_state(id, key.transient_state(), ctx.host);
    ctx.register(id);

    if branch && child_before {
        activate_children(ctx, id, key, brake_children);
    }
}

/// Start a timed branch activation on every child of `id`.
pub(crate) fn activate_children(ctx: &mut Ctx<'_>, id: ItemId, key: ItemKey, brake: bool) {
    let Some(children) = ctx.tree.get(id).map(|item| item.children.clone()) else {
        return;
    };
    for child in children {
        activate_timed(ctx, child, key, true, brake);
    }
}

fn activate_immediate(ctx: &mut Ctx<'_>, id: ItemId, key: ItemKey, branch: bool) {
    if branch {
        let children = ctx
            .tree
            .get(id)
            .map(|item| item.children.clone())
            .unwrap_or_default();
        for child in children {
            activate_immediate(ctx, child, key, true);
        }
    }

    let Some(item) = ctx.tree.get_mut(id) else {
        return;
    };
    item.state_chg_time = -1.0;
    item.state_chg_branch_mode = branch;
    item.state_chg_brake = false;
    item.time = key.bound();
    let keep_ticking = item.loop_activated || item.button_evaluation > 0.0;

    ctx.tree.set_state(id, key.terminal_state(), ctx.host);
    emit_tweens(ctx, id, key.bound(), key);

    match key {
        ItemKey::Opened => ctx.register(id),
        ItemKey::Closed if !keep_ticking => ctx.registry.unregister(id),
        ItemKey::Closed => {}
    }
}

/// Force every tween reacting to `key` to `progress` and emit the result.
fn emit_tweens(ctx: &mut Ctx<'_>, id: ItemId, progress: f32, key: ItemKey) {
    let Some(item) = ctx.tree.get_mut(id) else {
        return;
    };
    for tween in item.tweens.iter_mut() {
        if tween.enabled && tween.direction.matches(key) {
            let value = tween.evaluate(progress, key);
            trace!(item = %id, effect = ?tween.effect, value, "effect");
            ctx.host.apply_effect(id, tween.effect, value);
        }
    }
}

/// Drive an item from outside at a fixed progress.
///
/// The item enters the slave state, leaving the parent census, and every
/// tween reacting to `key` is forced to `value`.
pub fn evaluate(ctx: &mut Ctx<'_>, id: ItemId, value: f32, key: ItemKey) {
    if !ctx.tree.is_alive(id) {
        warn!(item = %id, "evaluation of a stale item handle");
        return;
    }
    let value = value.clamp(0.0, 1.0);

    ctx.tree.set_state(id, ItemState::Slave, ctx.host);
    if let Some(item) = ctx.tree.get_mut(id) {
        item.time = value;
        item.state_chg_time = -1.0;
    }
    emit_tweens(ctx, id, value, key);
}

/// [`evaluate`] on an item and all of its descendants.
pub fn evaluate_branch(ctx: &mut Ctx<'_>, id: ItemId, value: f32, key: ItemKey) {
    evaluate(ctx, id, value, key);
    let children = ctx
        .tree
        .get(id)
        .map(|item| item.children.clone())
        .unwrap_or_default();
    for child in children {
        evaluate_branch(ctx, child, value, key);
    }
}

/// Arm the press afterglow.
///
/// An idle item restarts its countdown at its own `button_duration`, and the
/// countdown is pushed down its whole branch. Idle direct children then
/// restart on their own duration.
pub fn press(ctx: &mut Ctx<'_>, id: ItemId) {
    let Some(item) = ctx.tree.get(id) else {
        warn!(item = %id, "press of a stale item handle");
        return;
    };
    let children = item.children.clone();
    if item.button_evaluation <= 0.0 {
        let duration = item.values.button_duration;
        set_button_evaluation(ctx, id, duration);
    }

    for child in children {
        let idle_duration = ctx
            .tree
            .get(child)
            .filter(|item| item.button_evaluation <= 0.0)
            .map(|item| item.values.button_duration);
        if let Some(duration) = idle_duration {
            set_button_evaluation(ctx, child, duration);
        }
    }
}

/// Write the press countdown to an item and every descendant. Items left
/// with a running countdown are registered so their button tweens tick.
pub(crate) fn set_button_evaluation(ctx: &mut Ctx<'_>, id: ItemId, value: f32) {
    let value = value.max(0.0);
    let mut stack = vec![id];
    while let Some(current) = stack.pop() {
        let Some(item) = ctx.tree.get_mut(current) else {
            continue;
        };
        item.button_evaluation = value;
        stack.extend(item.children.iter().rev().copied());
        if value > 0.0 {
            ctx.register(current);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{EffectKind, NullHost};
    use crate::item::{Item, ItemValues};
    use crate::tween::Tween;
    use crate::types::{Keyed, UpdatePhase};

    struct Fixture {
        tree: ItemTree,
        registry: Registry,
        host: NullHost,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                tree: ItemTree::new(),
                registry: Registry::default(),
                host: NullHost,
            }
        }

        fn ctx(&mut self) -> Ctx<'_> {
            Ctx::new(&mut self.tree, &mut self.registry, &mut self.host)
        }

        fn family(&mut self, values: ItemValues, children: usize) -> (ItemId, Vec<ItemId>) {
            let root = self.tree.spawn(Item::with_values("root", values));
            let kids = (0..children)
                .map(|i| {
                    let child = self.tree.spawn(Item::new(format!("child{i}")));
                    self.tree.attach(child, root);
                    child
                })
                .collect();
            self.tree.refresh_all(&mut self.host);
            (root, kids)
        }

        fn state(&self, id: ItemId) -> ItemState {
            self.tree.get(id).unwrap().state()
        }
    }

    #[test]
    fn test_timed_open_sets_delay_and_registers() {
        let mut fx = Fixture::new();
        let values = ItemValues {
            delay: Keyed::new(0.0, 0.75),
            ..ItemValues::default()
        };
        let (root, children) = fx.family(values, 2);

        activate(&mut fx.ctx(), root, ActivationMode::OpenBranch);

        let item = fx.tree.get(root).unwrap();
        assert_eq!(item.state(), ItemState::Opening);
        assert_eq!(item.state_chg_time(), 0.75);
        assert!(item.state_chg_branch_mode());
        assert!(fx.registry.contains(UpdatePhase::Update, root));

        // Children wait for the parent's delay.
        for child in children {
            assert_eq!(fx.state(child), ItemState::Closed);
        }
    }

    #[test]
    fn test_child_before_starts_children_at_once() {
        let mut fx = Fixture::new();
        let values = ItemValues {
            child_before: Keyed::new(false, true),
            ..ItemValues::default()
        };
        let (root, children) = fx.family(values, 2);

        activate(&mut fx.ctx(), root, ActivationMode::OpenBranch);

        for child in &children {
            assert_eq!(fx.state(*child), ItemState::Opening);
            assert!(fx.registry.contains(UpdatePhase::Update, *child));
        }
        assert_eq!(fx.tree.get(root).unwrap().child_count(ItemState::Opening), 2);
    }

    #[test]
    fn test_immediate_branch_snaps_whole_tree() {
        let mut fx = Fixture::new();
        let (root, children) = fx.family(ItemValues::default(), 3);

        activate(&mut fx.ctx(), root, ActivationMode::OpenBranchImmediately);
        for id in children.iter().chain([&root]) {
            let item = fx.tree.get(*id).unwrap();
            assert_eq!(item.state(), ItemState::Opened);
            assert_eq!(item.time(), 1.0);
        }
        assert_eq!(fx.tree.get(root).unwrap().child_count(ItemState::Opened), 3);
        assert!(fx.registry.contains(UpdatePhase::Update, root));

        activate(&mut fx.ctx(), root, ActivationMode::CloseBranchImmediately);
        assert_eq!(fx.state(root), ItemState::Closed);
        assert_eq!(fx.tree.get(root).unwrap().time(), 0.0);
        assert!(!fx.registry.is_registered(root));
    }

    #[test]
    fn test_disabled_is_noop() {
        let mut fx = Fixture::new();
        let (root, _) = fx.family(ItemValues::default(), 0);
        activate(&mut fx.ctx(), root, ActivationMode::Disabled);
        assert_eq!(fx.state(root), ItemState::Closed);
        assert!(!fx.registry.is_registered(root));
    }

    #[test]
    fn test_toggle_follows_state() {
        let mut fx = Fixture::new();
        let (root, _) = fx.family(ItemValues::default(), 0);

        open_close(&mut fx.ctx(), root);
        assert_eq!(fx.state(root), ItemState::Opening);

        open_close(&mut fx.ctx(), root);
        assert_eq!(fx.state(root), ItemState::Closing);
    }

    #[test]
    fn test_latest_activation_wins() {
        let mut fx = Fixture::new();
        let values = ItemValues {
            delay: Keyed::new(0.2, 0.5),
            ..ItemValues::default()
        };
        let (root, _) = fx.family(values, 0);

        activate(&mut fx.ctx(), root, ActivationMode::Open);
        activate(&mut fx.ctx(), root, ActivationMode::Close);

        let item = fx.tree.get(root).unwrap();
        assert_eq!(item.state(), ItemState::Closing);
        assert_eq!(item.state_chg_time(), 0.2);
    }

    #[test]
    fn test_brake_chain_delay_on_reversal() {
        let mut fx = Fixture::new();
        let values = ItemValues {
            brake_chain_delay: true,
            child_before: Keyed::splat(true),
            ..ItemValues::default()
        };
        let (root, children) = fx.family(values, 1);
        fx.tree.get_mut(children[0]).unwrap().values.delay = Keyed::splat(2.0);

        activate(&mut fx.ctx(), root, ActivationMode::OpenBranch);
        assert_eq!(fx.tree.get(children[0]).unwrap().state_chg_time(), 2.0);

        activate(&mut fx.ctx(), root, ActivationMode::CloseBranch);
        let child = fx.tree.get(children[0]).unwrap();
        assert_eq!(child.state(), ItemState::Closing);
        assert_eq!(child.state_chg_time(), 0.0);
    }

    #[test]
    fn test_evaluate_branch_enters_slave() {
        let mut fx = Fixture::new();
        let (root, children) = fx.family(ItemValues::default(), 2);
        fx.tree.get_mut(children[0]).unwrap().tweens.push(Tween::new(EffectKind::Scale));

        evaluate_branch(&mut fx.ctx(), root, 0.4, ItemKey::Opened);

        for id in children.iter().chain([&root]) {
            let item = fx.tree.get(*id).unwrap();
            assert_eq!(item.state(), ItemState::Slave);
            assert_eq!(item.time(), 0.4);
        }
        assert_eq!(fx.tree.get(children[0]).unwrap().tweens[0].last_value(), 0.4);
        assert_eq!(fx.tree.get(root).unwrap().child_counts(), [0, 0, 0, 0]);
    }

    #[test]
    fn test_press_pushes_countdown_down_the_branch() {
        let mut fx = Fixture::new();
        let (root, children) = fx.family(
            ItemValues {
                button_duration: 0.5,
                ..ItemValues::default()
            },
            2,
        );
        let grandchild = fx.tree.spawn(Item::new("grandchild"));
        fx.tree.attach(grandchild, children[0]);
        fx.tree.refresh_all(&mut fx.host);
        fx.tree.get_mut(children[1]).unwrap().values.button_duration = 0.2;

        press(&mut fx.ctx(), root);

        for id in [root, children[0], children[1], grandchild] {
            assert_eq!(fx.tree.get(id).unwrap().button_evaluation(), 0.5);
            assert!(fx.registry.is_registered(id));
        }
    }

    #[test]
    fn test_press_on_running_item_rearms_idle_children() {
        let mut fx = Fixture::new();
        let (root, children) = fx.family(
            ItemValues {
                button_duration: 0.5,
                ..ItemValues::default()
            },
            2,
        );
        for child in &children {
            fx.tree.get_mut(*child).unwrap().values.button_duration = 0.3;
        }
        fx.tree.get_mut(root).unwrap().button_evaluation = 0.25;
        fx.tree.get_mut(children[1]).unwrap().button_evaluation = 0.1;

        press(&mut fx.ctx(), root);

        assert_eq!(fx.tree.get(root).unwrap().button_evaluation(), 0.25);
        assert_eq!(fx.tree.get(children[0]).unwrap().button_evaluation(), 0.3);
        assert_eq!(fx.tree.get(children[1]).unwrap().button_evaluation(), 0.1);
    }

    #[test]
    fn test_external_activation_ends_loop() {
        let mut fx = Fixture::new();
        let values = ItemValues {
            loops: -1,
            ..ItemValues::default()
        };
        let (root, _) = fx.family(values, 0);
        {
            let item = fx.tree.get_mut(root).unwrap();
            item.loop_activated = true;
            item.current_loops = -1;
        }

        close(&mut fx.ctx(), root);
        let item = fx.tree.get(root).unwrap();
        assert!(!item.loop_activated());
        assert_eq!(item.state(), ItemState::Closing);
    }
}
