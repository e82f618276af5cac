//! Central per-frame scheduler.
//!
//! The [`Scheduler`] owns the registry of active items (one ordered,
//! duplicate-free list per [`UpdatePhase`]) and the core roots. The host calls
//! [`Scheduler::tick`] once per phase per frame; every registered item of that
//! phase is stepped in registration order.
//!
//! # Architecture
//!
//! ```text
//! host frame
//!   └── tick(phase, delta)
//!         └── for each registered item (registration order)
//!               ├── path follower update
//!               ├── state step (opening / closing / closed / opened)
//!               │     ├── delay countdown, child branch trigger
//!               │     ├── progress advance, census-gated completion
//!               │     ├── input polling, media end detection
//!               │     └── loop re-activation (bounded catch-up)
//!               ├── button afterglow
//!               └── retire idle closed items
//! ```
//!
//! Items may register or unregister while a phase is being ticked. Every
//! registered item is stepped at most once per tick; items registered during
//! the tick are stepped in the same tick, after the items already visited.

use std::collections::HashSet;

use cascade_config::SchedulerConfig;
use tracing::{debug, trace, warn};

use crate::activation::{self, Ctx};
use crate::host::{Host, near_end};
use crate::id::ItemId;
use crate::roots::CoreRoot;
use crate::tree::ItemTree;
use crate::tween::TweenDirection;
use crate::types::{ButtonDirection, ItemKey, ItemState, UpdatePhase};

/// Delta times delivered for one phase tick, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhaseDelta {
    /// Delta affected by the host's time scale.
    pub scaled: f32,
    /// Real delta.
    pub unscaled: f32,
}

impl PhaseDelta {
    pub fn new(scaled: f32, unscaled: f32) -> Self {
        Self { scaled, unscaled }
    }

    /// Same delta for scaled and unscaled items.
    pub fn uniform(dt: f32) -> Self {
        Self::new(dt, dt)
    }

    pub fn for_item(&self, time_scaled: bool) -> f32 {
        if time_scaled { self.scaled } else { self.unscaled }
    }
}

/// Deltas for one host frame: the normal and post phases share `update`,
/// the fixed phase runs `fixed_steps` times with `fixed`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameTimes {
    pub update: PhaseDelta,
    pub fixed: PhaseDelta,
    pub fixed_steps: u32,
}

/// Fixed-rate frame clock for headless hosts.
///
/// Each [`FrameClock::advance`] produces one frame of deltas. Fixed steps are
/// accumulated from scaled time so a time scale of zero pauses the fixed
/// phase.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameClock {
    frame_dt: f32,
    fixed_dt: f32,
    time_scale: f32,
    accumulator: f32,
}

impl FrameClock {
    /// Rates are in frames per second. A non-positive fixed rate disables
    /// the fixed phase.
    pub fn new(frame_rate: f32, fixed_rate: f32, time_scale: f32) -> Self {
        let rate_dt = |rate: f32| if rate > 0.0 { 1.0 / rate } else { 0.0 };
        Self {
            frame_dt: rate_dt(frame_rate),
            fixed_dt: rate_dt(fixed_rate),
            time_scale: time_scale.max(0.0),
            accumulator: 0.0,
        }
    }

    pub fn frame_dt(&self) -> f32 {
        self.frame_dt
    }

    pub fn advance(&mut self) -> FrameTimes {
        let scaled = self.frame_dt * self.time_scale;
        let update = PhaseDelta::new(scaled, self.frame_dt);

        if self.fixed_dt <= 0.0 {
            return FrameTimes {
                update,
                ..FrameTimes::default()
            };
        }

        self.accumulator += scaled;
        let mut fixed_steps = 0;
        while self.accumulator >= self.fixed_dt {
            self.accumulator -= self.fixed_dt;
            fixed_steps += 1;
        }

        FrameTimes {
            update,
            fixed: PhaseDelta::uniform(self.fixed_dt),
            fixed_steps,
        }
    }
}

/// Ordered registries of active items, one per phase.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    update: Vec<ItemId>,
    fixed_update: Vec<ItemId>,
    late_update: Vec<ItemId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Items of a phase in registration order.
    pub fn items(&self, phase: UpdatePhase) -> &[ItemId] {
        match phase {
            UpdatePhase::Update => &self.update,
            UpdatePhase::FixedUpdate => &self.fixed_update,
            UpdatePhase::LateUpdate => &self.late_update,
        }
    }

    fn items_mut(&mut self, phase: UpdatePhase) -> &mut Vec<ItemId> {
        match phase {
            UpdatePhase::Update => &mut self.update,
            UpdatePhase::FixedUpdate => &mut self.fixed_update,
            UpdatePhase::LateUpdate => &mut self.late_update,
        }
    }

    /// Append an item to a phase. An item lives in at most one phase; it is
    /// moved if it was registered elsewhere. Returns `false` if it was already
    /// registered in `phase`.
    pub fn register(&mut self, phase: UpdatePhase, id: ItemId) -> bool {
        if self.contains(phase, id) {
            return false;
        }
        for other in UpdatePhase::ALL {
            if other != phase {
                self.items_mut(other).retain(|i| *i != id);
            }
        }
        self.items_mut(phase).push(id);
        trace!(item = %id, ?phase, "registered");
        true
    }

    /// Remove an item from every phase.
    pub fn unregister(&mut self, id: ItemId) {
        for phase in UpdatePhase::ALL {
            let items = self.items_mut(phase);
            if let Some(pos) = items.iter().position(|i| *i == id) {
                items.remove(pos);
                trace!(item = %id, ?phase, "unregistered");
            }
        }
    }

    pub fn contains(&self, phase: UpdatePhase, id: ItemId) -> bool {
        self.items(phase).contains(&id)
    }

    pub fn is_registered(&self, id: ItemId) -> bool {
        UpdatePhase::ALL.iter().any(|phase| self.contains(*phase, id))
    }

    pub fn len(&self) -> usize {
        self.update.len() + self.fixed_update.len() + self.late_update.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.update.clear();
        self.fixed_update.clear();
        self.late_update.clear();
    }
}

/// What the state step asks the driver to do next.
#[derive(Debug, Clone, Copy, Default)]
struct StepOutcome {
    /// Run the state step again in this tick (immediate loop collapse).
    rerun: bool,
    /// Skip the button afterglow this tick.
    skip_button: bool,
}

/// Scheduler owning the registry, the core roots and the scheduling policy.
#[derive(Debug, Default)]
pub struct Scheduler {
    registry: Registry,
    roots: Vec<CoreRoot>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            registry: Registry::new(),
            roots: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn set_live(&mut self, live: bool) {
        self.config.live = live;
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Split borrow for activation calls.
    pub fn ctx<'a>(&'a mut self, tree: &'a mut ItemTree, host: &'a mut dyn Host) -> Ctx<'a> {
        Ctx::new(tree, &mut self.registry, host)
    }

    /// Register an item with the phase it is configured for.
    pub fn register_item(&mut self, tree: &ItemTree, id: ItemId) {
        match tree.get(id) {
            Some(item) => {
                self.registry.register(item.values.updating_type, id);
            }
            None => warn!(item = %id, "register of a stale item handle"),
        }
    }

    pub fn unregister_item(&mut self, id: ItemId) {
        self.registry.unregister(id);
    }

    pub fn register_root(&mut self, root: CoreRoot) {
        debug!(root = %root.name, "core root registered");
        self.roots.push(root);
    }

    pub fn roots(&self) -> &[CoreRoot] {
        &self.roots
    }

    pub fn root_mut(&mut self, name: &str) -> Option<&mut CoreRoot> {
        self.roots.iter_mut().find(|root| root.name == name)
    }

    /// Select a named state of a registered root.
    pub fn select_state(
        &mut self,
        tree: &mut ItemTree,
        host: &mut dyn Host,
        root: &str,
        state: &str,
    ) -> bool {
        let Some(core) = self.roots.iter_mut().find(|r| r.name == root) else {
            warn!(root, "unknown core root");
            return false;
        };
        let mut ctx = Ctx::new(tree, &mut self.registry, host);
        core.select_state(&mut ctx, state)
    }

    /// Scene boundary: every root selects its default state.
    pub fn scene_loaded(&mut self, tree: &mut ItemTree, host: &mut dyn Host) {
        let mut ctx = Ctx::new(tree, &mut self.registry, host);
        for root in self.roots.iter_mut() {
            root.select_default_state(&mut ctx);
        }
    }

    /// Scene boundary: clear every registry if configured to.
    pub fn scene_unloaded(&mut self) {
        if self.config.clear_lists_on_scene_unload {
            debug!(items = self.registry.len(), roots = self.roots.len(), "clearing registries");
            self.registry.clear();
            self.roots.clear();
        }
    }

    /// Step every registered item of `phase`.
    pub fn tick(
        &mut self,
        tree: &mut ItemTree,
        host: &mut dyn Host,
        phase: UpdatePhase,
        delta: PhaseDelta,
    ) {
        let mut visited = HashSet::new();
        let mut cursor = 0;

        loop {
            let items = self.registry.items(phase);
            // Removals shift unvisited items left of the cursor; appends land
            // behind it.
            cursor = cursor.min(items.len());
            while cursor > 0 && !visited.contains(&items[cursor - 1]) {
                cursor -= 1;
            }
            while cursor < items.len() && visited.contains(&items[cursor]) {
                cursor += 1;
            }
            let Some(&id) = items.get(cursor) else {
                break;
            };
            visited.insert(id);
            cursor += 1;

            let Some(item) = tree.get(id) else {
                warn!(item = %id, "dropping stale item from the registry");
                self.registry.unregister(id);
                continue;
            };
            let dt = delta.for_item(item.values.time_scaled);

            self.step_item(tree, host, id, dt);
        }
    }

    fn step_item(&mut self, tree: &mut ItemTree, host: &mut dyn Host, id: ItemId, dt: f32) {
        let live = self.config.live;
        let max_steps = self.config.max_catch_up_steps;
        let mut ctx = Ctx::new(tree, &mut self.registry, host);

        update_path(&mut ctx, id, dt);

        let mut steps = 0;
        let outcome = loop {
            let outcome = step_state(&mut ctx, id, dt, live);
            if !outcome.rerun {
                break outcome;
            }
            if steps >= max_steps {
                debug!(item = %id, steps, "immediate loop catch-up bound reached");
                break outcome;
            }
            steps += 1;
        };

        if !outcome.skip_button {
            update_button(&mut ctx, id, dt);
        }
        retire(&mut ctx, id);
    }
}

fn update_path(ctx: &mut Ctx<'_>, id: ItemId, dt: f32) {
    let has_path = ctx
        .tree
        .get(id)
        .is_some_and(|item| item.capabilities.path);
    if has_path {
        if let Some(path) = ctx.host.path(id) {
            path.update(dt);
        }
    }
}

fn step_state(ctx: &mut Ctx<'_>, id: ItemId, dt: f32, live: bool) -> StepOutcome {
    let Some(state) = ctx.tree.get(id).map(|item| item.state) else {
        return StepOutcome::default();
    };

    match state {
        ItemState::Opening => {
            step_transition(ctx, id, ItemKey::Opened, dt);
            StepOutcome::default()
        }
        ItemState::Closing => {
            step_transition(ctx, id, ItemKey::Closed, dt);
            StepOutcome::default()
        }
        ItemState::Closed => step_closed(ctx, id, live),
        ItemState::Opened => step_opened(ctx, id, live),
        ItemState::Slave => StepOutcome::default(),
    }
}

/// Opening or closing: delay countdown, then progress, then completion.
fn step_transition(ctx: &mut Ctx<'_>, id: ItemId, key: ItemKey, dt: f32) {
    let Some(item) = ctx.tree.get_mut(id) else {
        return;
    };

    if !item.delay_elapsed() {
        item.state_chg_time -= dt;
        // Tweens and input stay frozen until the delay runs out.
        if !item.delay_elapsed() {
            return;
        }
        for tween in item.tweens.iter_mut() {
            tween.reset_blend();
        }
        if item.values.duration[key] <= 0.0 {
            item.time = key.bound();
        }

        let trigger_children =
            item.state_chg_branch_mode && !item.values.child_before[key];
        let brake = item.state_chg_brake;
        trace!(item = %id, ?key, "delay elapsed");
        if trigger_children {
            activation::activate_children(ctx, id, key, brake);
        }
    } else {
        let duration = item.values.duration[key];
        item.time = match key {
            _ if duration <= 0.0 => key.bound(),
            ItemKey::Opened => (item.time + dt / duration).min(1.0),
            ItemKey::Closed => (item.time - dt / duration).max(0.0),
        };
    }

    let complete = ctx.tree.get(id).is_some_and(|item| {
        let at_bound = match key {
            ItemKey::Opened => item.time >= 1.0,
            ItemKey::Closed => item.time <= 0.0,
        };
        item.delay_elapsed() && at_bound && item.children_reached(key)
    });
    if complete {
        if let Some(item) = ctx.tree.get_mut(id) {
            item.time = key.bound();
        }
        ctx.tree.set_state(id, key.terminal_state(), ctx.host);
    }

    if key == ItemKey::Opened {
        poll_input(ctx, id);
    }
    update_tweens(ctx, id, dt);
}

fn step_closed(ctx: &mut Ctx<'_>, id: ItemId, live: bool) -> StepOutcome {
    let Some(item) = ctx.tree.get_mut(id) else {
        return StepOutcome::default();
    };
    if !item.values.is_looping() || !live || !item.loop_activated {
        return StepOutcome::default();
    }

    if item.current_loops != 0 {
        let mode = item.values.activation_open;
        activation::activate_from_loop(ctx, id, mode);
        if let Some(item) = ctx.tree.get_mut(id) {
            item.loop_activated = true;
            item.state_chg_time = 0.0;
        }
        StepOutcome::default()
    } else {
        debug!(item = %id, "loop finished");
        item.loop_activated = false;
        StepOutcome {
            rerun: false,
            skip_button: true,
        }
    }
}

fn step_opened(ctx: &mut Ctx<'_>, id: ItemId, live: bool) -> StepOutcome {
    poll_input(ctx, id);
    if close_on_media_end(ctx, id) {
        return StepOutcome::default();
    }

    let Some(item) = ctx.tree.get_mut(id) else {
        return StepOutcome::default();
    };
    if !item.values.is_looping() || !live || item.state != ItemState::Opened {
        return StepOutcome::default();
    }

    if !item.loop_activated {
        item.loop_activated = true;
        item.current_loops = item.values.loops;
        debug!(item = %id, loops = item.current_loops, "loop armed");
    }
    if item.current_loops == 0 {
        return StepOutcome::default();
    }

    let mode = item.values.loop_mode;
    if item.values.loops > 0 {
        item.current_loops -= 1;
    }
    activation::activate_from_loop(ctx, id, mode);

    StepOutcome {
        rerun: mode.is_immediate_close(),
        skip_button: false,
    }
}

/// Press the item's button when one of its keys went down.
fn poll_input(ctx: &mut Ctx<'_>, id: ItemId) {
    let Some(item) = ctx.tree.get(id) else {
        return;
    };
    if !item.capabilities.button || item.values.on_keyboard.is_empty() {
        return;
    }
    if !ctx.host.button_interactable(id) {
        return;
    }

    let pressed = item.values.on_keyboard.iter().any(|key| ctx.host.key_down(key));
    if pressed {
        debug!(item = %id, "keyboard press");
        activation::press(ctx, id);
    }
}

/// Close an opened item whose controlled media is about to end.
///
/// Audio is only watched when the item has no video.
fn close_on_media_end(ctx: &mut Ctx<'_>, id: ItemId) -> bool {
    let Some(item) = ctx.tree.get(id) else {
        return false;
    };
    let caps = item.capabilities;
    let values = &item.values;
    let lookahead = values.delay[ItemKey::Closed] + values.duration[ItemKey::Closed];

    let ending = if caps.video {
        values.video_control
            && ctx
                .host
                .video(id)
                .is_some_and(|player| near_end(&*player, lookahead))
    } else if caps.audio {
        values.sound_control
            && ctx
                .host
                .audio(id)
                .is_some_and(|player| near_end(&*player, lookahead))
    } else {
        false
    };

    if ending {
        debug!(item = %id, lookahead, "media ending, closing");
        activation::close(ctx, id);
    }
    ending
}

fn update_tweens(ctx: &mut Ctx<'_>, id: ItemId, dt: f32) {
    let Some(item) = ctx.tree.get_mut(id) else {
        return;
    };
    let (time, state) = (item.time, item.state);
    for tween in item.tweens.iter_mut() {
        if let Some(value) = tween.update(time, state, dt) {
            trace!(item = %id, effect = ?tween.effect, value, "effect");
            ctx.host.apply_effect(id, tween.effect, value);
        }
    }
}

/// Advance the press afterglow and drive the button tweens.
///
/// The countdown is written through the whole branch, so descendants follow
/// the item that was pressed.
fn update_button(ctx: &mut Ctx<'_>, id: ItemId, dt: f32) {
    let Some(remaining) = ctx
        .tree
        .get(id)
        .map(|item| item.button_evaluation)
        .filter(|remaining| *remaining > 0.0)
    else {
        return;
    };
    activation::set_button_evaluation(ctx, id, remaining - dt);

    let Some(item) = ctx.tree.get_mut(id) else {
        return;
    };
    let duration = item.values.button_duration;
    let ratio = if duration > 0.0 {
        item.button_evaluation / duration
    } else {
        0.0
    };
    let progress = match item.values.button_direction {
        ButtonDirection::OpenToClose => ratio,
        ButtonDirection::CloseToOpen => 1.0 - ratio,
    };

    for tween in item.tweens.iter_mut() {
        if tween.enabled && tween.direction == TweenDirection::Button {
            let value = tween.evaluate(progress, ItemKey::Opened);
            ctx.host.apply_effect(id, tween.effect, value);
        }
    }
}

/// Closed and slave items stop ticking once no loop or afterglow needs them.
fn retire(ctx: &mut Ctx<'_>, id: ItemId) {
    let idle = ctx.tree.get(id).is_some_and(|item| {
        matches!(item.state, ItemState::Closed | ItemState::Slave)
            && !item.loop_activated
            && item.button_evaluation <= 0.0
    });
    if idle {
        ctx.registry.unregister(id);
    }
}
