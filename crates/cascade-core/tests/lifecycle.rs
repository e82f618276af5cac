mod common;

use cascade_core::{
    ActivationMode, Capabilities, ChainDirection, EasingFunction, EffectKind, Engine, Item, ItemEvent, ItemId,
    ItemKey, ItemState, ItemValues, Keyed, PhaseDelta, Tween, TweenDirection, UpdatePhase,
};
use common::{Clip, RecordingHost};

fn tick(engine: &mut Engine, host: &mut RecordingHost, dt: f32) {
    engine.tick(UpdatePhase::Update, PhaseDelta::uniform(dt), host);
}

fn family(
    engine: &mut Engine,
    host: &mut RecordingHost,
    values: ItemValues,
    children: usize,
) -> (ItemId, Vec<ItemId>) {
    let parent = engine.spawn(Item::with_values("parent", values));
    let kids = (0..children)
        .map(|i| {
            let child = engine.spawn(Item::new(format!("child{i}")));
            engine.attach(child, parent, host);
            child
        })
        .collect();
    (parent, kids)
}

fn count(events: &[ItemEvent], state: ItemState) -> usize {
    events.iter().filter(|event| event.state() == state).count()
}

#[test]
fn parent_never_opens_before_child() {
    let mut host = RecordingHost::default();
    let mut engine = Engine::default();
    let (a, kids) = family(&mut engine, &mut host, ItemValues::default(), 1);
    let b = kids[0];

    engine.open(a, &mut host);
    assert_eq!(engine.item(a).unwrap().state(), ItemState::Opening);

    for _ in 0..6 {
        tick(&mut engine, &mut host, 1.0);
        let a_state = engine.item(a).unwrap().state();
        let b_state = engine.item(b).unwrap().state();
        assert!(
            a_state != ItemState::Opened || b_state == ItemState::Opened,
            "parent opened while child was {b_state:?}"
        );
    }

    assert_eq!(engine.item(a).unwrap().state(), ItemState::Opened);
    assert_eq!(engine.item(b).unwrap().state(), ItemState::Opened);
    assert_eq!(engine.item(a).unwrap().child_count(ItemState::Opened), 1);
}

#[test]
fn finite_loop_runs_exact_cycles() {
    let mut host = RecordingHost::default();
    let mut engine = Engine::default();
    let item = engine.spawn(Item::with_values(
        "pulse",
        ItemValues {
            loops: 3,
            loop_mode: ActivationMode::OpenClose,
            ..ItemValues::default()
        },
    ));
    engine.refresh(item, &mut host);
    engine.set_queue_events(item, true);

    engine.open_immediately(item, &mut host);
    for _ in 0..200 {
        tick(&mut engine, &mut host, 0.25);
    }

    let events: Vec<ItemEvent> = engine.drain_events().collect();
    assert_eq!(count(&events, ItemState::Closing), 3);
    assert_eq!(count(&events, ItemState::Opening), 2);

    let pulse = engine.item(item).unwrap();
    assert_eq!(pulse.current_loops(), 0);
    assert!(!pulse.loop_activated());
    assert_eq!(pulse.state(), ItemState::Closed);
    assert!(!engine.scheduler().registry().is_registered(item));

    for _ in 0..10 {
        tick(&mut engine, &mut host, 0.25);
    }
    assert_eq!(engine.item(item).unwrap().state(), ItemState::Closed);
}

#[test]
fn infinite_loop_keeps_cycling() {
    let mut host = RecordingHost::default();
    let mut engine = Engine::default();
    let item = engine.spawn(Item::with_values(
        "spinner",
        ItemValues {
            loops: -1,
            duration: Keyed::splat(0.5),
            ..ItemValues::default()
        },
    ));
    engine.refresh(item, &mut host);
    engine.set_queue_events(item, true);

    engine.open_immediately(item, &mut host);
    for _ in 0..200 {
        tick(&mut engine, &mut host, 0.1);
    }

    let events: Vec<ItemEvent> = engine.drain_events().collect();
    assert!(count(&events, ItemState::Closing) >= 5);
    let spinner = engine.item(item).unwrap();
    assert!(spinner.loop_activated());
    assert_eq!(spinner.current_loops(), -1);
    assert!(engine.scheduler().registry().is_registered(item));
}

#[test]
fn immediate_loop_mode_collapses_within_a_tick() {
    let mut host = RecordingHost::default();
    let mut engine = Engine::default();
    let item = engine.spawn(Item::with_values(
        "blink",
        ItemValues {
            loops: 2,
            loop_mode: ActivationMode::CloseImmediately,
            ..ItemValues::default()
        },
    ));
    engine.refresh(item, &mut host);
    engine.set_queue_events(item, true);

    engine.open_immediately(item, &mut host);
    tick(&mut engine, &mut host, 0.1);
    // Closed immediately, then reopened by the loop in the same tick.
    assert_eq!(engine.item(item).unwrap().state(), ItemState::Opening);

    for _ in 0..50 {
        tick(&mut engine, &mut host, 0.1);
    }
    let events: Vec<ItemEvent> = engine.drain_events().collect();
    assert_eq!(count(&events, ItemState::Closed), 2);
    assert_eq!(count(&events, ItemState::Opening), 1);
    assert_eq!(engine.item(item).unwrap().state(), ItemState::Closed);
}

#[test]
fn external_activation_cancels_loop() {
    let mut host = RecordingHost::default();
    let mut engine = Engine::default();
    let item = engine.spawn(Item::with_values(
        "pulse",
        ItemValues {
            loops: -1,
            ..ItemValues::default()
        },
    ));
    engine.refresh(item, &mut host);
    engine.open_immediately(item, &mut host);
    tick(&mut engine, &mut host, 0.1);
    assert!(engine.item(item).unwrap().loop_activated());

    engine.close(item, &mut host);
    assert!(!engine.item(item).unwrap().loop_activated());
    for _ in 0..30 {
        tick(&mut engine, &mut host, 0.1);
    }
    assert_eq!(engine.item(item).unwrap().state(), ItemState::Closed);
}

#[test]
fn chain_delays_follow_direction() {
    let mut host = RecordingHost::default();
    let mut engine = Engine::default();
    let values = ItemValues {
        chain_delay: Keyed::new(0.0, 0.5),
        first_child_delay: Keyed::new(0.0, 0.25),
        child_chain_mode: true,
        child_before: Keyed::new(false, true),
        ..ItemValues::default()
    };
    let (parent, kids) = family(&mut engine, &mut host, values, 3);

    let delays = |engine: &Engine| -> Vec<f32> {
        kids.iter()
            .map(|kid| engine.item(*kid).unwrap().chain_delay(ItemKey::Opened))
            .collect()
    };
    assert_eq!(delays(&engine), vec![0.25, 0.75, 1.25]);

    engine.open(parent, &mut host);
    let pending: Vec<f32> = kids
        .iter()
        .map(|kid| engine.item(*kid).unwrap().state_chg_time())
        .collect();
    assert_eq!(pending, vec![0.25, 0.75, 1.25]);

    engine.set_chain_direction(parent, ItemKey::Opened, ChainDirection::LastToFirst);
    assert_eq!(delays(&engine), vec![1.25, 0.75, 0.25]);

    engine.set_chain_direction(parent, ItemKey::Opened, ChainDirection::EndsToMiddle);
    assert_eq!(delays(&engine), vec![0.25, 0.75, 0.25]);
}

#[test]
fn refresh_is_idempotent() {
    let mut host = RecordingHost::default();
    let mut engine = Engine::default();
    let values = ItemValues {
        chain_delay: Keyed::splat(0.5),
        ..ItemValues::default()
    };
    let (parent, kids) = family(&mut engine, &mut host, values, 3);
    engine.open_branch_immediately(kids[1], &mut host);

    let snapshot = |engine: &Engine| {
        let item = engine.item(parent).unwrap();
        let siblings: Vec<u32> = kids
            .iter()
            .map(|kid| engine.item(*kid).unwrap().sibling_id())
            .collect();
        let delays: Vec<f32> = kids
            .iter()
            .map(|kid| engine.item(*kid).unwrap().chain_delay(ItemKey::Opened))
            .collect();
        (item.child_counts(), item.child_count_without_loops(), siblings, delays)
    };

    engine.refresh(parent, &mut host);
    let first = snapshot(&engine);
    engine.refresh(parent, &mut host);
    engine.refresh_all(&mut host);
    assert_eq!(snapshot(&engine), first);
    assert_eq!(first.0[ItemState::Opened.census_slot().unwrap()], 1);
    assert_eq!(first.2, vec![1, 2, 3]);
}

#[test]
fn removing_a_child_mid_transition_unblocks_parent() {
    let mut host = RecordingHost::default();
    let mut engine = Engine::default();
    let (parent, kids) = family(&mut engine, &mut host, ItemValues::default(), 2);
    engine.item_mut(kids[1]).unwrap().values.duration = Keyed::splat(100.0);
    engine.refresh(parent, &mut host);

    engine.open(parent, &mut host);
    for _ in 0..4 {
        tick(&mut engine, &mut host, 0.5);
    }
    assert_eq!(engine.item(kids[1]).unwrap().state(), ItemState::Opening);

    engine.despawn(kids[1], &mut host);
    assert!(engine.item(kids[1]).is_none());
    assert_eq!(engine.item(parent).unwrap().child_count_without_loops(), 1);

    for _ in 0..4 {
        tick(&mut engine, &mut host, 0.5);
    }
    assert_eq!(engine.item(parent).unwrap().state(), ItemState::Opened);
    assert_eq!(engine.scheduler().registry().len(), 2);
}

#[test]
fn disabling_a_child_removes_it_from_the_census() {
    let mut host = RecordingHost::default();
    let mut engine = Engine::default();
    let (parent, kids) = family(&mut engine, &mut host, ItemValues::default(), 2);

    engine.set_enabled(kids[0], false, &mut host);
    let item = engine.item(parent).unwrap();
    assert_eq!(item.children(), &[kids[1]]);
    assert_eq!(engine.item(kids[1]).unwrap().sibling_id(), 1);
    assert_eq!(engine.item(kids[0]).unwrap().parent(), None);
}

#[test]
fn media_end_closes_item() {
    let mut host = RecordingHost::default();
    let mut engine = Engine::default();
    let item = engine.spawn(Item::with_values(
        "clip",
        ItemValues {
            sound_control: true,
            ..ItemValues::default()
        },
    ));
    host.capabilities.insert(
        item,
        Capabilities {
            audio: true,
            interactable: true,
            ..Capabilities::default()
        },
    );
    host.clips.insert(
        item,
        Clip {
            remaining: 5.0,
            ..Clip::default()
        },
    );
    engine.refresh(item, &mut host);

    engine.open_immediately(item, &mut host);
    assert!(host.clips[&item].playing);
    assert_eq!(host.interactable.get(&item), Some(&true));

    tick(&mut engine, &mut host, 0.1);
    assert_eq!(engine.item(item).unwrap().state(), ItemState::Opened);

    host.clips.get_mut(&item).unwrap().remaining = 0.5;
    tick(&mut engine, &mut host, 0.1);
    assert_eq!(engine.item(item).unwrap().state(), ItemState::Closing);
    assert_eq!(host.interactable.get(&item), Some(&false));
    // The clip plays out during the close arc.
    assert!(host.clips[&item].playing);
    assert_eq!(host.clips[&item].pauses, 0);

    for _ in 0..15 {
        tick(&mut engine, &mut host, 0.1);
    }
    assert_eq!(engine.item(item).unwrap().state(), ItemState::Closed);
    assert!(!host.clips[&item].playing);
    assert_eq!(host.clips[&item].pauses, 1);
}

#[test]
fn clip_pauses_only_once_closed() {
    let mut host = RecordingHost::default();
    let mut engine = Engine::default();
    let item = engine.spawn(Item::with_values(
        "voice",
        ItemValues {
            sound_control: true,
            delay: Keyed::new(0.5, 0.0),
            ..ItemValues::default()
        },
    ));
    host.capabilities.insert(
        item,
        Capabilities {
            audio: true,
            ..Capabilities::default()
        },
    );
    host.clips.insert(
        item,
        Clip {
            remaining: 30.0,
            ..Clip::default()
        },
    );
    engine.refresh(item, &mut host);
    engine.open_immediately(item, &mut host);

    engine.close(item, &mut host);
    assert_eq!(engine.item(item).unwrap().state(), ItemState::Closing);
    assert!(host.clips[&item].playing);

    let mut ticks = 0;
    while engine.item(item).unwrap().state() == ItemState::Closing {
        assert!(host.clips[&item].playing);
        assert_eq!(host.clips[&item].pauses, 0);
        tick(&mut engine, &mut host, 0.1);
        ticks += 1;
        assert!(ticks < 40, "item never closed");
    }

    assert_eq!(engine.item(item).unwrap().state(), ItemState::Closed);
    assert!(!host.clips[&item].playing);
    assert_eq!(host.clips[&item].pauses, 1);
    assert_eq!(host.clips[&item].plays, 1);
}

#[test]
fn tweens_hold_during_delay_then_blend() {
    let mut host = RecordingHost::default();
    let mut engine = Engine::default();
    let item = engine.spawn(
        Item::with_values(
            "fade",
            ItemValues {
                delay: Keyed::new(1.0, 0.0),
                ..ItemValues::default()
            },
        )
        .with_tween(
            Tween::new(EffectKind::Alpha)
                .with_direction(TweenDirection::OpenClose)
                .with_close_easing(EasingFunction::EaseIn)
                .with_blend_time(0.5),
        ),
    );
    engine.refresh(item, &mut host);

    engine.open_single(item, &mut host);
    for _ in 0..6 {
        tick(&mut engine, &mut host, 0.1);
    }
    let before = host.last_effect(item, EffectKind::Alpha).unwrap();
    assert!((before - 0.5).abs() < 1e-4);

    engine.close_single(item, &mut host);
    let written = host.effects.len();
    for _ in 0..9 {
        tick(&mut engine, &mut host, 0.1);
    }
    assert_eq!(engine.item(item).unwrap().state(), ItemState::Closing);
    assert_eq!(host.effects.len(), written);

    // The delay runs out: blend from the held value towards the close curve.
    tick(&mut engine, &mut host, 0.2);
    let target = EasingFunction::EaseIn.evaluate(0.5);
    let after = host.last_effect(item, EffectKind::Alpha).unwrap();
    assert!(after < before && after > target, "{target} < {after} < {before}");
}

#[test]
fn keyboard_press_drives_button_track() {
    let mut host = RecordingHost::default();
    let mut engine = Engine::default();
    let item = engine.spawn(
        Item::with_values(
            "ok",
            ItemValues {
                button_duration: 0.5,
                on_keyboard: vec!["space".to_string()],
                ..ItemValues::default()
            },
        )
        .with_tween(Tween::new(EffectKind::Scale).with_direction(TweenDirection::Button)),
    );
    host.capabilities.insert(
        item,
        Capabilities {
            button: true,
            ..Capabilities::default()
        },
    );
    engine.refresh(item, &mut host);
    engine.open_immediately(item, &mut host);

    // Not interactable: the key is ignored.
    host.keys_down.insert("space".to_string());
    tick(&mut engine, &mut host, 0.1);
    assert_eq!(engine.item(item).unwrap().button_evaluation(), 0.0);

    host.buttons.insert(item);
    tick(&mut engine, &mut host, 0.1);
    host.keys_down.clear();

    let remaining = engine.item(item).unwrap().button_evaluation();
    assert!((remaining - 0.4).abs() < 1e-5);
    let scale = host.last_effect(item, EffectKind::Scale).unwrap();
    assert!((scale - 0.8).abs() < 1e-4);

    for _ in 0..10 {
        tick(&mut engine, &mut host, 0.1);
    }
    assert_eq!(engine.item(item).unwrap().button_evaluation(), 0.0);
    assert_eq!(host.last_effect(item, EffectKind::Scale), Some(0.0));
}

#[test]
fn keyboard_is_ignored_while_closing() {
    let mut host = RecordingHost::default();
    let mut engine = Engine::default();
    let item = engine.spawn(Item::with_values(
        "ok",
        ItemValues {
            button_duration: 0.5,
            on_keyboard: vec!["space".to_string()],
            ..ItemValues::default()
        },
    ));
    host.capabilities.insert(
        item,
        Capabilities {
            button: true,
            ..Capabilities::default()
        },
    );
    host.buttons.insert(item);
    engine.refresh(item, &mut host);
    engine.open_immediately(item, &mut host);

    engine.close(item, &mut host);
    host.keys_down.insert("space".to_string());
    for _ in 0..3 {
        tick(&mut engine, &mut host, 0.1);
    }
    assert_eq!(engine.item(item).unwrap().state(), ItemState::Closing);
    assert_eq!(engine.item(item).unwrap().button_evaluation(), 0.0);
}

#[test]
fn pressing_a_parent_drives_descendant_buttons() {
    let mut host = RecordingHost::default();
    let mut engine = Engine::default();
    let (parent, kids) = family(
        &mut engine,
        &mut host,
        ItemValues {
            button_duration: 0.5,
            ..ItemValues::default()
        },
        1,
    );
    let child = kids[0];
    engine
        .item_mut(child)
        .unwrap()
        .tweens
        .push(Tween::new(EffectKind::Scale).with_direction(TweenDirection::Button));

    engine.press(parent, &mut host);
    assert_eq!(engine.item(child).unwrap().button_evaluation(), 0.5);

    tick(&mut engine, &mut host, 0.1);
    let parent_left = engine.item(parent).unwrap().button_evaluation();
    let child_left = engine.item(child).unwrap().button_evaluation();
    assert!((parent_left - 0.4).abs() < 1e-5);
    assert!(child_left > 0.0 && child_left <= parent_left);
    assert!(host.last_effect(child, EffectKind::Scale).is_some());

    for _ in 0..10 {
        tick(&mut engine, &mut host, 0.1);
    }
    for id in [parent, child] {
        assert_eq!(engine.item(id).unwrap().button_evaluation(), 0.0);
        assert!(!engine.scheduler().registry().is_registered(id));
    }
    assert_eq!(host.last_effect(child, EffectKind::Scale), Some(0.0));
}

#[test]
fn evaluate_branch_takes_items_out_of_the_census() {
    let mut host = RecordingHost::default();
    let mut engine = Engine::default();
    let (parent, kids) = family(&mut engine, &mut host, ItemValues::default(), 2);
    engine
        .item_mut(kids[0])
        .unwrap()
        .tweens
        .push(Tween::new(EffectKind::Alpha));

    engine.evaluate_branch(parent, 1.5, &mut host);
    for id in [parent, kids[0], kids[1]] {
        let item = engine.item(id).unwrap();
        assert_eq!(item.state(), ItemState::Slave);
        assert_eq!(item.time(), 1.0);
    }
    assert_eq!(engine.item(parent).unwrap().child_count(ItemState::Opened), 0);
    assert_eq!(host.last_effect(kids[0], EffectKind::Alpha), Some(1.0));

    // Any activation takes the item back from external control.
    engine.close_branch(parent, &mut host);
    assert_eq!(engine.item(parent).unwrap().state(), ItemState::Closing);
}
