use std::collections::{HashMap, HashSet};

use cascade_core::{Capabilities, EffectKind, Host, ItemId, MediaPlayer};

/// Audio clip whose remaining time is set by the test.
#[derive(Debug, Default)]
pub struct Clip {
    pub playing: bool,
    pub remaining: f32,
    pub plays: u32,
    pub pauses: u32,
}

impl MediaPlayer for Clip {
    fn play(&mut self) {
        self.playing = true;
        self.plays += 1;
    }

    fn pause(&mut self) {
        self.playing = false;
        self.pauses += 1;
    }

    fn stop(&mut self) {
        self.playing = false;
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn remaining_time(&self) -> f32 {
        self.remaining
    }
}

/// Host that records everything the engine tells it.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub capabilities: HashMap<ItemId, Capabilities>,
    pub interactable: HashMap<ItemId, bool>,
    pub effects: Vec<(ItemId, EffectKind, f32)>,
    pub clips: HashMap<ItemId, Clip>,
    pub buttons: HashSet<ItemId>,
    pub keys_down: HashSet<String>,
}

impl RecordingHost {
    pub fn last_effect(&self, item: ItemId, effect: EffectKind) -> Option<f32> {
        self.effects
            .iter()
            .rev()
            .find(|(id, kind, _)| *id == item && *kind == effect)
            .map(|(_, _, value)| *value)
    }
}

impl Host for RecordingHost {
    fn probe(&mut self, item: ItemId) -> Capabilities {
        self.capabilities.get(&item).copied().unwrap_or_default()
    }

    fn set_interactable(&mut self, item: ItemId, enabled: bool) {
        self.interactable.insert(item, enabled);
    }

    fn audio(&mut self, item: ItemId) -> Option<&mut dyn MediaPlayer> {
        self.clips
            .get_mut(&item)
            .map(|clip| clip as &mut dyn MediaPlayer)
    }

    fn button_interactable(&mut self, item: ItemId) -> bool {
        self.buttons.contains(&item)
    }

    fn key_down(&mut self, key: &str) -> bool {
        self.keys_down.contains(key)
    }

    fn apply_effect(&mut self, item: ItemId, effect: EffectKind, intensity: f32) {
        self.effects.push((item, effect, intensity));
    }
}
