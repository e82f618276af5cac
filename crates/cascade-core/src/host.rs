//! Host capability interfaces.
//!
//! The engine never touches rendering, input or media directly. Everything it
//! needs from the host application goes through [`Host`]: capability probing
//! at refresh time, surface toggles on state writes, media players, path
//! followers, material resolution, keyboard polling and the effect sink that
//! receives every tween intensity.
//!
//! All methods have no-op defaults, so a host only implements what it has. A
//! missing capability silently disables the matching side effect.

use serde::{Deserialize, Serialize};

use crate::id::ItemId;
use crate::types::{ItemState, MaterialMode};

/// Effect category driven by a tween.
///
/// The engine only computes intensities; the host decides what an intensity
/// means for each category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Alpha,
    Scale,
    Rotation,
    Position,
    Size,
    Color,
    ImageFill,
    Text,
    Number,
    Material,
    Light,
    Sound,
    /// Host defined category.
    Custom(u32),
}

impl Default for EffectKind {
    fn default() -> Self {
        Self::Alpha
    }
}

/// Capabilities found on an item when it was last refreshed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Interactable surface that can be toggled.
    pub interactable: bool,
    /// Raycast blocking surface that can be toggled.
    pub raycast_target: bool,
    /// Button that can be pressed from the keyboard.
    pub button: bool,
    /// Audio-like resource.
    pub audio: bool,
    /// Video-like resource.
    pub video: bool,
    /// Path follower ticked before state logic.
    pub path: bool,
}

/// Opaque material handle resolved by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaterialHandle(pub u64);

/// Audio-like playback resource.
pub trait MediaPlayer {
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn is_playing(&self) -> bool;
    /// Looping media never reaches its end.
    fn is_looping(&self) -> bool {
        false
    }
    /// Seconds left until the end of the clip.
    fn remaining_time(&self) -> f32;
}

/// Video-like playback resource.
pub trait VideoPlayer: MediaPlayer {
    fn frame_rate(&self) -> f32;
    /// Clip length in seconds.
    fn duration(&self) -> f32;
}

/// External per-item transform updater (path following).
pub trait PathFollower {
    /// Re-resolve cached path data after a hierarchy change.
    fn refresh(&mut self) {}
    /// Advance along the path.
    fn update(&mut self, dt: f32);
}

/// Everything the engine consumes from the host application.
pub trait Host {
    /// Report which capabilities exist on an item. Called on refresh.
    fn probe(&mut self, _item: ItemId) -> Capabilities {
        Capabilities::default()
    }

    fn set_interactable(&mut self, _item: ItemId, _enabled: bool) {}

    fn set_raycast_target(&mut self, _item: ItemId, _enabled: bool) {}

    fn audio(&mut self, _item: ItemId) -> Option<&mut dyn MediaPlayer> {
        None
    }

    fn video(&mut self, _item: ItemId) -> Option<&mut dyn VideoPlayer> {
        None
    }

    fn path(&mut self, _item: ItemId) -> Option<&mut dyn PathFollower> {
        None
    }

    /// Resolve the material used by an item. `live` is false while the host
    /// is in an editing mode, where instancing must not happen.
    fn material(&mut self, _item: ItemId, _mode: MaterialMode, _live: bool) -> Option<MaterialHandle> {
        None
    }

    /// Whether the item's button currently accepts input.
    fn button_interactable(&mut self, _item: ItemId) -> bool {
        false
    }

    /// Whether the named key went down this frame.
    fn key_down(&mut self, _key: &str) -> bool {
        false
    }

    /// Effect sink for tween output.
    fn apply_effect(&mut self, _item: ItemId, _effect: EffectKind, _intensity: f32) {}
}

/// Host with no capabilities at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHost;

impl Host for NullHost {}

/// Play media while the item opens. Stop or pause only once it is fully
/// closed, so a clip can finish during the close arc.
pub(crate) fn switch_media<P: MediaPlayer + ?Sized>(
    player: &mut P,
    state: ItemState,
    restart: bool,
) {
    if state.surface_enabled() {
        if !player.is_playing() {
            player.play();
        }
    } else if state == ItemState::Closed {
        if restart {
            player.stop();
        } else {
            player.pause();
        }
    }
}

/// Whether a playing, non-looping clip ends within `lookahead` seconds.
pub(crate) fn near_end<P: MediaPlayer + ?Sized>(player: &P, lookahead: f32) -> bool {
    player.is_playing() && !player.is_looping() && player.remaining_time() <= lookahead
}
