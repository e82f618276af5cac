//! Tweens: per-item effect drivers.
//!
//! A tween maps the item's normalized progress onto an intensity for one
//! effect category. It knows nothing about what the effect does, only:
//! - which transition directions it reacts to (`TweenDirection`)
//! - which part of the arc it covers (`start_point`..`end_point`)
//! - which easing curve shapes it, per direction
//! - how long to blend from the last emitted value after an interruption
//!
//! # Example
//!
//! ```
//! use cascade_core::easing::EasingFunction;
//! use cascade_core::host::EffectKind;
//! use cascade_core::tween::{Tween, TweenDirection};
//!
//! // Fade in over the second half of the open arc.
//! let tween = Tween::new(EffectKind::Alpha)
//!     .with_direction(TweenDirection::Open)
//!     .with_window(0.5, 1.0)
//!     .with_easing(EasingFunction::EaseOut);
//! assert_eq!(tween.sample(0.25, cascade_core::types::ItemKey::Opened), 0.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::easing::EasingFunction;
use crate::host::EffectKind;
use crate::types::{ItemKey, ItemState};

/// Blend elapsed time for a tween that is not blending.
const SETTLED: f32 = f32::MAX;

/// Transition directions a tween reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TweenDirection {
    /// Both directions, same curve.
    Equal,
    /// Both directions, the close arc uses `close_easing`.
    OpenClose,
    /// Open arc only.
    Open,
    /// Close arc only.
    Close,
    /// Button press afterglow only.
    Button,
}

impl Default for TweenDirection {
    fn default() -> Self {
        Self::Equal
    }
}

impl TweenDirection {
    /// Whether a tween with this direction runs for transitions towards `key`.
    pub fn matches(self, key: ItemKey) -> bool {
        match self {
            Self::Equal | Self::OpenClose => true,
            Self::Open => key == ItemKey::Opened,
            Self::Close => key == ItemKey::Closed,
            Self::Button => false,
        }
    }
}

/// A single effect driver owned by an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tween {
    pub enabled: bool,
    pub effect: EffectKind,
    pub direction: TweenDirection,
    pub easing: EasingFunction,
    /// Curve for the close arc when `direction` is `OpenClose`.
    pub close_easing: EasingFunction,
    /// Item progress at which this tween starts moving.
    pub start_point: f32,
    /// Item progress at which this tween reaches full intensity.
    pub end_point: f32,
    /// Seconds spent blending from the last emitted value after the
    /// pre-activation delay of an interrupting transition expires.
    pub blend_time: f32,

    #[serde(skip, default = "settled")]
    blend_elapsed: f32,
    #[serde(skip)]
    last_value: f32,
}

fn settled() -> f32 {
    SETTLED
}

impl Default for Tween {
    fn default() -> Self {
        Self {
            enabled: true,
            effect: EffectKind::Alpha,
            direction: TweenDirection::Equal,
            easing: EasingFunction::Linear,
            close_easing: EasingFunction::Linear,
            start_point: 0.0,
            end_point: 1.0,
            blend_time: 0.0,
            blend_elapsed: SETTLED,
            last_value: 0.0,
        }
    }
}

impl Tween {
    pub fn new(effect: EffectKind) -> Self {
        Self {
            effect,
            ..Self::default()
        }
    }

    pub fn with_direction(mut self, direction: TweenDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_easing(mut self, easing: EasingFunction) -> Self {
        self.easing = easing;
        self
    }

    pub fn with_close_easing(mut self, easing: EasingFunction) -> Self {
        self.close_easing = easing;
        self
    }

    pub fn with_window(mut self, start_point: f32, end_point: f32) -> Self {
        self.start_point = start_point;
        self.end_point = end_point;
        self
    }

    pub fn with_blend_time(mut self, blend_time: f32) -> Self {
        self.blend_time = blend_time;
        self
    }

    /// Last intensity handed to the effect sink.
    pub fn last_value(&self) -> f32 {
        self.last_value
    }

    /// Whether a blend towards the current target is in progress.
    pub fn is_blending(&self) -> bool {
        self.blend_elapsed < self.blend_time
    }

    /// Intensity at item progress `time` for a transition towards `key`,
    /// without blending.
    pub fn sample(&self, time: f32, key: ItemKey) -> f32 {
        let span = self.end_point - self.start_point;
        let local = if span <= 0.0 {
            if time >= self.start_point { 1.0 } else { 0.0 }
        } else {
            ((time - self.start_point) / span).clamp(0.0, 1.0)
        };

        let easing = if key == ItemKey::Closed && self.direction == TweenDirection::OpenClose {
            &self.close_easing
        } else {
            &self.easing
        };
        easing.evaluate(local)
    }

    /// Force the tween to `progress`, bypassing blending. Used by external
    /// evaluation, immediate transitions and the button track.
    pub fn evaluate(&mut self, progress: f32, key: ItemKey) -> f32 {
        let value = self.sample(progress, key);
        self.last_value = value;
        self.blend_elapsed = SETTLED;
        value
    }

    /// Restart blending from the last emitted value.
    pub fn reset_blend(&mut self) {
        self.blend_elapsed = 0.0;
    }

    /// Advance one tick for an item in `state` at progress `time`.
    ///
    /// Returns the intensity to apply, or `None` when the tween is disabled or
    /// does not react to the item's current direction.
    pub fn update(&mut self, time: f32, state: ItemState, dt: f32) -> Option<f32> {
        if !self.enabled {
            return None;
        }
        let key = state.key()?;
        if !self.direction.matches(key) {
            return None;
        }

        let target = self.sample(time, key);
        let value = if self.is_blending() {
            self.blend_elapsed += dt;
            let factor = (self.blend_elapsed / self.blend_time).clamp(0.0, 1.0);
            self.last_value + (target - self.last_value) * factor
        } else {
            target
        };

        self.last_value = value;
        Some(value)
    }
}

static_assertions::assert_impl_all!(Tween: Send, Sync);
