//! Cascade core: a hierarchical open/close animation engine.
//!
//! Items form a tree. Each item moves between `Closed` and `Opened` through
//! timed `Opening`/`Closing` transitions, drives its tweens from its
//! progress, and only completes once the children it tracks have reached the
//! same terminal state. Branch activations cascade through the tree with
//! per-child chain delays.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  activate / press / evaluate  ┌─────────────────┐
//! │     Host     │ ────────────────────────────> │     Engine      │
//! │ (surfaces,   │                               │ ┌─────────────┐ │
//! │  media,      │ <── apply_effect ──────────── │ │  ItemTree   │ │
//! │  input)      │ <── set_interactable ──────── │ │  (arena)    │ │
//! └──────────────┘                               │ └─────────────┘ │
//!        │                                       │ ┌─────────────┐ │
//!        └──── tick(phase, delta) ─────────────> │ │  Scheduler  │ │
//!                                                │ │  registry,  │ │
//!                                                │ │  core roots │ │
//!                                                │ └─────────────┘ │
//!                                                └─────────────────┘
//! ```
//!
//! Items are addressed by generational [`ItemId`] handles, so a removed item
//! is never confused with a later one reusing its slot. Host collaborators
//! are reached through the [`Host`] trait and passed into each call.

pub mod activation;
pub mod chain;
pub mod easing;
pub mod engine;
pub mod error;
pub mod events;
pub mod host;
pub mod id;
pub mod item;
pub mod roots;
pub mod scene;
pub mod scheduler;
pub mod tree;
pub mod tween;
pub mod types;

pub use activation::Ctx;
pub use easing::{EasingFunction, StepPosition};
pub use engine::Engine;
pub use error::{Result, SceneError};
pub use events::{EventQueue, ItemEvent, Observer, Observers};
pub use host::{
    Capabilities, EffectKind, Host, MaterialHandle, MediaPlayer, NullHost, PathFollower,
    VideoPlayer,
};
pub use id::ItemId;
pub use item::{Item, ItemValues};
pub use roots::{CoreRoot, CoreState};
pub use scene::{ItemSpec, Profile, RootSpec, Scene, SceneHandles, StateSpec};
pub use scheduler::{FrameClock, FrameTimes, PhaseDelta, Registry, Scheduler};
pub use tree::ItemTree;
pub use tween::{Tween, TweenDirection};
pub use types::{
    ActivationMode, ButtonDirection, ChainDirection, ItemKey, ItemState, Keyed, MaterialMode,
    UpdatePhase,
};
