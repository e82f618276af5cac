//! Headless cascade driver.
//!
//! Loads a scene, simulates a fixed number of host frames and logs the
//! lifecycle events the engine queues. Halfway through, every core root
//! switches to its next state.
//!
//! Usage: `cascade [scene.toml]`. Without an argument the scene configured in
//! `cascade.toml` (`demo.scene` or `CASCADE_SCENE`) is used.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use cascade_config::{CascadeConfig, LoggingConfig};
use cascade_core::{EffectKind, Engine, FrameClock, Host, ItemId, Scene};

/// Host without surfaces that only counts effect writes.
#[derive(Debug, Default)]
struct HeadlessHost {
    effects: u64,
}

impl Host for HeadlessHost {
    fn apply_effect(&mut self, item: ItemId, effect: EffectKind, intensity: f32) {
        self.effects += 1;
        log::trace!("effect item={item} {effect:?}={intensity:.3}");
    }
}

fn init_logging(config: &LoggingConfig) {
    let default_filter = config.filter.as_deref().unwrap_or("info");
    let env = env_logger::Env::default().default_filter_or(default_filter);
    let _ = env_logger::Builder::from_env(env).try_init();
}

fn main() -> Result<()> {
    let config = CascadeConfig::load();
    init_logging(&config.logging);

    let scene_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| config.demo.scene.clone())
        .context("no scene given: pass a path or set demo.scene in cascade.toml")?;
    let scene = Scene::load(&scene_path)
        .with_context(|| format!("loading scene {}", scene_path.display()))?;

    let mut host = HeadlessHost::default();
    let mut engine = Engine::new(config.scheduler.clone());
    let handles = scene
        .build(&mut engine, &mut host)
        .with_context(|| format!("building scene {}", scene_path.display()))?;
    log::info!(
        "loaded {} items and {} roots from {}",
        handles.items.len(),
        handles.roots.len(),
        scene_path.display()
    );

    let demo = &config.demo;
    let mut clock = FrameClock::new(demo.frame_rate, demo.fixed_rate, demo.time_scale);
    let switch_frame = demo.frames / 2;

    for frame in 0..demo.frames {
        if frame == switch_frame && frame > 0 {
            switch_roots(&mut engine, &mut host);
        }

        let times = clock.advance();
        engine.frame(&times, &mut host);

        let elapsed = (frame + 1) as f32 * clock.frame_dt();
        for event in engine.drain_events() {
            log::info!(
                "[{elapsed:7.3}s] {:<12} {:?}",
                event.name(),
                event.state()
            );
        }
    }

    let states: BTreeMap<&str, String> = handles
        .items
        .iter()
        .filter_map(|(name, id)| {
            let item = engine.item(*id)?;
            Some((name.as_str(), format!("{:?} t={:.2}", item.state(), item.time())))
        })
        .collect();
    for (name, state) in &states {
        log::info!("{name:<12} {state}");
    }
    log::info!(
        "{} frames, {} effect writes, {} items still ticking",
        demo.frames,
        host.effects,
        engine.scheduler().registry().len()
    );

    engine.scene_unloaded();
    Ok(())
}

/// Move every core root to the state after its current one.
fn switch_roots(engine: &mut Engine, host: &mut HeadlessHost) {
    let targets: Vec<(String, String)> = engine
        .scheduler()
        .roots()
        .iter()
        .filter_map(|root| {
            let states = root.states();
            let current = root
                .current_state()
                .and_then(|name| states.iter().position(|state| state.name == name))
                .unwrap_or(0);
            let next = states.get((current + 1) % states.len().max(1))?;
            Some((root.name.clone(), next.name.clone()))
        })
        .collect();

    for (root, state) in targets {
        log::info!("switching root {root} to {state}");
        engine.select_state(&root, &state, host);
    }
}
