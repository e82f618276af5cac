//! Print the effective configuration after file and environment merging.
//!
//! Run with: cargo run -p cascade-config --example print_config

use cascade_config::CascadeConfig;

fn main() {
    let config = CascadeConfig::load();
    let scheduler = &config.scheduler;
    let demo = &config.demo;

    println!("[scheduler]");
    println!("  live                   = {}", scheduler.live);
    println!("  clear on scene unload  = {}", scheduler.clear_lists_on_scene_unload);
    println!("  max catch-up steps     = {}", scheduler.max_catch_up_steps);
    match scheduler.event_queue_limit {
        Some(limit) => println!("  event queue limit      = {limit}"),
        None => println!("  event queue limit      = unbounded"),
    }

    println!("[logging]");
    println!(
        "  filter                 = {}",
        config.logging.filter.as_deref().unwrap_or("(env_logger default)")
    );

    println!("[demo]");
    match &demo.scene {
        Some(path) => println!("  scene                  = {}", path.display()),
        None => println!("  scene                  = (none)"),
    }
    println!(
        "  {} frames at {} fps, fixed phase {} Hz, time scale {}",
        demo.frames, demo.frame_rate, demo.fixed_rate, demo.time_scale
    );

    if let Ok(text) = toml::to_string_pretty(&config) {
        println!("\n{text}");
    }
}
