//! Manual smoke test for the capture pipeline.
//!
//! Connects the configured backend, takes one screenshot, loads the template
//! registry, and runs a single existence pass over every template. No retry,
//! no assertions.
//!
//! Run with: cargo run --bin device_smoke

use adb_template_capture::device::DeviceSession;
use adb_template_capture::{Config, DeviceBackend, TemplateRegistry, matcher};

fn main() {
    env_logger::init();

    if let Err(e) = ctrlc::set_handler(|| {
        log::info!("Smoke test interrupted by the operator");
        std::process::exit(130);
    }) {
        log::warn!("Could not install interrupt handler: {e}");
    }

    let config = Config::from_env();
    log::info!("Starting smoke test...");

    if let Err(e) = run(&config) {
        log::error!("Smoke test failed: {e}");
        println!("Error: {e}");
        std::process::exit(1);
    }
    println!("Smoke test finished");
}

fn run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = DeviceBackend::connect(&config.device, config.use_rust_impl)?;
    let (sx, sy) = session.screen_dimensions();
    println!(
        "Connected to device '{}' size: {}x{}",
        session.device_name(),
        sx,
        sy
    );

    let snapshot = session.snapshot()?;
    println!(
        "Snapshot ok: {} bytes in {}ms",
        snapshot.bytes.len(),
        snapshot.duration_ms
    );

    let registry = TemplateRegistry::load(&config.image_dir)?;
    println!(
        "Registry: {} templates in {:?}",
        registry.len(),
        config.image_dir
    );

    for descriptor in registry.iter() {
        match matcher::template_exists(&mut session, descriptor) {
            Ok(found) => println!(
                "- {}: {}",
                descriptor.name,
                if found { "on screen" } else { "not on screen" }
            ),
            Err(e) => println!("- {}: check failed: {e}", descriptor.name),
        }
    }
    Ok(())
}
