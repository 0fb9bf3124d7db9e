use adb_template_capture::device::DeviceSession;
use adb_template_capture::{CaptureApp, Config, DeviceBackend, ScreenCapture, TemplateRegistry};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let mut config = Config::from_env();

    // Parse all flags (skip program name)
    for arg in args.iter().skip(1) {
        if arg == "--help" || arg == "-h" {
            print_help();
            return;
        } else if arg == "--version" || arg == "-v" {
            println!("adb-template-capture v{}", env!("CARGO_PKG_VERSION"));
            return;
        } else if let Some(rest) = arg.strip_prefix("--impl=") {
            config.use_rust_impl = match rest {
                "rust" => true,
                "shell" => false,
                other => {
                    println!("Unknown impl '{}', expected 'rust' or 'shell'", other);
                    return;
                }
            };
        } else if let Some(rest) = arg.strip_prefix("--device=") {
            config.device = rest.to_string();
        } else if let Some(rest) = arg.strip_prefix("--dir=") {
            config.image_dir = PathBuf::from(rest);
        } else {
            println!("Unknown argument: {}", arg);
            print_help();
            return;
        }
    }

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        // Farewell and closing message are guaranteed even when the
        // interrupt lands while the loop is blocked reading stdin.
        if let Err(e) = ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
            println!("\nExiting...");
            println!("\nTemplate capture utility closed");
            std::process::exit(130);
        }) {
            log::warn!("Could not install interrupt handler: {e}");
        }
    }

    match run(config, running) {
        Ok(()) => {}
        Err(e) => {
            log::error!("An error occurred: {e}");
            println!("\nError: {e}");
        }
    }

    // Guaranteed closing message on every exit path.
    println!("\nTemplate capture utility closed");
}

fn run(config: Config, running: Arc<AtomicBool>) -> Result<(), Box<dyn std::error::Error>> {
    let session = DeviceBackend::connect(&config.device, config.use_rust_impl)?;
    let (sx, sy) = session.screen_dimensions();
    log::info!(
        "Connected to device '{}' ({}x{})",
        session.device_name(),
        sx,
        sy
    );

    let capture = ScreenCapture::new(session, config.image_dir.clone())?;
    let registry = TemplateRegistry::load(&config.image_dir)?;

    let mut app = CaptureApp::new(
        capture,
        registry,
        config.test_timeout,
        config.poll_interval,
        running,
    );
    app.run(&mut std::io::stdin().lock());
    Ok(())
}

fn print_help() {
    println!("Template capture utility for ADB game automation");
    println!();
    println!("USAGE:");
    println!("    adb-template-capture [FLAGS]");
    println!();
    println!("FLAGS:");
    println!("    --device=<id>       Device serial or host:port (default: first available)");
    println!("    --impl=<shell|rust> Select ADB implementation (default: rust)");
    println!("                        The shell implementation requires the ADB tool to be installed.");
    println!("    --dir=<path>        Template image directory (default: img)");
    println!("    --help, -h          Show this help message");
    println!("    --version, -v       Show version information");
    println!();
    println!("ENVIRONMENT:");
    println!("    ADB_DEVICE, ADB_IMPL, TEMPLATE_DIR  Same settings, overridden by flags");
    println!();
    println!("EXAMPLES:");
    println!("    adb-template-capture");
    println!("    adb-template-capture --device=192.168.1.20:5555 --impl=shell");
    println!("    adb-template-capture --dir=img/corah");
}
