//! Interactive capture utility - a text menu loop driving the capture
//! service and template registry from operator input.

use crate::capture::ScreenCapture;
use crate::device::DeviceSession;
use crate::matcher;
use crate::templates::TemplateRegistry;
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("'{value}' is not a valid integer for {field}")]
    InvalidInt { field: &'static str, value: String },

    #[error("'{value}' is not a valid number for {field}")]
    InvalidFloat { field: &'static str, value: String },

    #[error("{field} must be a non-negative number, got {value}")]
    OutOfRange { field: &'static str, value: String },

    #[error("input closed")]
    Eof,
}

fn parse_u32(field: &'static str, raw: &str) -> Result<u32, InputError> {
    raw.trim().parse().map_err(|_| InputError::InvalidInt {
        field,
        value: raw.trim().to_string(),
    })
}

fn parse_interval(raw: &str) -> Result<Duration, InputError> {
    let secs: f64 = raw.trim().parse().map_err(|_| InputError::InvalidFloat {
        field: "interval",
        value: raw.trim().to_string(),
    })?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(InputError::OutOfRange {
            field: "interval",
            value: raw.trim().to_string(),
        });
    }
    Ok(Duration::from_secs_f64(secs))
}

fn parse_count(raw: &str) -> Result<usize, InputError> {
    raw.trim().parse().map_err(|_| InputError::InvalidInt {
        field: "count",
        value: raw.trim().to_string(),
    })
}

/// Print a prompt and read one line. `None` means end of input.
fn prompt<R: BufRead>(input: &mut R, label: &str) -> Option<String> {
    print!("{label}");
    let _ = std::io::stdout().flush();
    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(0) => None,
        Ok(_) => Some(line.trim().to_string()),
        Err(e) => {
            log::error!("Failed to read input: {e}");
            None
        }
    }
}

fn print_menu() {
    println!("\n=== Template Capture Utility ===");
    println!("1. Capture full screen");
    println!("2. Capture region");
    println!("3. Capture sequence");
    println!("4. Test existing template");
    println!("5. List existing templates");
    println!("q. Quit");
    println!("================================");
}

/// The operator-facing application: one device session, one capture service,
/// one registry, driven by a single-threaded menu loop.
pub struct CaptureApp<S> {
    capture: ScreenCapture<S>,
    registry: TemplateRegistry,
    test_timeout: Duration,
    poll_interval: Duration,
    running: Arc<AtomicBool>,
}

impl<S: DeviceSession> CaptureApp<S> {
    pub fn new(
        capture: ScreenCapture<S>,
        registry: TemplateRegistry,
        test_timeout: Duration,
        poll_interval: Duration,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            capture,
            registry,
            test_timeout,
            poll_interval,
            running,
        }
    }

    /// Run the menu loop until `q`, end of input, or interrupt.
    pub fn run<R: BufRead>(&mut self, input: &mut R) {
        while self.running.load(Ordering::SeqCst) {
            print_menu();
            let Some(choice) = prompt(input, "Enter your choice: ") else {
                break;
            };
            match choice.to_lowercase().as_str() {
                "q" => break,
                "1" => self.capture_full_screen(input),
                "2" => self.capture_region(input),
                "3" => self.capture_sequence(input),
                "4" => self.test_template(input),
                "5" => self.list_templates(),
                _ => println!("\nInvalid choice, please try again"),
            }
        }
    }

    fn capture_full_screen<R: BufRead>(&mut self, input: &mut R) {
        let Some(name) = prompt(
            input,
            "Enter name for the template (or press Enter for timestamp): ",
        ) else {
            return;
        };
        let name = if name.is_empty() { None } else { Some(name) };
        match self.capture.capture_screen(name.as_deref()) {
            Ok(filepath) => println!("\nTemplate saved to: {}", filepath.display()),
            Err(e) => println!("\nError capturing screen: {e}"),
        }
    }

    fn capture_region<R: BufRead>(&mut self, input: &mut R) {
        println!("\nEnter region coordinates:");
        let coords = (|| -> Result<(u32, u32, u32, u32), InputError> {
            let x1 = parse_u32("X1", &prompt(input, "X1 (top-left): ").ok_or(InputError::Eof)?)?;
            let y1 = parse_u32("Y1", &prompt(input, "Y1 (top-left): ").ok_or(InputError::Eof)?)?;
            let x2 = parse_u32(
                "X2",
                &prompt(input, "X2 (bottom-right): ").ok_or(InputError::Eof)?,
            )?;
            let y2 = parse_u32(
                "Y2",
                &prompt(input, "Y2 (bottom-right): ").ok_or(InputError::Eof)?,
            )?;
            Ok((x1, y1, x2, y2))
        })();
        let (x1, y1, x2, y2) = match coords {
            Ok(c) => c,
            Err(e) => {
                println!("\nError: please enter valid numbers for coordinates ({e})");
                return;
            }
        };
        let Some(name) = prompt(
            input,
            "Enter name for the template (or press Enter for timestamp): ",
        ) else {
            return;
        };
        let name = if name.is_empty() { None } else { Some(name) };
        match self.capture.capture_region(x1, y1, x2, y2, name.as_deref()) {
            Ok(filepath) => println!("\nTemplate saved to: {}", filepath.display()),
            Err(e) => println!("\nError capturing region: {e}"),
        }
    }

    fn capture_sequence<R: BufRead>(&mut self, input: &mut R) {
        let parsed = (|| -> Result<(Duration, usize, String), InputError> {
            let interval = parse_interval(
                &prompt(input, "Enter interval between captures (seconds): ")
                    .ok_or(InputError::Eof)?,
            )?;
            let count = parse_count(
                &prompt(input, "Enter number of captures: ").ok_or(InputError::Eof)?,
            )?;
            let prefix = prompt(input, "Enter prefix for filenames (default: seq): ")
                .ok_or(InputError::Eof)?;
            let prefix = if prefix.is_empty() {
                "seq".to_string()
            } else {
                prefix
            };
            Ok((interval, count, prefix))
        })();
        let (interval, count, prefix) = match parsed {
            Ok(p) => p,
            Err(e) => {
                println!("\nError: please enter valid numbers for interval and count ({e})");
                return;
            }
        };
        println!("\nStarting sequence capture ({count} images)...");
        match self.capture.capture_sequence(interval, count, &prefix) {
            Ok(paths) => {
                println!("\nCaptured {} images:", paths.len());
                for path in paths {
                    println!("- {}", path.display());
                }
            }
            Err(e) => println!("\nError capturing sequence: {e}"),
        }
    }

    fn test_template<R: BufRead>(&mut self, input: &mut R) {
        println!("\nAvailable templates:");
        for descriptor in self.registry.iter() {
            println!("- {}", descriptor.name);
        }
        let Some(key) = prompt(input, "\nEnter template name to test: ") else {
            return;
        };
        let Some(descriptor) = self.registry.get(&key) else {
            println!("\nTemplate '{key}' not found");
            return;
        };
        println!(
            "\nTesting template for {} seconds...",
            self.test_timeout.as_secs()
        );
        match matcher::poll_exists(
            self.capture.session_mut(),
            descriptor,
            self.test_timeout,
            self.poll_interval,
            &self.running,
        ) {
            Ok(true) => println!("\nTemplate '{key}' found on screen!"),
            Ok(false) => println!("\nTemplate '{key}' not found on screen during test period"),
            Err(e) => println!("\nError testing template: {e}"),
        }
    }

    fn list_templates(&self) {
        println!("\nAvailable templates:");
        if self.registry.is_empty() {
            println!("(none)");
            return;
        }
        for descriptor in self.registry.iter() {
            println!("- {}:", descriptor.name);
            println!("  File: {}", descriptor.path.display());
            match descriptor.threshold {
                Some(t) => println!("  Threshold: {t}"),
                None => println!("  Threshold: Default"),
            }
            if !descriptor.path.is_file() {
                println!("  Warning: backing file is missing");
            }
        }
    }
}
