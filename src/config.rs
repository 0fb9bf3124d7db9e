//! Runtime configuration: device identifier, backend implementation, image
//! directory, and existence-test timing. Flags override env, env overrides
//! defaults.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_IMAGE_DIR: &str = "img";
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct Config {
    /// Device serial or host:port; empty picks the first available device.
    pub device: String,
    /// true = adb_client server backend, false = external `adb` binary.
    pub use_rust_impl: bool,
    /// Directory templates are read from and captures written to.
    pub image_dir: PathBuf,
    /// Wall-clock budget for the template existence test.
    pub test_timeout: Duration,
    /// Sleep between existence polls.
    pub poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: String::new(),
            use_rust_impl: true,
            image_dir: PathBuf::from(DEFAULT_IMAGE_DIR),
            test_timeout: DEFAULT_TEST_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl Config {
    /// Defaults overlaid with `ADB_DEVICE`, `ADB_IMPL`, and `TEMPLATE_DIR`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(device) = std::env::var("ADB_DEVICE") {
            config.device = device;
        }
        if let Ok(imp) = std::env::var("ADB_IMPL") {
            match imp.as_str() {
                "rust" => config.use_rust_impl = true,
                "shell" => config.use_rust_impl = false,
                other => log::warn!("Ignoring unknown ADB_IMPL '{other}'"),
            }
        }
        if let Ok(dir) = std::env::var("TEMPLATE_DIR") {
            config.image_dir = PathBuf::from(dir);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.device, "");
        assert!(config.use_rust_impl);
        assert_eq!(config.image_dir, PathBuf::from("img"));
        assert_eq!(config.test_timeout, Duration::from_secs(10));
        assert_eq!(config.poll_interval, Duration::from_millis(500));
    }
}
