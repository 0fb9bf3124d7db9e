use std::path::PathBuf;
use thiserror::Error;

/// A specialized `Result` type for device session operations.
pub type DeviceResult<T> = Result<T, DeviceError>;

/// The error type for all device/ADB-related operations.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error(
        "'adb' binary not found in PATH. Install Android Platform Tools (https://developer.android.com/tools/adb) or add 'adb' to PATH. Alternatively run with --impl=rust (pure Rust backend)."
    )]
    AdbBinaryNotFound,

    #[error(
        "'adb' command found but returned non-zero ({status}). Ensure Android Platform Tools are properly installed, or switch to --impl=rust."
    )]
    AdbBinaryUnusable { status: String },

    #[error("Failed to invoke '{command}': {source}")]
    CommandIo {
        command: String,
        source: std::io::Error,
    },

    #[error("'{command}' failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("ADB server operation failed: {source}")]
    Server {
        #[from]
        source: adb_client::RustADBError,
    },

    #[error("No devices found. Connect a device or run 'adb connect <host:port>' first.")]
    NoDevices,

    #[error("Device '{name}' not found")]
    DeviceNotFound { name: String },

    #[error("adb connect to '{target}' refused: {details}. Try 'adb tcpip 5555' on the device.")]
    ConnectRefused { target: String, details: String },

    #[error("Device '{name}' is missing a transport_id in 'adb devices -l' output")]
    MissingTransportId { name: String },

    #[error("Could not parse screen size from 'wm size' output")]
    ScreenSizeParseFailed,

    #[error("Screenshot capture failed: {details}")]
    SnapshotFailed { details: String },

    #[error("Failed to convert framebuffer to PNG: {details}")]
    FramebufferToPngFailed { details: String },

    #[error("Failed to write snapshot to {path:?}: {source}")]
    SnapshotWrite {
        path: PathBuf,
        source: std::io::Error,
    },
}
