// Device session layer - screen capture over ADB.
// Two interchangeable backends: the external `adb` binary, or a direct
// connection to the local ADB server via the adb_client crate.

pub mod backend;
pub mod error;
pub mod server_impl;
pub mod shell_impl;
pub mod types;

pub use backend::DeviceBackend;
pub use error::{DeviceError, DeviceResult};
pub use server_impl::AdbServerSession;
pub use shell_impl::AdbShell;
pub use types::{Device, DeviceSession, Snapshot};
