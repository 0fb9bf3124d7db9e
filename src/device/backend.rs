use super::error::DeviceResult;
use super::server_impl::AdbServerSession;
use super::shell_impl::AdbShell;
use super::types::{Device, DeviceSession};

/// Selected device backend, fixed at startup.
pub enum DeviceBackend {
    Shell(AdbShell),
    Server(AdbServerSession),
}

impl DeviceBackend {
    pub fn list_devices(use_rust: bool) -> DeviceResult<Vec<Device>> {
        if use_rust {
            AdbServerSession::list_devices()
        } else {
            AdbShell::list_devices()
        }
    }

    /// Connect to `device_name` (empty = first available) with the chosen
    /// implementation.
    pub fn connect(device_name: &str, use_rust: bool) -> DeviceResult<Self> {
        if use_rust {
            Ok(DeviceBackend::Server(AdbServerSession::new_with_device(
                device_name,
            )?))
        } else {
            Ok(DeviceBackend::Shell(AdbShell::new_with_device(
                device_name,
            )?))
        }
    }
}

impl DeviceSession for DeviceBackend {
    fn snapshot_png(&mut self) -> DeviceResult<Vec<u8>> {
        match self {
            DeviceBackend::Shell(s) => s.snapshot_png(),
            DeviceBackend::Server(r) => r.snapshot_png(),
        }
    }

    fn screen_dimensions(&self) -> (u32, u32) {
        match self {
            DeviceBackend::Shell(s) => s.screen_dimensions(),
            DeviceBackend::Server(r) => r.screen_dimensions(),
        }
    }

    fn device_name(&self) -> &str {
        match self {
            DeviceBackend::Shell(s) => s.device_name(),
            DeviceBackend::Server(r) => r.device_name(),
        }
    }
}
