use super::error::{DeviceError, DeviceResult};
use super::types::{Device, DeviceSession};
use std::process::Command;

/// Session backed by the external `adb` binary.
pub struct AdbShell {
    pub device: Device,
    pub transport_id: String,
    pub screen_x: u32,
    pub screen_y: u32,
}

impl AdbShell {
    fn ensure_adb_available() -> DeviceResult<()> {
        match Command::new("adb").arg("version").output() {
            Ok(out) => {
                if !out.status.success() {
                    return Err(DeviceError::AdbBinaryUnusable {
                        status: out.status.to_string(),
                    });
                }
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(DeviceError::AdbBinaryNotFound)
            }
            Err(e) => Err(DeviceError::CommandIo {
                command: "adb version".into(),
                source: e,
            }),
        }
    }

    /// Open a session for `device_name`.
    ///
    /// An empty name picks the first device. A `host:port` name that is not
    /// already listed is connected via `adb connect` first.
    pub fn new_with_device(device_name: &str) -> DeviceResult<Self> {
        Self::ensure_adb_available()?;
        let devices = Self::list_devices()?;
        if devices.is_empty() && device_name.is_empty() {
            return Err(DeviceError::NoDevices);
        }
        let device = if device_name.is_empty() {
            devices.into_iter().next().ok_or(DeviceError::NoDevices)?
        } else if let Some(d) = devices.into_iter().find(|d| d.name == device_name) {
            d
        } else if device_name.contains(':') {
            Self::adb_connect(device_name)?;
            Self::list_devices()?
                .into_iter()
                .find(|d| d.name == device_name)
                .ok_or_else(|| DeviceError::DeviceNotFound {
                    name: device_name.to_string(),
                })?
        } else {
            return Err(DeviceError::DeviceNotFound {
                name: device_name.to_string(),
            });
        };
        let transport_id =
            device
                .transport_id
                .clone()
                .ok_or_else(|| DeviceError::MissingTransportId {
                    name: device.name.clone(),
                })?;
        let (screen_x, screen_y) = Self::get_screen_size(&transport_id)?;
        log::info!(
            "Shell session open for '{}' (transport {}) at {}x{}",
            device.name,
            transport_id,
            screen_x,
            screen_y
        );
        Ok(Self {
            device,
            transport_id,
            screen_x,
            screen_y,
        })
    }

    fn adb_connect(target: &str) -> DeviceResult<()> {
        let output = Command::new("adb")
            .arg("connect")
            .arg(target)
            .output()
            .map_err(|e| DeviceError::CommandIo {
                command: format!("adb connect {target}"),
                source: e,
            })?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success()
            || stdout.contains("Connection refused")
            || stderr.contains("Connection refused")
        {
            return Err(DeviceError::ConnectRefused {
                target: target.to_string(),
                details: format!("{}{}", stdout.trim(), stderr.trim()),
            });
        }
        Ok(())
    }

    pub fn list_devices() -> DeviceResult<Vec<Device>> {
        Self::ensure_adb_available()?;
        let output = Command::new("adb")
            .arg("devices")
            .arg("-l")
            .output()
            .map_err(|e| DeviceError::CommandIo {
                command: "adb devices -l".into(),
                source: e,
            })?;
        if !output.status.success() {
            return Err(DeviceError::CommandFailed {
                command: "adb devices -l".into(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(Self::parse_devices(&String::from_utf8_lossy(
            &output.stdout,
        )))
    }

    pub fn parse_devices(output: &str) -> Vec<Device> {
        output
            .lines()
            .skip(1)
            .filter_map(|line| {
                let parts: Vec<&str> = line.split_whitespace().collect();
                if parts.len() >= 2 && parts[1] == "device" {
                    let name = parts[0].to_string();
                    let transport_id = line.split_whitespace().find_map(|part| {
                        part.strip_prefix("transport_id:").map(str::to_string)
                    });
                    Some(Device { name, transport_id })
                } else {
                    None
                }
            })
            .collect()
    }

    fn get_screen_size(transport_id: &str) -> DeviceResult<(u32, u32)> {
        let output = Command::new("adb")
            .arg("-t")
            .arg(transport_id)
            .arg("shell")
            .arg("wm")
            .arg("size")
            .output()
            .map_err(|e| DeviceError::CommandIo {
                command: "adb shell wm size".into(),
                source: e,
            })?;
        if !output.status.success() {
            return Err(DeviceError::CommandFailed {
                command: "adb shell wm size".into(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Self::parse_screen_size(&String::from_utf8_lossy(&output.stdout))
    }

    pub fn parse_screen_size(stdout: &str) -> DeviceResult<(u32, u32)> {
        for line in stdout.lines() {
            if let Some(size_str) = line.strip_prefix("Physical size: ") {
                let parts: Vec<&str> = size_str.trim().split('x').collect();
                if parts.len() == 2
                    && let (Ok(x), Ok(y)) = (parts[0].parse::<u32>(), parts[1].parse::<u32>())
                {
                    return Ok((x, y));
                }
            }
        }
        Err(DeviceError::ScreenSizeParseFailed)
    }
}

impl DeviceSession for AdbShell {
    fn snapshot_png(&mut self) -> DeviceResult<Vec<u8>> {
        let output = Command::new("adb")
            .arg("-t")
            .arg(&self.transport_id)
            .arg("exec-out")
            .arg("screencap")
            .arg("-p")
            .output()
            .map_err(|e| DeviceError::CommandIo {
                command: "adb exec-out screencap -p".into(),
                source: e,
            })?;
        if !output.status.success() {
            return Err(DeviceError::CommandFailed {
                command: "adb exec-out screencap -p".into(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(output.stdout)
    }

    fn screen_dimensions(&self) -> (u32, u32) {
        (self.screen_x, self.screen_y)
    }

    fn device_name(&self) -> &str {
        &self.device.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_devices_filters_offline_rows() {
        let out = "List of devices attached\n\
                   emulator-5554          device product:sdk_gphone64 transport_id:1\n\
                   192.168.1.20:5555      offline transport_id:2\n";
        let devices = AdbShell::parse_devices(out);
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].name, "emulator-5554");
        assert_eq!(devices[0].transport_id.as_deref(), Some("1"));
    }

    #[test]
    fn parse_devices_without_transport_id() {
        let out = "List of devices attached\nabc123 device\n";
        let devices = AdbShell::parse_devices(out);
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].transport_id, None);
    }

    #[test]
    fn parse_screen_size_physical() {
        let out = "Physical size: 1080x2400\n";
        assert_eq!(AdbShell::parse_screen_size(out).unwrap(), (1080, 2400));
    }

    #[test]
    fn parse_screen_size_garbage_is_error() {
        assert!(AdbShell::parse_screen_size("no size here").is_err());
    }
}
