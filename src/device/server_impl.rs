// https://crates.io/crates/adb_client
use super::error::{DeviceError, DeviceResult};
use super::types::{Device, DeviceSession};
use adb_client::{ADBDeviceExt, ADBServer, ADBServerDevice};
use image::ImageFormat;
use std::io::Cursor;

/// Session backed by the `adb_client` crate, talking to the local ADB server
/// socket directly. No `adb` binary needed on PATH.
pub struct AdbServerSession {
    device: Device,
    server_device: ADBServerDevice,
    // Server handle kept alive alongside the device connection.
    _server: ADBServer,
    screen_x: u32,
    screen_y: u32,
}

impl AdbServerSession {
    /// Open a session for `device_name`; an empty name picks the first device.
    pub fn new_with_device(device_name: &str) -> DeviceResult<Self> {
        let mut server = ADBServer::default();
        let server_device = if device_name.is_empty() {
            server.get_device()?
        } else {
            server.get_device_by_name(device_name)?
        };
        let mut session = Self {
            device: Device {
                name: device_name.to_string(),
                transport_id: None,
            },
            server_device,
            _server: server,
            screen_x: 0,
            screen_y: 0,
        };
        let (sx, sy) = session.get_screen_size()?;
        session.screen_x = sx;
        session.screen_y = sy;
        log::info!(
            "Server session open for '{}' at {}x{}",
            session.device_name(),
            sx,
            sy
        );
        Ok(session)
    }

    pub fn list_devices() -> DeviceResult<Vec<Device>> {
        let mut server = ADBServer::default();
        let devices = server.devices()?;
        Ok(devices
            .into_iter()
            .map(|d| Device {
                name: d.identifier,
                transport_id: None,
            })
            .collect())
    }

    fn get_screen_size(&mut self) -> DeviceResult<(u32, u32)> {
        let mut out: Vec<u8> = Vec::new();
        self.server_device.shell_command(&["wm", "size"], &mut out)?;
        let stdout = String::from_utf8_lossy(&out);
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

    /// Normalize raw framebuffer output to PNG bytes.
    ///
    /// Depending on the device the framebuffer service returns ready-made
    /// PNG, JPEG, or a raw RGBA dump.
    fn framebuffer_to_png(&self, data: Vec<u8>) -> DeviceResult<Vec<u8>> {
        if data.len() >= 8 && data[0..8] == *b"\x89PNG\r\n\x1a\n" {
            return Ok(data);
        }
        if data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8 {
            let img = image::load_from_memory_with_format(&data, ImageFormat::Jpeg).map_err(
                |e| DeviceError::FramebufferToPngFailed {
                    details: format!("jpeg decode: {e}"),
                },
            )?;
            let mut png = Vec::new();
            img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
                .map_err(|e| DeviceError::FramebufferToPngFailed {
                    details: format!("png encode: {e}"),
                })?;
            return Ok(png);
        }
        let pixel_count = (self.screen_x as usize) * (self.screen_y as usize);
        if pixel_count > 0 && data.len() >= pixel_count * 4 {
            // Raw RGBA, possibly with trailing padding.
            let rgba = data[..pixel_count * 4].to_vec();
            let img = image::RgbaImage::from_raw(self.screen_x, self.screen_y, rgba).ok_or(
                DeviceError::FramebufferToPngFailed {
                    details: "raw buffer did not match screen dimensions".into(),
                },
            )?;
            let mut png = Vec::new();
            image::DynamicImage::ImageRgba8(img)
                .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
                .map_err(|e| DeviceError::FramebufferToPngFailed {
                    details: format!("png encode: {e}"),
                })?;
            return Ok(png);
        }
        Err(DeviceError::FramebufferToPngFailed {
            details: format!(
                "unrecognized framebuffer format: {} bytes for {} pixels",
                data.len(),
                pixel_count
            ),
        })
    }
}

impl DeviceSession for AdbServerSession {
    fn snapshot_png(&mut self) -> DeviceResult<Vec<u8>> {
        // Framebuffer first, it avoids a shell round-trip on most devices.
        match self.server_device.framebuffer_bytes() {
            Ok(data) => match self.framebuffer_to_png(data) {
                Ok(png) => return Ok(png),
                Err(e) => log::debug!("framebuffer conversion failed, trying screencap: {e}"),
            },
            Err(e) => log::debug!("framebuffer capture failed, trying screencap: {e}"),
        }
        let mut out: Vec<u8> = Vec::new();
        self.server_device
            .shell_command(&["screencap", "-p"], &mut out)
            .map_err(|e| DeviceError::SnapshotFailed {
                details: format!("screencap fallback failed: {e}"),
            })?;
        Ok(out)
    }

    fn screen_dimensions(&self) -> (u32, u32) {
        (self.screen_x, self.screen_y)
    }

    fn device_name(&self) -> &str {
        if self.device.name.is_empty() {
            "first-available"
        } else {
            &self.device.name
        }
    }
}
