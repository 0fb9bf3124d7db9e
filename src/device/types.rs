// Core device session types and traits

use super::error::DeviceResult;

/// One screenshot taken from the device, as encoded PNG bytes.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub bytes: Vec<u8>,
    pub duration_ms: u128,
}

/// A connected screen-capture session (shell or rust ADB implementation).
///
/// Opened once at startup and shared by every capture and match call for the
/// lifetime of the process.
pub trait DeviceSession {
    /// Raw backend-specific capture, returning PNG bytes.
    fn snapshot_png(&mut self) -> DeviceResult<Vec<u8>>;

    /// High-level capture with timing.
    fn snapshot(&mut self) -> DeviceResult<Snapshot> {
        let start = std::time::Instant::now();
        let bytes = self.snapshot_png()?;
        Ok(Snapshot {
            bytes,
            duration_ms: start.elapsed().as_millis(),
        })
    }

    fn screen_dimensions(&self) -> (u32, u32);
    fn device_name(&self) -> &str;
}

#[derive(Debug, PartialEq, Clone)]
pub struct Device {
    pub name: String,
    pub transport_id: Option<String>,
}
