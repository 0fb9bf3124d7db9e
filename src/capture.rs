//! Screen capture service - full-frame, region, and timed sequence captures
//! written as PNG files into the image directory.

use crate::device::{DeviceError, DeviceSession};
use chrono::Local;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Device capture failed: {source}")]
    Device {
        #[from]
        source: DeviceError,
    },

    #[error("Failed to decode snapshot image: {source}")]
    Decode { source: image::ImageError },

    #[error("Failed to save image to {path:?}: {source}")]
    Save {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Failed to create image directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(
        "Invalid capture region ({x1},{y1})-({x2},{y2}) for {width}x{height} frame: \
         coordinates must satisfy 0 <= x1 < x2 <= width and 0 <= y1 < y2 <= height"
    )]
    InvalidRegion {
        x1: u32,
        y1: u32,
        x2: u32,
        y2: u32,
        width: u32,
        height: u32,
    },

    #[error("Failed to read template image {path:?}: {source}")]
    TemplateRead {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error(
        "Template '{name}' ({t_width}x{t_height}) is larger than the screen frame ({width}x{height})"
    )]
    TemplateLargerThanFrame {
        name: String,
        t_width: u32,
        t_height: u32,
        width: u32,
        height: u32,
    },
}

/// Handles screen capture and template image creation.
///
/// Owns the device session for the lifetime of the process; the interactive
/// utility borrows it back for template matching.
pub struct ScreenCapture<S> {
    session: S,
    img_dir: PathBuf,
}

impl<S: DeviceSession> ScreenCapture<S> {
    /// Create the service, creating `img_dir` (and parents) if absent.
    pub fn new(session: S, img_dir: impl Into<PathBuf>) -> Result<Self, CaptureError> {
        let img_dir = img_dir.into();
        std::fs::create_dir_all(&img_dir).map_err(|e| CaptureError::CreateDir {
            path: img_dir.clone(),
            source: e,
        })?;
        Ok(Self { session, img_dir })
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    pub fn img_dir(&self) -> &Path {
        &self.img_dir
    }

    /// Capture the current screen and save it as a template.
    ///
    /// With no explicit name the file is `template_{YYYYMMDD_HHMMSS}.png`.
    pub fn capture_screen(&mut self, name: Option<&str>) -> Result<PathBuf, CaptureError> {
        let frame = self.take_frame()?;
        let filepath = self.target_path(name, "template");
        self.save_frame(&frame, &filepath)?;
        log::info!("Screen captured and saved as {:?}", filepath);
        Ok(filepath)
    }

    /// Capture the rectangle [x1,x2) x [y1,y2) of the current screen.
    ///
    /// Inverted or out-of-bounds rectangles are rejected with
    /// `CaptureError::InvalidRegion` before any file is written.
    pub fn capture_region(
        &mut self,
        x1: u32,
        y1: u32,
        x2: u32,
        y2: u32,
        name: Option<&str>,
    ) -> Result<PathBuf, CaptureError> {
        let frame = self.take_frame()?;
        let (width, height) = (frame.width(), frame.height());
        if x1 >= x2 || y1 >= y2 || x2 > width || y2 > height {
            return Err(CaptureError::InvalidRegion {
                x1,
                y1,
                x2,
                y2,
                width,
                height,
            });
        }
        let region = frame.crop_imm(x1, y1, x2 - x1, y2 - y1);
        let filepath = self.target_path(name, "region");
        self.save_frame(&region, &filepath)?;
        log::info!("Region captured and saved as {:?}", filepath);
        Ok(filepath)
    }

    /// Capture `count` full-frame screenshots, sleeping `interval` between
    /// consecutive captures (no sleep after the last one).
    ///
    /// The first failure aborts the sequence; files written by earlier
    /// iterations stay on disk.
    pub fn capture_sequence(
        &mut self,
        interval: Duration,
        count: usize,
        prefix: &str,
    ) -> Result<Vec<PathBuf>, CaptureError> {
        let mut paths = Vec::with_capacity(count);
        for i in 0..count {
            let frame = self.take_frame()?;
            let filepath = self.target_path(None, prefix);
            self.save_frame(&frame, &filepath)?;
            paths.push(filepath);
            if i + 1 < count {
                std::thread::sleep(interval);
            }
        }
        log::info!("Captured sequence of {} screenshots", paths.len());
        Ok(paths)
    }

    fn take_frame(&mut self) -> Result<DynamicImage, CaptureError> {
        let snapshot = self.session.snapshot().inspect_err(|e| {
            log::error!("Failed to capture screen: {e}");
        })?;
        log::debug!(
            "Snapshot: {} bytes in {}ms",
            snapshot.bytes.len(),
            snapshot.duration_ms
        );
        image::load_from_memory(&snapshot.bytes).map_err(|e| CaptureError::Decode { source: e })
    }

    fn save_frame(&self, frame: &DynamicImage, path: &Path) -> Result<(), CaptureError> {
        frame.save(path).map_err(|e| {
            log::error!("Failed to save image to {path:?}: {e}");
            CaptureError::Save {
                path: path.to_path_buf(),
                source: e,
            }
        })
    }

    /// Resolve the output path for a capture.
    ///
    /// Explicit operator names are taken as-is (and overwrite); generated
    /// names get a numeric suffix if the timestamped path already exists, so
    /// sub-second captures never collide.
    fn target_path(&self, name: Option<&str>, prefix: &str) -> PathBuf {
        match name {
            Some(name) => self.img_dir.join(format!("{name}.png")),
            None => {
                let timestamp = Local::now().format("%Y%m%d_%H%M%S");
                let stem = format!("{prefix}_{timestamp}");
                unique_path(&self.img_dir, &stem)
            }
        }
    }
}

fn unique_path(dir: &Path, stem: &str) -> PathBuf {
    let candidate = dir.join(format!("{stem}.png"));
    if !candidate.exists() {
        return candidate;
    }
    let mut n = 2;
    loop {
        let candidate = dir.join(format!("{stem}_{n}.png"));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceResult, Snapshot};
    use std::io::Cursor;
    use tempfile::TempDir;

    /// In-memory session serving a fixed synthetic frame.
    pub(crate) struct FakeSession {
        png: Vec<u8>,
        dims: (u32, u32),
        pub snapshots: usize,
    }

    impl FakeSession {
        pub(crate) fn new(width: u32, height: u32) -> Self {
            // Gradient frame so crops differ by position.
            let img = image::RgbaImage::from_fn(width, height, |x, y| {
                image::Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
            });
            let mut png = Vec::new();
            image::DynamicImage::ImageRgba8(img)
                .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
                .unwrap();
            Self {
                png,
                dims: (width, height),
                snapshots: 0,
            }
        }
    }

    impl DeviceSession for FakeSession {
        fn snapshot_png(&mut self) -> DeviceResult<Vec<u8>> {
            self.snapshots += 1;
            Ok(self.png.clone())
        }

        fn snapshot(&mut self) -> DeviceResult<Snapshot> {
            Ok(Snapshot {
                bytes: self.snapshot_png()?,
                duration_ms: 0,
            })
        }

        fn screen_dimensions(&self) -> (u32, u32) {
            self.dims
        }

        fn device_name(&self) -> &str {
            "fake-device"
        }
    }

    fn service(width: u32, height: u32) -> (ScreenCapture<FakeSession>, TempDir) {
        let dir = TempDir::new().unwrap();
        let capture = ScreenCapture::new(FakeSession::new(width, height), dir.path()).unwrap();
        (capture, dir)
    }

    #[test]
    fn capture_screen_with_explicit_name() {
        let (mut capture, _dir) = service(64, 48);
        let path = capture.capture_screen(Some("start_button")).unwrap();
        assert_eq!(path.file_name().unwrap(), "start_button.png");
        assert!(path.exists());
    }

    #[test]
    fn capture_screen_default_name_is_timestamped() {
        let (mut capture, _dir) = service(64, 48);
        let path = capture.capture_screen(None).unwrap();
        let fname = path.file_name().unwrap().to_str().unwrap();
        assert!(fname.starts_with("template_"), "got {fname}");
        assert!(fname.ends_with(".png"));
    }

    #[test]
    fn capture_round_trips_pixel_identically() {
        let (mut capture, _dir) = service(64, 48);
        let path = capture.capture_screen(None).unwrap();
        let reloaded = image::open(&path).unwrap().to_rgba8();
        let expected = image::load_from_memory(&capture.session_mut().snapshot_png().unwrap())
            .unwrap()
            .to_rgba8();
        assert_eq!(reloaded.as_raw(), expected.as_raw());
    }

    #[test]
    fn region_dimensions_match_rectangle() {
        let (mut capture, _dir) = service(64, 48);
        let path = capture.capture_region(10, 5, 30, 25, Some("crop")).unwrap();
        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (20, 20));
    }

    #[test]
    fn region_crop_picks_the_right_pixels() {
        let (mut capture, _dir) = service(64, 48);
        let path = capture.capture_region(8, 4, 16, 12, Some("crop")).unwrap();
        let img = image::open(&path).unwrap().to_rgba8();
        // Top-left of the crop is frame pixel (8,4) in the gradient.
        assert_eq!(img.get_pixel(0, 0).0, [8, 4, 12, 255]);
    }

    #[test]
    fn inverted_region_is_rejected() {
        let (mut capture, _dir) = service(64, 48);
        let err = capture.capture_region(30, 5, 10, 25, None).unwrap_err();
        assert!(matches!(err, CaptureError::InvalidRegion { .. }));
    }

    #[test]
    fn out_of_bounds_region_is_rejected() {
        let (mut capture, _dir) = service(64, 48);
        let err = capture.capture_region(0, 0, 65, 10, None).unwrap_err();
        assert!(matches!(err, CaptureError::InvalidRegion { .. }));
        let err = capture.capture_region(0, 0, 10, 49, None).unwrap_err();
        assert!(matches!(err, CaptureError::InvalidRegion { .. }));
    }

    #[test]
    fn rejected_region_writes_no_file() {
        let (mut capture, dir) = service(64, 48);
        let _ = capture.capture_region(30, 5, 10, 25, None);
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 0);
    }

    #[test]
    fn sequence_returns_exactly_count_paths() {
        let (mut capture, _dir) = service(32, 32);
        let paths = capture
            .capture_sequence(Duration::ZERO, 3, "seq")
            .unwrap();
        assert_eq!(paths.len(), 3);
        assert_eq!(capture.session().snapshots, 3);
        for path in &paths {
            assert!(path.exists());
            let fname = path.file_name().unwrap().to_str().unwrap();
            assert!(fname.starts_with("seq_"), "got {fname}");
        }
    }

    #[test]
    fn sequence_paths_never_collide_within_one_second() {
        let (mut capture, _dir) = service(32, 32);
        // Zero interval: all captures land in the same timestamp second.
        let paths = capture
            .capture_sequence(Duration::ZERO, 4, "burst")
            .unwrap();
        let mut unique: Vec<&PathBuf> = paths.iter().collect();
        unique.dedup();
        assert_eq!(unique.len(), 4);
    }

    #[test]
    fn zero_count_sequence_is_empty_and_captures_nothing() {
        let (mut capture, _dir) = service(32, 32);
        let paths = capture.capture_sequence(Duration::ZERO, 0, "seq").unwrap();
        assert!(paths.is_empty());
        assert_eq!(capture.session().snapshots, 0);
    }

    #[test]
    fn unique_path_appends_suffix() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.png"), b"x").unwrap();
        std::fs::write(dir.path().join("a_2.png"), b"x").unwrap();
        let path = unique_path(dir.path(), "a");
        assert_eq!(path.file_name().unwrap(), "a_3.png");
    }
}
