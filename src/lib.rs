pub mod capture;
pub mod config;
pub mod device;
pub mod matcher;
pub mod menu;
pub mod templates;

pub use capture::{CaptureError, ScreenCapture};
pub use config::Config;
pub use device::{DeviceBackend, DeviceSession};
pub use menu::CaptureApp;
pub use templates::{ConfigError, TemplateDescriptor, TemplateRegistry};
