//! Template registry - maps logical template names to image files and
//! match thresholds.
//!
//! The configuration source is the image directory itself: every `*.png`
//! becomes a template under its file stem, and an optional `templates.json`
//! manifest in the same directory can rename entries or set per-template
//! thresholds.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Default match threshold used when a descriptor does not set one.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.8;

/// Manifest filename looked up inside the image directory.
pub const MANIFEST_FILE: &str = "templates.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Template directory not found: {path:?}")]
    ImageDirMissing { path: PathBuf },

    #[error("Failed to read template directory {path:?}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read manifest {path:?}: {source}")]
    ManifestRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed manifest {path:?}: {source}")]
    ManifestParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Template '{name}' backing file not found: {path:?}")]
    BackingFileMissing { name: String, path: PathBuf },

    #[error("Template '{name}' file '{file}' escapes the image directory")]
    PathEscapes { name: String, file: String },
}

/// One loaded template: a reference image plus an optional similarity
/// threshold. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct TemplateDescriptor {
    pub name: String,
    pub path: PathBuf,
    pub threshold: Option<f32>,
}

impl TemplateDescriptor {
    pub fn effective_threshold(&self) -> f32 {
        self.threshold.unwrap_or(DEFAULT_MATCH_THRESHOLD)
    }
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    file: String,
    #[serde(default)]
    threshold: Option<f32>,
}

/// Registry of templates, loaded once at startup.
#[derive(Debug)]
pub struct TemplateRegistry {
    templates: Vec<TemplateDescriptor>,
}

impl TemplateRegistry {
    /// Scan `image_dir` (manifest first, then loose PNG files) and build the
    /// registry. Missing directory or a malformed manifest is fatal.
    pub fn load(image_dir: &Path) -> Result<Self, ConfigError> {
        if !image_dir.is_dir() {
            return Err(ConfigError::ImageDirMissing {
                path: image_dir.to_path_buf(),
            });
        }

        let mut templates: Vec<TemplateDescriptor> = Vec::new();

        let manifest_path = image_dir.join(MANIFEST_FILE);
        if manifest_path.is_file() {
            let raw =
                std::fs::read_to_string(&manifest_path).map_err(|e| ConfigError::ManifestRead {
                    path: manifest_path.clone(),
                    source: e,
                })?;
            // BTreeMap keeps manifest entries in a stable name order.
            let entries: BTreeMap<String, ManifestEntry> =
                serde_json::from_str(&raw).map_err(|e| ConfigError::ManifestParse {
                    path: manifest_path.clone(),
                    source: e,
                })?;
            for (name, entry) in entries {
                let rel = Path::new(&entry.file);
                if rel.is_absolute()
                    || rel.components().any(|c| matches!(c, Component::ParentDir))
                {
                    return Err(ConfigError::PathEscapes {
                        name,
                        file: entry.file,
                    });
                }
                let path = image_dir.join(rel);
                if !path.is_file() {
                    return Err(ConfigError::BackingFileMissing { name, path });
                }
                templates.push(TemplateDescriptor {
                    name,
                    path,
                    threshold: entry.threshold,
                });
            }
        }

        // Loose PNG files not already covered by the manifest.
        let mut scanned: Vec<TemplateDescriptor> = Vec::new();
        let entries = std::fs::read_dir(image_dir).map_err(|e| ConfigError::ReadDir {
            path: image_dir.to_path_buf(),
            source: e,
        })?;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("png") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let claimed = templates
                .iter()
                .any(|t| t.name == stem || t.path == path);
            if !claimed {
                scanned.push(TemplateDescriptor {
                    name: stem.to_string(),
                    path: path.clone(),
                    threshold: None,
                });
            }
        }
        scanned.sort_by(|a, b| a.name.cmp(&b.name));
        templates.extend(scanned);

        log::info!(
            "Loaded {} templates from {:?}",
            templates.len(),
            image_dir
        );
        Ok(Self { templates })
    }

    /// Look up a template by name. A miss is `None`, never an error.
    pub fn get(&self, name: &str) -> Option<&TemplateDescriptor> {
        self.templates.iter().find(|t| t.name == name)
    }

    /// All descriptors, in load order. Stable for the process lifetime.
    pub fn iter(&self) -> impl Iterator<Item = &TemplateDescriptor> {
        self.templates.iter()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_png(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([10, 20, 30, 255]));
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn missing_directory_is_config_error() {
        let err = TemplateRegistry::load(Path::new("/nonexistent/img")).unwrap_err();
        assert!(matches!(err, ConfigError::ImageDirMissing { .. }));
    }

    #[test]
    fn scans_loose_pngs_with_default_threshold() {
        let dir = TempDir::new().unwrap();
        write_png(dir.path(), "start_button.png");
        write_png(dir.path(), "menu_icon.png");
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let registry = TemplateRegistry::load(dir.path()).unwrap();
        assert_eq!(registry.len(), 2);
        let start = registry.get("start_button").unwrap();
        assert_eq!(start.threshold, None);
        assert_eq!(start.effective_threshold(), DEFAULT_MATCH_THRESHOLD);
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn manifest_overrides_threshold_and_orders_first() {
        let dir = TempDir::new().unwrap();
        write_png(dir.path(), "start_button.png");
        write_png(dir.path(), "menu_icon.png");
        std::fs::write(
            dir.path().join(MANIFEST_FILE),
            r#"{ "start_button": { "file": "start_button.png", "threshold": 0.92 } }"#,
        )
        .unwrap();

        let registry = TemplateRegistry::load(dir.path()).unwrap();
        assert_eq!(registry.len(), 2);
        let names: Vec<&str> = registry.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["start_button", "menu_icon"]);
        let start = registry.get("start_button").unwrap();
        assert_eq!(start.threshold, Some(0.92));
    }

    #[test]
    fn malformed_manifest_is_config_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), "{ not json").unwrap();
        let err = TemplateRegistry::load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ManifestParse { .. }));
    }

    #[test]
    fn manifest_with_missing_backing_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(MANIFEST_FILE),
            r#"{ "ghost": { "file": "ghost.png" } }"#,
        )
        .unwrap();
        let err = TemplateRegistry::load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::BackingFileMissing { .. }));
    }

    #[test]
    fn manifest_path_traversal_is_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(MANIFEST_FILE),
            r#"{ "evil": { "file": "../outside.png" } }"#,
        )
        .unwrap();
        let err = TemplateRegistry::load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::PathEscapes { .. }));
    }

    #[test]
    fn iteration_is_restartable() {
        let dir = TempDir::new().unwrap();
        write_png(dir.path(), "a.png");
        write_png(dir.path(), "b.png");
        let registry = TemplateRegistry::load(dir.path()).unwrap();
        let first: Vec<String> = registry.iter().map(|t| t.name.clone()).collect();
        let second: Vec<String> = registry.iter().map(|t| t.name.clone()).collect();
        assert_eq!(first, second);
    }
}
