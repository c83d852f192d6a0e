//! Configuration for a cataloging run

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Score a detection must exceed to be extracted.
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.7;

/// Longest side a source image is downscaled to before segmentation.
pub const DEFAULT_MAX_IMAGE_SIZE: u32 = 1024;

/// Settings passed explicitly to every stage; nothing is read from globals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// SQLite file holding the `objects` table
    pub db_path: PathBuf,

    /// Directory receiving one `<id>.png` crop per object
    pub output_dir: PathBuf,

    /// JSON file written by description aggregation
    pub descriptions_file: PathBuf,

    /// Detections at or below this score are dropped
    pub score_threshold: f32,

    /// Downscale sources whose longest side exceeds this (None keeps full size)
    pub max_image_size: Option<u32>,

    /// Blend factor of the mask overlay in the preview image
    pub overlay_alpha: f32,

    /// Draw each object's bounding box on the preview
    pub outline_boxes: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/object_metadata.db"),
            output_dir: PathBuf::from("data/output"),
            descriptions_file: PathBuf::from("data/descriptions.json"),
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            max_image_size: Some(DEFAULT_MAX_IMAGE_SIZE),
            overlay_alpha: 0.5,
            outline_boxes: false,
        }
    }
}

impl CatalogConfig {
    /// Load a config from a JSON file. Missing keys take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config: CatalogConfig = serde_json::from_str(&text)
            .with_context(|| format!("Invalid config {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&self.score_threshold) {
            anyhow::bail!("score_threshold must be in [0, 1], got {}", self.score_threshold);
        }
        if !(0.0..=1.0).contains(&self.overlay_alpha) {
            anyhow::bail!("overlay_alpha must be in [0, 1], got {}", self.overlay_alpha);
        }
        if self.max_image_size == Some(0) {
            anyhow::bail!("max_image_size must be positive");
        }
        Ok(())
    }
}
