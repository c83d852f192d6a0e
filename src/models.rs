use std::path::PathBuf;

use image::{ImageBuffer, Luma};
use serde::{Deserialize, Serialize};

/// Per-pixel object membership aligned to the source image.
///
/// Values are expected in `[0, 1]`; anything above zero counts as part of the
/// object for geometry, anything above 0.5 for overlays.
pub type Mask = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Axis-aligned box in source pixel coordinates.
///
/// Stored as the JSON array `[min_x, min_y, max_x, max_y]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u32; 4]", into = "[u32; 4]")]
pub struct BoundingBox {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl BoundingBox {
    pub fn new(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// The box covering a whole `width` x `height` canvas.
    pub fn full_canvas(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    pub fn is_ordered(&self) -> bool {
        self.min_x <= self.max_x && self.min_y <= self.max_y
    }

    /// True when every corner addresses a pixel of the canvas.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.is_ordered() && self.max_x < width && self.max_y < height
    }

    /// Serialized form used in the `bbox` column.
    pub fn to_json(&self) -> String {
        let coords: [u32; 4] = (*self).into();
        format!("[{}, {}, {}, {}]", coords[0], coords[1], coords[2], coords[3])
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

impl From<[u32; 4]> for BoundingBox {
    fn from([min_x, min_y, max_x, max_y]: [u32; 4]) -> Self {
        Self::new(min_x, min_y, max_x, max_y)
    }
}

impl From<BoundingBox> for [u32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.min_x, b.min_y, b.max_x, b.max_y]
    }
}

/// One object proposed by the segmenter, already past the score threshold.
#[derive(Debug, Clone)]
pub struct SegmentedObject {
    /// Detector box in xyxy float coordinates; informational only
    pub bbox_hint: [f32; 4],
    pub mask: Mask,
}

/// Result of extracting one object: what was written to disk and the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedObject {
    pub id: String,
    pub master_id: String,
    pub filename: String,
    pub bbox: BoundingBox,
    pub category: Option<String>,
    pub confidence: Option<f64>,
}

impl ExtractedObject {
    pub fn crop_path(&self, output_dir: &std::path::Path) -> PathBuf {
        output_dir.join(&self.filename)
    }
}

/// Label assigned to a crop by the external classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub category: String,
    pub confidence: f64,
}

impl Classification {
    pub fn new(category: impl Into<String>, confidence: f64) -> Self {
        Self {
            category: category.into(),
            confidence,
        }
    }
}
