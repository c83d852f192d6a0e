pub mod geometry;
pub mod preprocessing;
pub mod visualize;

use std::path::{Path, PathBuf};

use image::{DynamicImage, imageops};
use tracing::debug;

use crate::config::DEFAULT_SCORE_THRESHOLD;
use crate::error::{CatalogError, Result};
use crate::models::{Mask, SegmentedObject};

/// Raw detector output for one object, before score filtering.
#[derive(Debug, Clone)]
pub struct ScoredDetection {
    pub bbox: [f32; 4],
    pub mask: Mask,
    pub score: f32,
}

/// An instance segmentation model producing one mask per object.
///
/// Masks must be aligned to the image passed in.
pub trait Segmenter {
    fn segment(&self, image: &DynamicImage) -> anyhow::Result<Vec<ScoredDetection>>;
}

/// Runs a [`Segmenter`] and keeps only confident detections, in detector order.
pub struct SegmentationStage<S> {
    segmenter: S,
    pub score_threshold: f32,
}

impl<S: Segmenter> SegmentationStage<S> {
    pub fn new(segmenter: S) -> Self {
        Self {
            segmenter,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
        }
    }

    pub fn with_score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = threshold;
        self
    }

    pub fn segment(&self, image: &DynamicImage) -> Result<Vec<SegmentedObject>> {
        let detections = self
            .segmenter
            .segment(image)
            .map_err(|e| CatalogError::Input(format!("Segmentation failed: {:#}", e)))?;
        let total = detections.len();
        let kept = keep_confident(detections, self.score_threshold);
        debug!("Kept {} of {} detections above score {}", kept.len(), total, self.score_threshold);
        Ok(kept)
    }
}

/// Drop detections whose score does not exceed `threshold`.
pub fn keep_confident(detections: Vec<ScoredDetection>, threshold: f32) -> Vec<SegmentedObject> {
    detections
        .into_iter()
        .filter(|d| d.score > threshold)
        .map(|d| SegmentedObject {
            bbox_hint: d.bbox,
            mask: d.mask,
        })
        .collect()
}

/// Segmenter backed by precomputed masks: one grayscale image per object in
/// a directory, taken in file-name order. Every mask scores 1.0.
#[derive(Debug, Clone)]
pub struct MaskDirSegmenter {
    dir: PathBuf,
}

impl MaskDirSegmenter {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl Segmenter for MaskDirSegmenter {
    fn segment(&self, image: &DynamicImage) -> anyhow::Result<Vec<ScoredDetection>> {
        let mut detections = Vec::new();

        for path in preprocessing::image_paths(&self.dir)? {
            let mut gray = image::open(&path)
                .map_err(|e| anyhow::anyhow!("Failed to open mask {:?}: {}", path, e))?
                .to_luma8();
            if gray.dimensions() != (image.width(), image.height()) {
                gray = imageops::resize(&gray, image.width(), image.height(), imageops::FilterType::Nearest);
            }
            let mask = Mask::from_fn(gray.width(), gray.height(), |x, y| {
                image::Luma([gray.get_pixel(x, y)[0] as f32 / 255.0])
            });
            let bbox = geometry::compute_bbox(&mask).resolve(mask.width(), mask.height());
            detections.push(ScoredDetection {
                bbox: [bbox.min_x as f32, bbox.min_y as f32, bbox.max_x as f32, bbox.max_y as f32],
                mask,
                score: 1.0,
            });
        }

        Ok(detections)
    }
}
