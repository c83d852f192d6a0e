use std::cell::Cell;
use std::path::Path;

use image::{DynamicImage, Luma, Rgb, RgbImage};
use objcat::{
    BoundingBox, Classification, Classifier, Mask, NewObject, ObjectCatalog, ObjectRepository,
    SegmentedObject,
};

/// Creates an initialized catalog inside a fresh temp directory.
/// Returns both the catalog and the temp directory (which must be kept alive).
pub async fn create_test_catalog() -> (ObjectCatalog, tempfile::TempDir) {
    let dir = tempfile::TempDir::new().expect("Failed to create temp directory");
    let catalog = ObjectCatalog::new(dir.path().join("db").join("objects.db"));
    catalog
        .init_schema()
        .await
        .expect("Failed to initialize test catalog");
    (catalog, dir)
}

/// A `width` x `height` RGB image where pixel (x, y) is `[x, y, 100]` (mod 256).
pub fn make_test_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 100])
    }))
}

/// Writes a test image to disk under `dir` and returns its path.
pub fn save_test_image(dir: &Path, name: &str, width: u32, height: u32) -> std::path::PathBuf {
    let path = dir.join(name);
    make_test_image(width, height)
        .save(&path)
        .expect("Failed to save test image");
    path
}

/// Mask with value 1.0 on the inclusive rectangle `(x0, y0)..=(x1, y1)`.
pub fn rect_mask(width: u32, height: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> Mask {
    Mask::from_fn(width, height, |x, y| {
        let inside = (x0..=x1).contains(&x) && (y0..=y1).contains(&y);
        Luma([if inside { 1.0 } else { 0.0 }])
    })
}

pub fn segmented(mask: Mask) -> SegmentedObject {
    let (w, h) = mask.dimensions();
    SegmentedObject {
        bbox_hint: [0.0, 0.0, w as f32, h as f32],
        mask,
    }
}

pub fn make_new_object(id: &str, master_id: &str, filename: &str) -> NewObject {
    NewObject {
        id: id.to_string(),
        master_id: master_id.to_string(),
        filename: filename.to_string(),
        bbox: BoundingBox::new(1, 2, 30, 40),
    }
}

/// Deterministic classifier that counts its calls.
pub struct FixedClassifier {
    pub category: &'static str,
    pub confidence: f64,
    pub calls: Cell<usize>,
}

impl FixedClassifier {
    pub fn new(category: &'static str, confidence: f64) -> Self {
        Self {
            category,
            confidence,
            calls: Cell::new(0),
        }
    }
}

impl Classifier for FixedClassifier {
    fn classify(&self, crop: &Path) -> anyhow::Result<Classification> {
        if !crop.is_file() {
            anyhow::bail!("crop {:?} does not exist", crop);
        }
        self.calls.set(self.calls.get() + 1);
        Ok(Classification::new(self.category, self.confidence))
    }
}
