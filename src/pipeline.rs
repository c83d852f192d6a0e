use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, RgbImage};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::CatalogConfig;
use crate::core::db::{NewObject, ObjectCatalog, ObjectRepository};
use crate::detection::geometry::{apply_mask, compute_bbox};
use crate::detection::preprocessing::load_source_image;
use crate::detection::visualize::Visualizer;
use crate::detection::{SegmentationStage, Segmenter};
use crate::enrichment::{Classifier, EnrichmentStage};
use crate::error::{CatalogError, Result};
use crate::models::{ExtractedObject, SegmentedObject};

/// Turns segmented objects into crop files plus catalog rows.
///
/// One call handles one source image: all of its objects share a freshly
/// generated `master_id`. A failure aborts the call; crops and rows written
/// for earlier objects stay in place.
#[derive(Debug, Clone)]
pub struct ExtractionPipeline<R> {
    catalog: R,
    output_dir: PathBuf,
}

impl<R: ObjectRepository> ExtractionPipeline<R> {
    pub fn new<P: AsRef<Path>>(catalog: R, output_dir: P) -> Self {
        Self {
            catalog,
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn catalog(&self) -> &R {
        &self.catalog
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub async fn extract(
        &self,
        objects: &[SegmentedObject],
        source: &DynamicImage,
    ) -> Result<Vec<ExtractedObject>> {
        debug!("Starting extraction with {} segmented objects", objects.len());

        if objects.is_empty() {
            return Err(CatalogError::Input("No segmented objects to extract".to_string()));
        }

        let image = source.to_rgb8();
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(CatalogError::Input("Source image is empty".to_string()));
        }
        check_alignment(objects, width, height)?;

        std::fs::create_dir_all(&self.output_dir).map_err(|source| CatalogError::OutputIo {
            path: self.output_dir.clone(),
            source,
        })?;
        self.catalog.init_schema().await?;

        let master_id = Uuid::new_v4().to_string();
        let mut extracted = Vec::with_capacity(objects.len());

        for (i, object) in objects.iter().enumerate() {
            debug!("Processing object {}", i + 1);
            let id = Uuid::new_v4().to_string();

            let extent = compute_bbox(&object.mask);
            if extent.is_full_canvas() {
                warn!("No clear bounding box for object {}, using full image", i + 1);
            }
            let bbox = extent.resolve(width, height);
            debug!("Final bounding box: {:?}", bbox);

            let crop = apply_mask(&image, &object.mask, bbox);
            let filename = format!("{}.png", id);
            let crop_path = self.output_dir.join(&filename);
            save_crop(&crop, &crop_path)?;
            debug!("Saved object image to {:?}", crop_path);

            let row = NewObject {
                id: id.clone(),
                master_id: master_id.clone(),
                filename: filename.clone(),
                bbox,
            };
            self.catalog.insert(&row).await.inspect_err(|e| {
                error!("Failed to record object {} in the catalog: {}", id, e);
            })?;

            extracted.push(ExtractedObject {
                id,
                master_id: master_id.clone(),
                filename,
                bbox,
                category: None,
                confidence: None,
            });
        }

        info!("Extracted {} objects for master {}", extracted.len(), master_id);
        Ok(extracted)
    }
}

fn check_alignment(objects: &[SegmentedObject], width: u32, height: u32) -> Result<()> {
    for (i, object) in objects.iter().enumerate() {
        if object.mask.dimensions() != (width, height) {
            let (mw, mh) = object.mask.dimensions();
            return Err(CatalogError::Input(format!(
                "Mask {} is {}x{} but the source image is {}x{}",
                i + 1,
                mw,
                mh,
                width,
                height
            )));
        }
    }
    Ok(())
}

fn save_crop(crop: &RgbImage, path: &Path) -> Result<()> {
    crop.save_with_format(path, ImageFormat::Png)
        .map_err(|source| CatalogError::Encoding {
            path: path.to_path_buf(),
            source,
        })
}

/// Everything produced for one source image.
#[derive(Debug)]
pub struct ProcessedImage {
    pub objects: Vec<ExtractedObject>,
    pub preview: RgbImage,
}

/// Full run for a source image: segment, extract, classify, preview.
pub struct Cataloger<S, C> {
    segmentation: SegmentationStage<S>,
    extraction: ExtractionPipeline<ObjectCatalog>,
    enrichment: EnrichmentStage<C, ObjectCatalog>,
    visualizer: Visualizer,
    max_image_size: Option<u32>,
}

impl<S: Segmenter, C: Classifier> Cataloger<S, C> {
    pub fn new(config: &CatalogConfig, segmenter: S, classifier: C) -> Self {
        let catalog = ObjectCatalog::new(&config.db_path);
        Self {
            segmentation: SegmentationStage::new(segmenter)
                .with_score_threshold(config.score_threshold),
            extraction: ExtractionPipeline::new(catalog.clone(), &config.output_dir),
            enrichment: EnrichmentStage::new(classifier, catalog, &config.output_dir),
            visualizer: Visualizer::new(config.overlay_alpha)
                .with_outline_boxes(config.outline_boxes),
            max_image_size: config.max_image_size,
        }
    }

    pub fn catalog(&self) -> &ObjectCatalog {
        self.extraction.catalog()
    }

    pub async fn process_image<P: AsRef<Path>>(&self, image_path: P) -> Result<ProcessedImage> {
        let image_path = image_path.as_ref();
        info!("Processing {:?}", image_path);

        let source = load_source_image(image_path, self.max_image_size)?;
        let segmented = self.segmentation.segment(&source)?;
        let extracted = self.extraction.extract(&segmented, &source).await?;
        let objects = self.enrichment.enrich(&extracted).await?;
        let preview = self.visualizer.render(&source, &segmented);

        Ok(ProcessedImage { objects, preview })
    }
}
