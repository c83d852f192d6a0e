pub mod config;
pub mod core;
pub mod describe;
pub mod detection;
pub mod enrichment;
pub mod error;
pub mod models;
pub mod pipeline;

pub use config::CatalogConfig;
pub use crate::core::db::{DetectedObject, NewObject, ObjectCatalog, ObjectQuery, ObjectRepository, ObjectUpdate};
pub use describe::{Descriptions, describe_image, generate_descriptions};
pub use detection::geometry::{MaskExtent, compute_bbox, crop, overlay_color};
pub use detection::{MaskDirSegmenter, ScoredDetection, SegmentationStage, Segmenter};
pub use enrichment::{Classifier, EnrichmentStage};
pub use error::{CatalogError, Result};
pub use models::{BoundingBox, Classification, ExtractedObject, Mask, SegmentedObject};
pub use pipeline::{Cataloger, ExtractionPipeline, ProcessedImage};
