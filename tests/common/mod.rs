#![allow(dead_code)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from objcat for tests
pub use objcat::{
    BoundingBox, CatalogError, Classification, DetectedObject, ExtractedObject, ExtractionPipeline,
    Mask, NewObject, ObjectCatalog, ObjectQuery, ObjectRepository, ObjectUpdate, SegmentedObject,
};
