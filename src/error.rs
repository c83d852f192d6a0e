//! Error types for the object catalog

use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by extraction, the catalog, enrichment and description output.
///
/// An empty mask is not an error: it is resolved locally to the full canvas
/// (see [`crate::detection::geometry::MaskExtent`]).
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Input error: {0}")]
    Input(String),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Storage directory error for {path:?}: {source}")]
    StorageIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Schema mismatch: {0}")]
    Schema(String),

    #[error("Failed to encode {path:?}: {source}")]
    Encoding {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Output directory error for {path:?}: {source}")]
    OutputIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Classifier error: {0}")]
    Classifier(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CatalogError {
    /// True for every failure that originates in the relational store.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            CatalogError::Storage(_) | CatalogError::StorageIo { .. } | CatalogError::Schema(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
