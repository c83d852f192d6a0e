use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::core::db::{ObjectQuery, ObjectRepository};
use crate::error::{CatalogError, Result};
use crate::models::{Classification, ExtractedObject};

/// External model labelling one crop file.
pub trait Classifier {
    fn classify(&self, crop: &Path) -> anyhow::Result<Classification>;
}

impl<F> Classifier for F
where
    F: Fn(&Path) -> anyhow::Result<Classification>,
{
    fn classify(&self, crop: &Path) -> anyhow::Result<Classification> {
        self(crop)
    }
}

/// Fills in category and confidence of catalog rows from their crop files.
///
/// Only catalog rows and files on disk are read, so the stage can be run
/// again at any time; with a deterministic classifier a rerun leaves rows
/// unchanged.
#[derive(Debug, Clone)]
pub struct EnrichmentStage<C, R> {
    classifier: C,
    catalog: R,
    crop_dir: PathBuf,
}

impl<C: Classifier, R: ObjectRepository> EnrichmentStage<C, R> {
    pub fn new<P: AsRef<Path>>(classifier: C, catalog: R, crop_dir: P) -> Self {
        Self {
            classifier,
            catalog,
            crop_dir: crop_dir.as_ref().to_path_buf(),
        }
    }

    /// Classify the given objects and return them with their labels.
    pub async fn enrich(&self, objects: &[ExtractedObject]) -> Result<Vec<ExtractedObject>> {
        let mut enriched = Vec::with_capacity(objects.len());
        for object in objects {
            let label = self.classify_and_store(&object.id, &object.filename).await?;
            enriched.push(ExtractedObject {
                category: Some(label.category),
                confidence: Some(label.confidence),
                ..object.clone()
            });
        }
        Ok(enriched)
    }

    /// Classify every object of one source image. Returns the number of rows updated.
    pub async fn enrich_master(&self, master_id: &str) -> Result<usize> {
        let rows = self.catalog.query(&ObjectQuery::by_master(master_id)).await?;
        self.enrich_rows(rows.iter().map(|r| (r.id.as_str(), r.filename.as_str())))
            .await
    }

    /// Classify every row that has no category yet.
    pub async fn enrich_pending(&self) -> Result<usize> {
        let rows = self.catalog.query(&ObjectQuery::all()).await?;
        let pending: Vec<_> = rows.iter().filter(|r| !r.is_enriched()).collect();
        info!("{} of {} objects are awaiting classification", pending.len(), rows.len());
        self.enrich_rows(pending.iter().map(|r| (r.id.as_str(), r.filename.as_str())))
            .await
    }

    async fn enrich_rows<'a>(&self, rows: impl Iterator<Item = (&'a str, &'a str)>) -> Result<usize> {
        let mut count = 0;
        for (id, filename) in rows {
            self.classify_and_store(id, filename).await?;
            count += 1;
        }
        Ok(count)
    }

    async fn classify_and_store(&self, id: &str, filename: &str) -> Result<Classification> {
        let crop_path = self.crop_dir.join(filename);
        let label = self
            .classifier
            .classify(&crop_path)
            .map_err(|e| CatalogError::Classifier(format!("{:?}: {:#}", crop_path, e)))?;

        if !(0.0..=1.0).contains(&label.confidence) {
            return Err(CatalogError::Classifier(format!(
                "{:?}: confidence {} is outside [0, 1]",
                crop_path, label.confidence
            )));
        }

        let updated = self
            .catalog
            .update_category(id, &label.category, label.confidence)
            .await?;
        if updated == 0 {
            warn!("Object {} vanished from the catalog before it was classified", id);
        } else {
            debug!("Object {} classified as {} ({:.2})", id, label.category, label.confidence);
        }
        Ok(label)
    }
}
