use std::future::Future;

use crate::error::{CatalogError, Result};
use crate::models::BoundingBox;

/// One catalog row.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedObject {
    pub id: String,
    pub master_id: String,
    pub filename: String,
    pub bbox: BoundingBox,
    pub category: Option<String>,
    pub confidence: Option<f64>,
    pub(super) _guard: (),
}

impl DetectedObject {
    pub fn is_enriched(&self) -> bool {
        self.category.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct NewObject {
    pub id: String,
    pub master_id: String,
    pub filename: String,
    pub bbox: BoundingBox,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ObjectUpdate {
    pub filename: Option<String>,
    pub bbox: Option<BoundingBox>,
    pub category: Option<String>,
    pub confidence: Option<f64>,
}

/// Row filter; both fields unset means a full scan.
#[derive(Debug, Clone, Default)]
pub struct ObjectQuery {
    pub id: Option<String>,
    pub master_id: Option<String>,
}

impl ObjectQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            master_id: None,
        }
    }

    pub fn by_master(master_id: impl Into<String>) -> Self {
        Self {
            id: None,
            master_id: Some(master_id.into()),
        }
    }
}

pub trait ObjectRepository {
    fn init_schema(&self) -> impl Future<Output = Result<()>>;
    fn insert(&self, object: &NewObject) -> impl Future<Output = Result<()>>;
    fn update(&self, id: &str, update: &ObjectUpdate) -> impl Future<Output = Result<u64>>;
    fn query(&self, filter: &ObjectQuery) -> impl Future<Output = Result<Vec<DetectedObject>>>;

    /// Set category and confidence of one row. Returns the number of rows
    /// touched, which is 0 when `id` is unknown.
    fn update_category(
        &self,
        id: &str,
        category: &str,
        confidence: f64,
    ) -> impl Future<Output = Result<u64>> {
        let update = ObjectUpdate {
            category: Some(category.to_string()),
            confidence: Some(confidence),
            ..Default::default()
        };
        let id = id.to_string();
        async move { self.update(&id, &update).await }
    }

    fn get(&self, id: &str) -> impl Future<Output = Result<Option<DetectedObject>>> {
        let filter = ObjectQuery::by_id(id);
        async move { Ok(self.query(&filter).await?.into_iter().next()) }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct ObjectRow {
    pub id: String,
    pub master_id: Option<String>,
    pub filename: Option<String>,
    pub bbox: Option<String>,
    pub category: Option<String>,
    pub confidence: Option<f64>,
}

impl TryFrom<ObjectRow> for DetectedObject {
    type Error = CatalogError;

    fn try_from(row: ObjectRow) -> Result<Self> {
        let missing = |column: &str| CatalogError::Schema(format!("Row {} has no {}", row.id, column));
        let master_id = row.master_id.clone().ok_or_else(|| missing("master_id"))?;
        let filename = row.filename.clone().ok_or_else(|| missing("filename"))?;
        let bbox_text = row.bbox.as_deref().ok_or_else(|| missing("bbox"))?;
        let bbox = BoundingBox::from_json(bbox_text).map_err(|e| {
            CatalogError::Schema(format!("Row {} has invalid bbox {:?}: {}", row.id, bbox_text, e))
        })?;
        Ok(DetectedObject {
            id: row.id,
            master_id,
            filename,
            bbox,
            category: row.category,
            confidence: row.confidence,
            _guard: (),
        })
    }
}

pub(super) fn check_confidence(confidence: Option<f64>) -> Result<()> {
    match confidence {
        Some(c) if !(0.0..=1.0).contains(&c) => Err(CatalogError::Input(format!(
            "Confidence {} is outside [0, 1]",
            c
        ))),
        _ => Ok(()),
    }
}
