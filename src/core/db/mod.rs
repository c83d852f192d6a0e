mod model;
mod state;

use std::path::{Path, PathBuf};

use sqlx::Connection;
use tracing::{debug, info};

use crate::error::Result;

pub use model::{DetectedObject, NewObject, ObjectQuery, ObjectRepository, ObjectUpdate};

const CREATE_OBJECTS_TABLE: &str = r#"CREATE TABLE IF NOT EXISTS objects (
    id TEXT PRIMARY KEY,
    master_id TEXT,
    filename TEXT,
    bbox TEXT,
    category TEXT,
    confidence REAL
)"#;

const CREATE_MASTER_INDEX: &str =
    r#"CREATE INDEX IF NOT EXISTS idx_objects_master_id ON objects (master_id)"#;

/// SQLite-backed catalog of detected objects.
///
/// Every operation opens its own connection and closes it before returning,
/// so each call is atomic on its own but consecutive calls are not.
#[derive(Debug, Clone)]
pub struct ObjectCatalog {
    db_file: PathBuf,
}

impl ObjectCatalog {
    pub fn new<P: AsRef<Path>>(db_file: P) -> Self {
        Self {
            db_file: db_file.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.db_file
    }

    /// Drop the `objects` table and create it empty.
    ///
    /// Destroys every row; meant for test setup, the pipeline never calls it.
    pub async fn reset_schema(&self) -> Result<()> {
        let mut conn = state::open_or_create(&self.db_file).await?;
        let mut tx = conn.begin().await?;
        sqlx::query("DROP TABLE IF EXISTS objects")
            .execute(&mut *tx)
            .await?;
        sqlx::query(CREATE_OBJECTS_TABLE).execute(&mut *tx).await?;
        sqlx::query(CREATE_MASTER_INDEX).execute(&mut *tx).await?;
        tx.commit().await?;
        conn.close().await?;
        info!("Database {:?} reset", self.db_file);
        Ok(())
    }
}

impl ObjectRepository for ObjectCatalog {
    async fn init_schema(&self) -> Result<()> {
        let mut conn = state::open_or_create(&self.db_file).await?;
        sqlx::query(CREATE_OBJECTS_TABLE)
            .execute(&mut conn)
            .await?;
        sqlx::query(CREATE_MASTER_INDEX)
            .execute(&mut conn)
            .await?;
        conn.close().await?;
        Ok(())
    }

    async fn insert(&self, object: &NewObject) -> Result<()> {
        let mut conn = state::open(&self.db_file).await?;
        sqlx::query(
            r#"INSERT INTO objects (id, master_id, filename, bbox, category, confidence)
            VALUES ($1, $2, $3, $4, NULL, NULL)"#,
        )
        .bind(&object.id)
        .bind(&object.master_id)
        .bind(&object.filename)
        .bind(object.bbox.to_json())
        .execute(&mut conn)
        .await?;
        conn.close().await?;
        Ok(())
    }

    async fn update(&self, id: &str, update: &ObjectUpdate) -> Result<u64> {
        model::check_confidence(update.confidence)?;
        let mut conn = state::open(&self.db_file).await?;
        let bbox = update.bbox.map(|b| b.to_json());
        let affected = sqlx::query(
            r#"UPDATE objects SET
                filename = COALESCE($1, filename),
                bbox = COALESCE($2, bbox),
                category = COALESCE($3, category),
                confidence = COALESCE($4, confidence)
            WHERE id = $5"#,
        )
        .bind(&update.filename)
        .bind(bbox)
        .bind(&update.category)
        .bind(update.confidence)
        .bind(id)
        .execute(&mut conn)
        .await?
        .rows_affected();
        conn.close().await?;
        if affected == 0 {
            debug!("No object with id {} to update", id);
        }
        Ok(affected)
    }

    async fn query(&self, filter: &ObjectQuery) -> Result<Vec<DetectedObject>> {
        let mut conn = state::open(&self.db_file).await?;
        let rows = sqlx::query_as::<_, model::ObjectRow>(
            r#"SELECT id, master_id, filename, bbox, category, confidence
            FROM objects
            WHERE ($1 IS NULL OR id = $1)
            AND ($2 IS NULL OR master_id = $2)
            ORDER BY rowid ASC"#,
        )
        .bind(&filter.id)
        .bind(&filter.master_id)
        .fetch_all(&mut conn)
        .await?;
        conn.close().await?;
        rows.into_iter().map(DetectedObject::try_from).collect()
    }
}
