use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::{info, warn};

use crate::core::db::{DetectedObject, ObjectQuery, ObjectRepository};
use crate::error::{CatalogError, Result};

/// `master_id` to the descriptions of its objects, in catalog order.
pub type Descriptions = BTreeMap<String, Vec<String>>;

/// Rendered in place of a missing category or confidence.
pub const NOT_AVAILABLE: &str = "N/A";

pub fn describe_object(object: &DetectedObject) -> String {
    let confidence = match object.confidence {
        Some(c) => format!("{:.2}", c),
        None => NOT_AVAILABLE.to_string(),
    };
    format!(
        "Object in {}: {} (confidence: {})",
        object.filename,
        object.category.as_deref().unwrap_or(NOT_AVAILABLE),
        confidence
    )
}

pub fn group_descriptions(objects: &[DetectedObject]) -> Descriptions {
    let mut descriptions = Descriptions::new();
    for object in objects {
        if object.confidence.is_none() {
            warn!("Confidence is None for object in {}", object.filename);
        }
        descriptions
            .entry(object.master_id.clone())
            .or_default()
            .push(describe_object(object));
    }
    descriptions
}

/// Describe every catalogued object, grouped by source image, and write the
/// result to `output_file` as indented JSON, replacing its contents.
pub async fn generate_descriptions<R, P>(catalog: &R, output_file: P) -> Result<Descriptions>
where
    R: ObjectRepository,
    P: AsRef<Path>,
{
    let output_file = output_file.as_ref();
    info!("Generating object descriptions into {:?}", output_file);

    let objects = catalog.query(&ObjectQuery::all()).await?;
    info!("Found {} objects in the database", objects.len());

    let descriptions = group_descriptions(&objects);
    write_descriptions(&descriptions, output_file)?;

    info!("Generated descriptions for {} images", descriptions.len());
    Ok(descriptions)
}

/// Descriptions of the objects extracted from one source image.
pub async fn describe_image<R: ObjectRepository>(catalog: &R, master_id: &str) -> Result<Vec<String>> {
    let objects = catalog.query(&ObjectQuery::by_master(master_id)).await?;
    Ok(objects.iter().map(describe_object).collect())
}

fn write_descriptions(descriptions: &Descriptions, output_file: &Path) -> Result<()> {
    let io_error = |source: std::io::Error| CatalogError::OutputIo {
        path: output_file.to_path_buf(),
        source,
    };
    let mut writer = BufWriter::new(File::create(output_file).map_err(io_error)?);
    serde_json::to_writer_pretty(&mut writer, descriptions)?;
    writer.flush().map_err(io_error)?;
    Ok(())
}
