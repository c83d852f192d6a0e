//! Integration tests for classification of extracted objects.

mod common;

use std::path::Path;

use common::*;
use objcat::{Classifier, EnrichmentStage};

async fn extract_two(catalog: &ObjectCatalog, crop_dir: &Path) -> anyhow::Result<Vec<ExtractedObject>> {
    let pipeline = ExtractionPipeline::new(catalog.clone(), crop_dir);
    let objects = vec![
        segmented(rect_mask(32, 32, 1, 1, 8, 8)),
        segmented(rect_mask(32, 32, 10, 12, 30, 31)),
    ];
    Ok(pipeline.extract(&objects, &make_test_image(32, 32)).await?)
}

#[tokio::test]
async fn test_enrich_updates_rows() -> anyhow::Result<()> {
    let (catalog, temp_dir) = create_test_catalog().await;
    let crop_dir = temp_dir.path().join("crops");
    let extracted = extract_two(&catalog, &crop_dir).await?;

    let stage = EnrichmentStage::new(FixedClassifier::new("cat", 0.9), catalog.clone(), &crop_dir);
    let enriched = stage.enrich(&extracted).await?;

    assert_eq!(enriched.len(), 2);
    for (object, original) in enriched.iter().zip(&extracted) {
        assert_eq!(object.id, original.id);
        assert_eq!(object.category.as_deref(), Some("cat"));
        assert_eq!(object.confidence, Some(0.9));

        let row = catalog.get(&object.id).await?.expect("row should exist");
        assert_eq!(row.category.as_deref(), Some("cat"));
        assert_eq!(row.confidence, Some(0.9));
    }

    Ok(())
}

#[tokio::test]
async fn test_enrich_twice_equals_once() -> anyhow::Result<()> {
    let (catalog, temp_dir) = create_test_catalog().await;
    let crop_dir = temp_dir.path().join("crops");
    let extracted = extract_two(&catalog, &crop_dir).await?;
    let stage = EnrichmentStage::new(FixedClassifier::new("dog", 0.42), catalog.clone(), &crop_dir);

    stage.enrich(&extracted).await?;
    let once = catalog.query(&ObjectQuery::all()).await?;

    stage.enrich(&extracted).await?;
    let twice = catalog.query(&ObjectQuery::all()).await?;

    assert_eq!(once, twice);

    Ok(())
}

#[tokio::test]
async fn test_enrich_pending_only_touches_unclassified_rows() -> anyhow::Result<()> {
    let (catalog, temp_dir) = create_test_catalog().await;
    let crop_dir = temp_dir.path().join("crops");
    let extracted = extract_two(&catalog, &crop_dir).await?;

    // First object was classified before a simulated crash
    catalog.update_category(&extracted[0].id, "bird", 0.7).await?;

    let classifier = FixedClassifier::new("car", 0.8);
    let stage = EnrichmentStage::new(classifier, catalog.clone(), &crop_dir);
    let count = stage.enrich_pending().await?;
    assert_eq!(count, 1);

    let first = catalog.get(&extracted[0].id).await?.expect("row should exist");
    let second = catalog.get(&extracted[1].id).await?.expect("row should exist");
    assert_eq!(first.category.as_deref(), Some("bird"));
    assert_eq!(second.category.as_deref(), Some("car"));

    // Nothing left to do
    assert_eq!(stage.enrich_pending().await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_enrich_master_classifies_one_image() -> anyhow::Result<()> {
    let (catalog, temp_dir) = create_test_catalog().await;
    let crop_dir = temp_dir.path().join("crops");
    let first = extract_two(&catalog, &crop_dir).await?;
    let second = extract_two(&catalog, &crop_dir).await?;

    let stage = EnrichmentStage::new(FixedClassifier::new("cup", 0.6), catalog.clone(), &crop_dir);
    let count = stage.enrich_master(&second[0].master_id).await?;
    assert_eq!(count, 2);

    for object in &first {
        assert_eq!(catalog.get(&object.id).await?.expect("row").category, None);
    }
    for object in &second {
        assert_eq!(
            catalog.get(&object.id).await?.expect("row").category.as_deref(),
            Some("cup")
        );
    }

    Ok(())
}

#[tokio::test]
async fn test_classifier_failure_propagates() -> anyhow::Result<()> {
    let (catalog, temp_dir) = create_test_catalog().await;
    let crop_dir = temp_dir.path().join("crops");
    let extracted = extract_two(&catalog, &crop_dir).await?;

    let failing = |_: &Path| -> anyhow::Result<Classification> { anyhow::bail!("model not loaded") };
    let stage = EnrichmentStage::new(failing, catalog.clone(), &crop_dir);

    let result = stage.enrich(&extracted).await;
    assert!(matches!(result, Err(CatalogError::Classifier(_))));
    assert!(catalog.query(&ObjectQuery::all()).await?.iter().all(|o| o.category.is_none()));

    Ok(())
}

#[tokio::test]
async fn test_out_of_range_confidence_is_not_stored() -> anyhow::Result<()> {
    let (catalog, temp_dir) = create_test_catalog().await;
    let crop_dir = temp_dir.path().join("crops");
    let extracted = extract_two(&catalog, &crop_dir).await?;

    let stage = EnrichmentStage::new(FixedClassifier::new("cat", 1.2), catalog.clone(), &crop_dir);
    let result = stage.enrich(&extracted).await;
    assert!(matches!(result, Err(CatalogError::Classifier(_))));

    let row = catalog.get(&extracted[0].id).await?.expect("row should exist");
    assert_eq!(row.confidence, None);

    Ok(())
}

#[tokio::test]
async fn test_missing_crop_file_fails_enrichment() -> anyhow::Result<()> {
    let (catalog, temp_dir) = create_test_catalog().await;
    let crop_dir = temp_dir.path().join("crops");
    let extracted = extract_two(&catalog, &crop_dir).await?;
    std::fs::remove_file(crop_dir.join(&extracted[1].filename))?;

    let classifier = FixedClassifier::new("cat", 0.5);
    let stage = EnrichmentStage::new(
        |crop: &Path| classifier.classify(crop),
        catalog.clone(),
        &crop_dir,
    );
    let result = stage.enrich(&extracted).await;

    assert!(matches!(result, Err(CatalogError::Classifier(_))));
    // The first object was classified before the failure and stays that way
    assert_eq!(classifier.calls.get(), 1);
    let first = catalog.get(&extracted[0].id).await?.expect("row should exist");
    assert_eq!(first.category.as_deref(), Some("cat"));

    Ok(())
}
