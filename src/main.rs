use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use objcat::detection::preprocessing::{image_paths, load_source_image};
use objcat::detection::visualize::{Visualizer, save_visualization};
use objcat::{
    CatalogConfig, ExtractionPipeline, MaskDirSegmenter, ObjectCatalog, ObjectQuery,
    ObjectRepository, SegmentationStage, generate_descriptions,
};

#[derive(Parser)]
#[command(name = "objcat")]
#[command(about = "Catalog objects segmented out of images")]
struct Cli {
    /// JSON config file; flags below override its values
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// SQLite catalog file
    #[arg(long, value_name = "FILE", global = true)]
    db: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the objects table if it does not exist
    Init,

    /// Drop and recreate the objects table, deleting every row
    Reset,

    /// Extract objects from an image using one mask image per object
    Extract {
        /// Source image
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Directory of grayscale masks aligned to the image
        #[arg(long, value_name = "DIR")]
        masks: PathBuf,

        /// Directory receiving the crops
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,

        /// Also write a mask overlay preview here
        #[arg(long, value_name = "FILE")]
        preview: Option<PathBuf>,
    },

    /// Print catalog rows
    Query {
        #[arg(long)]
        id: Option<String>,

        #[arg(long)]
        master: Option<String>,
    },

    /// Write object descriptions grouped by source image
    Describe {
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// List the image files of a directory
    Images {
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("objcat={}", default_level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = match &args.config {
        Some(path) => CatalogConfig::load(path)?,
        None => CatalogConfig::default(),
    };
    if let Some(db) = args.db {
        config.db_path = db;
    }
    let catalog = ObjectCatalog::new(&config.db_path);

    match args.command {
        Command::Init => {
            catalog.init_schema().await?;
            println!("Catalog ready at {:?}", catalog.path());
        }
        Command::Reset => {
            catalog.reset_schema().await?;
            println!("Catalog at {:?} reset", catalog.path());
        }
        Command::Extract {
            image,
            masks,
            out,
            preview,
        } => {
            if let Some(out) = out {
                config.output_dir = out;
            }
            let source = load_source_image(&image, config.max_image_size)?;
            let segmented = SegmentationStage::new(MaskDirSegmenter::new(&masks))
                .with_score_threshold(config.score_threshold)
                .segment(&source)?;

            let pipeline = ExtractionPipeline::new(catalog, &config.output_dir);
            let extracted = pipeline.extract(&segmented, &source).await?;

            println!("\n=== Extraction Results ===");
            println!("Total objects extracted: {}", extracted.len());
            if let Some(first) = extracted.first() {
                println!("Master id: {}", first.master_id);
            }
            for object in &extracted {
                println!("  {} bbox={}", object.filename, object.bbox.to_json());
            }

            if let Some(preview_path) = preview {
                let rendered = Visualizer::new(config.overlay_alpha)
                    .with_outline_boxes(config.outline_boxes)
                    .render(&source, &segmented);
                save_visualization(&rendered, &preview_path)?;
                println!("Preview saved to {:?}", preview_path);
            }
        }
        Command::Query { id, master } => {
            let rows = catalog
                .query(&ObjectQuery {
                    id,
                    master_id: master,
                })
                .await?;
            for row in &rows {
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    row.id,
                    row.master_id,
                    row.filename,
                    row.bbox.to_json(),
                    row.category.as_deref().unwrap_or("-"),
                    row.confidence.map(|c| format!("{:.2}", c)).unwrap_or_else(|| "-".to_string())
                );
            }
            println!("{} rows", rows.len());
        }
        Command::Describe { output } => {
            let output = output.unwrap_or(config.descriptions_file);
            let descriptions = generate_descriptions(&catalog, &output).await?;
            println!(
                "Described {} images, written to {:?}",
                descriptions.len(),
                output
            );
        }
        Command::Images { dir } => {
            for path in image_paths(&dir)? {
                println!("{}", path.display());
            }
        }
    }

    Ok(())
}
