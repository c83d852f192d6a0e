use std::path::Path;

use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use rand::Rng;

use crate::detection::geometry::{compute_bbox, overlay_color};
use crate::error::{CatalogError, Result};
use crate::models::SegmentedObject;

pub const PALETTE_SIZE: usize = 256;

/// Fresh random colors; a new palette is drawn for every preview.
pub fn random_palette() -> Vec<Rgb<u8>> {
    let mut rng = rand::thread_rng();
    (0..PALETTE_SIZE)
        .map(|_| Rgb([rng.gen_range(0..255), rng.gen_range(0..255), rng.gen_range(0..255)]))
        .collect()
}

/// Builds the diagnostic preview: colored masks blended over the source.
///
/// The output is for inspection only and never feeds back into the catalog.
#[derive(Debug, Clone)]
pub struct Visualizer {
    pub alpha: f32,
    pub outline_boxes: bool,
}

impl Default for Visualizer {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            outline_boxes: false,
        }
    }
}

impl Visualizer {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha,
            ..Default::default()
        }
    }

    pub fn with_outline_boxes(mut self, outline: bool) -> Self {
        self.outline_boxes = outline;
        self
    }

    pub fn render(&self, image: &DynamicImage, objects: &[SegmentedObject]) -> RgbImage {
        self.render_with_palette(image, objects, &random_palette())
    }

    /// Same as [`Visualizer::render`] with a caller-chosen palette; object `i`
    /// takes color `i % palette.len()`.
    pub fn render_with_palette(
        &self,
        image: &DynamicImage,
        objects: &[SegmentedObject],
        palette: &[Rgb<u8>],
    ) -> RgbImage {
        let base = image.to_rgb8();
        let (width, height) = base.dimensions();
        let mut overlay = RgbImage::new(width, height);

        if !palette.is_empty() {
            for (i, object) in objects.iter().enumerate() {
                overlay_color(&object.mask, palette[i % palette.len()], &mut overlay);
            }
        }

        let alpha = self.alpha.clamp(0.0, 1.0);
        let mut blended = RgbImage::from_fn(width, height, |x, y| {
            let src = base.get_pixel(x, y);
            let over = overlay.get_pixel(x, y);
            let mix = |a: u8, b: u8| (a as f32 * (1.0 - alpha) + b as f32 * alpha) as u8;
            Rgb([mix(src[0], over[0]), mix(src[1], over[1]), mix(src[2], over[2])])
        });

        if self.outline_boxes && !palette.is_empty() {
            for (i, object) in objects.iter().enumerate() {
                let bbox = compute_bbox(&object.mask).resolve(width, height);
                let rect = Rect::at(bbox.min_x as i32, bbox.min_y as i32)
                    .of_size(bbox.width(), bbox.height());
                draw_hollow_rect_mut(&mut blended, rect, palette[i % palette.len()]);
            }
        }

        blended
    }
}

pub fn save_visualization<P: AsRef<Path>>(image: &RgbImage, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| CatalogError::OutputIo {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    image.save(path).map_err(|source| CatalogError::Encoding {
        path: path.to_path_buf(),
        source,
    })
}
