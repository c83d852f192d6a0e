use image::{Rgb, RgbImage, imageops};

use crate::models::{BoundingBox, Mask};

/// Mask value above which a pixel is painted by [`overlay_color`].
pub const OVERLAY_THRESHOLD: f32 = 0.5;

/// Outcome of measuring a mask.
///
/// A mask without any set pixel is a degenerate but recoverable input: it
/// resolves to the whole canvas instead of dropping the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskExtent {
    Tight(BoundingBox),
    FullCanvas,
}

impl MaskExtent {
    /// Concrete box for a `width` x `height` source.
    pub fn resolve(self, width: u32, height: u32) -> BoundingBox {
        match self {
            MaskExtent::Tight(bbox) => bbox,
            MaskExtent::FullCanvas => BoundingBox::full_canvas(width, height),
        }
    }

    pub fn is_full_canvas(&self) -> bool {
        matches!(self, MaskExtent::FullCanvas)
    }
}

/// Tight box over every mask cell with a value above zero.
pub fn compute_bbox(mask: &Mask) -> MaskExtent {
    let mut extent: Option<BoundingBox> = None;

    for (x, y, pixel) in mask.enumerate_pixels() {
        // NaN falls through as "not set"
        if !(pixel[0] > 0.0) {
            continue;
        }
        extent = Some(match extent {
            None => BoundingBox::new(x, y, x, y),
            Some(b) => BoundingBox::new(b.min_x.min(x), b.min_y.min(y), b.max_x.max(x), b.max_y.max(y)),
        });
    }

    extent.map_or(MaskExtent::FullCanvas, MaskExtent::Tight)
}

/// Crop `image` to `bbox`, max corner inclusive.
///
/// Boxes reaching past the canvas are clamped, so the full-canvas box
/// `(0, 0, width, height)` yields the whole image.
pub fn crop(image: &RgbImage, bbox: BoundingBox) -> RgbImage {
    imageops::crop_imm(image, bbox.min_x, bbox.min_y, bbox.width(), bbox.height()).to_image()
}

/// Crop `image` to `bbox` with the mask multiplied into every channel.
///
/// Pixels outside the mask become black; fractional mask values scale the
/// pixel. Mask cells outside the mask's own extent count as zero.
pub fn apply_mask(image: &RgbImage, mask: &Mask, bbox: BoundingBox) -> RgbImage {
    let mut cropped = crop(image, bbox);

    for (x, y, pixel) in cropped.enumerate_pixels_mut() {
        let weight = mask
            .get_pixel_checked(bbox.min_x + x, bbox.min_y + y)
            .map_or(0.0, |m| m[0].clamp(0.0, 1.0));
        for channel in pixel.0.iter_mut() {
            *channel = (*channel as f32 * weight) as u8;
        }
    }

    cropped
}

/// Paint `color` into `canvas` wherever the mask exceeds [`OVERLAY_THRESHOLD`].
pub fn overlay_color(mask: &Mask, color: Rgb<u8>, canvas: &mut RgbImage) {
    for (x, y, pixel) in mask.enumerate_pixels() {
        if pixel[0] > OVERLAY_THRESHOLD && x < canvas.width() && y < canvas.height() {
            canvas.put_pixel(x, y, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn mask_with(width: u32, height: u32, cells: &[(u32, u32)]) -> Mask {
        let mut mask = Mask::new(width, height);
        for &(x, y) in cells {
            mask.put_pixel(x, y, Luma([1.0]));
        }
        mask
    }

    #[test]
    fn tight_box_covers_set_cells() {
        let mask = mask_with(10, 8, &[(2, 3), (6, 1), (4, 7)]);
        assert_eq!(compute_bbox(&mask), MaskExtent::Tight(BoundingBox::new(2, 1, 6, 7)));
    }

    #[test]
    fn single_cell_gives_unit_box() {
        let mask = mask_with(5, 5, &[(4, 4)]);
        let bbox = compute_bbox(&mask).resolve(5, 5);
        assert_eq!(bbox, BoundingBox::new(4, 4, 4, 4));
        assert!(bbox.fits_within(5, 5));
    }

    #[test]
    fn empty_mask_resolves_to_full_canvas() {
        let mask = Mask::new(12, 7);
        let extent = compute_bbox(&mask);
        assert!(extent.is_full_canvas());
        assert_eq!(extent.resolve(12, 7), BoundingBox::new(0, 0, 12, 7));
    }

    #[test]
    fn negative_and_nan_cells_are_not_set() {
        let mut mask = Mask::new(4, 4);
        mask.put_pixel(1, 1, Luma([-0.3]));
        mask.put_pixel(2, 2, Luma([f32::NAN]));
        assert!(compute_bbox(&mask).is_full_canvas());
    }

    #[test]
    fn crop_at_canvas_edge_is_clamped() {
        let image = RgbImage::from_pixel(6, 4, Rgb([10, 20, 30]));
        let edge = crop(&image, BoundingBox::new(3, 2, 5, 3));
        assert_eq!(edge.dimensions(), (3, 2));

        let full = crop(&image, BoundingBox::full_canvas(6, 4));
        assert_eq!(full.dimensions(), (6, 4));
    }

    #[test]
    fn apply_mask_zeroes_pixels_outside_mask() {
        let image = RgbImage::from_pixel(4, 4, Rgb([200, 100, 50]));
        let mut mask = mask_with(4, 4, &[(1, 1), (2, 2)]);
        mask.put_pixel(2, 1, Luma([0.5]));
        let bbox = compute_bbox(&mask).resolve(4, 4);

        let out = apply_mask(&image, &mask, bbox);
        assert_eq!(out.dimensions(), (2, 2));
        assert_eq!(out.get_pixel(0, 0), &Rgb([200, 100, 50]));
        assert_eq!(out.get_pixel(1, 0), &Rgb([100, 50, 25]));
        assert_eq!(out.get_pixel(0, 1), &Rgb([0, 0, 0]));
        assert_eq!(out.get_pixel(1, 1), &Rgb([200, 100, 50]));
    }

    #[test]
    fn overlay_paints_only_above_threshold() {
        let mut mask = Mask::new(3, 1);
        mask.put_pixel(0, 0, Luma([0.9]));
        mask.put_pixel(1, 0, Luma([0.5]));
        let mut canvas = RgbImage::new(3, 1);

        overlay_color(&mask, Rgb([1, 2, 3]), &mut canvas);
        assert_eq!(canvas.get_pixel(0, 0), &Rgb([1, 2, 3]));
        assert_eq!(canvas.get_pixel(1, 0), &Rgb([0, 0, 0]));
        assert_eq!(canvas.get_pixel(2, 0), &Rgb([0, 0, 0]));
    }
}
