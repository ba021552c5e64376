// ============================================================================
// SELECTION: rectangular region with a raster mask for the edge overlay
// ============================================================================

use image::{GrayImage, Luma};

use crate::canvas::{Offset, Point, Rect};

/// Transparent border kept around the opaque interior of the mask so the
/// edge-detection pass always has an alpha transition to find.
pub const SELECTION_INSET: u32 = 1;

/// Largest interior side of a selection mask, in pixels.  Matches the
/// default `max_texture_dimension_2d` of a wgpu device.
pub const MAX_SELECTION_SIDE: u32 = 8192;

/// The current rectangular selection.
///
/// Always replaced wholesale; the mask dimensions therefore always match the
/// logical rectangle.  A 0×0 mask is the "no selection" state.
#[derive(Clone, Debug)]
pub struct Selection {
    offset: Offset,
    mask: GrayImage,
    /// Bumped on every replacement so the compositor knows to re-upload.
    generation: u64,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            offset: Offset::new(SELECTION_INSET as i32, SELECTION_INSET as i32),
            mask: GrayImage::new(0, 0),
            generation: 0,
        }
    }
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the selection spanned by two drag corners.  Drag direction does
    /// not matter: the corners are normalised before the mask is built.
    pub fn from_corners(a: Point, b: Point) -> Self {
        let mut selection = Self::default();
        selection.set_from_corners(a, b);
        selection
    }

    pub fn offset(&self) -> Offset {
        self.offset
    }

    pub fn mask(&self) -> &GrayImage {
        &self.mask
    }

    pub fn size(&self) -> (u32, u32) {
        self.mask.dimensions()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_empty(&self) -> bool {
        let (w, h) = self.size();
        w == 0 || h == 0
    }

    /// Full mask rectangle in document space (inset border included).
    pub fn rect(&self) -> Rect {
        Rect::from_offset_size(self.offset, self.size())
    }

    /// Mask coverage (0..=255) at a document-space pixel.
    pub fn coverage(&self, x: i32, y: i32) -> u8 {
        let lx = x as i64 - self.offset.x as i64;
        let ly = y as i64 - self.offset.y as i64;
        let (w, h) = self.size();
        if lx < 0 || ly < 0 || lx >= w as i64 || ly >= h as i64 {
            return 0;
        }
        self.mask.get_pixel(lx as u32, ly as u32)[0]
    }

    /// Replace the selection with the rectangle spanned by `a` and `b`.
    pub fn set_from_corners(&mut self, a: Point, b: Point) {
        let (ax, ay) = a.pixel();
        let (bx, by) = b.pixel();
        let x1 = ax.min(bx);
        let x2 = ax.max(bx);
        let y1 = ay.min(by);
        let y2 = ay.max(by);

        let inset = SELECTION_INSET;
        let side = |lo: i32, hi: i32| (hi as i64 - lo as i64).min(MAX_SELECTION_SIDE as i64) as u32;
        let width = side(x1, x2) + inset * 2;
        let height = side(y1, y2) + inset * 2;

        let mut mask = GrayImage::new(width, height);
        for y in inset..height - inset {
            for x in inset..width - inset {
                mask.put_pixel(x, y, Luma([255]));
            }
        }

        let offset = Offset::new(x1.saturating_sub(inset as i32), y1.saturating_sub(inset as i32));
        self.replace(offset, mask);
    }

    /// Replace offset and mask in one step.
    pub fn replace(&mut self, offset: Offset, mask: GrayImage) {
        self.offset = offset;
        self.mask = mask;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Back to the 0×0 "no selection" state.
    pub fn clear(&mut self) {
        let offset = Offset::new(SELECTION_INSET as i32, SELECTION_INSET as i32);
        self.replace(offset, GrayImage::new(0, 0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_selection_is_empty() {
        let sel = Selection::new();
        assert!(sel.is_empty());
        assert_eq!(sel.size(), (0, 0));
    }

    #[test]
    fn drag_is_normalised_with_inset() {
        let sel = Selection::from_corners(Point::new(300.0, 300.0), Point::new(100.0, 100.0));
        assert_eq!(sel.offset(), Offset::new(99, 99));
        assert_eq!(sel.size(), (202, 202));
    }

    #[test]
    fn drag_direction_does_not_matter() {
        let a = Point::new(12.0, 80.0);
        let b = Point::new(40.0, 5.0);
        let ab = Selection::from_corners(a, b);
        let ba = Selection::from_corners(b, a);
        assert_eq!(ab.rect(), ba.rect());
        assert_eq!(ab.mask().as_raw(), ba.mask().as_raw());
        let mixed = Selection::from_corners(Point::new(12.0, 5.0), Point::new(40.0, 80.0));
        assert_eq!(ab.rect(), mixed.rect());
    }

    #[test]
    fn mask_border_is_transparent_and_interior_opaque() {
        let sel = Selection::from_corners(Point::new(10.0, 10.0), Point::new(14.0, 13.0));
        // border pixels
        assert_eq!(sel.coverage(9, 9), 0);
        assert_eq!(sel.coverage(14, 12), 0);
        assert_eq!(sel.coverage(12, 13), 0);
        // interior spans exactly [10, 14) × [10, 13)
        assert_eq!(sel.coverage(10, 10), 255);
        assert_eq!(sel.coverage(13, 12), 255);
        // outside the mask entirely
        assert_eq!(sel.coverage(100, 100), 0);
    }

    #[test]
    fn zero_area_drag_keeps_only_border() {
        let p = Point::new(5.0, 5.0);
        let sel = Selection::from_corners(p, p);
        assert_eq!(sel.size(), (2, 2));
        assert!(sel.mask().pixels().all(|px| px[0] == 0));
    }

    #[test]
    fn huge_drags_are_clamped() {
        let sel = Selection::from_corners(Point::new(-2e9, 0.0), Point::new(2e9, 1.0));
        assert_eq!(sel.offset(), Offset::new(-2_000_000_001, -1));
        assert_eq!(sel.size(), (MAX_SELECTION_SIDE + 2, 3));

        let edge = Selection::from_corners(Point::new(f32::MIN, f32::MIN), Point::new(f32::MAX, f32::MAX));
        assert_eq!(edge.offset(), Offset::new(i32::MIN, i32::MIN));
        assert_eq!(edge.size(), (MAX_SELECTION_SIDE + 2, MAX_SELECTION_SIDE + 2));
    }

    #[test]
    fn replacement_bumps_generation() {
        let mut sel = Selection::new();
        let g = sel.generation();
        sel.set_from_corners(Point::new(0.0, 0.0), Point::new(3.0, 3.0));
        assert_ne!(sel.generation(), g);
        sel.clear();
        assert!(sel.is_empty());
    }
}
