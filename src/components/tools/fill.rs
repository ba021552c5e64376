use image::{Rgba, RgbaImage};

use super::{ToolContext, ToolOption, ToolResponse, ToolSettings};
use crate::components::pointer::PointerEvent;

pub const TOLERANCE: ToolOption = ToolOption {
    id: "tolerance",
    name: "Tolerance",
    min: 0.0,
    max: 255.0,
    step: 1.0,
    default: 40.0,
};

pub static FILL_OPTIONS: [ToolOption; 1] = [TOLERANCE];

/// Pixels with alpha below this all count as "transparent" for matching.
const TRANSPARENT_ALPHA: u8 = 2;

/// Bucket fill of the current layer with the foreground colour.
#[derive(Debug)]
pub struct FillTool {
    pub settings: ToolSettings,
}

impl Default for FillTool {
    fn default() -> Self {
        Self {
            settings: ToolSettings::from_options(&FILL_OPTIONS),
        }
    }
}

impl FillTool {
    pub fn up(&mut self, ctx: &mut ToolContext<'_>, ev: &PointerEvent) -> ToolResponse {
        if ev.action.is_none() {
            return ToolResponse::Idle;
        }
        let Some(layer) = ctx.layers.current() else {
            return ToolResponse::Idle;
        };
        let (x, y) = ev.point.relative_to(layer.offset).pixel();
        let texture = layer.texture();
        let tolerance = self.settings.value(&TOLERANCE).round() as u8;
        let fill = ctx.foreground.opaque().to_pixel();

        let Some(pixels) = ctx.compositor.pixels(texture) else {
            return ToolResponse::Idle;
        };
        let Some(mask) = flood_mask(pixels, x, y, fill, tolerance) else {
            return ToolResponse::Idle;
        };
        if let Some(pixels) = ctx.compositor.pixels_mut(texture) {
            for (px, &hit) in pixels.pixels_mut().zip(&mask) {
                if hit {
                    *px = fill;
                }
            }
        }
        ToolResponse::Changed
    }
}

fn matches(p: Rgba<u8>, seed: Rgba<u8>, tolerance: u8) -> bool {
    if p[3] < TRANSPARENT_ALPHA && seed[3] < TRANSPARENT_ALPHA {
        return true;
    }
    p.0.iter()
        .zip(seed.0.iter())
        .all(|(&a, &b)| a.abs_diff(b) <= tolerance)
}

/// 4-connected region around `(x, y)` matching the seed colour.  `None` when
/// the seed is outside the buffer or already has the fill colour.
pub fn flood_mask(pixels: &RgbaImage, x: i32, y: i32, fill: Rgba<u8>, tolerance: u8) -> Option<Vec<bool>> {
    let (w, h) = pixels.dimensions();
    if x < 0 || y < 0 || x as u32 >= w || y as u32 >= h {
        return None;
    }
    let (x, y) = (x as u32, y as u32);
    let seed = *pixels.get_pixel(x, y);
    if seed == fill {
        return None;
    }

    let wu = w as usize;
    // mask doubles as the visited set
    let mut mask = vec![false; wu * h as usize];
    let mut stack: Vec<(u32, u32)> = Vec::with_capacity(1024);
    mask[y as usize * wu + x as usize] = true;
    stack.push((x, y));

    while let Some((cx, cy)) = stack.pop() {
        let neighbours = [
            (cx.wrapping_sub(1), cy),
            (cx + 1, cy),
            (cx, cy.wrapping_sub(1)),
            (cx, cy + 1),
        ];
        for (nx, ny) in neighbours {
            if nx >= w || ny >= h {
                continue;
            }
            let idx = ny as usize * wu + nx as usize;
            if !mask[idx] && matches(*pixels.get_pixel(nx, ny), seed, tolerance) {
                mask[idx] = true;
                stack.push((nx, ny));
            }
        }
    }
    Some(mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{Color, Point};
    use crate::components::layers::LayerStack;
    use crate::components::pointer::PointerAction;
    use crate::compositor::Compositor;
    use crate::selection::Selection;

    #[test]
    fn fill_stops_at_walls() {
        // 5x5 transparent with a vertical wall at x = 2
        let mut img = RgbaImage::new(5, 5);
        for y in 0..5 {
            img.put_pixel(2, y, Rgba([0, 0, 0, 255]));
        }
        let mask = flood_mask(&img, 0, 0, Rgba([255, 0, 0, 255]), 40).unwrap();
        let filled: usize = mask.iter().filter(|&&m| m).count();
        assert_eq!(filled, 10);
        assert!(!mask[2]);
        assert!(!mask[3]);
    }

    #[test]
    fn tolerance_widens_the_match() {
        let mut img = RgbaImage::from_pixel(3, 1, Rgba([100, 100, 100, 255]));
        img.put_pixel(1, 0, Rgba([130, 100, 100, 255]));
        let strict = flood_mask(&img, 0, 0, Rgba([0, 0, 0, 255]), 10).unwrap();
        assert_eq!(strict, vec![true, false, false]);
        let loose = flood_mask(&img, 0, 0, Rgba([0, 0, 0, 255]), 40).unwrap();
        assert_eq!(loose, vec![true, true, true]);
    }

    #[test]
    fn seed_outside_or_same_colour_is_no_op() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255]));
        assert!(flood_mask(&img, -1, 0, Rgba([0, 0, 0, 255]), 0).is_none());
        assert!(flood_mask(&img, 0, 2, Rgba([0, 0, 0, 255]), 0).is_none());
        assert!(flood_mask(&img, 0, 0, Rgba([1, 2, 3, 255]), 0).is_none());
    }

    #[test]
    fn fill_tool_paints_current_layer_on_release() {
        let mut comp = Compositor::cpu();
        let mut layers = LayerStack::new();
        let mut selection = Selection::new();
        layers.create_empty(&mut comp, 4, 4);
        let texture = layers.current().unwrap().texture();

        let mut tool = FillTool::default();
        let mut ctx = ToolContext {
            layers: &mut layers,
            compositor: &mut comp,
            selection: &mut selection,
            foreground: Color::rgb(0, 128, 0),
        };
        let p = Point::new(1.5, 2.5);
        let hover = PointerEvent {
            point: p,
            start: p,
            last: p,
            action: None,
        };
        assert_eq!(tool.up(&mut ctx, &hover), ToolResponse::Idle);
        let click = PointerEvent {
            action: Some(PointerAction::Primary),
            ..hover
        };
        assert_eq!(tool.up(&mut ctx, &click), ToolResponse::Changed);

        let pixels = comp.pixels(texture).unwrap();
        assert!(pixels.pixels().all(|px| *px == Rgba([0, 128, 0, 255])));
        assert!(comp.is_dirty(texture));
    }
}
