// ============================================================================
// BRUSH / ERASER: radial stamp, gap-filled strokes
// ============================================================================

use std::f32::consts::SQRT_2;

use image::{Rgba, RgbaImage};

use super::{ToolContext, ToolOption, ToolResponse, ToolSettings};
use crate::canvas::{blend_normal, erase_pixel, Color, Point};
use crate::components::pointer::{PointerAction, PointerEvent};

/// Moves longer than this would skip pixels at 1:1 and get interpolated.
pub const GAP_FILL_DISTANCE: f32 = SQRT_2;

pub const HARDNESS: ToolOption = ToolOption {
    id: "hardness",
    name: "Hardness",
    min: 0.0,
    max: 1.0,
    step: 0.01,
    default: 1.0,
};

pub const SIZE: ToolOption = ToolOption {
    id: "size",
    name: "Size",
    min: 0.0,
    max: 1000.0,
    step: 1.0,
    default: 50.0,
};

pub static BRUSH_OPTIONS: [ToolOption; 2] = [HARDNESS, SIZE];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrushMode {
    /// Source-over with the foreground colour.
    Paint,
    /// Destination-out: the stamp's alpha removes coverage.
    Erase,
}

#[derive(Debug)]
pub struct BrushTool {
    mode: BrushMode,
    pub settings: ToolSettings,
    /// Stamp of the gesture in progress.
    stamp: Option<RgbaImage>,
}

impl BrushTool {
    pub fn new(mode: BrushMode) -> Self {
        Self {
            mode,
            settings: ToolSettings::from_options(&BRUSH_OPTIONS),
            stamp: None,
        }
    }

    pub fn mode(&self) -> BrushMode {
        self.mode
    }

    pub fn down(&mut self, ctx: &mut ToolContext<'_>, ev: &PointerEvent) -> ToolResponse {
        if ev.action != Some(PointerAction::Primary) {
            return ToolResponse::Idle;
        }
        self.stamp = Some(self.build_stamp(ctx.foreground));
        self.draw(ctx, ev.point, None)
    }

    pub fn moved(&mut self, ctx: &mut ToolContext<'_>, ev: &PointerEvent) -> ToolResponse {
        if ev.action != Some(PointerAction::Primary) {
            return ToolResponse::Idle;
        }
        if self.stamp.is_none() {
            self.stamp = Some(self.build_stamp(ctx.foreground));
        }
        self.draw(ctx, ev.point, Some(ev.last))
    }

    pub fn up(&mut self) -> ToolResponse {
        self.stamp = None;
        ToolResponse::Idle
    }

    pub fn reset(&mut self) {
        self.stamp = None;
    }

    fn build_stamp(&self, color: Color) -> RgbaImage {
        let size = self.settings.value(&SIZE).round() as u32;
        let hardness = self.settings.value(&HARDNESS);
        let color = match self.mode {
            BrushMode::Paint => color,
            // Only the alpha matters when erasing.
            BrushMode::Erase => Color::BLACK,
        };
        build_stamp(size, hardness, color)
    }

    /// Stamp at `point`, or along the line from `last` when the move is long
    /// enough to leave gaps.
    fn draw(&self, ctx: &mut ToolContext<'_>, point: Point, last: Option<Point>) -> ToolResponse {
        let Some(stamp) = self.stamp.as_ref().filter(|s| s.width() > 0) else {
            return ToolResponse::Idle;
        };
        let Some(layer) = ctx.layers.current() else {
            return ToolResponse::Idle;
        };
        let offset = layer.offset;
        let texture = layer.texture();

        let point = point.relative_to(offset);
        let points = match last.map(|l| l.relative_to(offset)) {
            Some(last) if point.distance_to(last) > GAP_FILL_DISTANCE => line_points(last, point),
            _ => vec![point.pixel()],
        };

        let Some(pixels) = ctx.compositor.pixels_mut(texture) else {
            return ToolResponse::Idle;
        };
        for (x, y) in points {
            apply_stamp(pixels, stamp, x, y, self.mode);
        }
        ToolResponse::Changed
    }
}

/// Radial alpha gradient: opaque up to `hardness × radius`, falling linearly
/// to transparent at the radius.
pub fn build_stamp(size: u32, hardness: f32, color: Color) -> RgbaImage {
    let radius = size as f32 / 2.0;
    RgbaImage::from_fn(size, size, |x, y| {
        let dx = x as f32 + 0.5 - radius;
        let dy = y as f32 + 0.5 - radius;
        let t = (dx * dx + dy * dy).sqrt() / radius;
        let falloff = if t <= hardness {
            1.0
        } else if t >= 1.0 {
            0.0
        } else {
            1.0 - (t - hardness) / (1.0 - hardness)
        };
        let a = (color.a as f32 * falloff).round() as u8;
        Rgba([color.r, color.g, color.b, a])
    })
}

/// Composite `stamp` centred on pixel `(cx, cy)`, clipped to `target`.
fn apply_stamp(target: &mut RgbaImage, stamp: &RgbaImage, cx: i32, cy: i32, mode: BrushMode) {
    let half = (stamp.width() / 2) as i64;
    let left = cx as i64 - half;
    let top = cy as i64 - half;
    let (tw, th) = (target.width() as i64, target.height() as i64);

    for (sx, sy, src) in stamp.enumerate_pixels() {
        if src[3] == 0 {
            continue;
        }
        let x = left + sx as i64;
        let y = top + sy as i64;
        if x < 0 || y < 0 || x >= tw || y >= th {
            continue;
        }
        let dst = target.get_pixel_mut(x as u32, y as u32);
        *dst = match mode {
            BrushMode::Paint => blend_normal(*dst, *src),
            BrushMode::Erase => erase_pixel(*dst, src[3]),
        };
    }
}

/// Integer points from `a` to `b` (both floored), inclusive, by the
/// error-accumulating line stepper.  Consecutive points are 8-connected.
pub fn line_points(a: Point, b: Point) -> Vec<(i32, i32)> {
    let (mut x, mut y) = a.pixel();
    let (xx, yy) = b.pixel();
    let dx = (xx - x).abs();
    let sx = if x < xx { 1 } else { -1 };
    let dy = -(yy - y).abs();
    let sy = if y < yy { 1 } else { -1 };
    let mut err = dx + dy;

    let mut points = Vec::with_capacity((dx - dy + 1) as usize);
    loop {
        points.push((x, y));
        if x == xx && y == yy {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
    points
}
