use std::fmt;
use std::str::FromStr;

use image::Rgba;
use serde::{Deserialize, Serialize};

use crate::error::EditorError;

/// Default edge length of an empty layer.
pub const DEFAULT_LAYER_SIZE: u32 = 512;

/// Zoom limits shared by every viewport operation.
pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 100.0;

// ============================================================================
// GEOMETRY
// ============================================================================

/// A sub-pixel position (pointer input, brush stamps).
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Translate into the space whose origin sits at `origin`.
    pub fn relative_to(self, origin: Offset) -> Point {
        Point::new(self.x - origin.x as f32, self.y - origin.y as f32)
    }

    /// The integer pixel containing this point.
    pub fn pixel(self) -> (i32, i32) {
        (self.x.floor() as i32, self.y.floor() as i32)
    }
}

/// Integer document-space position of a raster buffer's top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct Offset {
    pub x: i32,
    pub y: i32,
}

impl Offset {
    pub const ZERO: Offset = Offset { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned pixel rectangle in document space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn from_offset_size(offset: Offset, (width, height): (u32, u32)) -> Self {
        Self::new(offset.x, offset.y, width, height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn offset(&self) -> Offset {
        Offset::new(self.x, self.y)
    }

    pub fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    /// Smallest rectangle containing both.  Empty rectangles are ignored.
    pub fn union(self, other: Rect) -> Rect {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        let span = |len: i64| len.min(u32::MAX as i64) as u32;
        Rect::new(x, y, span(right - x as i64), span(bottom - y as i64))
    }
}

// ============================================================================
// COLOR
// ============================================================================

/// Straight-alpha RGBA color, exchanged with the host as `#rrggbb` strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_pixel(p: Rgba<u8>) -> Self {
        Self::rgba(p[0], p[1], p[2], p[3])
    }

    pub fn to_pixel(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, self.a])
    }

    /// `#rrggbb`, alpha dropped.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// The same color at full opacity.
    pub fn opaque(self) -> Self {
        Self { a: 255, ..self }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            f.write_str(&self.to_hex())
        } else {
            write!(f, "{}{:02x}", self.to_hex(), self.a)
        }
    }
}

impl FromStr for Color {
    type Err = EditorError;

    /// Accepts `#rgb`, `#rrggbb` and `#rrggbbaa` (the leading `#` is optional).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        let bad = || EditorError::InvalidColor(s.to_string());
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(bad());
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| bad());
        match hex.len() {
            3 => {
                let nib = |i: usize| {
                    u8::from_str_radix(&hex[i..i + 1], 16)
                        .map(|v| v * 17)
                        .map_err(|_| bad())
                };
                Ok(Color::rgb(nib(0)?, nib(1)?, nib(2)?))
            }
            6 => Ok(Color::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Ok(Color::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => Err(bad()),
        }
    }
}

// ============================================================================
// VIEWPORT: document-level pan/zoom read by the compositor
// ============================================================================

/// Maps document space to surface space: `screen = (doc + pan) * zoom`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub pan: Point,
    pub zoom: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            pan: Point::ZERO,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    /// 1:1 view that places document `(x, y)` at surface `(0, 0)`.
    pub fn region(x: i32, y: i32) -> Self {
        Self {
            pan: Point::new(-(x as f32), -(y as f32)),
            zoom: 1.0,
        }
    }

    pub fn to_document(&self, screen: Point) -> Point {
        Point::new(screen.x / self.zoom - self.pan.x, screen.y / self.zoom - self.pan.y)
    }

    pub fn to_screen(&self, doc: Point) -> Point {
        Point::new((doc.x + self.pan.x) * self.zoom, (doc.y + self.pan.y) * self.zoom)
    }

    /// Pan by a surface-space delta.
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.pan.x += dx / self.zoom;
        self.pan.y += dy / self.zoom;
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Zoom while keeping a surface-space point fixed (e.g. under the cursor).
    pub fn zoom_around(&mut self, factor: f32, anchor: Point) {
        let fixed = self.to_document(anchor);
        self.set_zoom(self.zoom * factor);
        // anchor = (fixed + pan) * zoom  =>  pan = anchor / zoom - fixed
        self.pan = Point::new(anchor.x / self.zoom - fixed.x, anchor.y / self.zoom - fixed.y);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// ============================================================================
// PIXEL MATH
// ============================================================================

/// Straight-alpha source-over.  The only blend mode layers composite with.
pub fn blend_normal(base: Rgba<u8>, top: Rgba<u8>) -> Rgba<u8> {
    // Fast path: fully transparent top pixel, nothing to blend
    if top[3] == 0 {
        return base;
    }
    // Fast path: fully opaque top pixel, just overwrite
    if top[3] == 255 {
        return top;
    }

    let base_a = base[3] as f32 / 255.0;
    let top_a = top[3] as f32 / 255.0;

    let out_a = top_a + base_a * (1.0 - top_a);
    if out_a == 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |i: usize| {
        let b = base[i] as f32 / 255.0;
        let t = top[i] as f32 / 255.0;
        let v = (t * top_a + b * base_a * (1.0 - top_a)) / out_a;
        (v * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        channel(0),
        channel(1),
        channel(2),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

/// Destination-out: reduce `base` alpha by `mask_alpha` (0..=255).
pub fn erase_pixel(base: Rgba<u8>, mask_alpha: u8) -> Rgba<u8> {
    if mask_alpha == 0 {
        return base;
    }
    let keep = 1.0 - mask_alpha as f32 / 255.0;
    let a = (base[3] as f32 * keep).round() as u8;
    if a == 0 {
        Rgba([0, 0, 0, 0])
    } else {
        Rgba([base[0], base[1], base[2], a])
    }
}
