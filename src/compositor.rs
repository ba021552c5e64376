// ============================================================================
// COMPOSITOR: texture registry, frame passes, offscreen region renders
// ============================================================================
//
// Every layer (and the selection mask) lives here as a CPU `RgbaImage`.  The
// compositor draws a frame in four passes:
//
//   1. transparency checkerboard (full surface)
//   2. layers, bottom of the stack first, straight-alpha source-over
//   3. selection edge ("marching ants", static dash)
//   4. current-layer bounds highlight
//
// With a GPU renderer the passes run as wgpu render pipelines over textures
// mirrored from the CPU buffers; without one they run here on the CPU, row
// parallel through rayon.  Both paths sample at pixel centres and share the
// overlay remap below, so their output matches.

use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::canvas::{blend_normal, Offset, Point, Rect, Viewport};
use crate::components::layers::Layer;
use crate::error::{EditorError, Result};
use crate::gpu::{GpuPass, GpuRenderer, LayerTexture, PassKind, PassUniforms};
use crate::selection::Selection;

/// Minimum bounds-highlight thickness, in layer-local units.
pub const LAYER_BOUNDS_BAND: f32 = 0.002;
/// Checkerboard tile edge in document pixels.
pub const CHECKER_TILE: f32 = 16.0;
/// Dash period of the selection edge, in surface pixels.
pub const SELECTION_DASH: f32 = 8.0;

const BOUNDS_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);

// ============================================================================
// TEXTURE ARENA
// ============================================================================

/// Generation-checked key for a registered texture.
///
/// Handles are only minted by [`Compositor::register`]; a handle whose slot
/// has been freed (or reused) no longer resolves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureHandle {
    index: u32,
    generation: u32,
}

/// A registered texture: the authoritative CPU buffer plus its GPU mirror.
pub struct TextureEntry {
    pub pixels: RgbaImage,
    /// CPU buffer changed since the last upload.
    dirty: bool,
    gpu: Option<LayerTexture>,
}

struct Slot {
    generation: u32,
    entry: Option<TextureEntry>,
}

#[derive(Default)]
pub struct TextureArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl TextureArena {
    pub fn insert(&mut self, pixels: RgbaImage) -> TextureHandle {
        let entry = TextureEntry {
            pixels,
            dirty: true,
            gpu: None,
        };
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.entry = Some(entry);
            return TextureHandle {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            entry: Some(entry),
        });
        TextureHandle {
            index,
            generation: 0,
        }
    }

    pub fn remove(&mut self, handle: TextureHandle) -> Option<TextureEntry> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let entry = slot.entry.take()?;
        self.free.push(handle.index);
        self.live -= 1;
        Some(entry)
    }

    pub fn get(&self, handle: TextureHandle) -> Option<&TextureEntry> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.entry.as_ref())
    }

    pub fn get_mut(&mut self, handle: TextureHandle) -> Option<&mut TextureEntry> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.entry.as_mut())
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}

// ============================================================================
// FRAME DESCRIPTION
// ============================================================================

/// Everything a frame needs from the editor state.
pub struct FrameScene<'a> {
    /// Layer stack, index 0 on top.
    pub layers: &'a [Layer],
    /// Layer whose bounds get highlighted.
    pub current: Option<&'a Layer>,
    pub selection: Option<&'a Selection>,
    pub viewport: Viewport,
}

/// Counters exposed for diagnostics and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompositorStats {
    pub frames: u64,
    pub region_renders: u64,
    pub uploads: u64,
}

// ============================================================================
// COMPOSITOR
// ============================================================================

pub struct Compositor {
    arena: TextureArena,
    /// Overlay texture mirroring the selection mask (alpha channel).
    selection_texture: TextureHandle,
    selection_generation: Option<u64>,
    /// Size the host reported for the display surface.
    surface_size: (u32, u32),
    /// CPU render target; also the readback buffer of the CPU path.
    surface: RgbaImage,
    last_frame_gpu: bool,
    checkerboard_brightness: f32,
    gpu: Option<GpuRenderer>,
    stats: CompositorStats,
}

impl Compositor {
    /// Create a compositor, trying the GPU first when `use_gpu` is set.
    pub fn new(use_gpu: bool, preferred_gpu: &str, checkerboard_brightness: f32) -> Self {
        let gpu = if use_gpu {
            GpuRenderer::try_new(preferred_gpu)
        } else {
            log_info!("GPU acceleration disabled; compositing on the CPU");
            None
        };
        Self::with_renderer(gpu, checkerboard_brightness)
    }

    /// CPU-only compositor.
    pub fn cpu() -> Self {
        Self::with_renderer(None, 1.0)
    }

    pub fn with_renderer(gpu: Option<GpuRenderer>, checkerboard_brightness: f32) -> Self {
        let mut arena = TextureArena::default();
        let selection_texture = arena.insert(RgbaImage::new(0, 0));
        Self {
            arena,
            selection_texture,
            selection_generation: None,
            surface_size: (0, 0),
            surface: RgbaImage::new(0, 0),
            last_frame_gpu: false,
            checkerboard_brightness,
            gpu,
            stats: CompositorStats::default(),
        }
    }

    pub fn is_gpu(&self) -> bool {
        self.gpu.is_some()
    }

    pub fn backend_name(&self) -> &str {
        self.gpu.as_ref().map_or("cpu", |g| g.adapter_name())
    }

    pub fn stats(&self) -> CompositorStats {
        self.stats
    }

    pub fn set_checkerboard_brightness(&mut self, brightness: f32) {
        self.checkerboard_brightness = brightness.max(0.0);
    }

    // ---- texture registry ----------------------------------------------

    /// Register a CPU buffer and get the handle that keys it.
    pub fn register(&mut self, pixels: RgbaImage) -> TextureHandle {
        self.arena.insert(pixels)
    }

    /// Drop a texture.  Unknown or already-freed handles are an error.
    pub fn deregister(&mut self, handle: TextureHandle) -> Result<RgbaImage> {
        if handle == self.selection_texture {
            log_err!("refusing to deregister the selection overlay texture");
            return Err(EditorError::StaleTexture(handle));
        }
        match self.arena.remove(handle) {
            Some(entry) => Ok(entry.pixels),
            None => {
                log_err!("deregister of unknown texture {:?}", handle);
                Err(EditorError::StaleTexture(handle))
            }
        }
    }

    pub fn is_registered(&self, handle: TextureHandle) -> bool {
        self.arena.get(handle).is_some()
    }

    /// Number of registered layer textures (the selection overlay excluded).
    pub fn texture_count(&self) -> usize {
        self.arena.len() - 1
    }

    pub fn pixels(&self, handle: TextureHandle) -> Option<&RgbaImage> {
        self.arena.get(handle).map(|e| &e.pixels)
    }

    /// Mutable access to a CPU buffer; marks it for re-upload.
    pub fn pixels_mut(&mut self, handle: TextureHandle) -> Option<&mut RgbaImage> {
        self.arena.get_mut(handle).map(|e| {
            e.dirty = true;
            &mut e.pixels
        })
    }

    pub fn is_dirty(&self, handle: TextureHandle) -> bool {
        self.arena.get(handle).is_some_and(|e| e.dirty)
    }

    // ---- surface ---------------------------------------------------------

    /// Record the display size; used by every subsequent `draw_frame`.
    pub fn set_surface_size(&mut self, width: u32, height: u32) {
        self.surface_size = (width, height);
    }

    pub fn surface_size(&self) -> (u32, u32) {
        self.surface_size
    }

    /// Draw one full frame (all four passes) at the display size.
    pub fn draw_frame(&mut self, scene: &FrameScene<'_>) -> Result<()> {
        if let Some(selection) = scene.selection {
            self.sync_selection(selection);
        }
        self.stats.frames += 1;
        self.render_scene(scene, self.surface_size, true)
    }

    /// Pixels of the most recent frame or region render.
    pub fn read_frame(&mut self) -> Result<RgbaImage> {
        if self.last_frame_gpu {
            if let Some(gpu) = self.gpu.as_mut() {
                let (w, h) = self.surface.dimensions();
                let data = gpu.read_target()?;
                return RgbaImage::from_raw(w, h, data)
                    .ok_or_else(|| EditorError::Gpu("readback size mismatch".into()));
            }
        }
        Ok(self.surface.clone())
    }

    /// Render only the layers (no overlays, no background) into an offscreen
    /// surface of exactly `rect.width × rect.height`, with document
    /// `(rect.x, rect.y)` at the top-left and zoom 1.
    pub fn render_region(&mut self, layers: &[Layer], rect: Rect) -> Result<RgbaImage> {
        self.stats.region_renders += 1;
        if rect.is_empty() {
            return Ok(RgbaImage::new(rect.width, rect.height));
        }
        let scene = FrameScene {
            layers,
            current: None,
            selection: None,
            viewport: Viewport::region(rect.x, rect.y),
        };
        self.render_scene(&scene, (rect.width, rect.height), false)?;
        self.read_frame()
    }

    fn sync_selection(&mut self, selection: &Selection) {
        if self.selection_generation == Some(selection.generation()) {
            return;
        }
        let (w, h) = selection.size();
        let mask = selection.mask();
        let overlay = RgbaImage::from_fn(w, h, |x, y| Rgba([0, 0, 0, mask.get_pixel(x, y)[0]]));
        if let Some(entry) = self.arena.get_mut(self.selection_texture) {
            entry.pixels = overlay;
            entry.dirty = true;
        }
        self.selection_generation = Some(selection.generation());
    }

    /// Re-upload every dirty texture the frame is about to sample.
    fn sync_textures(&mut self, handles: &[TextureHandle]) {
        for &handle in handles {
            let Some(entry) = self.arena.get_mut(handle) else {
                continue;
            };
            if !entry.dirty {
                continue;
            }
            if let Some(gpu) = self.gpu.as_ref() {
                let (w, h) = entry.pixels.dimensions();
                if gpu.supports_size(w, h) {
                    gpu.upload(&mut entry.gpu, w, h, entry.pixels.as_raw());
                } else {
                    entry.gpu = None;
                }
            }
            entry.dirty = false;
            self.stats.uploads += 1;
        }
    }

    fn render_scene(
        &mut self,
        scene: &FrameScene<'_>,
        (width, height): (u32, u32),
        overlays: bool,
    ) -> Result<()> {
        let mut handles: Vec<TextureHandle> = scene.layers.iter().map(Layer::texture).collect();
        let selection = scene
            .selection
            .filter(|s| overlays && !s.is_empty())
            .map(|s| s.rect());
        if selection.is_some() {
            handles.push(self.selection_texture);
        }
        self.sync_textures(&handles);

        if self.surface.dimensions() != (width, height) {
            self.surface = RgbaImage::new(width, height);
        }
        if width == 0 || height == 0 {
            self.last_frame_gpu = false;
            return Ok(());
        }

        let bounds = scene.current.filter(|_| overlays).map(Layer::rect);
        if self.gpu.is_some() && self.gpu_can_draw(scene.layers, (width, height)) {
            self.gpu_passes(scene, (width, height), overlays, selection, bounds);
            self.last_frame_gpu = true;
        } else {
            self.cpu_passes(scene, overlays, selection, bounds);
            self.last_frame_gpu = false;
        }
        Ok(())
    }

    fn gpu_can_draw(&self, layers: &[Layer], (width, height): (u32, u32)) -> bool {
        let Some(gpu) = self.gpu.as_ref() else {
            return false;
        };
        if !gpu.supports_size(width, height) {
            log_warn!("surface {}x{} exceeds GPU limits; using CPU passes", width, height);
            return false;
        }
        layers.iter().all(|layer| {
            let (w, h) = layer.size();
            w == 0 || h == 0 || gpu.supports_size(w, h)
        })
    }

    // ---- GPU path ----------------------------------------------------------

    fn gpu_passes(
        &mut self,
        scene: &FrameScene<'_>,
        (width, height): (u32, u32),
        overlays: bool,
        selection: Option<Rect>,
        bounds: Option<Rect>,
    ) {
        let vp = scene.viewport;
        let base = PassUniforms {
            resolution: [width as f32, height as f32],
            pan: [vp.pan.x, vp.pan.y],
            zoom: vp.zoom,
            brightness: self.checkerboard_brightness,
            ..Default::default()
        };
        let rect_uniforms = |rect: Rect| PassUniforms {
            rect_offset: [rect.x as f32, rect.y as f32],
            rect_size: [rect.width as f32, rect.height as f32],
            ..base
        };

        let mut passes = Vec::with_capacity(scene.layers.len() + 3);
        if overlays {
            passes.push(GpuPass {
                kind: PassKind::Background,
                uniforms: base,
                texture: None,
            });
        }
        for layer in scene.layers.iter().rev() {
            let rect = layer.rect();
            if rect.is_empty() {
                continue;
            }
            let texture = self.arena.get(layer.texture()).and_then(|e| e.gpu.as_ref());
            passes.push(GpuPass {
                kind: PassKind::Layer,
                uniforms: rect_uniforms(rect),
                texture,
            });
        }
        if let Some(rect) = selection {
            let texture = self.arena.get(self.selection_texture).and_then(|e| e.gpu.as_ref());
            passes.push(GpuPass {
                kind: PassKind::SelectionEdge,
                uniforms: rect_uniforms(rect),
                texture,
            });
        }
        if let Some(rect) = bounds.filter(|r| !r.is_empty()) {
            let band = bounds_band(rect, vp.zoom);
            passes.push(GpuPass {
                kind: PassKind::LayerBounds,
                uniforms: PassUniforms {
                    band: [band.x, band.y],
                    ..rect_uniforms(rect)
                },
                texture: None,
            });
        }

        if let Some(gpu) = self.gpu.as_mut() {
            gpu.render(width, height, &passes);
        }
    }

    // ---- CPU path ----------------------------------------------------------

    fn cpu_passes(
        &mut self,
        scene: &FrameScene<'_>,
        overlays: bool,
        selection: Option<Rect>,
        bounds: Option<Rect>,
    ) {
        let layers: Vec<(&RgbaImage, Offset)> = scene
            .layers
            .iter()
            .rev()
            .filter_map(|layer| self.arena.get(layer.texture()).map(|e| (&e.pixels, layer.offset)))
            .collect();
        let selection = selection.and_then(|rect| {
            self.arena
                .get(self.selection_texture)
                .map(|e| (&e.pixels, rect))
        });

        let frame = CpuFrame {
            viewport: scene.viewport,
            background: overlays.then_some(self.checkerboard_brightness),
            layers,
            selection,
            bounds: bounds.filter(|r| !r.is_empty()),
        };

        let width = self.surface.width() as usize;
        let buf: &mut [u8] = &mut self.surface;
        buf.par_chunks_mut(width * 4).enumerate().for_each(|(y, row)| {
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                px.copy_from_slice(&frame.shade(x as u32, y as u32).0);
            }
        });
    }
}

/// Per-frame inputs of the CPU passes.
struct CpuFrame<'a> {
    viewport: Viewport,
    /// Checkerboard brightness; `None` leaves the background transparent.
    background: Option<f32>,
    /// Bottom of the stack first.
    layers: Vec<(&'a RgbaImage, Offset)>,
    selection: Option<(&'a RgbaImage, Rect)>,
    bounds: Option<Rect>,
}

impl CpuFrame<'_> {
    fn shade(&self, x: u32, y: u32) -> Rgba<u8> {
        let frag = Point::new(x as f32 + 0.5, y as f32 + 0.5);
        let doc = self.viewport.to_document(frag);

        let mut out = match self.background {
            Some(brightness) => checker(doc, brightness),
            None => Rgba([0, 0, 0, 0]),
        };

        let (px, py) = doc.pixel();
        for (pixels, offset) in &self.layers {
            let lx = px as i64 - offset.x as i64;
            let ly = py as i64 - offset.y as i64;
            if lx < 0 || ly < 0 || lx >= pixels.width() as i64 || ly >= pixels.height() as i64 {
                continue;
            }
            out = blend_normal(out, *pixels.get_pixel(lx as u32, ly as u32));
        }

        if let Some((mask, rect)) = self.selection {
            if let Some(ant) = selection_edge(frag, &self.viewport, mask, rect) {
                out = ant;
            }
        }

        if let Some(rect) = self.bounds {
            if on_bounds_band(frag, &self.viewport, rect) {
                out = BOUNDS_COLOR;
            }
        }

        out
    }
}

// ============================================================================
// PASS MATH: shared by the CPU passes and mirrored in gpu/shaders.rs
// ============================================================================

/// Remap a surface fragment into the unit square of a document rectangle.
pub fn to_local(frag: Point, viewport: &Viewport, rect: Rect) -> Point {
    let doc = viewport.to_document(frag);
    Point::new(
        (doc.x - rect.x as f32) / rect.width as f32,
        (doc.y - rect.y as f32) / rect.height as f32,
    )
}

fn checker(doc: Point, brightness: f32) -> Rgba<u8> {
    let cx = (doc.x / CHECKER_TILE).floor() as i64;
    let cy = (doc.y / CHECKER_TILE).floor() as i64;
    let base = if (cx + cy).rem_euclid(2) == 1 { 0.4 } else { 0.3 };
    let c = ((base * brightness).clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgba([c, c, c, 255])
}

fn mask_alpha(frag: Point, viewport: &Viewport, mask: &RgbaImage, rect: Rect) -> u8 {
    let local = to_local(frag, viewport, rect);
    if !(local.x >= 0.0 && local.y >= 0.0 && local.x < 1.0 && local.y < 1.0) {
        return 0;
    }
    let (w, h) = mask.dimensions();
    let tx = ((local.x * w as f32).floor() as u32).min(w - 1);
    let ty = ((local.y * h as f32).floor() as u32).min(h - 1);
    mask.get_pixel(tx, ty)[3]
}

/// Black/white dash where the mask alpha changes between the fragment and a
/// 4-neighbour.  Horizontal edges dash along x, vertical edges along y.
fn selection_edge(frag: Point, viewport: &Viewport, mask: &RgbaImage, rect: Rect) -> Option<Rgba<u8>> {
    let at = |dx: f32, dy: f32| mask_alpha(Point::new(frag.x + dx, frag.y + dy), viewport, mask, rect);
    let o = at(0.0, 0.0);
    let n = at(0.0, -1.0);
    let e = at(1.0, 0.0);
    let s = at(0.0, 1.0);
    let w = at(-1.0, 0.0);

    let phase = if n != o || s != o {
        fract(frag.x / SELECTION_DASH)
    } else if e != o || w != o {
        fract(frag.y / SELECTION_DASH)
    } else {
        return None;
    };
    Some(if phase > 0.5 {
        Rgba([255, 255, 255, 255])
    } else {
        Rgba([0, 0, 0, 255])
    })
}

/// Band thickness in layer-local units: never thinner than one surface pixel.
pub fn bounds_band(rect: Rect, zoom: f32) -> Point {
    Point::new(
        LAYER_BOUNDS_BAND.max(1.0 / (rect.width as f32 * zoom)),
        LAYER_BOUNDS_BAND.max(1.0 / (rect.height as f32 * zoom)),
    )
}

fn on_bounds_band(frag: Point, viewport: &Viewport, rect: Rect) -> bool {
    let local = to_local(frag, viewport, rect);
    let band = bounds_band(rect, viewport.zoom);
    let inside = local.x > 0.0 && local.y > 0.0 && local.x < 1.0 && local.y < 1.0;
    inside
        && (local.x < band.x || local.y < band.y || 1.0 - local.x < band.x || 1.0 - local.y < band.y)
}

fn fract(v: f32) -> f32 {
    v - v.floor()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, c: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(c))
    }

    fn layer(comp: &mut Compositor, name: &str, offset: Offset, pixels: RgbaImage) -> Layer {
        let size = pixels.dimensions();
        let texture = comp.register(pixels);
        Layer::new(name.to_string(), offset, texture, size)
    }

    #[test]
    fn arena_rejects_stale_handles() {
        let mut comp = Compositor::cpu();
        let a = comp.register(solid(2, 2, [1, 2, 3, 255]));
        assert_eq!(comp.texture_count(), 1);
        assert!(comp.deregister(a).is_ok());
        assert!(matches!(comp.deregister(a), Err(EditorError::StaleTexture(_))));

        // The freed slot is reused under a new generation.
        let b = comp.register(solid(1, 1, [0, 0, 0, 0]));
        assert_ne!(a, b);
        assert!(!comp.is_registered(a));
        assert!(comp.is_registered(b));
        assert!(comp.pixels(a).is_none());
        assert_eq!(comp.texture_count(), 1);
    }

    #[test]
    fn selection_overlay_cannot_be_deregistered() {
        let mut comp = Compositor::cpu();
        let overlay = comp.selection_texture;
        assert!(comp.deregister(overlay).is_err());
        assert!(comp.is_registered(overlay));
    }

    #[test]
    fn region_render_has_exact_size_and_content() {
        let mut comp = Compositor::cpu();
        let l = layer(&mut comp, "Layer 1", Offset::new(10, 10), solid(4, 4, [255, 0, 0, 255]));
        let out = comp
            .render_region(std::slice::from_ref(&l), Rect::new(8, 8, 5, 3))
            .unwrap();
        assert_eq!(out.dimensions(), (5, 3));
        assert_eq!(out.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
        assert_eq!(out.get_pixel(2, 2), &Rgba([255, 0, 0, 255]));
        assert_eq!(out.get_pixel(4, 2), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn zero_sized_region_is_empty_image() {
        let mut comp = Compositor::cpu();
        let out = comp.render_region(&[], Rect::new(0, 0, 0, 7)).unwrap();
        assert_eq!(out.dimensions(), (0, 7));
    }

    #[test]
    fn top_of_stack_is_drawn_last() {
        let mut comp = Compositor::cpu();
        let top = layer(&mut comp, "top", Offset::ZERO, solid(2, 2, [255, 0, 0, 255]));
        let bottom = layer(&mut comp, "bottom", Offset::ZERO, solid(4, 4, [0, 0, 255, 255]));
        let stack = [top, bottom];
        let out = comp.render_region(&stack, Rect::new(0, 0, 4, 4)).unwrap();
        assert_eq!(out.get_pixel(1, 1), &Rgba([255, 0, 0, 255]));
        assert_eq!(out.get_pixel(3, 3), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn frame_draws_checkerboard_and_bounds() {
        let mut comp = Compositor::cpu();
        comp.set_surface_size(64, 64);
        let l = layer(&mut comp, "Layer 1", Offset::new(20, 20), solid(10, 10, [0, 255, 0, 255]));
        let selection = Selection::new();
        let scene = FrameScene {
            layers: std::slice::from_ref(&l),
            current: Some(&l),
            selection: Some(&selection),
            viewport: Viewport::default(),
        };
        comp.draw_frame(&scene).unwrap();
        let frame = comp.read_frame().unwrap();
        assert_eq!(frame.dimensions(), (64, 64));
        // checkerboard: tile (0,0) is the darker shade, tile (1,0) the lighter
        assert_eq!(frame.get_pixel(0, 0), &Rgba([77, 77, 77, 255]));
        assert_eq!(frame.get_pixel(16, 0), &Rgba([102, 102, 102, 255]));
        // one-pixel red frame on the layer border, layer content inside
        assert_eq!(frame.get_pixel(20, 25), &BOUNDS_COLOR);
        assert_eq!(frame.get_pixel(29, 25), &BOUNDS_COLOR);
        assert_eq!(frame.get_pixel(25, 25), &Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn selection_edge_is_dashed_at_mask_transitions() {
        let mut comp = Compositor::cpu();
        comp.set_surface_size(64, 64);
        let selection = Selection::from_corners(Point::new(10.0, 10.0), Point::new(40.0, 40.0));
        let scene = FrameScene {
            layers: &[],
            current: None,
            selection: Some(&selection),
            viewport: Viewport::default(),
        };
        comp.draw_frame(&scene).unwrap();
        let frame = comp.read_frame().unwrap();
        let black = Rgba([0, 0, 0, 255]);
        let white = Rgba([255, 255, 255, 255]);
        // Top edge of the opaque interior: dash along x with period 8.
        assert_eq!(frame.get_pixel(16, 10), &black);
        assert_eq!(frame.get_pixel(19, 10), &black);
        assert_eq!(frame.get_pixel(12, 10), &white);
        assert_eq!(frame.get_pixel(20, 10), &white);
        // The transparent border row just outside is marked too.
        assert_eq!(frame.get_pixel(16, 9), &black);
        // Left edge: dash along y.
        assert_eq!(frame.get_pixel(10, 16), &black);
        assert_eq!(frame.get_pixel(10, 20), &white);
        // Far from any edge the checkerboard shows through.
        assert_eq!(frame.get_pixel(25, 25)[0], 77);
    }

    #[test]
    fn dirty_textures_upload_once() {
        let mut comp = Compositor::cpu();
        comp.set_surface_size(8, 8);
        let l = layer(&mut comp, "Layer 1", Offset::ZERO, solid(4, 4, [9, 9, 9, 255]));
        let scene = FrameScene {
            layers: std::slice::from_ref(&l),
            current: None,
            selection: None,
            viewport: Viewport::default(),
        };
        comp.draw_frame(&scene).unwrap();
        assert_eq!(comp.stats().uploads, 1);
        comp.draw_frame(&scene).unwrap();
        assert_eq!(comp.stats().uploads, 1);

        comp.pixels_mut(l.texture()).unwrap().put_pixel(0, 0, Rgba([1, 1, 1, 255]));
        assert!(comp.is_dirty(l.texture()));
        comp.draw_frame(&scene).unwrap();
        assert_eq!(comp.stats().uploads, 2);
        assert!(!comp.is_dirty(l.texture()));
        assert_eq!(comp.read_frame().unwrap().get_pixel(0, 0), &Rgba([1, 1, 1, 255]));
    }

    #[test]
    fn zoomed_view_scales_layer_pixels() {
        let mut comp = Compositor::cpu();
        comp.set_surface_size(8, 8);
        let mut pixels = solid(2, 2, [0, 0, 0, 0]);
        pixels.put_pixel(1, 1, Rgba([255, 255, 0, 255]));
        let l = layer(&mut comp, "Layer 1", Offset::ZERO, pixels);
        let mut viewport = Viewport::default();
        viewport.set_zoom(4.0);
        let scene = FrameScene {
            layers: std::slice::from_ref(&l),
            current: None,
            selection: None,
            viewport,
        };
        comp.draw_frame(&scene).unwrap();
        let frame = comp.read_frame().unwrap();
        assert_eq!(frame.get_pixel(5, 5), &Rgba([255, 255, 0, 255]));
        assert_eq!(frame.get_pixel(7, 4), &Rgba([255, 255, 0, 255]));
        assert_ne!(frame.get_pixel(3, 3), &Rgba([255, 255, 0, 255]));
    }

    #[test]
    fn band_is_at_least_one_surface_pixel() {
        let band = bounds_band(Rect::new(0, 0, 100, 2000), 1.0);
        assert!((band.x - 0.01).abs() < 1e-6);
        assert!((band.y - LAYER_BOUNDS_BAND).abs() < 1e-6);
    }
}
