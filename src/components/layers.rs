use std::fmt;

use image::{Rgba, RgbaImage};
use uuid::Uuid;

use crate::canvas::{Offset, Rect};
use crate::compositor::{Compositor, TextureHandle};
use crate::error::Result;

const AUTO_NAME_PREFIX: &str = "Layer ";

/// Stable identity of a layer for its whole lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LayerId(Uuid);

impl LayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A raster layer.  Pixels live in the compositor, keyed by `texture`.
///
/// There is no way to build a `Layer` without a registered texture, and the
/// layer is not `Clone`, so a handle is never shared by two layers.
#[derive(Debug)]
pub struct Layer {
    id: LayerId,
    pub name: String,
    /// Document-space position of the buffer's top-left corner.
    pub offset: Offset,
    texture: TextureHandle,
    width: u32,
    height: u32,
}

impl Layer {
    pub(crate) fn new(name: String, offset: Offset, texture: TextureHandle, (width, height): (u32, u32)) -> Self {
        Self {
            id: LayerId::new(),
            name,
            offset,
            texture,
            width,
            height,
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn texture(&self) -> TextureHandle {
        self.texture
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Document-space bounds.
    pub fn rect(&self) -> Rect {
        Rect::from_offset_size(self.offset, self.size())
    }
}

/// Numeric suffix of an auto-named layer: the digits right after `"Layer "`.
/// `"Layer 3 copy"` counts as 3.
fn auto_name_number(name: &str) -> Option<u64> {
    let rest = name.strip_prefix(AUTO_NAME_PREFIX)?;
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

// ============================================================================
// LAYER STACK
// ============================================================================

/// Ordered layers (index 0 = topmost) plus the current-layer reference.
///
/// Invariant: `current` is `None` only when the stack is empty, and otherwise
/// names a layer that is in the stack.
#[derive(Debug, Default)]
pub struct LayerStack {
    layers: Vec<Layer>,
    current: Option<LayerId>,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn current_id(&self) -> Option<LayerId> {
        self.current
    }

    pub fn current(&self) -> Option<&Layer> {
        self.current.and_then(|id| self.get(id))
    }

    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn get_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    pub fn index_of(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    /// `"Layer N"` with N one past the highest auto-name suffix in use.
    pub fn next_layer_name(&self) -> String {
        let max = self
            .layers
            .iter()
            .filter_map(|l| auto_name_number(&l.name))
            .max()
            .unwrap_or(0);
        format!("{AUTO_NAME_PREFIX}{}", max + 1)
    }

    /// New transparent layer on top of the stack; it becomes current.
    pub fn create_empty(&mut self, compositor: &mut Compositor, width: u32, height: u32) -> LayerId {
        let pixels = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
        self.push_top(compositor, pixels)
    }

    /// New layer sized to the image's own dimensions, on top and current.
    pub fn create_from_image(&mut self, compositor: &mut Compositor, image: RgbaImage) -> LayerId {
        self.push_top(compositor, image)
    }

    fn push_top(&mut self, compositor: &mut Compositor, pixels: RgbaImage) -> LayerId {
        let name = self.next_layer_name();
        let size = pixels.dimensions();
        let texture = compositor.register(pixels);
        let layer = Layer::new(name, Offset::ZERO, texture, size);
        let id = layer.id;
        log_info!("Created {} ({}x{})", layer.name, size.0, size.1);
        self.layers.insert(0, layer);
        self.current = Some(id);
        id
    }

    /// Deep copy of `id` (pixels and offset) right after it in the stack.
    /// The copy becomes current.  `None` if `id` is unknown.
    pub fn duplicate(&mut self, compositor: &mut Compositor, id: LayerId) -> Option<LayerId> {
        let index = self.index_of(id)?;
        let source = &self.layers[index];
        let pixels = compositor.pixels(source.texture)?.clone();
        let size = pixels.dimensions();
        let name = format!("{} copy", source.name);
        let offset = source.offset;

        let texture = compositor.register(pixels);
        let copy = Layer::new(name, offset, texture, size);
        let copy_id = copy.id;
        log_info!("Duplicated {} as {}", self.layers[index].name, copy.name);
        self.layers.insert(index + 1, copy);
        self.current = Some(copy_id);
        Some(copy_id)
    }

    /// Remove `id` and deregister its texture.  Unknown ids are a no-op and
    /// return `Ok(false)`.
    ///
    /// If the deleted layer was current, its neighbour at the previous index
    /// becomes current; deleting index 0 falls through to the new index 0.
    pub fn delete(&mut self, compositor: &mut Compositor, id: LayerId) -> Result<bool> {
        let Some(index) = self.index_of(id) else {
            return Ok(false);
        };
        let layer = self.layers.remove(index);
        if self.current == Some(id) {
            let next = index
                .checked_sub(1)
                .and_then(|i| self.layers.get(i))
                .or_else(|| self.layers.get(index));
            self.current = next.map(|l| l.id);
        }
        log_info!("Deleted {}", layer.name);
        compositor.deregister(layer.texture)?;
        Ok(true)
    }

    /// Make `id` current.  Unknown ids leave the selection unchanged.
    pub fn select(&mut self, id: LayerId) -> bool {
        if self.get(id).is_none() || self.current == Some(id) {
            return false;
        }
        self.current = Some(id);
        true
    }

    pub fn rename(&mut self, id: LayerId, name: impl Into<String>) -> bool {
        match self.get_mut(id) {
            Some(layer) => {
                layer.name = name.into();
                true
            }
            None => false,
        }
    }

    /// Place the layer's top-left corner at `offset` in document space.
    pub fn move_to(&mut self, id: LayerId, offset: Offset) -> bool {
        match self.get_mut(id) {
            Some(layer) if layer.offset != offset => {
                layer.offset = offset;
                true
            }
            _ => false,
        }
    }

    /// Drop every layer and its texture.
    pub fn clear(&mut self, compositor: &mut Compositor) -> Result<()> {
        self.current = None;
        for layer in self.layers.drain(..) {
            compositor.deregister(layer.texture)?;
        }
        Ok(())
    }

    /// Bounds of all layers, `None` for an empty stack.
    pub fn bounds(&self) -> Option<Rect> {
        self.layers
            .iter()
            .map(Layer::rect)
            .filter(|r| !r.is_empty())
            .reduce(Rect::union)
    }
}
