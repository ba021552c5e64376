// ============================================================================
// EDITOR: the public facade tying layers, tools, selection and compositor
// ============================================================================

use std::path::Path;

use image::RgbaImage;

use crate::canvas::{Color, DEFAULT_LAYER_SIZE, Offset, Point, Rect, Viewport};
use crate::components::events::{EditorEvent, EventBus, EventKind, SubscriptionId};
use crate::components::layers::{Layer, LayerId, LayerStack};
use crate::components::pointer::{PointerButton, PointerEvent, PointerTracker};
use crate::components::tools::{ToolContext, ToolId, ToolOption, ToolRegistry, ToolResponse, ToolSettings};
use crate::compositor::{Compositor, FrameScene};
use crate::error::Result;
use crate::io;
use crate::selection::Selection;
use crate::settings::EditorSettings;

#[derive(Clone, Copy)]
enum Phase {
    Down,
    Move,
    Up,
}

/// A single-threaded editor instance.  Every mutation happens through
/// `&mut self`; listeners run synchronously inside the call that triggered
/// them.
pub struct Editor {
    settings: EditorSettings,
    layers: LayerStack,
    compositor: Compositor,
    selection: Selection,
    tools: ToolRegistry,
    pointer: PointerTracker,
    events: EventBus,
    viewport: Viewport,
    foreground: Color,
    background: Color,
}

impl Editor {
    /// Editor with the compositor backend chosen by `settings`.
    pub fn new(settings: EditorSettings) -> Self {
        let compositor = Compositor::new(
            settings.gpu_acceleration,
            &settings.preferred_gpu,
            settings.checkerboard_brightness,
        );
        Self::with_compositor(settings, compositor)
    }

    /// CPU-only editor with default settings.
    pub fn headless() -> Self {
        Self::with_compositor(EditorSettings::default(), Compositor::cpu())
    }

    pub fn with_compositor(settings: EditorSettings, mut compositor: Compositor) -> Self {
        compositor.set_checkerboard_brightness(settings.checkerboard_brightness);
        log_info!("Editor compositing on {}", compositor.backend_name());
        Self {
            foreground: settings.foreground_color,
            background: settings.background_color,
            settings,
            layers: LayerStack::new(),
            compositor,
            selection: Selection::new(),
            tools: ToolRegistry::new(),
            pointer: PointerTracker::new(),
            events: EventBus::new(),
            viewport: Viewport::default(),
        }
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    // ---- layers ----------------------------------------------------------

    pub fn layers(&self) -> &[Layer] {
        self.layers.layers()
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(id)
    }

    pub fn current_layer(&self) -> Option<&Layer> {
        self.layers.current()
    }

    pub fn current_layer_id(&self) -> Option<LayerId> {
        self.layers.current_id()
    }

    /// Empty layer at the configured default size.
    pub fn create_empty_layer(&mut self) -> LayerId {
        let w = nonzero_or_default(self.settings.default_layer_width);
        let h = nonzero_or_default(self.settings.default_layer_height);
        self.create_empty_layer_sized(w, h)
    }

    pub fn create_empty_layer_sized(&mut self, width: u32, height: u32) -> LayerId {
        let id = self.layers.create_empty(&mut self.compositor, width, height);
        self.notify_state();
        id
    }

    pub fn create_layer_from_image(&mut self, image: RgbaImage) -> LayerId {
        let id = self.layers.create_from_image(&mut self.compositor, image);
        self.notify_state();
        id
    }

    /// Decode encoded image bytes into a new topmost layer.  On decode failure
    /// the stack is untouched.
    pub fn load_layer_from_bytes(&mut self, bytes: &[u8]) -> Result<LayerId> {
        let image = io::decode_image(bytes)?;
        Ok(self.create_layer_from_image(image))
    }

    pub fn load_layer_from_path(&mut self, path: &Path) -> Result<LayerId> {
        let image = io::load_image_path(path)?;
        Ok(self.create_layer_from_image(image))
    }

    /// `data:` URIs and local paths.  Fetching remote URLs is the host's job;
    /// it should hand the bytes to [`Editor::load_layer_from_bytes`].
    pub fn load_layer_from_url(&mut self, url: &str) -> Result<LayerId> {
        let image = io::load_image_source(url)?;
        Ok(self.create_layer_from_image(image))
    }

    pub fn duplicate_layer(&mut self, id: LayerId) -> Option<LayerId> {
        let copy = self.layers.duplicate(&mut self.compositor, id)?;
        self.notify_state();
        Some(copy)
    }

    /// Unknown ids are a no-op returning `Ok(false)`.
    pub fn delete_layer(&mut self, id: LayerId) -> Result<bool> {
        let removed = self.layers.delete(&mut self.compositor, id);
        // An Err still means the layer left the stack.
        if !matches!(removed, Ok(false)) {
            self.notify_state();
        }
        removed
    }

    pub fn select_layer(&mut self, id: LayerId) -> bool {
        let changed = self.layers.select(id);
        if changed {
            self.notify_state();
        }
        changed
    }

    pub fn rename_layer(&mut self, id: LayerId, name: impl Into<String>) -> bool {
        let changed = self.layers.rename(id, name);
        if changed {
            self.notify_state();
        }
        changed
    }

    pub fn move_layer(&mut self, id: LayerId, offset: Offset) -> bool {
        let changed = self.layers.move_to(id, offset);
        if changed {
            self.notify_state();
        }
        changed
    }

    /// Delete every layer and release its texture.
    pub fn clear_layers(&mut self) -> Result<()> {
        let had_layers = !self.layers.is_empty();
        let result = self.layers.clear(&mut self.compositor);
        if had_layers {
            self.notify_state();
        }
        result
    }

    pub fn layer_pixels(&self, id: LayerId) -> Option<&RgbaImage> {
        self.compositor.pixels(self.layers.get(id)?.texture())
    }

    /// Edit a layer's pixels in place; the texture is re-uploaded on the next
    /// frame.
    pub fn with_layer_pixels_mut<R>(&mut self, id: LayerId, f: impl FnOnce(&mut RgbaImage) -> R) -> Option<R> {
        let texture = self.layers.get(id)?.texture();
        self.compositor.pixels_mut(texture).map(f)
    }

    fn notify_state(&mut self) {
        self.events.publish(EditorEvent::State);
    }

    // ---- selection -------------------------------------------------------

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Replace the selection with the rectangle spanned by two document points.
    pub fn set_selection(&mut self, a: Point, b: Point) {
        self.selection.set_from_corners(a, b);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // ---- tools -----------------------------------------------------------

    pub fn active_tool(&self) -> ToolId {
        self.tools.active_id()
    }

    pub fn tool_options(&self, id: ToolId) -> &'static [ToolOption] {
        self.tools.tool(id).options()
    }

    pub fn tool_settings(&self, id: ToolId) -> Option<&ToolSettings> {
        self.tools.tool(id).settings()
    }

    /// Switch tools.  The outgoing tool is reset and any gesture in flight
    /// ends.
    pub fn select_tool(&mut self, id: ToolId) -> bool {
        if !self.tools.select(id) {
            return false;
        }
        self.pointer.reset();
        self.events.publish(EditorEvent::ToolChanged(id));
        true
    }

    /// Replace the active tool's settings.  `false` for tools without options.
    pub fn update_tool_settings(&mut self, settings: ToolSettings) -> bool {
        let id = self.tools.active_id();
        if !self.tools.active_mut().set_settings(settings) {
            return false;
        }
        self.events.publish(EditorEvent::ToolSettingsChanged(id));
        true
    }

    // ---- colours ---------------------------------------------------------

    pub fn foreground(&self) -> Color {
        self.foreground
    }

    pub fn background(&self) -> Color {
        self.background
    }

    /// Set from a colour string such as `#ff8800`.
    pub fn set_foreground_color(&mut self, value: &str) -> Result<()> {
        let color: Color = value.parse()?;
        self.set_foreground(color);
        Ok(())
    }

    pub fn set_background_color(&mut self, value: &str) -> Result<()> {
        let color: Color = value.parse()?;
        self.set_background(color);
        Ok(())
    }

    pub fn set_foreground(&mut self, color: Color) {
        self.foreground = color;
        self.events.publish(EditorEvent::ForegroundColorChanged(color));
    }

    pub fn set_background(&mut self, color: Color) {
        self.background = color;
        self.events.publish(EditorEvent::BackgroundColorChanged(color));
    }

    // ---- pointer input ---------------------------------------------------

    /// Points are document-space.
    pub fn pointer_down(&mut self, point: Point, button: PointerButton) -> ToolResponse {
        let ev = self.pointer.down(point, button);
        self.dispatch(Phase::Down, &ev)
    }

    pub fn pointer_move(&mut self, point: Point) -> ToolResponse {
        let ev = self.pointer.moved(point);
        self.dispatch(Phase::Move, &ev)
    }

    pub fn pointer_up(&mut self, point: Point) -> ToolResponse {
        let ev = self.pointer.up(point);
        self.dispatch(Phase::Up, &ev)
    }

    fn dispatch(&mut self, phase: Phase, ev: &PointerEvent) -> ToolResponse {
        let mut ctx = ToolContext {
            layers: &mut self.layers,
            compositor: &mut self.compositor,
            selection: &mut self.selection,
            foreground: self.foreground,
        };
        let tool = self.tools.active_mut();
        let response = match phase {
            Phase::Down => tool.down(&mut ctx, ev),
            Phase::Move => tool.moved(&mut ctx, ev),
            Phase::Up => tool.up(&mut ctx, ev),
        };
        if let ToolResponse::ColorPicked(color) = response {
            self.set_foreground(color);
        }
        response
    }

    // ---- viewport --------------------------------------------------------

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn screen_to_document(&self, screen: Point) -> Point {
        self.viewport.to_document(screen)
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.viewport.pan_by(dx, dy);
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.viewport.set_zoom(zoom);
    }

    pub fn zoom_around(&mut self, factor: f32, anchor: Point) {
        self.viewport.zoom_around(factor, anchor);
    }

    pub fn reset_view(&mut self) {
        self.viewport.reset();
    }

    // ---- rendering -------------------------------------------------------

    pub fn set_surface_size(&mut self, width: u32, height: u32) {
        self.compositor.set_surface_size(width, height);
    }

    pub fn draw_frame(&mut self) -> Result<()> {
        let scene = FrameScene {
            layers: self.layers.layers(),
            current: self.layers.current(),
            selection: Some(&self.selection),
            viewport: self.viewport,
        };
        self.compositor.draw_frame(&scene)
    }

    pub fn read_frame(&mut self) -> Result<RgbaImage> {
        self.compositor.read_frame()
    }

    /// Layers only, exactly `rect.width × rect.height`, at zoom 1.
    pub fn render_region(&mut self, rect: Rect) -> Result<RgbaImage> {
        self.compositor.render_region(self.layers.layers(), rect)
    }

    // ---- export ----------------------------------------------------------

    /// The selection if it is non-empty, else the current layer's bounds, else
    /// a default-sized region at the origin.
    pub fn selection_export_rect(&self) -> Rect {
        if !self.selection.is_empty() {
            return self.selection.rect();
        }
        match self.layers.current() {
            Some(layer) => layer.rect(),
            None => default_rect(),
        }
    }

    /// Union of every layer's bounds, or a default-sized region at the origin.
    pub fn document_rect(&self) -> Rect {
        self.layers.bounds().unwrap_or_else(default_rect)
    }

    pub fn export_selection_image(&mut self) -> Result<RgbaImage> {
        let rect = self.selection_export_rect();
        self.render_region(rect)
    }

    /// Composited selection as a `data:image/png;base64,...` URI.
    pub fn export_selection(&mut self) -> Result<String> {
        let image = self.export_selection_image()?;
        log_info!("Exporting selection {}x{}", image.width(), image.height());
        io::to_data_uri(&image)
    }

    pub fn export_whole_document_image(&mut self) -> Result<RgbaImage> {
        let rect = self.document_rect();
        self.render_region(rect)
    }

    pub fn export_whole_document(&mut self) -> Result<String> {
        let image = self.export_whole_document_image()?;
        log_info!("Exporting document {}x{}", image.width(), image.height());
        io::to_data_uri(&image)
    }

    // ---- notifications ---------------------------------------------------

    pub fn subscribe(&mut self, kind: EventKind, listener: impl FnMut(&EditorEvent) + 'static) -> SubscriptionId {
        self.events.subscribe(kind, listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }
}

impl Drop for Editor {
    fn drop(&mut self) {
        if let Err(e) = self.layers.clear(&mut self.compositor) {
            log_err!("Releasing layer textures failed: {}", e);
        }
    }
}

fn nonzero_or_default(v: u32) -> u32 {
    if v == 0 { DEFAULT_LAYER_SIZE } else { v }
}

fn default_rect() -> Rect {
    Rect::new(0, 0, DEFAULT_LAYER_SIZE, DEFAULT_LAYER_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn record(editor: &mut Editor, kind: EventKind) -> Rc<RefCell<Vec<EditorEvent>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        editor.subscribe(kind, move |ev| sink.borrow_mut().push(ev.clone()));
        log
    }

    #[test]
    fn each_layer_operation_publishes_one_state_event() {
        let mut editor = Editor::headless();
        let state = record(&mut editor, EventKind::State);

        let a = editor.create_empty_layer();
        let b = editor.duplicate_layer(a).unwrap();
        editor.select_layer(a);
        editor.rename_layer(a, "Sky");
        editor.move_layer(a, Offset::new(3, 4));
        editor.delete_layer(b).unwrap();
        assert_eq!(state.borrow().len(), 6);

        // No-ops stay silent.
        editor.select_layer(a);
        editor.move_layer(a, Offset::new(3, 4));
        assert!(!editor.delete_layer(b).unwrap());
        assert!(editor.duplicate_layer(b).is_none());
        assert_eq!(state.borrow().len(), 6);
    }

    #[test]
    fn tool_switch_and_settings_notify() {
        let mut editor = Editor::headless();
        let changed = record(&mut editor, EventKind::ToolChanged);
        let settings = record(&mut editor, EventKind::ToolSettingsChanged);

        assert!(editor.select_tool(ToolId::Fill));
        assert!(!editor.select_tool(ToolId::Fill));
        assert!(editor.update_tool_settings(ToolSettings::new().with("tolerance", 0.0)));
        editor.select_tool(ToolId::Move);
        assert!(!editor.update_tool_settings(ToolSettings::new()));

        assert_eq!(
            *changed.borrow(),
            vec![EditorEvent::ToolChanged(ToolId::Fill), EditorEvent::ToolChanged(ToolId::Move)]
        );
        assert_eq!(*settings.borrow(), vec![EditorEvent::ToolSettingsChanged(ToolId::Fill)]);
        assert_eq!(editor.tool_settings(ToolId::Fill).unwrap().get("tolerance"), Some(0.0));
    }

    #[test]
    fn colour_strings_are_parsed() {
        let mut editor = Editor::headless();
        let fg = record(&mut editor, EventKind::ForegroundColorChanged);
        editor.set_foreground_color("#ff8800").unwrap();
        assert!(editor.set_background_color("orange-ish").is_err());
        assert_eq!(editor.foreground(), Color::rgb(255, 136, 0));
        assert_eq!(editor.background(), Color::WHITE);
        assert_eq!(*fg.borrow(), vec![EditorEvent::ForegroundColorChanged(Color::rgb(255, 136, 0))]);
    }

    #[test]
    fn eyedropper_sets_foreground() {
        let mut editor = Editor::headless();
        let id = editor.create_empty_layer_sized(8, 8);
        editor.with_layer_pixels_mut(id, |px| px.put_pixel(5, 6, image::Rgba([9, 8, 7, 255])));
        editor.select_tool(ToolId::Eyedropper);
        let fg = record(&mut editor, EventKind::ForegroundColorChanged);

        editor.pointer_down(Point::new(5.5, 6.5), PointerButton::Left);
        editor.pointer_up(Point::new(5.5, 6.5));
        assert_eq!(editor.foreground().to_hex(), "#090807");
        assert_eq!(fg.borrow().len(), 1);

        // A bare release with no gesture samples nothing.
        editor.pointer_up(Point::new(0.0, 0.0));
        assert_eq!(fg.borrow().len(), 1);
    }

    #[test]
    fn tool_switch_ends_the_gesture() {
        let mut editor = Editor::headless();
        editor.create_empty_layer_sized(16, 16);
        editor.pointer_down(Point::new(1.0, 1.0), PointerButton::Left);
        editor.select_tool(ToolId::Select);
        editor.select_tool(ToolId::Brush);
        // The move after the switch is a hover: nothing is drawn.
        let id = editor.current_layer_id().unwrap();
        let before = editor.layer_pixels(id).unwrap().clone();
        editor.pointer_move(Point::new(10.0, 10.0));
        assert_eq!(editor.layer_pixels(id).unwrap(), &before);
    }

    #[test]
    fn export_rect_fallbacks() {
        let mut editor = Editor::headless();
        assert_eq!(editor.selection_export_rect(), Rect::new(0, 0, 512, 512));
        assert_eq!(editor.document_rect(), Rect::new(0, 0, 512, 512));

        let id = editor.create_empty_layer_sized(40, 30);
        editor.move_layer(id, Offset::new(5, 6));
        assert_eq!(editor.selection_export_rect(), Rect::new(5, 6, 40, 30));

        editor.set_selection(Point::new(10.0, 10.0), Point::new(20.0, 15.0));
        assert_eq!(editor.selection_export_rect(), Rect::new(9, 9, 12, 7));

        editor.create_empty_layer_sized(10, 10);
        assert_eq!(editor.document_rect(), Rect::new(0, 0, 45, 36));
    }

    #[test]
    fn dropping_releases_every_texture() {
        let mut editor = Editor::headless();
        editor.create_empty_layer_sized(4, 4);
        editor.create_empty_layer_sized(4, 4);
        assert_eq!(editor.compositor().texture_count(), 2);
        editor.clear_layers().unwrap();
        assert_eq!(editor.compositor().texture_count(), 0);
        assert!(editor.current_layer().is_none());
    }
}
