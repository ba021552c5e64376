//! Layered raster image editor core: a layer stack composited through wgpu
//! (or the CPU when no adapter is available), a tool framework driven by
//! document-space pointer gestures, a rectangular selection with a
//! marching-ants overlay, and PNG/data-URI export of composited regions.

#[macro_use]
pub mod logger;

pub mod canvas;
pub mod cli;
pub mod components;
pub mod compositor;
pub mod editor;
pub mod error;
pub mod gpu;
pub mod io;
pub mod render_loop;
pub mod selection;
pub mod settings;

pub use canvas::{Color, Offset, Point, Rect, Viewport};
pub use components::events::{EditorEvent, EventKind, SubscriptionId};
pub use components::layers::{Layer, LayerId};
pub use components::pointer::PointerButton;
pub use components::tools::{ToolId, ToolResponse, ToolSettings};
pub use editor::Editor;
pub use error::{EditorError, Result};
pub use render_loop::{RenderLoop, TickOutcome, VisibilityProbe};
pub use settings::EditorSettings;
