use super::{ToolContext, ToolResponse};
use crate::canvas::{Color, Rect};
use crate::components::pointer::PointerEvent;

/// Samples the composited document under the pointer on release.
#[derive(Clone, Debug, Default)]
pub struct EyedropperTool;

impl EyedropperTool {
    pub fn up(&mut self, ctx: &mut ToolContext<'_>, ev: &PointerEvent) -> ToolResponse {
        if ev.action.is_none() || ctx.layers.is_empty() {
            return ToolResponse::Idle;
        }
        let (x, y) = ev.point.pixel();
        let sample = match ctx.compositor.render_region(ctx.layers.layers(), Rect::new(x, y, 1, 1)) {
            Ok(sample) => sample,
            Err(e) => {
                log_warn!("Eyedropper sample at ({}, {}) failed: {}", x, y, e);
                return ToolResponse::Idle;
            }
        };
        match sample.pixels().next() {
            // Alpha is dropped: the foreground is always an opaque colour.
            Some(px) => ToolResponse::ColorPicked(Color::from_pixel(*px).opaque()),
            None => ToolResponse::Idle,
        }
    }
}
