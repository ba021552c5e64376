use super::{ToolContext, ToolResponse};
use crate::canvas::Point;
use crate::components::pointer::PointerEvent;

/// Rectangle selection.  The drag anchor is taken at pointer-down and the
/// selection is rebuilt on every move until pointer-up.
#[derive(Clone, Debug, Default)]
pub struct SelectTool {
    anchor: Option<Point>,
}

impl SelectTool {
    pub fn down(&mut self, ev: &PointerEvent) -> ToolResponse {
        self.anchor = Some(ev.point);
        ToolResponse::Idle
    }

    pub fn moved(&mut self, ctx: &mut ToolContext<'_>, ev: &PointerEvent) -> ToolResponse {
        let Some(anchor) = self.anchor else {
            return ToolResponse::Idle;
        };
        ctx.selection.set_from_corners(anchor, ev.point);
        ToolResponse::Changed
    }

    pub fn up(&mut self) -> ToolResponse {
        self.anchor = None;
        ToolResponse::Idle
    }

    pub fn reset(&mut self) {
        self.anchor = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.anchor.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{Color, Offset};
    use crate::components::layers::LayerStack;
    use crate::components::pointer::PointerAction;
    use crate::compositor::Compositor;
    use crate::selection::Selection;

    fn at(x: f32, y: f32) -> PointerEvent {
        let p = Point::new(x, y);
        PointerEvent {
            point: p,
            start: p,
            last: p,
            action: Some(PointerAction::Primary),
        }
    }

    #[test]
    fn drag_replaces_selection_on_every_move() {
        let mut comp = Compositor::cpu();
        let mut layers = LayerStack::new();
        let mut selection = Selection::new();
        let mut tool = SelectTool::default();
        let mut ctx = ToolContext {
            layers: &mut layers,
            compositor: &mut comp,
            selection: &mut selection,
            foreground: Color::BLACK,
        };

        tool.down(&at(300.0, 300.0));
        tool.moved(&mut ctx, &at(250.0, 250.0));
        assert_eq!(ctx.selection.size(), (52, 52));
        tool.moved(&mut ctx, &at(100.0, 100.0));
        tool.up();

        assert_eq!(selection.offset(), Offset::new(99, 99));
        assert_eq!(selection.size(), (202, 202));
    }

    #[test]
    fn moves_without_a_drag_leave_selection_alone() {
        let mut comp = Compositor::cpu();
        let mut layers = LayerStack::new();
        let mut selection = Selection::new();
        let mut tool = SelectTool::default();
        let mut ctx = ToolContext {
            layers: &mut layers,
            compositor: &mut comp,
            selection: &mut selection,
            foreground: Color::BLACK,
        };
        assert_eq!(tool.moved(&mut ctx, &at(5.0, 5.0)), ToolResponse::Idle);

        tool.down(&at(0.0, 0.0));
        tool.reset();
        assert!(!tool.is_dragging());
        tool.moved(&mut ctx, &at(5.0, 5.0));
        assert!(selection.is_empty());
    }
}
