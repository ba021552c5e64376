//! Pointer gesture tracking: button → action tag, start/last points.

use serde::{Deserialize, Serialize};

use crate::canvas::Point;

/// Which kind of gesture is in progress, fixed at pointer-down.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerAction {
    Primary,
    Secondary,
}

/// Raw input buttons, as reported by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerButton {
    Left,
    Middle,
    Right,
    /// Pen barrel button, eraser end, extra mouse buttons...
    Other(u16),
}

impl PointerButton {
    /// Left drives primary gestures, right secondary.  Anything else starts
    /// no gesture.
    pub fn action(self) -> Option<PointerAction> {
        match self {
            PointerButton::Left => Some(PointerAction::Primary),
            PointerButton::Right => Some(PointerAction::Secondary),
            PointerButton::Middle | PointerButton::Other(_) => None,
        }
    }
}

/// In-flight gesture state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerState {
    pub start: Point,
    pub last: Point,
    pub action: Option<PointerAction>,
}

/// What a tool callback receives.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerEvent {
    pub point: Point,
    pub start: Point,
    /// Point of the previous event in this gesture.
    pub last: Point,
    pub action: Option<PointerAction>,
}

/// Tracks at most one gesture at a time.
#[derive(Clone, Debug, Default)]
pub struct PointerTracker {
    state: Option<PointerState>,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Option<&PointerState> {
        self.state.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    /// Start a gesture; any stale gesture is discarded.
    pub fn down(&mut self, point: Point, button: PointerButton) -> PointerEvent {
        let action = button.action();
        self.state = Some(PointerState {
            start: point,
            last: point,
            action,
        });
        PointerEvent {
            point,
            start: point,
            last: point,
            action,
        }
    }

    /// Advance the gesture.  Without a gesture in flight this is a hover:
    /// the event carries no action.
    pub fn moved(&mut self, point: Point) -> PointerEvent {
        match self.state.as_mut() {
            Some(state) => {
                let event = PointerEvent {
                    point,
                    start: state.start,
                    last: state.last,
                    action: state.action,
                };
                state.last = point;
                event
            }
            None => PointerEvent {
                point,
                start: point,
                last: point,
                action: None,
            },
        }
    }

    /// End the gesture.  A release with nothing in flight has no action.
    pub fn up(&mut self, point: Point) -> PointerEvent {
        match self.state.take() {
            Some(state) => PointerEvent {
                point,
                start: state.start,
                last: state.last,
                action: state.action,
            },
            None => PointerEvent {
                point,
                start: point,
                last: point,
                action: None,
            },
        }
    }

    pub fn reset(&mut self) {
        self.state = None;
    }
}
