//! Tool framework: a fixed registry of tools, exactly one active.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::canvas::Color;
use crate::components::layers::LayerStack;
use crate::components::pointer::PointerEvent;
use crate::compositor::Compositor;
use crate::error::EditorError;
use crate::selection::Selection;

pub mod brush;
pub mod eyedropper;
pub mod fill;
pub mod select;

pub use brush::{BrushMode, BrushTool};
pub use eyedropper::EyedropperTool;
pub use fill::FillTool;
pub use select::SelectTool;

// ===== Tool Identifier =====

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolId {
    /// Does nothing; pan/zoom live on the viewport.
    Move,
    Select,
    #[default]
    Brush,
    Eraser,
    Fill,
    Eyedropper,
}

impl ToolId {
    pub const ALL: [ToolId; 6] = [
        ToolId::Move,
        ToolId::Select,
        ToolId::Brush,
        ToolId::Eraser,
        ToolId::Fill,
        ToolId::Eyedropper,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolId::Move => "move",
            ToolId::Select => "select",
            ToolId::Brush => "brush",
            ToolId::Eraser => "eraser",
            ToolId::Fill => "fill",
            ToolId::Eyedropper => "eyedropper",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ToolId::Move => "Move",
            ToolId::Select => "Select",
            ToolId::Brush => "Brush",
            ToolId::Eraser => "Eraser",
            ToolId::Fill => "Fill",
            ToolId::Eyedropper => "Eyedropper",
        }
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolId {
    type Err = EditorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolId::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| EditorError::Settings(format!("unknown tool '{s}'")))
    }
}

// ===== Options and settings =====

/// A numeric option a tool exposes to the host UI.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToolOption {
    pub id: &'static str,
    pub name: &'static str,
    pub min: f32,
    pub max: f32,
    pub step: f32,
    pub default: f32,
}

impl ToolOption {
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.default;
        }
        value.clamp(self.min, self.max)
    }
}

/// Live option values of one tool, keyed by option id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolSettings(BTreeMap<String, f32>);

impl ToolSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_options(options: &[ToolOption]) -> Self {
        Self(options.iter().map(|o| (o.id.to_string(), o.default)).collect())
    }

    pub fn with(mut self, id: &str, value: f32) -> Self {
        self.set(id, value);
        self
    }

    pub fn get(&self, id: &str) -> Option<f32> {
        self.0.get(id).copied()
    }

    pub fn set(&mut self, id: &str, value: f32) {
        self.0.insert(id.to_string(), value);
    }

    /// Current value of `option`, clamped to its range; its default if unset.
    pub fn value(&self, option: &ToolOption) -> f32 {
        self.get(option.id).map_or(option.default, |v| option.clamp(v))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

// ===== Tool context =====

/// Mutable editor state a tool callback may touch.
pub struct ToolContext<'a> {
    pub layers: &'a mut LayerStack,
    pub compositor: &'a mut Compositor,
    pub selection: &'a mut Selection,
    pub foreground: Color,
}

/// What a callback did, for the editor to act on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ToolResponse {
    #[default]
    Idle,
    /// Layer pixels or the selection changed.
    Changed,
    /// The eyedropper sampled a colour for the foreground.
    ColorPicked(Color),
}

// ===== Move tool =====

/// Deliberately inert.
#[derive(Clone, Debug, Default)]
pub struct MoveTool;

// ===== ToolBox Enum =====

/// Every tool kind, matched exhaustively at each dispatch site.
#[derive(Debug)]
pub enum ToolBox {
    Move(MoveTool),
    Select(SelectTool),
    Brush(BrushTool),
    Fill(FillTool),
    Eyedropper(EyedropperTool),
}

impl ToolBox {
    pub fn for_id(id: ToolId) -> Self {
        match id {
            ToolId::Move => ToolBox::Move(MoveTool),
            ToolId::Select => ToolBox::Select(SelectTool::default()),
            ToolId::Brush => ToolBox::Brush(BrushTool::new(BrushMode::Paint)),
            ToolId::Eraser => ToolBox::Brush(BrushTool::new(BrushMode::Erase)),
            ToolId::Fill => ToolBox::Fill(FillTool::default()),
            ToolId::Eyedropper => ToolBox::Eyedropper(EyedropperTool),
        }
    }

    pub fn id(&self) -> ToolId {
        match self {
            ToolBox::Move(_) => ToolId::Move,
            ToolBox::Select(_) => ToolId::Select,
            ToolBox::Brush(tool) => match tool.mode() {
                BrushMode::Paint => ToolId::Brush,
                BrushMode::Erase => ToolId::Eraser,
            },
            ToolBox::Fill(_) => ToolId::Fill,
            ToolBox::Eyedropper(_) => ToolId::Eyedropper,
        }
    }

    pub fn options(&self) -> &'static [ToolOption] {
        match self {
            ToolBox::Brush(_) => &brush::BRUSH_OPTIONS,
            ToolBox::Fill(_) => &fill::FILL_OPTIONS,
            ToolBox::Move(_) | ToolBox::Select(_) | ToolBox::Eyedropper(_) => &[],
        }
    }

    pub fn settings(&self) -> Option<&ToolSettings> {
        match self {
            ToolBox::Brush(tool) => Some(&tool.settings),
            ToolBox::Fill(tool) => Some(&tool.settings),
            ToolBox::Move(_) | ToolBox::Select(_) | ToolBox::Eyedropper(_) => None,
        }
    }

    /// Replace the settings wholesale.  Tools without options ignore this.
    pub fn set_settings(&mut self, settings: ToolSettings) -> bool {
        match self {
            ToolBox::Brush(tool) => {
                tool.settings = settings;
                true
            }
            ToolBox::Fill(tool) => {
                tool.settings = settings;
                true
            }
            ToolBox::Move(_) | ToolBox::Select(_) | ToolBox::Eyedropper(_) => false,
        }
    }

    pub fn down(&mut self, ctx: &mut ToolContext<'_>, ev: &PointerEvent) -> ToolResponse {
        match self {
            ToolBox::Move(_) => ToolResponse::Idle,
            ToolBox::Select(tool) => tool.down(ev),
            ToolBox::Brush(tool) => tool.down(ctx, ev),
            ToolBox::Fill(_) => ToolResponse::Idle,
            ToolBox::Eyedropper(_) => ToolResponse::Idle,
        }
    }

    pub fn moved(&mut self, ctx: &mut ToolContext<'_>, ev: &PointerEvent) -> ToolResponse {
        match self {
            ToolBox::Move(_) => ToolResponse::Idle,
            ToolBox::Select(tool) => tool.moved(ctx, ev),
            ToolBox::Brush(tool) => tool.moved(ctx, ev),
            ToolBox::Fill(_) => ToolResponse::Idle,
            ToolBox::Eyedropper(_) => ToolResponse::Idle,
        }
    }

    pub fn up(&mut self, ctx: &mut ToolContext<'_>, ev: &PointerEvent) -> ToolResponse {
        match self {
            ToolBox::Move(_) => ToolResponse::Idle,
            ToolBox::Select(tool) => tool.up(),
            ToolBox::Brush(tool) => tool.up(),
            ToolBox::Fill(tool) => tool.up(ctx, ev),
            ToolBox::Eyedropper(tool) => tool.up(ctx, ev),
        }
    }

    /// Drop any partial gesture state.
    pub fn reset(&mut self) {
        match self {
            ToolBox::Move(_) | ToolBox::Fill(_) | ToolBox::Eyedropper(_) => {}
            ToolBox::Select(tool) => tool.reset(),
            ToolBox::Brush(tool) => tool.reset(),
        }
    }
}

// ===== Registry =====

/// One instance of every tool (settings persist across switches) and the
/// active tool id.
#[derive(Debug)]
pub struct ToolRegistry {
    tools: Vec<ToolBox>,
    active: ToolId,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self {
            tools: ToolId::ALL.into_iter().map(ToolBox::for_id).collect(),
            active: ToolId::default(),
        }
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_id(&self) -> ToolId {
        self.active
    }

    pub fn tool(&self, id: ToolId) -> &ToolBox {
        &self.tools[Self::slot(id)]
    }

    pub fn tool_mut(&mut self, id: ToolId) -> &mut ToolBox {
        &mut self.tools[Self::slot(id)]
    }

    pub fn active(&self) -> &ToolBox {
        self.tool(self.active)
    }

    pub fn active_mut(&mut self) -> &mut ToolBox {
        let id = self.active;
        self.tool_mut(id)
    }

    /// Reset the outgoing tool and activate `id`.  Returns `false` when `id`
    /// was already active.
    pub fn select(&mut self, id: ToolId) -> bool {
        if id == self.active {
            return false;
        }
        self.active_mut().reset();
        self.active = id;
        true
    }

    fn slot(id: ToolId) -> usize {
        match id {
            ToolId::Move => 0,
            ToolId::Select => 1,
            ToolId::Brush => 2,
            ToolId::Eraser => 3,
            ToolId::Fill => 4,
            ToolId::Eyedropper => 5,
        }
    }
}
