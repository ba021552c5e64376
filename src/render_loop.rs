//! Cooperative frame scheduler gated by a polled visibility check.
//!
//! The host calls [`RenderLoop::tick`] whenever [`RenderLoop::next_deadline`]
//! has passed.  While the surface is hidden no frame is composited and the
//! cadence drops to the hidden interval.

use std::time::{Duration, Instant};

use crate::editor::Editor;
use crate::error::Result;
use crate::settings::EditorSettings;

/// Answers "is the rendering surface currently visible to the user?".
pub trait VisibilityProbe {
    fn is_visible(&mut self) -> bool;
}

impl<F: FnMut() -> bool> VisibilityProbe for F {
    fn is_visible(&mut self) -> bool {
        self()
    }
}

/// Probe for hosts without a notion of visibility (headless export).
#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysVisible;

impl VisibilityProbe for AlwaysVisible {
    fn is_visible(&mut self) -> bool {
        true
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Rendered,
    /// Surface hidden; no composite pass ran.
    Skipped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoopTiming {
    pub frame_interval: Duration,
    pub hidden_interval: Duration,
    pub visibility_poll: Duration,
}

impl LoopTiming {
    pub fn from_settings(settings: &EditorSettings) -> Self {
        Self {
            frame_interval: settings.frame_interval(),
            hidden_interval: settings.hidden_interval(),
            visibility_poll: settings.visibility_poll(),
        }
    }
}

impl Default for LoopTiming {
    fn default() -> Self {
        Self::from_settings(&EditorSettings::default())
    }
}

pub struct RenderLoop<P: VisibilityProbe> {
    probe: P,
    timing: LoopTiming,
    visible: bool,
    last_poll: Option<Instant>,
    next_deadline: Option<Instant>,
    rendered: u64,
    skipped: u64,
}

impl<P: VisibilityProbe> RenderLoop<P> {
    pub fn new(probe: P, timing: LoopTiming) -> Self {
        Self {
            probe,
            timing,
            visible: true,
            last_poll: None,
            next_deadline: None,
            rendered: 0,
            skipped: 0,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// When the host should call [`tick`](Self::tick) next; `None` before the
    /// first tick (call immediately).
    pub fn next_deadline(&self) -> Option<Instant> {
        self.next_deadline
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.next_deadline.is_none_or(|d| now >= d)
    }

    /// `(rendered, skipped)` tick counts.
    pub fn counts(&self) -> (u64, u64) {
        (self.rendered, self.skipped)
    }

    pub fn tick(&mut self, now: Instant, editor: &mut Editor) -> Result<TickOutcome> {
        self.poll_visibility(now);
        if self.visible {
            self.next_deadline = Some(now + self.timing.frame_interval);
            self.rendered += 1;
            editor.draw_frame()?;
            Ok(TickOutcome::Rendered)
        } else {
            self.next_deadline = Some(now + self.timing.hidden_interval);
            self.skipped += 1;
            Ok(TickOutcome::Skipped)
        }
    }

    fn poll_visibility(&mut self, now: Instant) {
        let due = self
            .last_poll
            .is_none_or(|last| now.saturating_duration_since(last) >= self.timing.visibility_poll);
        if !due {
            return;
        }
        self.last_poll = Some(now);
        let visible = self.probe.is_visible();
        if visible != self.visible {
            if visible {
                log_info!("Render surface visible; resuming frames");
            } else {
                log_info!("Render surface hidden; throttling to {:?}", self.timing.hidden_interval);
            }
            self.visible = visible;
        }
    }
}
