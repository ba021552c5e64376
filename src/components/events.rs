//! Outbound editor notifications.
//!
//! Listeners subscribe to one [`EventKind`] and are called synchronously, in
//! subscription order, every time an event of that kind is published.

use crate::canvas::Color;
use crate::components::tools::ToolId;

/// Kinds of notification a host can listen for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    ToolChanged,
    ToolSettingsChanged,
    /// Layers or the current layer changed.
    State,
    ForegroundColorChanged,
    BackgroundColorChanged,
}

/// A published notification with its payload.
#[derive(Clone, Debug, PartialEq)]
pub enum EditorEvent {
    ToolChanged(ToolId),
    ToolSettingsChanged(ToolId),
    State,
    ForegroundColorChanged(Color),
    BackgroundColorChanged(Color),
}

impl EditorEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            EditorEvent::ToolChanged(_) => EventKind::ToolChanged,
            EditorEvent::ToolSettingsChanged(_) => EventKind::ToolSettingsChanged,
            EditorEvent::State => EventKind::State,
            EditorEvent::ForegroundColorChanged(_) => EventKind::ForegroundColorChanged,
            EditorEvent::BackgroundColorChanged(_) => EventKind::BackgroundColorChanged,
        }
    }
}

/// Token returned by [`EventBus::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&EditorEvent)>;

#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    listeners: Vec<(SubscriptionId, EventKind, Listener)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, kind: EventKind, listener: impl FnMut(&EditorEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, kind, Box::new(listener)));
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _, _)| *sid != id);
        self.listeners.len() != before
    }

    pub fn publish(&mut self, event: EditorEvent) {
        let kind = event.kind();
        for (_, listener_kind, listener) in &mut self.listeners {
            if *listener_kind == kind {
                listener(&event);
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
