use crate::geometry::Point;

use super::model::InteractionMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    Drag,
    Resize,
}

impl InteractionKind {
    pub const fn mode(self) -> InteractionMode {
        match self {
            Self::Drag => InteractionMode::Dragging,
            Self::Resize => InteractionMode::Resizing,
        }
    }
}

/// Edge events that drive mode transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionEvent {
    Start(InteractionKind),
    End,
    Cancel,
}

/// Raw pointer input as delivered by a host surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { position: Point, kind: InteractionKind },
    Move { position: Point },
    Up,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeTransition {
    pub from: InteractionMode,
    pub event: InteractionEvent,
    pub to: InteractionMode,
}

impl ModeTransition {
    pub const fn new(from: InteractionMode, event: InteractionEvent, to: InteractionMode) -> Self {
        Self { from, event, to }
    }
}
