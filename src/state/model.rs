use crate::geometry::Point;

use super::event::InteractionKind;

/// Smallest side, in display pixels, a selection may shrink to.
pub const MIN_CROP_SIZE: f64 = 50.0;

/// Side of the default selection relative to the shorter rendered dimension.
pub const DEFAULT_CROP_RATIO: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionMode {
    #[default]
    Idle,
    Dragging,
    Resizing,
}

impl InteractionMode {
    pub const fn is_idle(self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// Held for the lifetime of one drag or resize. While present the host must route
/// move/up/cancel to the machine and suppress default pointer and scroll handling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerCapture {
    pub kind: InteractionKind,
    pub last: Point,
}
