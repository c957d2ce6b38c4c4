use crate::geometry::{clamp_span, Point, Rect, Size};
use crate::viewport::{CoordinateTransform, DisplayGeometry};

use super::error::{StateError, StateResult};
use super::event::{InteractionEvent, InteractionKind, ModeTransition, PointerEvent};
use super::model::{InteractionMode, PointerCapture, DEFAULT_CROP_RATIO, MIN_CROP_SIZE};

/// Owns the square selection in display space and moves it under pointer input.
#[derive(Debug, Default)]
pub struct CropStateMachine {
    mode: InteractionMode,
    transform: Option<CoordinateTransform>,
    crop: Option<Rect>,
    capture: Option<PointerCapture>,
}

impl CropStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn transform(&self) -> Option<&CoordinateTransform> {
        self.transform.as_ref()
    }

    /// Current selection in display space.
    pub fn crop_rect(&self) -> Option<Rect> {
        self.crop
    }

    /// Current selection in source space.
    pub fn source_rect(&self) -> Option<Rect> {
        let transform = self.transform.as_ref()?;
        self.crop.map(|crop| transform.to_source(crop))
    }

    pub fn captures_pointer(&self) -> bool {
        self.capture.is_some()
    }

    pub fn next_mode(&self, event: InteractionEvent) -> Option<InteractionMode> {
        use InteractionEvent::*;
        match (self.mode, event) {
            (InteractionMode::Idle, Start(kind)) => Some(kind.mode()),
            (_, End | Cancel) => Some(InteractionMode::Idle),
            (InteractionMode::Dragging | InteractionMode::Resizing, Start(_)) => None,
        }
    }

    pub fn transition(&mut self, event: InteractionEvent) -> StateResult<ModeTransition> {
        tracing::debug!(from = ?self.mode, event = ?event, "request interaction transition");
        let next = self.next_mode(event).ok_or_else(|| {
            let from = self.mode;
            tracing::warn!(from = ?from, event = ?event, "invalid interaction transition requested");
            StateError::InvalidTransition { from, event }
        })?;

        let record = ModeTransition::new(self.mode, event, next);
        self.mode = next;
        Ok(record)
    }

    /// Installs a freshly laid out image and resets the selection to the default square.
    pub fn on_image_load(
        &mut self,
        natural: Size,
        rendered: Size,
        container: Size,
    ) -> StateResult<Rect> {
        let transform =
            CoordinateTransform::new(natural, DisplayGeometry::new(rendered, container))
                .ok_or(StateError::NotLaidOut)?;
        self.release(InteractionEvent::Cancel);

        let crop = default_crop(transform.image_bounds());
        tracing::debug!(?crop, scale = ?transform.scale(), "image laid out");
        self.transform = Some(transform);
        self.crop = Some(crop);
        Ok(transform.to_source(crop))
    }

    /// Re-derives the transform after the container changed size. The selected source
    /// region is preserved and mapped into the new display space.
    pub fn on_layout_change(&mut self, rendered: Size, container: Size) -> StateResult<Rect> {
        let (previous, crop) = self
            .transform
            .zip(self.crop)
            .ok_or(StateError::NotLaidOut)?;
        let transform = CoordinateTransform::new(
            previous.natural(),
            DisplayGeometry::new(rendered, container),
        )
        .ok_or(StateError::NotLaidOut)?;
        self.release(InteractionEvent::Cancel);

        let next = fit_square(transform.to_display(previous.to_source(crop)), &transform);
        self.transform = Some(transform);
        self.crop = Some(next);
        Ok(transform.to_source(next))
    }

    /// Places the selection from source coordinates. The rectangle is squared on its
    /// shorter side and clamped into the image like any pointer-driven change.
    pub fn select_source(&mut self, source: Rect) -> StateResult<Rect> {
        let transform = self.transform.ok_or(StateError::NotLaidOut)?;
        if !self.mode.is_idle() {
            return Err(StateError::InvalidTransition {
                from: self.mode,
                event: InteractionEvent::Start(InteractionKind::Resize),
            });
        }
        let next = fit_square(transform.to_display(source), &transform);
        tracing::debug!(?source, display = ?next, "selection placed from source coordinates");
        self.crop = Some(next);
        Ok(transform.to_source(next))
    }

    /// Begins a drag or resize. A start while another interaction is active is rejected
    /// and leaves that interaction untouched.
    pub fn on_interaction_start(
        &mut self,
        pointer: Point,
        kind: InteractionKind,
    ) -> StateResult<()> {
        if self.transform.is_none() || self.crop.is_none() {
            return Err(StateError::NotLaidOut);
        }
        self.transition(InteractionEvent::Start(kind))?;
        self.capture = Some(PointerCapture {
            kind,
            last: pointer,
        });
        Ok(())
    }

    /// Applies the pointer delta since the previous event and returns the updated
    /// selection in source space, or `None` when no interaction is active.
    pub fn on_interaction_move(&mut self, pointer: Point) -> Option<Rect> {
        let capture = self.capture.as_mut()?;
        let transform = self.transform?;
        let current = self.crop?;
        let bounds = transform.image_bounds();
        let delta = pointer.delta_from(capture.last);

        let mut next = current;
        match capture.kind {
            InteractionKind::Drag => {
                next.x += delta.x;
                next.y += delta.y;
            }
            InteractionKind::Resize => {
                let growth = delta.x.max(delta.y);
                let max_side = (bounds.right() - next.x).min(bounds.bottom() - next.y);
                let side = clamp_span(next.width + growth, min_side(&bounds), max_side);
                next.width = side;
                next.height = side;
            }
        }
        let next = clamp_into(next, &bounds);

        capture.last = pointer;
        self.crop = Some(next);
        Some(transform.to_source(next))
    }

    pub fn on_interaction_end(&mut self) {
        self.release(InteractionEvent::End);
    }

    pub fn on_interaction_cancel(&mut self) {
        self.release(InteractionEvent::Cancel);
    }

    /// Routes a raw pointer event; returns the emitted source selection for moves.
    pub fn handle(&mut self, event: PointerEvent) -> StateResult<Option<Rect>> {
        match event {
            PointerEvent::Down { position, kind } => {
                self.on_interaction_start(position, kind)?;
                Ok(None)
            }
            PointerEvent::Move { position } => Ok(self.on_interaction_move(position)),
            PointerEvent::Up => {
                self.on_interaction_end();
                Ok(None)
            }
            PointerEvent::Cancel => {
                self.on_interaction_cancel();
                Ok(None)
            }
        }
    }

    /// Drops the image and selection entirely, e.g. when a new upload starts.
    pub fn reset(&mut self) {
        self.release(InteractionEvent::Cancel);
        self.transform = None;
        self.crop = None;
    }

    fn release(&mut self, event: InteractionEvent) {
        if let Ok(record) = self.transition(event) {
            if record.from != record.to {
                tracing::debug!(from = ?record.from, "interaction finished");
            }
        }
        self.capture = None;
    }
}

/// Images rendered smaller than the minimum allow a selection as large as they are.
fn min_side(bounds: &Rect) -> f64 {
    MIN_CROP_SIZE.min(bounds.width.min(bounds.height))
}

fn default_crop(bounds: Rect) -> Rect {
    let shorter = bounds.width.min(bounds.height);
    let side = clamp_span(shorter * DEFAULT_CROP_RATIO, min_side(&bounds), shorter);
    Rect::square(
        bounds.x + (bounds.width - side) / 2.0,
        bounds.y + (bounds.height - side) / 2.0,
        side,
    )
}

/// Squares `display` on its shorter side and pulls it inside the image box.
fn fit_square(display: Rect, transform: &CoordinateTransform) -> Rect {
    let bounds = transform.image_bounds();
    let side = clamp_span(
        display.width.min(display.height),
        min_side(&bounds),
        bounds.width.min(bounds.height),
    );
    clamp_into(Rect::square(display.x, display.y, side), &bounds)
}

fn clamp_into(rect: Rect, bounds: &Rect) -> Rect {
    Rect {
        x: clamp_span(rect.x, bounds.x, bounds.right() - rect.width),
        y: clamp_span(rect.y, bounds.y, bounds.bottom() - rect.height),
        ..rect
    }
}

#[cfg(test)]
impl CropStateMachine {
    fn with_crop(natural: Size, container: Size, crop: Rect) -> Self {
        let mut machine = Self::new();
        let geometry = DisplayGeometry::fitted(natural, container);
        machine
            .on_image_load(natural, geometry.rendered, container)
            .expect("image should lay out");
        machine.crop = Some(crop);
        machine
    }
}
