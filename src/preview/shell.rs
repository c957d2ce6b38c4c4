use std::time::{Duration, Instant};

pub const DEFAULT_PREVIEW_HIDE_DELAY: Duration = Duration::from_millis(2_500);
pub const DEFAULT_NARROW_VIEWPORT_WIDTH: f64 = 768.0;

/// Visibility of the small floating result preview shown while cropping on narrow
/// viewports. Each crop interaction re-arms the hide deadline.
#[derive(Debug, Clone)]
pub struct FloatingPreview {
    hide_delay: Duration,
    narrow_width: f64,
    viewport_width: f64,
    visible: bool,
    hide_at: Option<Instant>,
}

impl Default for FloatingPreview {
    fn default() -> Self {
        Self::new(DEFAULT_PREVIEW_HIDE_DELAY, DEFAULT_NARROW_VIEWPORT_WIDTH)
    }
}

impl FloatingPreview {
    pub fn new(hide_delay: Duration, narrow_width: f64) -> Self {
        Self {
            hide_delay,
            narrow_width,
            viewport_width: f64::INFINITY,
            visible: false,
            hide_at: None,
        }
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn hide_at(&self) -> Option<Instant> {
        self.hide_at
    }

    pub fn is_narrow(&self) -> bool {
        self.viewport_width < self.narrow_width
    }

    /// Widening past the threshold hides the preview at once.
    pub fn set_viewport_width(&mut self, width: f64) {
        self.viewport_width = width;
        if !self.is_narrow() && self.visible {
            tracing::debug!(width, "viewport widened; hiding floating preview");
            self.hide();
        }
    }

    /// Called for every crop interaction event. Returns whether the preview is shown.
    pub fn trigger(&mut self, now: Instant) -> bool {
        if !self.is_narrow() {
            return false;
        }
        self.visible = true;
        self.hide_at = Some(now + self.hide_delay);
        true
    }

    pub fn update_visibility(&mut self, now: Instant) {
        if let Some(deadline) = self.hide_at {
            if now >= deadline {
                self.hide();
            }
        }
    }

    fn hide(&mut self) {
        self.visible = false;
        self.hide_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn narrow_preview() -> FloatingPreview {
        let mut preview = FloatingPreview::default();
        preview.set_viewport_width(390.0);
        preview
    }

    #[test]
    fn floating_preview_starts_hidden_on_wide_viewports() {
        let mut preview = FloatingPreview::default();
        assert!(!preview.visible());
        assert!(!preview.is_narrow());

        preview.set_viewport_width(1280.0);
        assert!(!preview.trigger(Instant::now()));
        assert!(!preview.visible());
    }

    #[test]
    fn floating_preview_hides_after_delay() {
        let mut preview = narrow_preview();
        let now = Instant::now();
        assert!(preview.trigger(now));
        assert!(preview.visible());

        preview.update_visibility(now + Duration::from_millis(2_499));
        assert!(preview.visible());

        preview.update_visibility(now + Duration::from_millis(2_500));
        assert!(!preview.visible());
        assert_eq!(preview.hide_at(), None);
    }

    #[test]
    fn floating_preview_deadline_rearms_on_each_trigger() {
        let mut preview = narrow_preview();
        let now = Instant::now();

        preview.trigger(now);
        preview.trigger(now + Duration::from_millis(2_000));
        preview.update_visibility(now + Duration::from_millis(3_000));
        assert!(preview.visible());

        preview.update_visibility(now + Duration::from_millis(4_500));
        assert!(!preview.visible());
    }

    #[test]
    fn widening_viewport_hides_immediately() {
        let mut preview = narrow_preview();
        preview.trigger(Instant::now());
        preview.set_viewport_width(DEFAULT_NARROW_VIEWPORT_WIDTH);
        assert!(!preview.visible());
        assert_eq!(preview.hide_at(), None);
    }
}
