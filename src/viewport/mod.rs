//! Mapping between display space (the image as laid out inside its container) and
//! source space (the decoded image's native pixel grid).

use crate::geometry::{Point, Rect, Size};

/// Aspect-preserving fit of `natural` inside `container`.
pub fn fit_within(natural: Size, container: Size) -> Size {
    if natural.is_empty() || container.is_empty() {
        return Size::default();
    }
    let scale = (container.width / natural.width).min(container.height / natural.height);
    Size::new(natural.width * scale, natural.height * scale)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayGeometry {
    pub rendered: Size,
    pub container: Size,
}

impl DisplayGeometry {
    pub const fn new(rendered: Size, container: Size) -> Self {
        Self {
            rendered,
            container,
        }
    }

    /// Lays out `natural` centered inside `container`.
    pub fn fitted(natural: Size, container: Size) -> Self {
        Self::new(fit_within(natural, container), container)
    }

    pub fn offset(&self) -> Point {
        Point::new(
            (self.container.width - self.rendered.width) / 2.0,
            (self.container.height - self.rendered.height) / 2.0,
        )
    }

    /// Bounding box of the rendered image in container coordinates.
    pub fn image_bounds(&self) -> Rect {
        let offset = self.offset();
        Rect::new(
            offset.x,
            offset.y,
            self.rendered.width,
            self.rendered.height,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactors {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateTransform {
    natural: Size,
    geometry: DisplayGeometry,
    scale: ScaleFactors,
}

impl CoordinateTransform {
    /// Returns `None` while the image has no rendered extent; the transform is undefined then.
    pub fn new(natural: Size, geometry: DisplayGeometry) -> Option<Self> {
        if geometry.rendered.is_empty() || natural.is_empty() {
            return None;
        }
        let scale = ScaleFactors {
            x: natural.width / geometry.rendered.width,
            y: natural.height / geometry.rendered.height,
        };
        if !(scale.x.is_finite() && scale.y.is_finite()) {
            return None;
        }
        Some(Self {
            natural,
            geometry,
            scale,
        })
    }

    pub fn natural(&self) -> Size {
        self.natural
    }

    pub fn geometry(&self) -> DisplayGeometry {
        self.geometry
    }

    pub fn scale(&self) -> ScaleFactors {
        self.scale
    }

    pub fn offset(&self) -> Point {
        self.geometry.offset()
    }

    pub fn image_bounds(&self) -> Rect {
        self.geometry.image_bounds()
    }

    pub fn to_source(&self, display: Rect) -> Rect {
        let offset = self.offset();
        Rect::new(
            (display.x - offset.x) * self.scale.x,
            (display.y - offset.y) * self.scale.y,
            display.width * self.scale.x,
            display.height * self.scale.y,
        )
    }

    pub fn to_display(&self, source: Rect) -> Rect {
        let offset = self.offset();
        Rect::new(
            source.x / self.scale.x + offset.x,
            source.y / self.scale.y + offset.y,
            source.width / self.scale.x,
            source.height / self.scale.y,
        )
    }
}
