use std::sync::Arc;

use image::{imageops, RgbaImage};

use crate::geometry::{Color, Rect};

use super::raster::{blend_mask, fill, CoverageMask};
use super::style::TextStyle;
use super::text::{layout_caption, CaptionLayout};
use super::typeface::Typeface;

pub const DEFAULT_OUTPUT_SIZE: u32 = 512;
pub const DEFAULT_BACKGROUND: Color = Color::BLACK;
pub const TEXT_FILL: Color = Color::WHITE;
pub const TEXT_STROKE: Color = Color::BLACK;
pub const PLACEHOLDER_COLOR: Color = Color::new(0x9C, 0xA3, 0xAF);
pub const PLACEHOLDER_FONT_SIZE: f32 = 24.0;
pub const EMPTY_LABEL: &str = "Upload an image and select an area";
pub const ERROR_LABEL: &str = "Error loading image";

/// What the renderer has to work with for the current frame.
#[derive(Debug, Clone, Copy)]
pub enum SourceImage<'a> {
    /// Nothing uploaded yet, or still decoding.
    Missing,
    Failed,
    Ready(&'a RgbaImage),
}

#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    pub source: SourceImage<'a>,
    /// Selection in source pixels.
    pub crop: Option<Rect>,
    pub style: &'a TextStyle,
    pub output_size: u32,
    /// Multiplier applied to font size and vertical offset; 1.0 for the full-size output.
    pub text_scale: f32,
}

impl<'a> RenderRequest<'a> {
    pub fn new(source: SourceImage<'a>, crop: Option<Rect>, style: &'a TextStyle) -> Self {
        Self {
            source,
            crop,
            style,
            output_size: DEFAULT_OUTPUT_SIZE,
            text_scale: 1.0,
        }
    }

    /// The same frame at another output size, with text shrunk proportionally.
    pub fn scaled_to(&self, output_size: u32) -> Self {
        Self {
            output_size,
            text_scale: self.text_scale * output_size as f32 / self.output_size.max(1) as f32,
            ..*self
        }
    }
}

/// Paints the captioned crop. Identical requests yield identical pixels.
#[derive(Clone)]
pub struct Composer {
    face: Arc<dyn Typeface + Send + Sync>,
    background: Color,
}

impl std::fmt::Debug for Composer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Composer")
            .field("background", &self.background)
            .finish_non_exhaustive()
    }
}

impl Composer {
    pub fn new(face: Arc<dyn Typeface + Send + Sync>) -> Self {
        Self {
            face,
            background: DEFAULT_BACKGROUND,
        }
    }

    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    pub fn face(&self) -> &dyn Typeface {
        self.face.as_ref()
    }

    pub fn render(&self, request: &RenderRequest<'_>) -> RgbaImage {
        let size = request.output_size.max(1);
        let mut canvas = RgbaImage::new(size, size);
        fill(&mut canvas, self.background);

        let (image, crop) = match (request.source, request.crop) {
            (SourceImage::Ready(image), Some(crop)) if !crop.is_degenerate() => (image, crop),
            (SourceImage::Failed, _) => {
                self.draw_placeholder(&mut canvas, ERROR_LABEL, request.text_scale);
                return canvas;
            }
            _ => {
                self.draw_placeholder(&mut canvas, EMPTY_LABEL, request.text_scale);
                return canvas;
            }
        };

        let Some(region) = scaled_region(image, crop, size) else {
            self.draw_placeholder(&mut canvas, EMPTY_LABEL, request.text_scale);
            return canvas;
        };
        imageops::replace(&mut canvas, &region, 0, 0);

        let layout = layout_caption(
            self.face(),
            &request.style.text,
            request.style.font_size.px() as f32 * request.text_scale,
            request.style.vertical_offset() as f32 * request.text_scale,
            size,
            size,
        );
        self.draw_caption(&mut canvas, &layout);
        canvas
    }

    fn draw_caption(&self, canvas: &mut RgbaImage, layout: &CaptionLayout) {
        for line in &layout.lines {
            let mut mask = CoverageMask::new(canvas.width(), canvas.height());
            self.face.rasterize(
                &line.text,
                layout.font_size,
                layout.center_x,
                line.bottom_y,
                &mut mask,
            );
            let outline = mask.dilate(layout.stroke_width / 2.0);
            blend_mask(canvas, &outline, TEXT_STROKE);
            blend_mask(canvas, &mask, TEXT_FILL);
        }
    }

    fn draw_placeholder(&self, canvas: &mut RgbaImage, label: &str, text_scale: f32) {
        let font_size = PLACEHOLDER_FONT_SIZE * text_scale.max(0.25);
        let mut mask = CoverageMask::new(canvas.width(), canvas.height());
        self.face.rasterize(
            label,
            font_size,
            canvas.width() as f32 / 2.0,
            (canvas.height() as f32 + font_size) / 2.0,
            &mut mask,
        );
        blend_mask(canvas, &mask, PLACEHOLDER_COLOR);
    }
}

/// Snaps the source selection to whole pixels inside the image and resamples it to
/// fill a `size`×`size` surface.
fn scaled_region(image: &RgbaImage, crop: Rect, size: u32) -> Option<RgbaImage> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return None;
    }
    let left = (crop.x.round().max(0.0) as u32).min(width - 1);
    let top = (crop.y.round().max(0.0) as u32).min(height - 1);
    let right = (crop.right().round().max(0.0) as u32).clamp(left + 1, width);
    let bottom = (crop.bottom().round().max(0.0) as u32).clamp(top + 1, height);

    let region = imageops::crop_imm(image, left, top, right - left, bottom - top).to_image();
    Some(imageops::resize(
        &region,
        size,
        size,
        imageops::FilterType::Triangle,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::style::FontSize;
    use crate::render::typeface::BlockFace;
    use image::Rgba;

    fn composer() -> Composer {
        Composer::new(Arc::new(BlockFace))
    }

    fn quadrant_image() -> RgbaImage {
        RgbaImage::from_fn(200, 200, |x, y| match (x < 100, y < 100) {
            (true, true) => Rgba([255, 0, 0, 255]),
            (false, true) => Rgba([0, 255, 0, 255]),
            (true, false) => Rgba([0, 0, 255, 255]),
            (false, false) => Rgba([255, 255, 0, 255]),
        })
    }

    #[test]
    fn missing_image_renders_placeholder_on_background() {
        let style = TextStyle::default();
        let canvas = composer().render(&RenderRequest::new(SourceImage::Missing, None, &style));

        assert_eq!(canvas.dimensions(), (DEFAULT_OUTPUT_SIZE, DEFAULT_OUTPUT_SIZE));
        assert_eq!(canvas.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(256, 256), &PLACEHOLDER_COLOR.to_rgba());
        assert_ne!(canvas.get_pixel(256, 490), &TEXT_FILL.to_rgba());
    }

    #[test]
    fn failed_decode_and_empty_selection_use_distinct_labels() {
        let style = TextStyle::default();
        let image = quadrant_image();
        let failed = composer().render(&RenderRequest::new(SourceImage::Failed, None, &style));
        let degenerate = composer().render(&RenderRequest::new(
            SourceImage::Ready(&image),
            Some(Rect::square(10.0, 10.0, 0.0)),
            &style,
        ));
        assert_ne!(failed.as_raw(), degenerate.as_raw());
    }

    #[test]
    fn crop_region_fills_the_whole_surface() {
        let image = quadrant_image();
        let style = TextStyle::new("", FontSize::Medium, 30);
        let canvas = composer().render(&RenderRequest::new(
            SourceImage::Ready(&image),
            Some(Rect::square(100.0, 100.0, 100.0)),
            &style,
        ));

        for (x, y) in [(0, 0), (511, 0), (0, 511), (511, 511), (256, 256)] {
            assert_eq!(canvas.get_pixel(x, y), &Rgba([255, 255, 0, 255]));
        }
    }

    #[test]
    fn caption_is_filled_white_over_black_outline_at_the_offset_line() {
        let image = RgbaImage::from_pixel(64, 64, Rgba([0, 128, 0, 255]));
        let style = TextStyle::new("Hi", FontSize::Medium, 30);
        let canvas = composer().render(&RenderRequest::new(
            SourceImage::Ready(&image),
            Some(Rect::square(0.0, 0.0, 64.0)),
            &style,
        ));

        // Block glyphs span y in [482 - 40.8, 482 - 10.2) around x = 256.
        assert_eq!(canvas.get_pixel(256, 455), &TEXT_FILL.to_rgba());
        // Just outside the fill the dilated outline shows through.
        let left_edge = (256.0_f32 - 51.0 * 0.6).round() as u32;
        assert_eq!(canvas.get_pixel(left_edge - 1, 455), &TEXT_STROKE.to_rgba());
        assert_eq!(canvas.get_pixel(20, 455), &Rgba([0, 128, 0, 255]));
        assert_eq!(canvas.get_pixel(256, 100), &Rgba([0, 128, 0, 255]));
    }

    #[test]
    fn identical_requests_are_byte_identical() {
        let image = quadrant_image();
        let style = TextStyle::new("Deterministic output", FontSize::Large, 55);
        let request = RenderRequest::new(
            SourceImage::Ready(&image),
            Some(Rect::square(12.5, 30.25, 150.0)),
            &style,
        );
        let first = composer().render(&request);
        let second = composer().render(&request);
        assert_eq!(first.as_raw(), second.as_raw());
    }

    #[test]
    fn secondary_preview_uses_same_contract_at_smaller_size() {
        let image = quadrant_image();
        let style = TextStyle::default();
        let request = RenderRequest::new(
            SourceImage::Ready(&image),
            Some(Rect::square(0.0, 0.0, 100.0)),
            &style,
        );
        let preview = request.scaled_to(128);
        assert_eq!(preview.output_size, 128);
        assert_eq!(preview.text_scale, 0.25);

        let canvas = composer().render(&preview);
        assert_eq!(canvas.dimensions(), (128, 128));
        assert_eq!(canvas.get_pixel(2, 2), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn selection_overhanging_the_image_is_bounded() {
        let image = quadrant_image();
        let region = scaled_region(&image, Rect::square(150.0, 150.0, 100.000001), 32)
            .expect("region should exist");
        assert_eq!(region.dimensions(), (32, 32));
        assert_eq!(region.get_pixel(16, 16), &Rgba([255, 255, 0, 255]));
    }
}
