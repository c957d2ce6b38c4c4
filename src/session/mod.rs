use std::path::PathBuf;
use std::time::{Duration, Instant};

use image::{ImageError, RgbaImage};
use thiserror::Error;

use crate::config::AppConfig;
use crate::export::{ExportError, ExportService};
use crate::geometry::{Rect, Size};
use crate::preview::FloatingPreview;
use crate::render::{Composer, FontSize, RenderRequest, SourceImage, TextStyle};
use crate::state::{CropStateMachine, PointerEvent, StateError};
use crate::viewport::fit_within;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("upload is not a recognized image: {reason}")]
    InvalidUpload { reason: String },
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Identifies one upload; decodes carrying an older ticket are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UploadTicket(u64);

#[derive(Debug, Default)]
pub enum ImageResource {
    #[default]
    Empty,
    Pending(UploadTicket),
    Ready(RgbaImage),
    Failed(String),
}

impl ImageResource {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    fn as_source(&self) -> SourceImage<'_> {
        match self {
            Self::Ready(image) => SourceImage::Ready(image),
            Self::Failed(_) => SourceImage::Failed,
            Self::Empty | Self::Pending(_) => SourceImage::Missing,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub output_size: u32,
    pub preview_size: u32,
    pub default_text: String,
    pub preview_hide_delay: Duration,
    pub narrow_viewport_width: f64,
}

impl SessionSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            output_size: config.output_size,
            preview_size: config.preview_size,
            default_text: config.default_text.clone(),
            preview_hide_delay: Duration::from_millis(config.preview_hide_ms),
            narrow_viewport_width: config.narrow_viewport_width,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Decodes upload bytes into an RGBA raster.
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage, ImageError> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// One editing session: the uploaded image, the crop engine, caption style and the
/// outputs derived from them.
#[derive(Debug)]
pub struct Session {
    machine: CropStateMachine,
    image: ImageResource,
    next_ticket: u64,
    container: Size,
    style: TextStyle,
    composer: Composer,
    exporter: ExportService,
    preview: FloatingPreview,
    output_size: u32,
    preview_size: u32,
}

impl Session {
    pub fn new(composer: Composer, exporter: ExportService, settings: SessionSettings) -> Self {
        let mut style = TextStyle::default();
        style.set_text(settings.default_text);
        Self {
            machine: CropStateMachine::new(),
            image: ImageResource::Empty,
            next_ticket: 0,
            container: Size::default(),
            style,
            composer,
            exporter,
            preview: FloatingPreview::new(
                settings.preview_hide_delay,
                settings.narrow_viewport_width,
            ),
            output_size: settings.output_size,
            preview_size: settings.preview_size,
        }
    }

    pub fn machine(&self) -> &CropStateMachine {
        &self.machine
    }

    pub fn image(&self) -> &ImageResource {
        &self.image
    }

    pub fn style(&self) -> &TextStyle {
        &self.style
    }

    pub fn preview(&self) -> &FloatingPreview {
        &self.preview
    }

    /// Current selection in source pixels.
    pub fn selection(&self) -> Option<Rect> {
        self.machine.source_rect()
    }

    /// Validates the upload and marks the image as decoding. Bytes that are not a
    /// recognized image are rejected and leave the current image and selection intact.
    pub fn begin_upload(&mut self, bytes: &[u8]) -> SessionResult<UploadTicket> {
        if let Err(err) = image::guess_format(bytes) {
            tracing::warn!(len = bytes.len(), %err, "rejected upload");
            return Err(SessionError::InvalidUpload {
                reason: err.to_string(),
            });
        }

        self.next_ticket += 1;
        let ticket = UploadTicket(self.next_ticket);
        self.machine.reset();
        self.image = ImageResource::Pending(ticket);
        tracing::info!(?ticket, len = bytes.len(), "upload accepted; decoding");
        Ok(ticket)
    }

    /// Installs a decode result. Returns `false` when the ticket was superseded by a
    /// later upload and the result was dropped.
    pub fn complete_decode(
        &mut self,
        ticket: UploadTicket,
        decoded: Result<RgbaImage, ImageError>,
    ) -> bool {
        if !matches!(self.image, ImageResource::Pending(current) if current == ticket) {
            tracing::debug!(?ticket, "dropping stale decode result");
            return false;
        }

        match decoded {
            Ok(image) => {
                tracing::info!(
                    ?ticket,
                    width = image.width(),
                    height = image.height(),
                    "image decoded"
                );
                self.image = ImageResource::Ready(image);
                if let Err(err) = self.lay_out_image() {
                    tracing::debug!(%err, "decoded image waits for layout");
                }
            }
            Err(err) => {
                tracing::warn!(?ticket, %err, "image decode failed");
                self.image = ImageResource::Failed(err.to_string());
            }
        }
        true
    }

    /// Upload and decode in one step.
    pub fn upload(&mut self, bytes: &[u8]) -> SessionResult<()> {
        let ticket = self.begin_upload(bytes)?;
        self.complete_decode(ticket, decode_image(bytes));
        Ok(())
    }

    /// Records the display container size and re-fits the image into it. Returns the
    /// selection in source pixels when an image is laid out.
    pub fn layout(&mut self, container: Size) -> SessionResult<Option<Rect>> {
        self.container = container;
        if !self.image.is_ready() {
            return Ok(None);
        }
        if container.is_empty() {
            tracing::debug!(?container, "container collapsed; keeping current geometry");
            return Ok(None);
        }
        self.lay_out_image().map(Some)
    }

    /// Width of the whole viewport, which decides whether the floating preview applies.
    pub fn set_viewport_width(&mut self, width: f64) {
        self.preview.set_viewport_width(width);
    }

    /// Forwards pointer input to the crop engine. Input before the image is laid out
    /// is ignored.
    pub fn pointer(&mut self, event: PointerEvent, now: Instant) -> SessionResult<Option<Rect>> {
        if self.machine.transform().is_none() {
            tracing::debug!(?event, "pointer input before layout; ignoring");
            return Ok(None);
        }
        let emitted = self.machine.handle(event)?;
        if matches!(event, PointerEvent::Down { .. }) || emitted.is_some() {
            self.preview.trigger(now);
        }
        Ok(emitted)
    }

    pub fn select_source(&mut self, source: Rect) -> SessionResult<Rect> {
        Ok(self.machine.select_source(source)?)
    }

    /// Advances time-based state such as the floating preview's hide deadline.
    pub fn tick(&mut self, now: Instant) {
        self.preview.update_visibility(now);
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.style.set_text(text);
    }

    pub fn set_font_size(&mut self, font_size: FontSize) {
        self.style.set_font_size(font_size);
    }

    pub fn set_vertical_offset(&mut self, vertical_offset: u32) {
        self.style.set_vertical_offset(vertical_offset);
    }

    pub fn render(&self) -> RgbaImage {
        self.composer.render(&self.render_request())
    }

    /// The same frame at the floating preview's size.
    pub fn render_preview(&self) -> RgbaImage {
        self.composer
            .render(&self.render_request().scaled_to(self.preview_size))
    }

    pub fn can_export(&self) -> bool {
        self.image.is_ready()
            && self
                .selection()
                .is_some_and(|selection| !selection.is_degenerate())
    }

    /// Writes `meme.png`. Without an image or selection there is nothing to export and
    /// `Ok(None)` is returned.
    pub fn export(&self) -> SessionResult<Option<PathBuf>> {
        if !self.can_export() {
            tracing::debug!("export requested without a ready image; ignoring");
            return Ok(None);
        }
        Ok(Some(self.exporter.save(&self.render())?))
    }

    fn render_request(&self) -> RenderRequest<'_> {
        RenderRequest {
            output_size: self.output_size,
            ..RenderRequest::new(self.image.as_source(), self.selection(), &self.style)
        }
    }

    fn lay_out_image(&mut self) -> SessionResult<Rect> {
        let ImageResource::Ready(image) = &self.image else {
            return Err(StateError::NotLaidOut.into());
        };
        let natural = Size::from_pixels(image.width(), image.height());
        let rendered = fit_within(natural, self.container);
        let selection = if self.machine.transform().is_some() {
            self.machine.on_layout_change(rendered, self.container)?
        } else {
            self.machine.on_image_load(natural, rendered, self.container)?
        };
        tracing::debug!(?rendered, ?selection, "image fitted into container");
        Ok(selection)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::export::encode_png;
    use crate::geometry::Point;
    use crate::render::BlockFace;
    use crate::state::{InteractionKind, InteractionMode};
    use image::Rgba;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba([40, 90, 200, 255]));
        encode_png(&image).expect("png should encode")
    }

    fn session_in(dir: &std::path::Path) -> Session {
        Session::new(
            Composer::new(Arc::new(BlockFace)),
            ExportService::with_dir(dir),
            SessionSettings::default(),
        )
    }

    fn laid_out_session(dir: &std::path::Path) -> Session {
        let mut session = session_in(dir);
        session
            .layout(Size::new(400.0, 400.0))
            .expect("empty layout should succeed");
        session.upload(&png(1000, 800)).expect("upload should succeed");
        session
    }

    #[test]
    fn upload_after_layout_creates_default_selection() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let session = laid_out_session(dir.path());

        assert!(session.image().is_ready());
        assert_eq!(
            session.machine().crop_rect(),
            Some(Rect::square(72.0, 72.0, 256.0))
        );
        assert!(session.can_export());
    }

    #[test]
    fn invalid_upload_keeps_current_image_and_selection() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let mut session = laid_out_session(dir.path());
        let before = session.selection();

        let error = session
            .upload(b"definitely not an image")
            .expect_err("garbage should be rejected");
        assert!(matches!(error, SessionError::InvalidUpload { .. }));
        assert!(session.image().is_ready());
        assert_eq!(session.selection(), before);
    }

    #[test]
    fn stale_decode_results_are_dropped() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let mut session = session_in(dir.path());
        session
            .layout(Size::new(400.0, 400.0))
            .expect("empty layout should succeed");

        let first = session.begin_upload(&png(10, 10)).expect("first upload");
        let second = session.begin_upload(&png(300, 100)).expect("second upload");
        assert_ne!(first, second);

        let late = RgbaImage::new(10, 10);
        assert!(!session.complete_decode(first, Ok(late)));
        assert!(matches!(session.image(), ImageResource::Pending(ticket) if *ticket == second));

        assert!(session.complete_decode(second, decode_image(&png(300, 100))));
        let natural = session
            .machine()
            .transform()
            .expect("transform should exist")
            .natural();
        assert_eq!(natural, Size::new(300.0, 100.0));
    }

    #[test]
    fn decode_failure_is_shown_not_exported() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let mut session = session_in(dir.path());
        let mut truncated = png(20, 20);
        truncated.truncate(40);

        session.upload(&truncated).expect("png signature should pass validation");
        assert!(matches!(session.image(), ImageResource::Failed(_)));
        assert!(!session.can_export());
        assert_eq!(session.export().expect("export should not fail"), None);
        assert!(!dir.path().join("meme.png").exists());
    }

    #[test]
    fn decoded_image_waits_for_container_layout() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let mut session = session_in(dir.path());
        session.upload(&png(100, 100)).expect("upload should succeed");
        assert!(session.selection().is_none());
        assert!(!session.can_export());

        let selection = session
            .layout(Size::new(200.0, 200.0))
            .expect("layout should succeed")
            .expect("selection should exist");
        assert_eq!(selection, Rect::square(10.0, 10.0, 80.0));
    }

    #[test]
    fn pointer_input_before_layout_is_ignored() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let mut session = session_in(dir.path());
        let now = Instant::now();

        let emitted = session
            .pointer(
                PointerEvent::Down {
                    position: Point::new(10.0, 10.0),
                    kind: InteractionKind::Drag,
                },
                now,
            )
            .expect("early pointer input should not fail");
        assert_eq!(emitted, None);
        assert_eq!(session.machine().mode(), InteractionMode::Idle);
        assert!(!session.machine().captures_pointer());

        session.upload(&png(100, 100)).expect("upload should succeed");
        let emitted = session
            .pointer(
                PointerEvent::Move {
                    position: Point::new(20.0, 20.0),
                },
                now,
            )
            .expect("pointer input awaiting layout should not fail");
        assert_eq!(emitted, None);
    }

    #[test]
    fn collapsed_container_keeps_current_geometry() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let mut session = session_in(dir.path());
        session.upload(&png(100, 100)).expect("upload should succeed");
        session
            .layout(Size::new(200.0, 200.0))
            .expect("layout should succeed");
        let before = session.selection();
        let crop_before = session.machine().crop_rect();

        let collapsed = session
            .layout(Size::new(0.0, 0.0))
            .expect("collapsed container should not fail");
        assert_eq!(collapsed, None);
        assert_eq!(session.selection(), before);
        assert_eq!(session.machine().crop_rect(), crop_before);
        assert!(session.can_export());
    }

    #[test]
    fn pointer_drag_moves_selection_and_arms_narrow_preview() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let mut session = laid_out_session(dir.path());
        session.set_viewport_width(375.0);
        let now = Instant::now();

        session
            .pointer(
                PointerEvent::Down {
                    position: Point::new(100.0, 100.0),
                    kind: InteractionKind::Drag,
                },
                now,
            )
            .expect("drag should start");
        let emitted = session
            .pointer(
                PointerEvent::Move {
                    position: Point::new(110.0, 100.0),
                },
                now,
            )
            .expect("move should succeed");
        assert!(emitted.is_some());
        assert_eq!(session.machine().mode(), InteractionMode::Dragging);
        assert!(session.preview().visible());

        session
            .pointer(PointerEvent::Up, now)
            .expect("release should succeed");
        session.tick(now + Duration::from_secs(3));
        assert!(!session.preview().visible());
        assert_eq!(session.render_preview().dimensions(), (192, 192));
    }

    #[test]
    fn export_writes_fixed_name_when_ready() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let mut session = laid_out_session(dir.path());
        session.set_text("Exported");
        session.set_font_size(FontSize::Large);
        session.set_vertical_offset(500);

        let path = session
            .export()
            .expect("export should succeed")
            .expect("export should produce a file");
        assert_eq!(path, dir.path().join("meme.png"));
        assert_eq!(session.style().vertical_offset(), 100);
        let written = image::open(&path).expect("export should decode").to_rgba8();
        assert_eq!(written.dimensions(), (512, 512));
    }

    #[test]
    fn empty_session_renders_placeholder_and_skips_export() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let session = session_in(dir.path());
        assert!(!session.can_export());
        assert_eq!(session.export().expect("export should not fail"), None);
        assert_eq!(session.render().dimensions(), (512, 512));
    }
}
