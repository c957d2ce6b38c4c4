mod compose;
mod raster;
mod style;
mod text;
mod typeface;

pub use compose::{
    Composer, RenderRequest, SourceImage, DEFAULT_BACKGROUND, DEFAULT_OUTPUT_SIZE, EMPTY_LABEL,
    ERROR_LABEL, TEXT_FILL, TEXT_STROKE,
};
pub use raster::CoverageMask;
pub use style::{
    FontSize, TextStyle, DEFAULT_CAPTION, DEFAULT_VERTICAL_OFFSET, MAX_VERTICAL_OFFSET,
    MIN_VERTICAL_OFFSET,
};
pub use text::{layout_caption, wrap_text, CaptionLayout, CaptionLine};
pub use typeface::{FontError, FontResult, GlyphFace, Typeface};

#[cfg(test)]
pub(crate) use typeface::BlockFace;
