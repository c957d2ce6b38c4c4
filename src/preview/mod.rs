mod shell;

pub use shell::{FloatingPreview, DEFAULT_NARROW_VIEWPORT_WIDTH, DEFAULT_PREVIEW_HIDE_DELAY};
