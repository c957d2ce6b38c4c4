use super::typeface::Typeface;

pub const LINE_HEIGHT_FACTOR: f32 = 1.2;
pub const MAX_WIDTH_RATIO: f32 = 0.9;
pub const STROKE_WIDTH_DIVISOR: f32 = 15.0;

/// Greedy, character-granular line breaking. A character that would push a non-empty
/// line past `max_width` starts the next line, so scripts without spaces wrap too.
/// Empty input yields no lines.
pub fn wrap_text(text: &str, max_width: f32, mut measure: impl FnMut(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();

    for ch in text.chars() {
        let mut candidate = line.clone();
        candidate.push(ch);
        if measure(&candidate) > max_width && !line.is_empty() {
            lines.push(std::mem::take(&mut line));
            line.push(ch);
        } else {
            line = candidate;
        }
    }

    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptionLine {
    pub text: String,
    /// Bottom of the line box in output pixels.
    pub bottom_y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptionLayout {
    pub font_size: f32,
    pub line_height: f32,
    pub stroke_width: f32,
    pub center_x: f32,
    pub lines: Vec<CaptionLine>,
}

/// Wraps `text` for a `width`×`height` surface and anchors it from the bottom: the last
/// line sits `vertical_offset` above the bottom edge and earlier lines stack upward.
pub fn layout_caption(
    face: &dyn Typeface,
    text: &str,
    font_size: f32,
    vertical_offset: f32,
    width: u32,
    height: u32,
) -> CaptionLayout {
    let max_width = width as f32 * MAX_WIDTH_RATIO;
    let wrapped = wrap_text(text, max_width, |candidate| face.measure(candidate, font_size));
    let line_height = font_size * LINE_HEIGHT_FACTOR;
    let anchor = height as f32 - vertical_offset;
    let count = wrapped.len();

    let lines = wrapped
        .into_iter()
        .enumerate()
        .map(|(index, text)| CaptionLine {
            text,
            bottom_y: anchor - (count - 1 - index) as f32 * line_height,
        })
        .collect();

    CaptionLayout {
        font_size,
        line_height,
        stroke_width: font_size / STROKE_WIDTH_DIVISOR,
        center_x: width as f32 / 2.0,
        lines,
    }
}
