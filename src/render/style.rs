/// Caption sizes offered to the user, in output pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl FontSize {
    pub const ALL: [FontSize; 3] = [Self::Small, Self::Medium, Self::Large];

    pub const fn px(self) -> u32 {
        match self {
            Self::Small => 42,
            Self::Medium => 51,
            Self::Large => 64,
        }
    }

    pub fn from_px(px: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|size| size.px() == px)
    }
}

pub const MIN_VERTICAL_OFFSET: u32 = 10;
pub const MAX_VERTICAL_OFFSET: u32 = 100;
pub const DEFAULT_VERTICAL_OFFSET: u32 = 30;
pub const DEFAULT_CAPTION: &str = "When the crop is just right";

/// Caption parameters owned by the surrounding UI and read by the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextStyle {
    pub text: String,
    pub font_size: FontSize,
    vertical_offset: u32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self::new(DEFAULT_CAPTION, FontSize::default(), DEFAULT_VERTICAL_OFFSET)
    }
}

impl TextStyle {
    pub fn new(text: impl Into<String>, font_size: FontSize, vertical_offset: u32) -> Self {
        Self {
            text: text.into(),
            font_size,
            vertical_offset: clamp_vertical_offset(vertical_offset),
        }
    }

    pub fn vertical_offset(&self) -> u32 {
        self.vertical_offset
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn set_font_size(&mut self, font_size: FontSize) {
        self.font_size = font_size;
    }

    pub fn set_vertical_offset(&mut self, vertical_offset: u32) {
        self.vertical_offset = clamp_vertical_offset(vertical_offset);
    }
}

const fn clamp_vertical_offset(offset: u32) -> u32 {
    if offset < MIN_VERTICAL_OFFSET {
        MIN_VERTICAL_OFFSET
    } else if offset > MAX_VERTICAL_OFFSET {
        MAX_VERTICAL_OFFSET
    } else {
        offset
    }
}
