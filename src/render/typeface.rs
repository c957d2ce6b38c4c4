use std::fs;
use std::path::{Path, PathBuf};

use ab_glyph::{point, Font, FontArc, FontVec, GlyphId, ScaleFont};
use fontdb::{Database, Family, Query, Source, Weight};
use thiserror::Error;

use super::raster::CoverageMask;

#[derive(Debug, Error)]
pub enum FontError {
    #[error("failed to read font file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode font data from {origin}")]
    Decode { origin: String },
    #[error("no usable font found among {families:?} or installed system faces")]
    NotFound { families: Vec<String> },
}

pub type FontResult<T> = std::result::Result<T, FontError>;

/// Measures and rasterizes single lines of caption text.
pub trait Typeface {
    /// Advance width of `text` at `size` pixels.
    fn measure(&self, text: &str, size: f32) -> f32;

    /// Draws `text` horizontally centered on `center_x` with the bottom of its line box
    /// at `bottom_y`.
    fn rasterize(
        &self,
        text: &str,
        size: f32,
        center_x: f32,
        bottom_y: f32,
        mask: &mut CoverageMask,
    );
}

/// Outline font backed by `ab_glyph`.
#[derive(Clone)]
pub struct GlyphFace {
    font: FontArc,
}

impl std::fmt::Debug for GlyphFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlyphFace").finish_non_exhaustive()
    }
}

impl GlyphFace {
    pub fn new(font: FontArc) -> Self {
        Self { font }
    }

    pub fn from_file(path: &Path) -> FontResult<Self> {
        let data = fs::read(path).map_err(|source| FontError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        FontArc::try_from_vec(data)
            .map(Self::new)
            .map_err(|_| FontError::Decode {
                origin: path.display().to_string(),
            })
    }

    /// Picks the first bold face matching `families`, then any installed face.
    pub fn from_system(families: &[String]) -> FontResult<Self> {
        let mut db = Database::new();
        db.load_system_fonts();

        for name in families {
            let family = match name.to_ascii_lowercase().as_str() {
                "sans-serif" => Family::SansSerif,
                "serif" => Family::Serif,
                "monospace" => Family::Monospace,
                _ => Family::Name(name.as_str()),
            };
            let query = Query {
                families: &[family],
                weight: Weight::BOLD,
                ..Default::default()
            };
            if let Some(id) = db.query(&query) {
                match load_face(&db, id) {
                    Ok(Some(font)) => {
                        tracing::debug!(family = %name, "caption font resolved");
                        return Ok(Self::new(font));
                    }
                    Ok(None) => {}
                    Err(err) => tracing::warn!(family = %name, ?err, "skipping unusable font"),
                }
            }
        }

        for face in db.faces() {
            if let Ok(Some(font)) = load_face(&db, face.id) {
                tracing::warn!(
                    requested = ?families,
                    fallback = ?face.families.first().map(|(name, _)| name),
                    "preferred caption fonts missing; using fallback face"
                );
                return Ok(Self::new(font));
            }
        }

        Err(FontError::NotFound {
            families: families.to_vec(),
        })
    }

    fn glyphs<'a>(
        &'a self,
        text: &'a str,
        size: f32,
    ) -> impl Iterator<Item = (GlyphId, f32)> + 'a {
        let scaled = self.font.as_scaled(size);
        let mut cursor_x = 0.0f32;
        let mut previous = None;
        text.chars()
            .filter(|ch| !ch.is_control())
            .map(move |ch| {
                let glyph = scaled.glyph_id(ch);
                if let Some(prev) = previous {
                    cursor_x += scaled.kern(prev, glyph);
                }
                let x = cursor_x;
                cursor_x += scaled.h_advance(glyph);
                previous = Some(glyph);
                (glyph, x)
            })
    }
}

impl Typeface for GlyphFace {
    fn measure(&self, text: &str, size: f32) -> f32 {
        let scaled = self.font.as_scaled(size);
        self.glyphs(text, size)
            .last()
            .map(|(glyph, x)| x + scaled.h_advance(glyph))
            .unwrap_or(0.0)
    }

    fn rasterize(
        &self,
        text: &str,
        size: f32,
        center_x: f32,
        bottom_y: f32,
        mask: &mut CoverageMask,
    ) {
        let scaled = self.font.as_scaled(size);
        let left = center_x - self.measure(text, size) / 2.0;
        let baseline = bottom_y + scaled.descent();
        for (glyph, x) in self.glyphs(text, size) {
            let positioned = glyph.with_scale_and_position(size, point(left + x, baseline));
            if let Some(outline) = self.font.outline_glyph(positioned) {
                let bounds = outline.px_bounds();
                outline.draw(|px, py, coverage| {
                    mask.add(
                        bounds.min.x as i32 + px as i32,
                        bounds.min.y as i32 + py as i32,
                        coverage,
                    );
                });
            }
        }
    }
}

/// Draws every character as a solid block so caption placement is observable.
#[cfg(test)]
pub(crate) struct BlockFace;

#[cfg(test)]
impl Typeface for BlockFace {
    fn measure(&self, text: &str, size: f32) -> f32 {
        text.chars().count() as f32 * size * 0.6
    }

    fn rasterize(
        &self,
        text: &str,
        size: f32,
        center_x: f32,
        bottom_y: f32,
        mask: &mut CoverageMask,
    ) {
        let width = self.measure(text, size);
        let left = center_x - width / 2.0;
        let top = bottom_y - size * 0.8;
        for x in left.round() as i32..(left + width).round() as i32 {
            for y in top.round() as i32..(bottom_y - size * 0.2).round() as i32 {
                mask.add(x, y, 1.0);
            }
        }
    }
}

fn load_face(db: &Database, id: fontdb::ID) -> FontResult<Option<FontArc>> {
    let Some(origin) = db.face(id).map(|face| match &face.source {
        Source::File(path) | Source::SharedFile(path, _) => path.display().to_string(),
        Source::Binary(_) => "binary source".to_string(),
    }) else {
        return Ok(None);
    };
    match db.with_face_data(id, |data, index| {
        FontVec::try_from_vec_and_index(data.to_vec(), index)
    }) {
        Some(Ok(font)) => Ok(Some(FontArc::new(font))),
        Some(Err(_)) => Err(FontError::Decode { origin }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::text::layout_caption;

    fn system_face() -> Option<GlyphFace> {
        let families = ["DejaVu Sans", "Liberation Sans", "sans-serif"].map(String::from);
        match GlyphFace::from_system(&families) {
            Ok(face) => Some(face),
            Err(FontError::NotFound { .. }) => None,
            Err(err) => panic!("installed font should load: {err}"),
        }
    }

    #[test]
    fn empty_text_has_no_width() {
        let Some(face) = system_face() else { return };
        assert_eq!(face.measure("", 51.0), 0.0);
    }

    #[test]
    fn width_grows_as_characters_are_appended() {
        let Some(face) = system_face() else { return };
        let text = "AVAWay, Tokyo 你好";
        let mut previous = 0.0;
        for (end, _) in text.char_indices().skip(1).chain([(text.len(), ' ')]) {
            let width = face.measure(&text[..end], 51.0);
            assert!(width >= previous, "{:?} shrank to {width}", &text[..end]);
            previous = width;
        }
        assert!(previous > 0.0);
    }

    #[test]
    fn rasterized_line_stays_above_its_bottom_edge() {
        let Some(face) = system_face() else { return };
        let mut mask = CoverageMask::new(400, 200);
        face.rasterize("gjpqy Ág", 51.0, 200.0, 120.0, &mut mask);
        assert!(!mask.is_empty());

        // One row of slack for anti-aliased edges.
        for y in 121..mask.height() {
            for x in 0..mask.width() {
                assert_eq!(mask.get(x, y), 0.0, "coverage at ({x}, {y})");
            }
        }
    }

    #[test]
    fn short_cjk_caption_fits_one_line_with_real_metrics() {
        let Some(face) = system_face() else { return };
        let layout = layout_caption(&face, "你好呀", 51.0, 30.0, 512, 512);
        assert_eq!(layout.lines.len(), 1);
        assert_eq!(layout.lines[0].bottom_y, 482.0);
    }
}
