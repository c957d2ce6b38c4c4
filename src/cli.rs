use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use crate::config::{load_app_config, load_app_config_from, AppConfig};
use crate::error::{AppError, AppResult};
use crate::export::ExportService;
use crate::geometry::{Rect, Size};
use crate::render::{
    Composer, FontSize, GlyphFace, Typeface, MAX_VERTICAL_OFFSET, MIN_VERTICAL_OFFSET,
};
use crate::session::{ImageResource, Session, SessionSettings};

/// Crop a square out of an image, caption it and write `meme.png`.
#[derive(Parser, Debug)]
#[command(name = "memecrop", version, about)]
pub struct CliArgs {
    /// Source image (PNG, JPEG, GIF, WebP or BMP).
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Caption text. Defaults to the configured default caption.
    #[arg(short, long)]
    pub text: Option<String>,

    /// Caption size in output pixels: 42, 51 or 64.
    #[arg(long, value_parser = parse_font_size, default_value = "51")]
    pub font_size: FontSize,

    /// Distance from the bottom edge to the last caption line.
    #[arg(
        long,
        default_value_t = 30,
        value_parser = clap::value_parser!(u32).range(i64::from(MIN_VERTICAL_OFFSET)..=i64::from(MAX_VERTICAL_OFFSET))
    )]
    pub offset: u32,

    /// Selection in source pixels as `x,y,size`. Defaults to the centered square.
    #[arg(long, value_parser = parse_crop, value_name = "X,Y,SIZE")]
    pub crop: Option<Rect>,

    /// Directory receiving `meme.png`.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Side of the square output in pixels.
    #[arg(long, value_name = "PX")]
    pub output_size: Option<u32>,

    /// Font file to use instead of a system face.
    #[arg(long, value_name = "FILE")]
    pub font: Option<PathBuf>,

    /// Display container the crop engine lays the image out in.
    #[arg(long, value_parser = parse_container, default_value = "400x400", value_name = "WxH")]
    pub container: Size,

    /// Explicit config file instead of the XDG location.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl CliArgs {
    /// Folds command-line overrides into the loaded config.
    fn apply_to(&self, mut config: AppConfig) -> AppConfig {
        if let Some(size) = self.output_size {
            config.output_size = size;
        }
        if let Some(dir) = &self.output_dir {
            config.export_dir = Some(dir.clone());
        }
        if let Some(font) = &self.font {
            config.font_path = Some(font.clone());
        }
        if let Some(text) = &self.text {
            config.default_text = text.clone();
        }
        config.sanitized()
    }
}

/// Runs one headless upload → crop → caption → export pass.
pub fn execute(args: &CliArgs) -> AppResult<PathBuf> {
    let config = match &args.config {
        Some(path) => load_app_config_from(path)?,
        None => load_app_config(),
    };
    let config = args.apply_to(config);

    let face = load_typeface(&config)?;
    let composer = Composer::new(face).with_background(config.background_color());
    let exporter = ExportService::with_default_dir(config.export_dir.as_deref())?;
    let mut session = Session::new(composer, exporter, SessionSettings::from_config(&config));

    let bytes = std::fs::read(&args.input)?;
    session.layout(args.container)?;
    session.upload(&bytes)?;
    if let ImageResource::Failed(reason) = session.image() {
        return Err(AppError::Decode {
            reason: reason.clone(),
        });
    }

    if let Some(crop) = args.crop {
        let applied = session.select_source(crop)?;
        if applied != crop {
            tracing::warn!(requested = ?crop, ?applied, "selection adjusted to fit the image");
        }
    }
    session.set_font_size(args.font_size);
    session.set_vertical_offset(args.offset);

    session.export()?.ok_or(AppError::NothingToExport)
}

fn load_typeface(config: &AppConfig) -> AppResult<Arc<dyn Typeface + Send + Sync>> {
    let face = match &config.font_path {
        Some(path) => GlyphFace::from_file(path)?,
        None => GlyphFace::from_system(&config.font_families)?,
    };
    Ok(Arc::new(face))
}

fn parse_font_size(value: &str) -> Result<FontSize, String> {
    let px: u32 = value
        .trim()
        .parse()
        .map_err(|_| format!("`{value}` is not a number"))?;
    FontSize::from_px(px).ok_or_else(|| {
        let allowed: Vec<String> = FontSize::ALL.iter().map(|size| size.px().to_string()).collect();
        format!("font size must be one of {}", allowed.join(", "))
    })
}

fn parse_crop(value: &str) -> Result<Rect, String> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| format!("`{value}` is not `x,y,size`"))?;
    match parts.as_slice() {
        [x, y, size] if *size > 0.0 && parts.iter().all(|v| v.is_finite()) => {
            Ok(Rect::square(*x, *y, *size))
        }
        _ => Err(format!("`{value}` is not `x,y,size` with a positive size")),
    }
}

fn parse_container(value: &str) -> Result<Size, String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("`{value}` is not `WxH`"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v > 0.0)
            .ok_or_else(|| format!("`{value}` is not `WxH` with positive sides"))
    };
    Ok(Size::new(parse(width)?, parse(height)?))
}
