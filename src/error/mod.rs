use crate::config::ConfigError;
use crate::export::ExportError;
use crate::render::FontError;
use crate::session::SessionError;
use thiserror::Error;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Font(#[from] FontError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode image: {reason}")]
    Decode { reason: String },
    #[error("nothing to export: no image or selection")]
    NothingToExport,
}
