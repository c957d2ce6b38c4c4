use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::geometry::Color;
use crate::render::{DEFAULT_CAPTION, DEFAULT_OUTPUT_SIZE};

const APP_DIR: &str = "memecrop";
const APP_CONFIG_FILE: &str = "config.json";
const MIN_SURFACE_SIZE: u32 = 16;
const MAX_SURFACE_SIZE: u32 = 4096;

pub const DEFAULT_PREVIEW_SIZE: u32 = 192;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing HOME environment variable")]
    MissingHomeDirectory,
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Application-level settings from `config.json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub output_size: u32,
    pub preview_size: u32,
    pub background: String,
    pub font_families: Vec<String>,
    pub font_path: Option<PathBuf>,
    pub default_text: String,
    pub export_dir: Option<PathBuf>,
    pub narrow_viewport_width: f64,
    pub preview_hide_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_size: DEFAULT_OUTPUT_SIZE,
            preview_size: DEFAULT_PREVIEW_SIZE,
            background: "#000000".to_string(),
            font_families: ["Impact", "Anton", "DejaVu Sans", "sans-serif"]
                .into_iter()
                .map(String::from)
                .collect(),
            font_path: None,
            default_text: DEFAULT_CAPTION.to_string(),
            export_dir: None,
            narrow_viewport_width: 768.0,
            preview_hide_ms: 2_500,
        }
    }
}

impl AppConfig {
    /// Background as a color, falling back to black for unparsable values.
    pub fn background_color(&self) -> Color {
        Color::from_hex(&self.background).unwrap_or(Color::BLACK)
    }

    pub(crate) fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        self.output_size = self.output_size.clamp(MIN_SURFACE_SIZE, MAX_SURFACE_SIZE);
        self.preview_size = self.preview_size.clamp(MIN_SURFACE_SIZE, MAX_SURFACE_SIZE);
        if Color::from_hex(&self.background).is_none() {
            tracing::warn!(background = %self.background, "invalid background color; using default");
            self.background = defaults.background;
        }
        if self.font_families.is_empty() {
            self.font_families = defaults.font_families;
        }
        if !self.narrow_viewport_width.is_finite() || self.narrow_viewport_width < 0.0 {
            self.narrow_viewport_width = defaults.narrow_viewport_width;
        }
        self
    }
}

pub fn load_app_config() -> AppConfig {
    let (xdg_config_home, home) = config_env_dirs();
    load_app_config_with(xdg_config_home.as_deref(), home.as_deref())
}

/// Reads an explicitly named config file; unlike discovery, failures are reported.
pub fn load_app_config_from(path: &Path) -> ConfigResult<AppConfig> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: AppConfig =
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(config.sanitized())
}

fn load_app_config_with(xdg_config_home: Option<&Path>, home: Option<&Path>) -> AppConfig {
    let path = match app_config_path(APP_DIR, APP_CONFIG_FILE, xdg_config_home, home) {
        Ok(p) => p,
        Err(_) => return AppConfig::default(),
    };
    if !path.exists() {
        return AppConfig::default();
    }
    load_app_config_from(&path).unwrap_or_else(|err| {
        tracing::warn!(%err, ?path, "failed to load config.json; using defaults");
        AppConfig::default()
    })
}

pub(crate) fn config_env_dirs() -> (Option<PathBuf>, Option<PathBuf>) {
    (
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

pub(crate) fn app_config_path(
    app_dir: &str,
    file_name: &str,
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> ConfigResult<PathBuf> {
    let mut path = config_root(xdg_config_home, home)?;
    path.push(app_dir);
    path.push(file_name);
    Ok(path)
}

fn config_root(xdg_config_home: Option<&Path>, home: Option<&Path>) -> ConfigResult<PathBuf> {
    if let Some(xdg) = xdg_config_home.filter(|path| !path.as_os_str().is_empty()) {
        return Ok(xdg.to_path_buf());
    }

    let home = home.ok_or(ConfigError::MissingHomeDirectory)?;
    Ok(home.join(".config"))
}
