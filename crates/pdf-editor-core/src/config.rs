use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Text color for overlays, one byte per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn black() -> Self {
        Self::new(0, 0, 0)
    }

    pub const fn red() -> Self {
        Self::new(255, 0, 0)
    }

    pub const fn blue() -> Self {
        Self::new(0, 0, 255)
    }

    pub const fn dark_green() -> Self {
        Self::new(0, 128, 0)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "black" => Some(Self::black()),
            "red" => Some(Self::red()),
            "blue" => Some(Self::blue()),
            "darkgreen" | "dark_green" | "dark-green" => Some(Self::dark_green()),
            _ => None,
        }
    }

    /// Parse either a color name or an `r,g,b` triple.
    pub fn parse(value: &str) -> Option<Self> {
        if let Some(named) = Self::from_name(value.trim()) {
            return Some(named);
        }

        let channels: Vec<u8> = value
            .split(',')
            .map(|c| c.trim().parse::<u8>())
            .collect::<Result<_, _>>()
            .ok()?;

        match channels.as_slice() {
            [r, g, b] => Some(Self::new(*r, *g, *b)),
            _ => None,
        }
    }

    /// Convert to the 0.0-1.0 channel range used by PDF color operators.
    pub fn to_unit(self) -> (f32, f32, f32) {
        (
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
        )
    }

    /// Convert to CSS rgb() string
    pub fn to_css(self) -> String {
        format!("rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

impl Default for RgbColor {
    fn default() -> Self {
        Self::black()
    }
}

/// Where text-overlay fonts are fetched from.
///
/// `base_url` is either an `http(s)://` prefix or a local directory; the
/// font filename is appended to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontConfig {
    #[serde(default = "default_font_base")]
    pub base_url: String,

    #[serde(default = "default_font_name")]
    pub default_font: String,

    /// HTTP timeout for font downloads
    #[serde(default = "default_font_timeout_secs")]
    pub timeout_secs: u64,

    /// In-memory font cache budget in megabytes (0 disables the cache)
    #[serde(default = "default_font_cache_mb")]
    pub cache_max_mb: u64,
}

fn default_font_base() -> String {
    "./fonts/".to_string()
}

fn default_font_name() -> String {
    "NotoSansJP-Regular.ttf".to_string()
}

const fn default_font_timeout_secs() -> u64 {
    30
}

const fn default_font_cache_mb() -> u64 {
    64
}

impl FontConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn is_remote(&self) -> bool {
        self.base_url.starts_with("http://") || self.base_url.starts_with("https://")
    }
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            base_url: default_font_base(),
            default_font: default_font_name(),
            timeout_secs: default_font_timeout_secs(),
            cache_max_mb: default_font_cache_mb(),
        }
    }
}

/// Defaults applied to text overlays when the caller leaves them out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextDefaults {
    #[serde(default = "default_font_size")]
    pub font_size: f32,

    #[serde(default)]
    pub color: RgbColor,
}

const fn default_font_size() -> f32 {
    16.0
}

impl Default for TextDefaults {
    fn default() -> Self {
        Self {
            font_size: default_font_size(),
            color: RgbColor::default(),
        }
    }
}

/// Names given to documents produced by the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputNames {
    /// Filename offered for the exported document
    #[serde(default = "default_export_name")]
    pub export: String,

    /// Name of the synthetic file that replaces the working set after a merge
    #[serde(default = "default_merged_name")]
    pub merged: String,
}

fn default_export_name() -> String {
    "edited.pdf".to_string()
}

fn default_merged_name() -> String {
    "merged.pdf".to_string()
}

impl Default for OutputNames {
    fn default() -> Self {
        Self {
            export: default_export_name(),
            merged: default_merged_name(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Font asset location
    #[serde(default)]
    pub fonts: FontConfig,

    /// Text overlay defaults
    #[serde(default)]
    pub text: TextDefaults,

    /// Output filenames
    #[serde(default)]
    pub output: OutputNames,
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations (~/.config/pdf-editor/config.toml, ./config.toml)
    pub fn load() -> Self {
        // Try user config
        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("pdf-editor").join("config.toml");
            if user_config.exists() {
                match Self::from_file(&user_config) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {}", user_config.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // Try local config
        let local_config = std::path::PathBuf::from("config.toml");
        if local_config.exists() {
            match Self::from_file(&local_config) {
                Ok(config) => {
                    tracing::debug!("Loaded config from ./config.toml");
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to load ./config.toml: {}", e);
                }
            }
        }

        tracing::debug!("No config file found, using defaults");
        Self::default()
    }

    /// Reject values no operation could work with.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.text.font_size.is_finite() || self.text.font_size <= 0.0 {
            return Err(Error::ConfigInvalid {
                field: "text.font_size".to_string(),
                reason: format!("must be a positive number, got {}", self.text.font_size),
            });
        }
        if self.fonts.base_url.trim().is_empty() {
            return Err(Error::ConfigInvalid {
                field: "fonts.base_url".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.output.export.trim().is_empty() {
            return Err(Error::ConfigInvalid {
                field: "output.export".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Color options for UI
pub fn color_options() -> Vec<(&'static str, RgbColor)> {
    vec![
        ("Black", RgbColor::black()),
        ("Red", RgbColor::red()),
        ("Blue", RgbColor::blue()),
        ("Dark Green", RgbColor::dark_green()),
    ]
}
