use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Points per millimetre (1 in = 72 pt = 25.4 mm).
pub const PT_PER_MM: f32 = 72.0 / 25.4;

/// Convert millimetres to PDF points.
pub const fn mm(value: f32) -> f32 {
    value * PT_PER_MM
}

/// RGB colour with components in the 0.0-1.0 range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl TextColor {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Build from 0-255 channel values.
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    pub const fn black() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Accent used for section headers and the plain title.
    pub const fn accent() -> Self {
        Self::from_rgb(220, 38, 127)
    }

    /// Grey used for field labels and the footer.
    pub const fn muted() -> Self {
        Self::from_rgb(100, 100, 100)
    }

    /// Near-black used for the applicant name under the photo.
    pub const fn heading() -> Self {
        Self::from_rgb(34, 34, 34)
    }
}

impl Default for TextColor {
    fn default() -> Self {
        Self::accent()
    }
}

/// Output page size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    #[default]
    A4,
    Letter,
}

impl PageSize {
    /// Width and height in points.
    pub const fn dimensions_pt(self) -> (f32, f32) {
        match self {
            Self::A4 => (mm(210.0), mm(297.0)),
            Self::Letter => (612.0, 792.0),
        }
    }
}

/// Complex-script font configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontConfig {
    /// Where to fetch the Bengali font from: http(s) URL, file:// URL,
    /// root-relative path (resolved against `fetch.base_url`) or local path.
    #[serde(default = "default_font_url")]
    pub url: String,

    /// Family name written into the embedded font dictionaries
    #[serde(default = "default_font_family")]
    pub family: String,
}

fn default_font_url() -> String {
    "/fonts/SolaimanLipi.ttf".to_string()
}

fn default_font_family() -> String {
    "SolaimanLipi".to_string()
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            url: default_font_url(),
            family: default_font_family(),
        }
    }
}

/// Resource fetch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum body resources fetched ahead of the renderer (1 = sequential)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Prefix for root-relative URLs such as `/fonts/...`
    #[serde(default)]
    pub base_url: Option<String>,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Let file references name local paths and `file://` URLs. The font
    /// location is always allowed to be local.
    #[serde(default)]
    pub allow_local: bool,
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_concurrency() -> usize {
    1
}

fn default_user_agent() -> String {
    format!("dossier/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            concurrency: default_concurrency(),
            base_url: None,
            user_agent: default_user_agent(),
            allow_local: false,
        }
    }
}

/// Page layout configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default)]
    pub page_size: PageSize,

    /// Colour for section headers and the plain title
    #[serde(default)]
    pub accent: TextColor,
}

/// Web preview store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Seconds a merged PDF stays downloadable after assembly
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,

    /// Maximum stored documents
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
}

const fn default_ttl_seconds() -> u64 {
    120
}

const fn default_max_entries() -> u64 {
    64
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl_seconds(),
            max_entries: default_max_entries(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub font: FontConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub preview: PreviewConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
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

    /// Load from default locations, layered lowest to highest priority:
    /// `~/.config/dossier/config.toml`, `./dossier.toml`, then
    /// `DOSSIER__SECTION__KEY` environment variables.
    ///
    /// Falls back to defaults (with a warning) when the layers don't parse.
    pub fn load() -> Self {
        match Self::layered() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring configuration: {}", e);
                Self::default()
            }
        }
    }

    fn layered() -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("dossier").join("config.toml");
            tracing::debug!("Checking {}", user_config.display());
            builder = builder.add_source(config::File::from(user_config).required(false));
        }

        let config: Self = builder
            .add_source(config::File::with_name("dossier").required(false))
            .add_source(
                config::Environment::with_prefix("DOSSIER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|settings| settings.try_deserialize::<Self>())
            .map_err(|e| Error::ConfigLoad(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the assembler cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.fetch.concurrency == 0 {
            return Err(Error::ConfigInvalid {
                field: "fetch.concurrency".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.fetch.timeout_secs == 0 {
            return Err(Error::ConfigInvalid {
                field: "fetch.timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.font.url.trim().is_empty() {
            return Err(Error::ConfigInvalid {
                field: "font.url".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.font.url, "/fonts/SolaimanLipi.ttf");
        assert_eq!(config.fetch.concurrency, 1);
        assert_eq!(config.layout.page_size, PageSize::A4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [fetch]
            concurrency = 4
            base_url = "https://admin.example.com"

            [layout]
            page_size = "letter"
            "#,
        )
        .unwrap();

        assert_eq!(config.fetch.concurrency, 4);
        assert_eq!(config.fetch.timeout_secs, 30);
        assert_eq!(config.fetch.base_url.as_deref(), Some("https://admin.example.com"));
        assert_eq!(config.layout.page_size.dimensions_pt(), (612.0, 792.0));
        assert_eq!(config.font.family, "SolaimanLipi");
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = AppConfig::default();
        config.fetch.concurrency = 0;
        assert!(matches!(
            config.validate(),
            Err(Error::ConfigInvalid { ref field, .. }) if field == "fetch.concurrency"
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dossier.toml");
        std::fs::write(&path, "[font]\nurl = \"fonts/bn.ttf\"\n").unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.font.url, "fonts/bn.ttf");
    }

    #[test]
    fn test_a4_dimensions() {
        let (w, h) = PageSize::A4.dimensions_pt();
        assert!((w - 595.28).abs() < 0.01);
        assert!((h - 841.89).abs() < 0.01);
    }
}
