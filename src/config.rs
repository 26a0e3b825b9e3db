use crate::classify::Range;
use crate::data::table::ValidationMode;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub boundaries: BoundaryConfig,
    pub data: DataConfig,
    pub slider: SliderConfig,
    pub style: StyleConfig,
    pub basemap: BasemapConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BoundaryConfig {
    /// Directory or http(s) base URL holding `topojson/<country>.topojson`
    pub source: String,
    pub countries: Vec<String>,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            source: ".".to_string(),
            countries: vec!["Switzerland".to_string()],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DataConfig {
    pub path: Option<PathBuf>,
    pub name_column: String,
    pub value_column: String,
    pub validation: ValidationMode,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: None,
            name_column: "Canton".to_string(),
            value_column: "Total".to_string(),
            validation: ValidationMode::FirstRow,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SliderConfig {
    pub thumbs: usize,
    pub step: f64,
    pub palette: Vec<String>,
    /// Fixed ranges used before any dataset is loaded
    pub ranges: Vec<Range>,
}

impl Default for SliderConfig {
    fn default() -> Self {
        Self {
            thumbs: 4,
            step: 1.0,
            palette: ["#ffffb2", "#fecc5c", "#fd8d3c", "#f03b20", "#bd0026"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ranges: Vec::new(),
        }
    }
}

/// Fixed stroke and fill settings applied on every repaint
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StyleConfig {
    pub weight: u8,
    pub opacity: f64,
    pub border_color: String,
    pub fill_opacity: f64,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            weight: 2,
            opacity: 1.0,
            border_color: "#ffffff".to_string(),
            fill_opacity: 0.7,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BasemapConfig {
    /// Line GeoJSON files drawn under the boundary layer
    pub files: Vec<PathBuf>,
    pub attribution: String,
}

impl Default for BasemapConfig {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            attribution: "Natural Earth".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LogConfig {
    pub file: PathBuf,
    /// `EnvFilter` directive; `RUST_LOG` takes precedence
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("tui-choropleth.log"),
            filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Use the file when it exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<()> {
        for range in &self.slider.ranges {
            range.validate().context("Invalid entry in [slider] ranges")?;
        }
        if crate::color::Rgb::parse(&self.style.border_color).is_none() {
            anyhow::bail!("Invalid style.border_color {:?}", self.style.border_color);
        }
        Ok(())
    }
}
