use crate::colors::ColorRamp;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SOURCE_URL: &str = "https://public.opendatasoft.com/explore/dataset/covid-19-pandemic-worldwide-data/download/?format=csv&timezone=Europe/Berlin&lang=fr&use_labels_for_header=true&csv_separator=%3B";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub filter: FilterConfig,
    pub render: RenderConfig,
    pub output: OutputConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InputConfig {
    pub cache_path: PathBuf,
    pub geo_path: PathBuf,
    pub source_url: String,
    pub delimiter: char,
    pub name_property: String, // GeoJSON property holding the zone name
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            cache_path: PathBuf::from("tutorial_data/data.csv"),
            geo_path: PathBuf::from("continent.geo.json"),
            source_url: DEFAULT_SOURCE_URL.to_string(),
            delimiter: ';',
            name_property: "name".to_string(),
        }
    }
}

/// Point-in-time snapshot selection applied to the case table.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FilterConfig {
    pub date: String,
    pub category: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            date: "2020-11-19".to_string(),
            category: "Confirmed".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct Center {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq)]
#[serde(default)]
pub struct Margin {
    pub r: u32,
    pub t: u32,
    pub l: u32,
    pub b: u32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RenderConfig {
    pub colorscale: String,
    pub opacity: f64,
    pub center: Center,
    pub zoom: f64,
    pub margin: Margin,
    pub map_style: String,
    pub colorbar_title: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            colorscale: "YlOrRd".to_string(),
            opacity: 0.6,
            center: Center { lat: 19.0, lon: 11.0 },
            zoom: 1.0,
            margin: Margin::default(),
            map_style: "open-street-map".to_string(),
            colorbar_title: "Confirmed people".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub html: PathBuf,
    pub figure_json: PathBuf,
    pub png: Option<PathBuf>,
    pub png_width: u32,
    pub png_height: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            html: PathBuf::from("output/map.html"),
            figure_json: PathBuf::from("output/figure.json"),
            png: None,
            png_width: 1440,
            png_height: 720,
        }
    }
}

impl OutputConfig {
    /// Directory served under `/files`.
    pub fn dir(&self) -> PathBuf {
        self.html
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    /// Defaults when `path` does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::info!("No config at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.render.opacity) {
            return Err(anyhow!(
                "render.opacity must be within [0, 1], got {}",
                self.render.opacity
            ));
        }
        if ColorRamp::by_name(&self.render.colorscale).is_none() {
            return Err(anyhow!(
                "Unknown colour scale '{}' (known: {})",
                self.render.colorscale,
                ColorRamp::NAMES.join(", ")
            ));
        }
        if self.filter.date.trim().is_empty() || self.filter.category.trim().is_empty() {
            return Err(anyhow!("filter.date and filter.category must not be empty"));
        }
        if self.output.png_width == 0 || self.output.png_height == 0 {
            return Err(anyhow!("PNG dimensions must be positive"));
        }
        Ok(())
    }
}
