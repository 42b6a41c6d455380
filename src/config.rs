use std::collections::HashMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{Context, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub sources: SourcesConfig,
    pub filter: FilterConfig,
    pub labels: LabelConfig,
    pub style: StyleConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourcesConfig {
    pub counties: ArcgisSource,
    pub states: ArcgisSource,
    pub marine: Option<PathBuf>, // supplementary water polygons, local file
}

/// One ArcGIS FeatureServer query endpoint and the attribute fields to pull
/// from it.
#[derive(Debug, Deserialize, Clone)]
pub struct ArcgisSource {
    /// Base query URL, up to and including `/query`.
    pub url: String,
    /// Row filter; defaults to the always-true `1=1`.
    #[serde(rename = "where")]
    pub where_clause: Option<String>,
    /// Attribute fields to request; empty means all (`*`).
    #[serde(default)]
    pub out_fields: Vec<String>,
    /// Attribute holding the display name.
    pub name_field: String,
    /// Attribute holding the jurisdiction code, if any.
    pub code_field: Option<String>,
    #[serde(default)]
    pub format: QueryFormat,
    /// Records requested per page (default 1000).
    pub page_size: Option<u32>,
}

/// Wire format of the query response.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueryFormat {
    #[default]
    Geojson,
    /// Esri JSON (`rings` geometry).
    Json,
}

impl QueryFormat {
    pub fn as_query_value(self) -> &'static str {
        match self {
            QueryFormat::Geojson => "geojson",
            QueryFormat::Json => "json",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FilterConfig {
    /// Neighboring states kept for visual context.
    pub states: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LabelConfig {
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default = "default_label_color")]
    pub color: String,
    /// Manual label nudges in map units, keyed by display name.
    #[serde(default)]
    pub offsets: HashMap<String, [f64; 2]>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StyleConfig {
    pub county_fill: String, // Hex code
    pub state_fill: String,
    pub marine_fill: String,
    pub county_outline: String,
    #[serde(default = "default_outline_width")]
    pub outline_width: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_margin")]
    pub margin: f64,
}

fn default_font_family() -> String {
    "sans-serif".to_string()
}

fn default_font_size() -> f64 {
    11.0
}

fn default_label_color() -> String {
    "#222222".to_string()
}

fn default_outline_width() -> f64 {
    0.8
}

fn default_margin() -> f64 {
    40.0
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}
