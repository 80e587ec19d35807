use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub map: MapConfig,
    pub output: OutputConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    /// Entry records dumped from the program backend (.json or .csv).
    pub entries: PathBuf,
}

/// Viewport defaults for the service region (Khyber Pakhtunkhwa).
#[derive(Debug, Deserialize, Clone)]
pub struct MapConfig {
    #[serde(default = "default_center")]
    pub default_center: [f64; 2],
    #[serde(default = "default_zoom")]
    pub default_zoom: u8,
    /// Zoom used when the viewport is framed around computed circles.
    #[serde(default = "cluster_zoom")]
    pub cluster_zoom: u8,
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            default_center: default_center(),
            default_zoom: default_zoom(),
            cluster_zoom: cluster_zoom(),
        }
    }
}

fn default_center() -> [f64; 2] {
    [34.0151, 71.5249]
}

fn default_zoom() -> u8 {
    8
}

fn cluster_zoom() -> u8 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    pub tile_dir: PathBuf,
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// Optional GeoJSON overlay export for the map frontend.
    pub geojson: Option<PathBuf>,
    /// Optional CSV export of the computed circles.
    pub circles_csv: Option<PathBuf>,
    /// Optional CSV export of per-district statistics.
    pub stats_csv: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
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
