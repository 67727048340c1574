use std::path::PathBuf;

use dirs::home_dir;
use log::error;

use crate::map::coordinates::WGS84Coordinate;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct TileProvider {
  pub name: String,
  pub url: String,
  #[serde(default)]
  pub attribution: String,
  #[serde(default)]
  pub max_zoom: Option<u8>,
}

impl TileProvider {
  /// Maximum zoom level served by this provider, 19 if not configured.
  #[must_use]
  pub fn get_max_zoom(&self) -> u8 {
    self.max_zoom.unwrap_or(19)
  }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct Config {
  pub config_path: Option<PathBuf>,
  pub tile_provider: Vec<TileProvider>,
  pub tile_cache_dir: Option<PathBuf>,
  /// Path or http(s) URL of the shop GeoJSON document.
  pub data_source: Option<String>,
  /// Directory holding `<type>.png` marker icons and `location.png`.
  pub icon_dir: Option<PathBuf>,
  /// JSON endpoint answering with `latitude` and `longitude` of the caller.
  pub location_url: Option<String>,
  /// Replaces the network lookup when set.
  pub fixed_location: Option<WGS84Coordinate>,
}

const CARTO_POSITRON_URL: &str = "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png";
const OSM_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
const DEFAULT_DATA_SOURCE: &str = "data/clothshops-data.geojson";
const DEFAULT_ICON_DIR: &str = "icons";
const DEFAULT_LOCATION_URL: &str = "https://ipapi.co/json/";

impl Config {
  /// Environment first, then the config file, then the defaults.
  #[must_use]
  pub fn new() -> Self {
    let from_env = Self::from_env();
    let from_file = Self::from_file();

    let mut merged = from_env;
    if let Some(from_file) = &from_file {
      merged = merged.merge(from_file);
    }
    merged = merged.merge(&Self::default());

    if from_file.is_none() {
      merged.init_cfg_file();
    }

    merged
  }

  fn from_env() -> Self {
    let config_path = std::env::var("CLOTHMAP_CONFIG").ok().map(PathBuf::from);

    let tile_provider = std::env::var("CLOTHMAP_TILE_URL")
      .ok()
      .map_or_else(Vec::new, |url| {
        vec![TileProvider {
          name: "ENV".to_string(),
          url,
          attribution: String::new(),
          max_zoom: None,
        }]
      });

    Self {
      config_path,
      tile_provider,
      tile_cache_dir: std::env::var("CLOTHMAP_TILE_CACHE_DIR")
        .ok()
        .map(PathBuf::from),
      data_source: std::env::var("CLOTHMAP_DATA").ok(),
      icon_dir: std::env::var("CLOTHMAP_ICON_DIR").ok().map(PathBuf::from),
      location_url: None,
      fixed_location: None,
    }
  }

  /// Fills everything `self` leaves open from `other`. Tile providers are concatenated.
  #[must_use]
  pub fn merge(mut self, other: &Self) -> Self {
    self.config_path = self.config_path.or_else(|| other.config_path.clone());
    for provider in &other.tile_provider {
      if !self.tile_provider.contains(provider) {
        self.tile_provider.push(provider.clone());
      }
    }
    self.tile_cache_dir = self.tile_cache_dir.or_else(|| other.tile_cache_dir.clone());
    self.data_source = self.data_source.or_else(|| other.data_source.clone());
    self.icon_dir = self.icon_dir.or_else(|| other.icon_dir.clone());
    self.location_url = self.location_url.or_else(|| other.location_url.clone());
    self.fixed_location = self.fixed_location.or(other.fixed_location);
    self
  }

  fn from_file() -> Option<Self> {
    let config_path = std::env::var("CLOTHMAP_CONFIG")
      .ok()
      .map(PathBuf::from)
      .or_else(default_config_dir)?
      .join("config.json");

    serde_json::from_str(&std::fs::read_to_string(&config_path).ok()?)
      .inspect_err(|e| error!("Failed to read config file {}: {e}", config_path.display()))
      .ok()
  }

  fn init_cfg_file(&self) {
    let Some(path) = &self.config_path else {
      return;
    };
    if !path.exists() {
      let _ = std::fs::create_dir_all(path).inspect_err(|e| {
        error!("Failed to create config directory: {e}");
      });
    }

    let file = path.join("config.json");
    if file.exists() {
      return;
    }
    match serde_json::to_string_pretty(self) {
      Ok(content) => {
        let _ = std::fs::write(file, content).inspect_err(|e| {
          error!("Failed to write config file: {e}");
        });
      }
      Err(e) => error!("Failed to serialize config: {e}"),
    }
  }

  #[must_use]
  pub fn data_source(&self) -> &str {
    self.data_source.as_deref().unwrap_or(DEFAULT_DATA_SOURCE)
  }

  #[must_use]
  pub fn icon_dir(&self) -> PathBuf {
    self
      .icon_dir
      .clone()
      .unwrap_or_else(|| PathBuf::from(DEFAULT_ICON_DIR))
  }

  #[must_use]
  pub fn location_url(&self) -> &str {
    self.location_url.as_deref().unwrap_or(DEFAULT_LOCATION_URL)
  }
}

fn default_config_dir() -> Option<PathBuf> {
  home_dir().map(|p| p.join(".config").join("clothmap"))
}

impl Default for Config {
  fn default() -> Self {
    Self {
      config_path: default_config_dir(),
      tile_provider: vec![
        TileProvider {
          name: "CartoDB Positron".to_string(),
          url: CARTO_POSITRON_URL.to_string(),
          attribution: "© OpenStreetMap & CartoDB".to_string(),
          max_zoom: Some(19),
        },
        TileProvider {
          name: "OpenStreetMap".to_string(),
          url: OSM_URL.to_string(),
          attribution: "© OpenStreetMap".to_string(),
          max_zoom: Some(19),
        },
      ],
      tile_cache_dir: home_dir().map(|p| p.join(".clothmap_tile_cache")),
      data_source: Some(DEFAULT_DATA_SOURCE.to_string()),
      icon_dir: Some(PathBuf::from(DEFAULT_ICON_DIR)),
      location_url: Some(DEFAULT_LOCATION_URL.to_string()),
      fixed_location: None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn empty() -> Config {
    Config {
      config_path: None,
      tile_provider: Vec::new(),
      tile_cache_dir: None,
      data_source: None,
      icon_dir: None,
      location_url: None,
      fixed_location: None,
    }
  }

  #[test]
  fn merge_prefers_own_values() {
    let mut own = empty();
    own.data_source = Some("shops.geojson".to_string());
    let merged = own.merge(&Config::default());

    assert_eq!(merged.data_source(), "shops.geojson");
    assert_eq!(merged.icon_dir(), PathBuf::from("icons"));
    assert_eq!(merged.location_url(), DEFAULT_LOCATION_URL);
  }

  #[test]
  fn merge_appends_tile_providers_once() {
    let mut own = empty();
    own.tile_provider.push(TileProvider {
      name: "ENV".to_string(),
      url: "https://tiles.example.com/{z}/{x}/{y}.png".to_string(),
      attribution: String::new(),
      max_zoom: None,
    });

    let merged = own.merge(&Config::default()).merge(&Config::default());
    let names: Vec<_> = merged.tile_provider.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["ENV", "CartoDB Positron", "OpenStreetMap"]);
    assert_eq!(merged.tile_provider[0].get_max_zoom(), 19);
  }

  #[test]
  fn defaults_start_with_positron() {
    let config = Config::default();
    assert_eq!(config.tile_provider[0].name, "CartoDB Positron");
    assert_eq!(config.data_source(), DEFAULT_DATA_SOURCE);
    assert!(config.fixed_location.is_none());
  }

  #[test]
  fn config_file_round_trip() {
    let mut config = Config::default();
    config.fixed_location = Some(WGS84Coordinate::new(47.8, 13.04));
    let json = serde_json::to_string(&config).expect("serialize");
    let back: Config = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, config);
  }
}
