use crate::config::{Config, TileProvider};
use crate::map::coordinates::Tile;
use anyhow::Result;
use log::{debug, error, trace};
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use surf::{Config as HttpConfig, Url};
use surf_governor::GovernorMiddleware;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TileLoaderError {
  #[error("Tile {tile:?} not available.")]
  TileNotAvailable { tile: Tile },
  #[error("Download of {tile:?} already in progress.")]
  TileDownloadInProgress { tile: Tile },
  #[error("Invalid tile url {url}: {reason}")]
  InvalidUrl { url: String, reason: String },
}

/// The encoded image data of a tile.
pub type TileData = Vec<u8>;

/// Anything tiles can be fetched from.
pub trait TileLoader {
  async fn tile_data(&self, tile: &Tile) -> Result<TileData>;
}

const SUBDOMAINS: [&str; 3] = ["a", "b", "c"];

/// Expands `{s}`, `{z}`/`{zoom}`, `{x}`, `{y}` and `{r}` of a tile url template.
#[must_use]
pub fn expand_url_template(template: &str, tile: &Tile) -> String {
  let subdomain = SUBDOMAINS[((tile.x + tile.y) % 3) as usize];
  template
    .replace("{s}", subdomain)
    .replace("{zoom}", &tile.zoom.to_string())
    .replace("{z}", &tile.zoom.to_string())
    .replace("{x}", &tile.x.to_string())
    .replace("{y}", &tile.y.to_string())
    .replace("{r}", "")
}

/// Cache directory name for a url template. API keys are masked so that rotating a key does
/// not invalidate the cache.
fn cache_key(url_template: &str) -> String {
  let key_re = Regex::new("[Kk]ey=([A-Za-z0-9-_]*)").expect("re did not compile");
  let masked = key_re.replace_all(url_template, "*");
  let mut hasher = DefaultHasher::new();
  masked.hash(&mut hasher);
  hasher.finish().to_string()
}

#[derive(Debug, Clone)]
struct TileCache {
  base_path: Option<PathBuf>,
}

impl TileCache {
  fn new(base_path: Option<PathBuf>) -> Self {
    if let Some(path) = &base_path
      && !path.exists()
    {
      let _ = fs::create_dir_all(path).inspect_err(|e| {
        error!("Failed to create tile cache directory: {e}");
      });
    }
    Self { base_path }
  }

  fn path(&self, tile: &Tile) -> Option<PathBuf> {
    self
      .base_path
      .as_ref()
      .map(|b| b.join(format!("{}_{}_{}.png", tile.zoom, tile.x, tile.y)))
  }

  fn store(&self, tile: &Tile, data: &[u8]) {
    let Some(path) = self.path(tile) else { return };
    let _ = fs::write(path, data).inspect_err(|e| debug!("Error when writing tile {tile:?}: {e}"));
  }
}

impl TileLoader for TileCache {
  async fn tile_data(&self, tile: &Tile) -> Result<TileData> {
    match self.path(tile) {
      Some(p) if p.exists() => Ok(tokio::fs::read(p).await?),
      _ => Err(TileLoaderError::TileNotAvailable { tile: *tile }.into()),
    }
  }
}

#[derive(Debug)]
struct TileDownloader {
  url_template: String,
  tiles_in_download: Arc<Mutex<HashSet<Tile>>>,
  client: surf::Client,
}

impl TileDownloader {
  fn new(url_template: &str) -> Result<Self> {
    let client: surf::Client = HttpConfig::new()
      .set_timeout(Some(Duration::from_secs(5)))
      .try_into()
      .map_err(|e| anyhow::anyhow!("Failed to build http client: {e}"))?;
    let governor = GovernorMiddleware::per_second(10).map_err(|e| anyhow::anyhow!("{e}"))?;
    Ok(Self {
      url_template: url_template.to_string(),
      tiles_in_download: Arc::default(),
      client: client.with(governor),
    })
  }

  async fn fetch(&self, tile: &Tile) -> Result<TileData> {
    let url = expand_url_template(&self.url_template, tile);
    let url = Url::parse(&url).map_err(|e| TileLoaderError::InvalidUrl {
      url: url.clone(),
      reason: e.to_string(),
    })?;

    let mut response = self
      .client
      .get(url)
      .await
      .map_err(|e| anyhow::anyhow!("Error when downloading tile {tile:?}: {e}"))?;
    if !response.status().is_success() {
      error!(
        "Error when downloading tile {tile:?}: {}",
        response.status()
      );
      return Err(TileLoaderError::TileNotAvailable { tile: *tile }.into());
    }
    response
      .body_bytes()
      .await
      .map_err(|_| TileLoaderError::TileNotAvailable { tile: *tile }.into())
  }
}

impl TileLoader for TileDownloader {
  async fn tile_data(&self, tile: &Tile) -> Result<TileData> {
    if !self.tiles_in_download.lock().unwrap().insert(*tile) {
      return Err(TileLoaderError::TileDownloadInProgress { tile: *tile }.into());
    }
    let result = self.fetch(tile).await;
    self.tiles_in_download.lock().unwrap().remove(tile);
    debug!("Downloaded {tile:?}: {}", result.is_ok());
    result
  }
}

/// Tile loading for one base layer: disk cache first, then download.
#[derive(Debug)]
pub struct CachedTileLoader {
  provider: TileProvider,
  tile_cache: TileCache,
  tile_loader: TileDownloader,
}

impl CachedTileLoader {
  #[must_use]
  pub fn name(&self) -> &str {
    &self.provider.name
  }

  #[must_use]
  pub fn attribution(&self) -> &str {
    &self.provider.attribution
  }

  #[must_use]
  pub fn max_zoom(&self) -> u8 {
    self.provider.get_max_zoom()
  }

  /// One loader per configured provider. Providers whose client cannot be built are skipped.
  pub fn from_config(config: &Config) -> impl Iterator<Item = Self> + '_ {
    config.tile_provider.iter().filter_map(|provider| {
      Self::new(provider.clone(), config.tile_cache_dir.clone())
        .inspect_err(|e| error!("Skipping tile provider {}: {e}", provider.name))
        .ok()
    })
  }

  fn new(provider: TileProvider, cache_dir: Option<PathBuf>) -> Result<Self> {
    let tile_loader = TileDownloader::new(&provider.url)?;
    let cache_path = cache_dir.map(|dir| dir.join(cache_key(&provider.url)));
    Ok(Self {
      provider,
      tile_cache: TileCache::new(cache_path),
      tile_loader,
    })
  }
}

impl TileLoader for CachedTileLoader {
  async fn tile_data(&self, tile: &Tile) -> Result<TileData> {
    trace!("Loading tile {tile:?} for {}", self.name());
    if let Ok(data) = self.tile_cache.tile_data(tile).await {
      debug!("cache_hit: {tile:?}");
      return Ok(data);
    }
    debug!("cache_miss: {tile:?}");
    let data = self.tile_loader.tile_data(tile).await?;
    // Tiny answers are error pages or empty images.
    if data.len() <= 100 {
      return Err(TileLoaderError::TileNotAvailable { tile: *tile }.into());
    }
    self.tile_cache.store(tile, &data);
    Ok(data)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const TILE: Tile = Tile {
    x: 8_813,
    y: 5_754,
    zoom: 14,
  };

  #[test]
  fn expands_leaflet_style_templates() {
    let url = expand_url_template(
      "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png",
      &TILE,
    );
    // (8813 + 5754) % 3 == 2
    assert_eq!(
      url,
      "https://c.basemaps.cartocdn.com/light_all/14/8813/5754.png"
    );
  }

  #[test]
  fn expands_zoom_placeholder() {
    let url = expand_url_template("https://tile.example.com/{zoom}/{x}/{y}.png", &TILE);
    assert_eq!(url, "https://tile.example.com/14/8813/5754.png");
  }

  #[test]
  fn cache_key_ignores_api_keys() {
    assert_eq!(
      cache_key("https://tiles.example.com/{z}/{x}/{y}.png?key=abc"),
      cache_key("https://tiles.example.com/{z}/{x}/{y}.png?key=xyz")
    );
    assert_ne!(
      cache_key("https://a.example.com/{z}/{x}/{y}.png"),
      cache_key("https://b.example.com/{z}/{x}/{y}.png")
    );
  }

  #[tokio::test]
  async fn cache_miss_without_cache_dir() {
    let cache = TileCache::new(None);
    assert!(cache.tile_data(&TILE).await.is_err());
  }

  #[tokio::test]
  async fn cache_serves_stored_tiles() {
    let dir = std::env::temp_dir().join(format!("clothmap-tile-cache-{}", std::process::id()));
    let cache = TileCache::new(Some(dir.clone()));
    cache.store(&TILE, &[1, 2, 3]);
    assert_eq!(cache.tile_data(&TILE).await.expect("cached"), vec![1, 2, 3]);
    let _ = fs::remove_dir_all(dir);
  }
}
