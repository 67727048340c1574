use std::{convert::Infallible, fmt::Display, path::PathBuf, str::FromStr};

use itertools::Itertools as _;
use log::{debug, info};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::feature::{Feature, FeatureId};
use crate::map::coordinates::WGS84Coordinate;

#[derive(Error, Debug)]
pub enum DataLoadError {
  #[error("Failed to read {path}: {source}")]
  Io {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("Failed to fetch {url}: {reason}")]
  Http { url: String, reason: String },
  #[error("Fetching {url} returned status {status}")]
  Status { url: String, status: u16 },
  #[error("Malformed GeoJSON: {0}")]
  Json(#[from] serde_json::Error),
  #[error("Expected a FeatureCollection, found {0}")]
  NotAFeatureCollection(String),
  #[error("Feature {index} is invalid: {reason}")]
  InvalidFeature { index: usize, reason: String },
}

/// Where the shop document is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
  File(PathBuf),
  Url(String),
}

impl FromStr for DataSource {
  type Err = Infallible;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    if s.starts_with("http://") || s.starts_with("https://") {
      Ok(Self::Url(s.to_string()))
    } else {
      Ok(Self::File(PathBuf::from(s)))
    }
  }
}

impl Display for DataSource {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      DataSource::File(path) => write!(f, "{}", path.display()),
      DataSource::Url(url) => write!(f, "{url}"),
    }
  }
}

#[derive(Deserialize)]
struct RawCollection {
  #[serde(rename = "type")]
  kind: String,
  #[serde(default)]
  features: Vec<RawFeature>,
}

#[derive(Deserialize)]
struct RawFeature {
  geometry: Option<RawGeometry>,
  properties: Option<RawProperties>,
}

#[derive(Deserialize)]
struct RawGeometry {
  #[serde(rename = "type")]
  kind: String,
  coordinates: Value,
}

#[derive(Deserialize)]
struct RawProperties {
  name: Option<String>,
  clothes: Option<String>,
  category: Option<String>,
  opening_ho: Option<String>,
}

impl RawFeature {
  fn into_feature(self, index: usize) -> Result<Feature, DataLoadError> {
    let invalid = |reason: &str| DataLoadError::InvalidFeature {
      index,
      reason: reason.to_string(),
    };

    let geometry = self.geometry.ok_or_else(|| invalid("missing geometry"))?;
    if geometry.kind != "Point" {
      return Err(invalid(&format!("unsupported geometry {}", geometry.kind)));
    }
    let position = point_position(&geometry.coordinates).ok_or_else(|| invalid("bad coordinates"))?;

    let properties = self.properties.ok_or_else(|| invalid("missing properties"))?;
    let clothes = properties.clothes.ok_or_else(|| invalid("missing clothes"))?;
    let category = properties.category.ok_or_else(|| invalid("missing category"))?;

    let mut feature = Feature::new(FeatureId(index), position, clothes, category);
    if let Some(name) = properties.name {
      feature = feature.with_name(name);
    }
    if let Some(opening_hours) = properties.opening_ho {
      feature = feature.with_opening_hours(opening_hours);
    }
    Ok(feature)
  }
}

/// GeoJSON positions are `[lon, lat, (alt)]`.
#[allow(clippy::cast_possible_truncation)]
fn point_position(coordinates: &Value) -> Option<WGS84Coordinate> {
  let lon = coordinates.get(0)?.as_f64()? as f32;
  let lat = coordinates.get(1)?.as_f64()? as f32;
  let position = WGS84Coordinate::new(lat, lon);
  position.is_valid().then_some(position)
}

/// All shops of the session, in document order. Never changes after loading.
#[derive(Debug, Clone, Default)]
pub struct FeatureStore {
  features: Vec<Feature>,
}

impl FeatureStore {
  #[must_use]
  pub fn empty() -> Self {
    Self::default()
  }

  #[must_use]
  pub fn from_features(features: Vec<Feature>) -> Self {
    Self { features }
  }

  /// Parses a complete document. One bad feature rejects the whole document.
  pub fn from_geojson_str(document: &str) -> Result<Self, DataLoadError> {
    let collection: RawCollection = serde_json::from_str(document)?;
    if collection.kind != "FeatureCollection" {
      return Err(DataLoadError::NotAFeatureCollection(collection.kind));
    }
    let features = collection
      .features
      .into_iter()
      .enumerate()
      .map(|(index, raw)| raw.into_feature(index))
      .collect::<Result<Vec<_>, _>>()?;
    Ok(Self { features })
  }

  /// Reads the document exactly once. There are no retries.
  pub async fn load(source: &DataSource) -> Result<Self, DataLoadError> {
    info!("Loading shops from {source}");
    let document = match source {
      DataSource::File(path) => {
        tokio::fs::read_to_string(path)
          .await
          .map_err(|source| DataLoadError::Io {
            path: path.clone(),
            source,
          })?
      }
      DataSource::Url(url) => fetch(url).await?,
    };
    let store = Self::from_geojson_str(&document)?;
    debug!("Loaded {} shops from {source}", store.len());
    Ok(store)
  }

  #[must_use]
  pub fn features(&self) -> &[Feature] {
    &self.features
  }

  #[must_use]
  pub fn get(&self, id: FeatureId) -> Option<&Feature> {
    self.features.get(id.0)
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.features.len()
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.features.is_empty()
  }

  /// Distinct canonical type tokens, sorted.
  #[must_use]
  pub fn type_tokens(&self) -> Vec<String> {
    self
      .features
      .iter()
      .map(Feature::canonical_type)
      .filter(|t| !t.is_empty())
      .unique()
      .sorted()
      .collect()
  }

  /// Distinct lower-cased categories, sorted.
  #[must_use]
  pub fn categories(&self) -> Vec<String> {
    self
      .features
      .iter()
      .map(|f| f.category().to_lowercase())
      .filter(|c| !c.is_empty())
      .unique()
      .sorted()
      .collect()
  }
}

async fn fetch(url: &str) -> Result<String, DataLoadError> {
  let http_error = |reason: String| DataLoadError::Http {
    url: url.to_string(),
    reason,
  };
  let mut response = surf::get(url)
    .await
    .map_err(|e| http_error(e.to_string()))?;
  if !response.status().is_success() {
    return Err(DataLoadError::Status {
      url: url.to_string(),
      status: response.status().into(),
    });
  }
  response
    .body_string()
    .await
    .map_err(|e| http_error(e.to_string()))
}
