use std::collections::BTreeMap;

use super::feature::{Feature, FeatureId};
use crate::map::{
  coordinates::WGS84Coordinate,
  markers::{MarkerHandle, MarkerSpec, MarkerSurface},
};

pub const SHOPS_GEOJSON: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "geometry": {"type": "Point", "coordinates": [13.04, 47.8]},
      "properties": {
        "name": "Alpha Boutique",
        "clothes": "shoes, sport",
        "category": "Sport",
        "opening_ho": "Mo-Sa 10:00-18:00"
      }
    },
    {
      "type": "Feature",
      "geometry": {"type": "Point", "coordinates": [13.045, 47.805]},
      "properties": {
        "name": "Beta Shirts",
        "clothes": "shirts",
        "category": "Casual",
        "opening_ho": "Mo-Fr 09:00-19:00"
      }
    },
    {
      "type": "Feature",
      "geometry": {"type": "Point", "coordinates": [13.05, 47.81]},
      "properties": {
        "name": null,
        "clothes": "Jackets",
        "category": "Casual",
        "opening_ho": null
      }
    }
  ]
}"#;

pub fn sample_features() -> Vec<Feature> {
  vec![
    Feature::new(
      FeatureId(0),
      WGS84Coordinate::new(47.8, 13.04),
      "shoes, sport",
      "Sport",
    )
    .with_name("Alpha Boutique"),
    Feature::new(
      FeatureId(1),
      WGS84Coordinate::new(47.805, 13.045),
      "shirts",
      "Casual",
    )
    .with_name("Beta Shirts"),
    Feature::new(
      FeatureId(2),
      WGS84Coordinate::new(47.81, 13.05),
      "Jackets",
      "Casual",
    ),
  ]
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedMarker {
  pub spec: MarkerSpec,
  pub opacity: f32,
}

/// Records what the shop logic does to the map.
#[derive(Debug, Default)]
pub struct RecordingSurface {
  /// Whether markers get a drawable element, like a map that has been shown.
  pub mounted: bool,
  pub markers: BTreeMap<MarkerHandle, PlacedMarker>,
  pub removals: Vec<MarkerHandle>,
  pub focus: Vec<(WGS84Coordinate, u8)>,
  next_handle: u64,
}

impl RecordingSurface {
  pub fn mounted() -> Self {
    Self {
      mounted: true,
      ..Self::default()
    }
  }

  pub fn icons(&self) -> Vec<&str> {
    self.markers.values().map(|m| m.spec.icon.as_str()).collect()
  }

  pub fn opacity(&self, handle: MarkerHandle) -> Option<f32> {
    self.markers.get(&handle).map(|m| m.opacity)
  }
}

impl MarkerSurface for RecordingSurface {
  fn add_marker(&mut self, marker: MarkerSpec) -> MarkerHandle {
    let handle = MarkerHandle(self.next_handle);
    self.next_handle += 1;
    self.markers.insert(
      handle,
      PlacedMarker {
        spec: marker,
        opacity: 1.,
      },
    );
    handle
  }

  fn remove_marker(&mut self, handle: MarkerHandle) {
    self.removals.push(handle);
    self.markers.remove(&handle);
  }

  fn has_element(&self, handle: MarkerHandle) -> bool {
    self.mounted && self.markers.contains_key(&handle)
  }

  fn set_opacity(&mut self, handle: MarkerHandle, opacity: f32) {
    if let Some(marker) = self.markers.get_mut(&handle) {
      marker.opacity = opacity;
    }
  }

  fn focus(&mut self, coordinate: WGS84Coordinate, zoom: u8) {
    self.focus.push((coordinate, zoom));
  }
}
