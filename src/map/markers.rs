use super::coordinates::WGS84Coordinate;

/// Identifies one placed marker. Handles are never reused, so a feature that is shown again
/// after a filter change gets a new handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerHandle(pub u64);

/// Everything needed to place a marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
  pub position: WGS84Coordinate,
  /// Asset key of the icon, resolved to `<icon dir>/<key>.png`.
  pub icon: String,
  pub popup: String,
  /// Zoom level the map jumps to when the marker is clicked.
  pub click_zoom: Option<u8>,
  pub popup_open: bool,
}

impl MarkerSpec {
  #[must_use]
  pub fn new(position: WGS84Coordinate, icon: impl Into<String>, popup: impl Into<String>) -> Self {
    Self {
      position,
      icon: icon.into(),
      popup: popup.into(),
      click_zoom: None,
      popup_open: false,
    }
  }

  #[must_use]
  pub fn with_click_zoom(mut self, zoom: u8) -> Self {
    self.click_zoom = Some(zoom);
    self
  }

  #[must_use]
  pub fn with_open_popup(mut self) -> Self {
    self.popup_open = true;
    self
  }
}

/// The part of the map the shop logic talks to.
pub trait MarkerSurface {
  /// Attaches a marker at full opacity.
  fn add_marker(&mut self, marker: MarkerSpec) -> MarkerHandle;
  /// Detaches a marker. Unknown or already removed handles are ignored.
  fn remove_marker(&mut self, handle: MarkerHandle);
  /// Whether the marker is attached and has been drawn, i.e. can be faded.
  fn has_element(&self, handle: MarkerHandle) -> bool;
  fn set_opacity(&mut self, handle: MarkerHandle, opacity: f32);
  /// Centers the view on `coordinate` at the given tile zoom level.
  fn focus(&mut self, coordinate: WGS84Coordinate, zoom: u8);
}
