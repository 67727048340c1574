use crate::map::coordinates::Transform;
use egui::{Rect, Ui};

/// Draws the shop and location markers with their popups.
mod marker_layer;
/// Draws the base map.
mod tile_layer;

pub use marker_layer::MarkerLayer;
pub use tile_layer::TileLayer;

/// A layer represents everything that can be summarized as a logical unit on the map.
/// E.g. a layer to draw the map tiles and one to draw the markers.
pub trait Layer {
  fn draw(&mut self, ui: &mut Ui, transform: &Transform, rect: Rect);
  fn name(&self) -> &str;
  fn visible(&self) -> bool;
  /// Controls shown in the layer switcher.
  fn ui_content(&mut self, ui: &mut Ui);
}

/// Common properties for all layers.
pub struct LayerProperties {
  pub visible: bool,
}

impl Default for LayerProperties {
  fn default() -> Self {
    Self { visible: true }
  }
}
