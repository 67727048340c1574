use egui::{Align2, Rect, Response, Sense, Ui, Widget};
use helpers::{
  MAX_ZOOM, MIN_ZOOM, fit_to_screen, set_coordinate_to_pixel, transform_zoom_for_level,
};
use layer::{Layer, MarkerLayer, TileLayer};
use log::{debug, info};

use super::{
  coordinates::{PixelCoordinate, PixelPosition, Transform, WGS84Coordinate},
  markers::{MarkerHandle, MarkerSpec, MarkerSurface},
};
use crate::config::Config;

mod helpers;
mod layer;
/// Metric scale bar.
mod scale_bar;

/// Salzburg old town.
pub const INITIAL_CENTER: WGS84Coordinate = WGS84Coordinate {
  lat: 47.8011,
  lon: 13.0439,
};
pub const INITIAL_ZOOM: u8 = 14;

/// The slippy map: a base layer with markers on top.
pub struct Map {
  transform: Transform,
  tile_layer: TileLayer,
  marker_layer: MarkerLayer,
  pending_focus: Option<(WGS84Coordinate, u8)>,
  ctx: egui::Context,
}

impl Map {
  #[must_use]
  pub fn new(ctx: egui::Context, config: &Config) -> Self {
    Self {
      transform: Transform::invalid(),
      tile_layer: TileLayer::from_config(ctx.clone(), config),
      marker_layer: MarkerLayer::new(ctx.clone(), config.icon_dir()),
      pending_focus: Some((INITIAL_CENTER, INITIAL_ZOOM)),
      ctx,
    }
  }

  fn layers(&mut self) -> [&mut dyn Layer; 2] {
    [&mut self.tile_layer, &mut self.marker_layer]
  }

  #[must_use]
  pub fn marker_count(&self) -> usize {
    self.marker_layer.len()
  }

  #[must_use]
  pub fn marker(&self, handle: MarkerHandle) -> Option<&MarkerSpec> {
    self.marker_layer.spec(handle)
  }

  #[must_use]
  pub fn marker_opacity(&self, handle: MarkerHandle) -> Option<f32> {
    self.marker_layer.opacity(handle)
  }

  #[must_use]
  pub fn is_popup_open(&self, handle: MarkerHandle) -> bool {
    self.marker_layer.is_popup_open(handle)
  }

  #[must_use]
  pub fn base_layer(&self) -> Option<&str> {
    self.tile_layer.selected_provider()
  }

  pub fn select_base_layer(&mut self, index: usize) {
    self.tile_layer.select_provider(index);
  }

  /// The view waiting to be applied on the next frame, if any.
  #[must_use]
  pub fn pending_focus(&self) -> Option<(WGS84Coordinate, u8)> {
    self.pending_focus
  }

  fn focus_on_coordinate(&mut self, coordinate: WGS84Coordinate, level: u8, rect: Rect) {
    self.transform.zoom = transform_zoom_for_level(level, &rect);
    set_coordinate_to_pixel(
      PixelCoordinate::from(coordinate),
      rect.center().into(),
      &mut self.transform,
    );
    info!(
      "Focused on {:.4}, {:.4} at zoom level {level}",
      coordinate.lat, coordinate.lon
    );
  }

  fn handle_keys(&mut self, ui: &Ui, rect: Rect) {
    if ui.ctx().wants_keyboard_input() {
      return;
    }
    let keys = ui.input(|i| {
      i.events
        .iter()
        .filter_map(|e| match e {
          egui::Event::Key {
            key, pressed: true, ..
          } => Some(*key),
          _ => None,
        })
        .collect::<Vec<_>>()
    });
    for key in keys {
      match key {
        egui::Key::ArrowDown => {
          self.transform.translate(PixelPosition { x: 0., y: -10. });
        }
        egui::Key::ArrowLeft => {
          self.transform.translate(PixelPosition { x: 10., y: 0. });
        }
        egui::Key::ArrowRight => {
          self.transform.translate(PixelPosition { x: -10., y: 0. });
        }
        egui::Key::ArrowUp => {
          self.transform.translate(PixelPosition { x: 0., y: 10. });
        }
        egui::Key::Minus => self.zoom_with_center(0.9, rect.center().into()),
        egui::Key::Plus | egui::Key::Equals => {
          self.zoom_with_center(1. / 0.9, rect.center().into());
        }
        _ => debug!("Unhandled key pressed: {key:?}"),
      }
    }
  }

  fn handle_mouse_wheel(&mut self, ui: &Ui, response: &Response) {
    if response.hovered() {
      let delta = ui
        .input(|i| {
          i.events.iter().find_map(|e| match e {
            egui::Event::MouseWheel { delta, .. } => Some(*delta),
            _ => None,
          })
        })
        .map(|d| (d.y + 1.).clamp(0.8, 1.4).sqrt());
      if let Some(delta) = delta {
        let cursor = response.hover_pos().unwrap_or_default().into();
        self.zoom_with_center(delta, cursor);
      }
    }
  }

  fn zoom_with_center(&mut self, delta: f32, center: PixelPosition) {
    if self.transform.zoom * delta < MIN_ZOOM || self.transform.zoom * delta > MAX_ZOOM {
      return;
    }
    let hover_coord: PixelCoordinate = self.transform.invert().apply(center);
    self.transform.zoom(delta);
    set_coordinate_to_pixel(hover_coord, center, &mut self.transform);
  }

  fn handle_click(&mut self, response: &Response) {
    if !response.clicked() {
      return;
    }
    let Some(pos) = response.interact_pointer_pos() else {
      return;
    };
    match self.marker_layer.marker_at(pos, &self.transform) {
      Some(handle) => {
        self.marker_layer.open_popup(handle);
        if let Some(spec) = self.marker_layer.spec(handle)
          && let Some(zoom) = spec.click_zoom
        {
          self.pending_focus = Some((spec.position, zoom));
        }
      }
      None => self.marker_layer.close_popups(),
    }
  }

  fn show_layer_control(&mut self, ui: &Ui, rect: Rect) {
    egui::Area::new(egui::Id::new("layer_control"))
      .fixed_pos(rect.right_top() + egui::vec2(-10., 10.))
      .pivot(Align2::RIGHT_TOP)
      .order(egui::Order::Foreground)
      .show(ui.ctx(), |ui| {
        egui::Frame::popup(ui.style()).show(ui, |ui| {
          for layer in self.layers() {
            ui.strong(layer.name().to_owned());
            layer.ui_content(ui);
          }
        });
      });
  }

  fn show_attribution(&self, ui: &Ui, rect: Rect) {
    if let Some(attribution) = self.tile_layer.attribution() {
      ui.painter_at(rect).text(
        rect.right_bottom() - egui::vec2(4., 4.),
        Align2::RIGHT_BOTTOM,
        attribution,
        egui::FontId::proportional(10.),
        egui::Color32::from_gray(60),
      );
    }
  }
}

impl Widget for &mut Map {
  fn ui(self, ui: &mut Ui) -> Response {
    let size = ui.available_size();
    let (rect, response) = ui.allocate_exact_size(size, Sense::click_and_drag());

    if self.transform.is_invalid() {
      self.transform = Transform::default();
      fit_to_screen(&mut self.transform, &rect);
    }
    if let Some((coordinate, level)) = self.pending_focus.take() {
      self.focus_on_coordinate(coordinate, level, rect);
    }

    self.handle_mouse_wheel(ui, &response);
    self.handle_keys(ui, rect);
    self.handle_click(&response);

    if response.dragged() {
      self.transform.translate(PixelPosition {
        x: response.drag_delta().x,
        y: response.drag_delta().y,
      });
    }

    fit_to_screen(&mut self.transform, &rect);

    if ui.is_rect_visible(rect) {
      let transform = self.transform;
      for layer in self.layers() {
        layer.draw(ui, &transform, rect);
      }
      scale_bar::draw(ui, &self.transform, rect);
      self.show_attribution(ui, rect);
      self.show_layer_control(ui, rect);
    }

    // A click on a marker moves the view, apply it right away.
    if self.pending_focus.is_some() {
      self.ctx.request_repaint();
    }

    response
  }
}

impl MarkerSurface for Map {
  fn add_marker(&mut self, marker: MarkerSpec) -> MarkerHandle {
    self.marker_layer.add(marker)
  }

  fn remove_marker(&mut self, handle: MarkerHandle) {
    self.marker_layer.remove(handle);
  }

  fn has_element(&self, handle: MarkerHandle) -> bool {
    self.marker_layer.has_element(handle)
  }

  fn set_opacity(&mut self, handle: MarkerHandle, opacity: f32) {
    self.marker_layer.set_opacity(handle, opacity);
  }

  fn focus(&mut self, coordinate: WGS84Coordinate, zoom: u8) {
    self.pending_focus = Some((coordinate, zoom));
    self.ctx.request_repaint();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::TileProvider;

  fn config() -> Config {
    let mut config = Config::default();
    config.tile_cache_dir = None;
    config.icon_dir = Some(std::path::PathBuf::from("does-not-exist"));
    config.tile_provider = ["positron", "osm"]
      .iter()
      .map(|name| TileProvider {
        name: (*name).to_string(),
        url: format!("https://{name}.example.com/{{z}}/{{x}}/{{y}}.png"),
        attribution: String::new(),
        max_zoom: Some(19),
      })
      .collect();
    config
  }

  /// Runs one frame with the map filling an 800x600 screen.
  fn frame(ctx: &egui::Context, map: &mut Map, time: &mut f64, events: Vec<egui::Event>) {
    *time += 0.05;
    let input = egui::RawInput {
      screen_rect: Some(Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(800., 600.))),
      time: Some(*time),
      events,
      ..Default::default()
    };
    let _ = ctx.run(input, |ctx| {
      egui::CentralPanel::default()
        .frame(egui::Frame::NONE)
        .show(ctx, |ui| {
          (&mut *map).ui(ui);
        });
    });
  }

  fn click(ctx: &egui::Context, map: &mut Map, time: &mut f64, pos: egui::Pos2) {
    let button = |pressed| egui::Event::PointerButton {
      pos,
      button: egui::PointerButton::Primary,
      pressed,
      modifiers: egui::Modifiers::NONE,
    };
    frame(ctx, map, time, vec![egui::Event::PointerMoved(pos), button(true)]);
    frame(ctx, map, time, vec![button(false)]);
  }

  #[tokio::test]
  async fn marker_click_opens_popup_and_zooms_in() {
    let ctx = egui::Context::default();
    let mut map = Map::new(ctx.clone(), &config());
    let mut time = 0.;
    let handle = map.add_marker(
      MarkerSpec::new(INITIAL_CENTER, "shoes", "Alpha Boutique\nType: shoes").with_click_zoom(17),
    );

    frame(&ctx, &mut map, &mut time, Vec::new());
    assert!(map.pending_focus().is_none());
    assert!(map.has_element(handle));

    // The icon sits above its position, which is in the centre of the screen.
    click(&ctx, &mut map, &mut time, egui::pos2(400., 285.));
    assert!(map.is_popup_open(handle));
    assert_eq!(map.pending_focus(), Some((INITIAL_CENTER, 17)));

    frame(&ctx, &mut map, &mut time, Vec::new());
    assert!(map.pending_focus().is_none());

    click(&ctx, &mut map, &mut time, egui::pos2(100., 500.));
    assert!(!map.is_popup_open(handle));
    assert!(map.pending_focus().is_none());
  }

  #[tokio::test]
  async fn markers_keep_their_opacity() {
    let ctx = egui::Context::default();
    let mut map = Map::new(ctx.clone(), &config());
    let handle = map.add_marker(MarkerSpec::new(INITIAL_CENTER, "shirts", "Beta Shirts"));
    assert_eq!(map.marker_opacity(handle), Some(1.));

    map.set_opacity(handle, 0.4);
    assert_eq!(map.marker_opacity(handle), Some(0.4));
    assert_eq!(map.marker(handle).map(|m| m.icon.as_str()), Some("shirts"));

    map.remove_marker(handle);
    assert_eq!(map.marker_opacity(handle), None);
    assert_eq!(map.marker_count(), 0);
  }

  #[tokio::test]
  async fn base_layer_can_be_switched() {
    let mut map = Map::new(egui::Context::default(), &config());
    assert_eq!(map.base_layer(), Some("positron"));
    map.select_base_layer(1);
    assert_eq!(map.base_layer(), Some("osm"));
  }
}
