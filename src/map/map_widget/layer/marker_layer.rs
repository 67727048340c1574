use std::{
  collections::{BTreeMap, HashMap},
  path::PathBuf,
  sync::mpsc::{Receiver, Sender},
};

use egui::{Align2, Color32, ColorImage, Pos2, Rect, Stroke, Ui, Vec2};
use log::{debug, warn};

use crate::map::{
  coordinates::{PixelCoordinate, Transform},
  map_widget::helpers::decode_image,
  markers::{MarkerHandle, MarkerSpec},
};

use super::{Layer, LayerProperties};

const ICON_SIZE: Vec2 = Vec2::splat(30.);
const FALLBACK_RADIUS: f32 = 7.;

enum Icon {
  Loading,
  Ready(egui::TextureHandle),
  Missing,
}

/// Icons by asset key, read from `<dir>/<key>.png` in the background.
struct IconCache {
  dir: PathBuf,
  icons: HashMap<String, Icon>,
  sender: Sender<(String, Option<ColorImage>)>,
  receiver: Receiver<(String, Option<ColorImage>)>,
  ctx: egui::Context,
}

impl IconCache {
  fn new(ctx: egui::Context, dir: PathBuf) -> Self {
    let (sender, receiver) = std::sync::mpsc::channel();
    Self {
      dir,
      icons: HashMap::new(),
      sender,
      receiver,
      ctx,
    }
  }

  fn collect(&mut self) {
    for (key, image) in self.receiver.try_iter() {
      let icon = match image {
        Some(image) => Icon::Ready(self.ctx.load_texture(
          format!("icon-{key}"),
          image,
          egui::TextureOptions::default(),
        )),
        None => Icon::Missing,
      };
      self.icons.insert(key, icon);
    }
  }

  fn get(&mut self, key: &str) -> Option<&egui::TextureHandle> {
    if !self.icons.contains_key(key) {
      self.icons.insert(key.to_string(), Icon::Loading);
      self.load(key);
    }
    match self.icons.get(key) {
      Some(Icon::Ready(texture)) => Some(texture),
      _ => None,
    }
  }

  fn load(&self, key: &str) {
    let path = self.dir.join(format!("{key}.png"));
    let key = key.to_string();
    let sender = self.sender.clone();
    let ctx = self.ctx.clone();
    tokio::spawn(async move {
      let image = match tokio::fs::read(&path).await {
        Ok(data) => decode_image(&data)
          .inspect_err(|e| warn!("Icon {} is not an image: {e}", path.display()))
          .ok(),
        Err(e) => {
          warn!("Icon {} not found, using fallback pin: {e}", path.display());
          None
        }
      };
      let _ = sender.send((key, image));
      ctx.request_repaint();
    });
  }
}

struct PlacedMarker {
  spec: MarkerSpec,
  opacity: f32,
  popup_open: bool,
}

/// Holds the markers placed on the map. Handles grow monotonically, so iteration order is
/// placement order and later markers are drawn on top.
pub struct MarkerLayer {
  markers: BTreeMap<MarkerHandle, PlacedMarker>,
  next_handle: u64,
  mounted: bool,
  icons: IconCache,
  layer_properties: LayerProperties,
}

const NAME: &str = "Markers";

/// Icon rectangle, anchored bottom centre at the marker position.
fn icon_rect(position: PixelCoordinate, transform: &Transform) -> Rect {
  let anchor: Pos2 = transform.apply(position).into();
  Rect::from_min_size(
    anchor - Vec2::new(ICON_SIZE.x / 2., ICON_SIZE.y),
    ICON_SIZE,
  )
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn alpha(opacity: f32) -> u8 {
  (opacity.clamp(0., 1.) * 255.).round() as u8
}

impl MarkerLayer {
  pub fn new(ctx: egui::Context, icon_dir: PathBuf) -> Self {
    Self {
      markers: BTreeMap::new(),
      next_handle: 0,
      mounted: false,
      icons: IconCache::new(ctx, icon_dir),
      layer_properties: LayerProperties::default(),
    }
  }

  pub fn add(&mut self, spec: MarkerSpec) -> MarkerHandle {
    let handle = MarkerHandle(self.next_handle);
    self.next_handle += 1;
    debug!("Placing marker {handle:?} with icon {}", spec.icon);
    self.markers.insert(
      handle,
      PlacedMarker {
        popup_open: spec.popup_open,
        spec,
        opacity: 1.,
      },
    );
    handle
  }

  pub fn remove(&mut self, handle: MarkerHandle) {
    self.markers.remove(&handle);
  }

  /// Markers can only be faded after the layer has been drawn once.
  #[must_use]
  pub fn has_element(&self, handle: MarkerHandle) -> bool {
    self.mounted && self.markers.contains_key(&handle)
  }

  pub fn set_opacity(&mut self, handle: MarkerHandle, opacity: f32) {
    if let Some(marker) = self.markers.get_mut(&handle) {
      marker.opacity = opacity.clamp(0., 1.);
    }
  }

  #[must_use]
  pub fn opacity(&self, handle: MarkerHandle) -> Option<f32> {
    self.markers.get(&handle).map(|m| m.opacity)
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.markers.len()
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.markers.is_empty()
  }

  #[must_use]
  pub fn spec(&self, handle: MarkerHandle) -> Option<&MarkerSpec> {
    self.markers.get(&handle).map(|m| &m.spec)
  }

  #[must_use]
  pub fn is_popup_open(&self, handle: MarkerHandle) -> bool {
    self.markers.get(&handle).is_some_and(|m| m.popup_open)
  }

  /// The top-most visible marker whose icon covers `pos`.
  #[must_use]
  pub fn marker_at(&self, pos: Pos2, transform: &Transform) -> Option<MarkerHandle> {
    if !self.visible() {
      return None;
    }
    self
      .markers
      .iter()
      .rev()
      .filter(|(_, m)| m.opacity > 0.)
      .find(|(_, m)| icon_rect(m.spec.position.into(), transform).contains(pos))
      .map(|(handle, _)| *handle)
  }

  /// Opens the popup of `handle` and closes all others.
  pub fn open_popup(&mut self, handle: MarkerHandle) {
    for (h, marker) in &mut self.markers {
      marker.popup_open = *h == handle;
    }
  }

  pub fn close_popups(&mut self) {
    for marker in self.markers.values_mut() {
      marker.popup_open = false;
    }
  }

  fn draw_marker(&mut self, ui: &Ui, clip: Rect, handle: MarkerHandle, transform: &Transform) {
    let Some(marker) = self.markers.get(&handle) else {
      return;
    };
    let rect = icon_rect(marker.spec.position.into(), transform);
    if !rect.intersects(clip) || marker.opacity <= 0. {
      return;
    }
    let opacity = marker.opacity;
    let icon = marker.spec.icon.clone();

    let painter = ui.painter_at(clip);
    if let Some(texture) = self.icons.get(&icon) {
      painter.image(
        texture.id(),
        rect,
        Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
        Color32::from_white_alpha(alpha(opacity)),
      );
    } else {
      let center = egui::pos2(rect.center().x, rect.max.y - FALLBACK_RADIUS);
      painter.circle(
        center,
        FALLBACK_RADIUS,
        Color32::from_rgb(70, 110, 200).gamma_multiply(opacity),
        Stroke::new(1.5, Color32::WHITE.gamma_multiply(opacity)),
      );
    }
  }

  fn draw_popup(&mut self, ui: &Ui, handle: MarkerHandle, transform: &Transform) {
    let Some(marker) = self.markers.get(&handle) else {
      return;
    };
    let anchor = icon_rect(marker.spec.position.into(), transform).center_top();
    let mut lines = marker.spec.popup.lines();
    let title = lines.next().unwrap_or_default().to_string();
    let body: Vec<String> = lines.map(str::to_string).collect();

    let mut close = false;
    egui::Area::new(egui::Id::new(("marker_popup", handle.0)))
      .fixed_pos(anchor - Vec2::new(0., 4.))
      .pivot(Align2::CENTER_BOTTOM)
      .order(egui::Order::Foreground)
      .show(ui.ctx(), |ui| {
        egui::Frame::popup(ui.style()).show(ui, |ui| {
          ui.horizontal(|ui| {
            ui.strong(&title);
            if ui.small_button("×").clicked() {
              close = true;
            }
          });
          for line in &body {
            ui.label(line);
          }
        });
      });

    if close && let Some(marker) = self.markers.get_mut(&handle) {
      marker.popup_open = false;
    }
  }
}

impl Layer for MarkerLayer {
  fn draw(&mut self, ui: &mut Ui, transform: &Transform, rect: Rect) {
    self.mounted = true;
    self.icons.collect();
    if !self.visible() {
      return;
    }

    let handles: Vec<MarkerHandle> = self.markers.keys().copied().collect();
    for handle in &handles {
      self.draw_marker(ui, rect, *handle, transform);
    }
    for handle in handles {
      if self.is_popup_open(handle) {
        self.draw_popup(ui, handle, transform);
      }
    }
  }

  fn name(&self) -> &str {
    NAME
  }

  fn visible(&self) -> bool {
    self.layer_properties.visible
  }

  fn ui_content(&mut self, ui: &mut Ui) {
    ui.checkbox(&mut self.layer_properties.visible, "Shops");
  }
}
