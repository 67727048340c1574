use std::{
  collections::{HashMap, HashSet},
  sync::{Arc, Mutex},
};

use egui::{Color32, ColorImage, Rect, Ui};
use log::{debug, error, info};

use crate::{
  config::Config,
  map::{
    coordinates::{Tile, TileCoordinate, Transform, tiles_in_box},
    map_widget::helpers::{decode_image, level_for_transform},
    tile_loader::{CachedTileLoader, TileLoader},
  },
};

use super::{Layer, LayerProperties};

/// A decoded tile, tagged with the index of the base layer it was loaded for.
type LoadedTile = (usize, Tile, ColorImage);

/// A layer that loads and displays the tiles of the selected base layer.
pub struct TileLayer {
  receiver: std::sync::mpsc::Receiver<LoadedTile>,
  sender: std::sync::mpsc::Sender<LoadedTile>,
  tile_loader_index: usize,
  tile_loader_old_index: usize,
  all_tile_loader: Vec<Arc<CachedTileLoader>>,
  loaded_tiles: HashMap<Tile, egui::TextureHandle>,
  in_flight_tiles: Arc<Mutex<HashSet<Tile>>>,
  ctx: egui::Context,
  layer_properties: LayerProperties,
}

const NAME: &str = "Base layer";

impl TileLayer {
  pub fn from_config(ctx: egui::Context, config: &Config) -> TileLayer {
    let (sender, receiver) = std::sync::mpsc::channel();
    let all_tile_loader: Vec<_> = CachedTileLoader::from_config(config)
      .map(Arc::new)
      .collect();
    if all_tile_loader.is_empty() {
      info!("No tile provider configured, the map has no base layer");
    }
    TileLayer {
      receiver,
      sender,
      tile_loader_index: 0,
      tile_loader_old_index: 0,
      all_tile_loader,
      loaded_tiles: HashMap::new(),
      in_flight_tiles: Arc::new(Mutex::new(HashSet::new())),
      ctx,
      layer_properties: LayerProperties::default(),
    }
  }

  fn tile_loader(&self) -> Option<Arc<CachedTileLoader>> {
    self.all_tile_loader.get(self.tile_loader_index).cloned()
  }

  /// Names of all base layers, in configuration order.
  pub fn provider_names(&self) -> impl Iterator<Item = &str> {
    self.all_tile_loader.iter().map(|l| l.name())
  }

  /// Switches the base layer. Out of range indices are ignored.
  pub fn select_provider(&mut self, index: usize) {
    if index < self.all_tile_loader.len() {
      self.tile_loader_index = index;
    }
  }

  #[must_use]
  pub fn selected_provider(&self) -> Option<&str> {
    self
      .all_tile_loader
      .get(self.tile_loader_index)
      .map(|l| l.name())
  }

  #[must_use]
  pub fn attribution(&self) -> Option<&str> {
    self
      .all_tile_loader
      .get(self.tile_loader_index)
      .map(|l| l.attribution())
      .filter(|a| !a.is_empty())
  }

  fn draw_tile(&self, ui: &mut Ui, rect: Rect, tile: &Tile, transform: &Transform) -> bool {
    if let Some(image_data) = self.loaded_tiles.get(tile) {
      let (nw, se) = tile.position();
      let (nw, se) = (transform.apply(nw), transform.apply(se));
      let tile_rect = Rect::from_min_max(nw.into(), se.into());

      ui.painter_at(rect).image(
        image_data.id(),
        tile_rect,
        Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
        Color32::WHITE,
      );
      return true;
    }
    false
  }

  fn get_tile(&self, tile: Tile) {
    let Some(tile_loader) = self.tile_loader() else {
      return;
    };
    if tile.zoom > tile_loader.max_zoom() || self.loaded_tiles.contains_key(&tile) {
      return;
    }

    if !self.in_flight_tiles.lock().unwrap().insert(tile) {
      return;
    }

    let provider = self.tile_loader_index;
    let sender = self.sender.clone();
    let ctx = self.ctx.clone();
    let in_flight_tiles = self.in_flight_tiles.clone();
    tokio::spawn(async move {
      let image = match tile_loader.tile_data(&tile).await {
        Ok(data) => tokio::task::spawn_blocking(move || decode_image(&data)).await,
        Err(e) => {
          debug!("Failed to fetch tile {tile:?}: {e}");
          in_flight_tiles.lock().unwrap().remove(&tile);
          return;
        }
      };

      match image {
        Ok(Ok(image)) => {
          if sender.send((provider, tile, image)).is_ok() {
            ctx.request_repaint();
          }
        }
        Ok(Err(e)) => error!("Failed to decode tile {tile:?}: {e}"),
        Err(e) => error!("Decoding of tile {tile:?} panicked: {e}"),
      }
      in_flight_tiles.lock().unwrap().remove(&tile);
    });
  }

  fn apply_provider_switch(&mut self) {
    if self.tile_loader_index == self.tile_loader_old_index {
      return;
    }
    info!(
      "Base layer switched to {}, clearing {} tiles",
      self.selected_provider().unwrap_or_default(),
      self.loaded_tiles.len()
    );
    self.loaded_tiles.clear();
    self.in_flight_tiles.lock().unwrap().clear();
    self.tile_loader_old_index = self.tile_loader_index;
  }

  /// Takes over decoded tiles. Tiles of a previously selected base layer are dropped.
  fn collect_new_tile_data(&mut self) {
    for (provider, tile, image) in self.receiver.try_iter() {
      if provider != self.tile_loader_index {
        debug!("Dropping tile {tile:?} of a previous base layer");
        continue;
      }
      let handle = self.ctx.load_texture(
        format!("{}-{}-{}", tile.zoom, tile.x, tile.y),
        image,
        egui::TextureOptions::default(),
      );
      self.loaded_tiles.insert(tile, handle);
    }
  }
}

impl Layer for TileLayer {
  fn draw(&mut self, ui: &mut Ui, transform: &Transform, rect: Rect) {
    self.apply_provider_switch();
    self.collect_new_tile_data();

    let Some(tile_loader) = self.tile_loader() else {
      return;
    };
    if !self.visible() {
      return;
    }

    let zoom = level_for_transform(transform, &rect).min(tile_loader.max_zoom());
    let inv = transform.invert();
    let min_pos = TileCoordinate::from_pixel_coordinate(inv.apply(rect.min.into()), zoom);
    let max_pos = TileCoordinate::from_pixel_coordinate(inv.apply(rect.max.into()), zoom);

    for tile in tiles_in_box(min_pos, max_pos) {
      self.get_tile(tile);
    }

    // Parents stand in for tiles that are not loaded yet. Coarser tiles are drawn first to
    // have detailed textures on top.
    let mut tiles_to_draw = tiles_in_box(min_pos, max_pos)
      .filter_map(|mut tile| {
        while !self.loaded_tiles.contains_key(&tile) {
          tile = tile.parent()?;
        }
        Some(tile)
      })
      .collect::<Vec<_>>();
    tiles_to_draw.sort_unstable_by_key(|tile| tile.zoom);
    tiles_to_draw.dedup();

    for tile in tiles_to_draw {
      self.draw_tile(ui, rect, &tile, transform);
    }
  }

  fn name(&self) -> &str {
    NAME
  }

  fn visible(&self) -> bool {
    self.layer_properties.visible
  }

  fn ui_content(&mut self, ui: &mut Ui) {
    let names: Vec<String> = self.provider_names().map(str::to_string).collect();
    for (i, name) in names.into_iter().enumerate() {
      ui.radio_value(&mut self.tile_loader_index, i, name);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::TileProvider;

  fn config(providers: &[&str]) -> Config {
    let mut config = Config::default();
    config.tile_cache_dir = None;
    config.tile_provider = providers
      .iter()
      .map(|name| TileProvider {
        name: (*name).to_string(),
        url: format!("https://{name}.example.com/{{z}}/{{x}}/{{y}}.png"),
        attribution: format!("© {name}"),
        max_zoom: Some(19),
      })
      .collect();
    config
  }

  #[tokio::test]
  async fn switches_between_base_layers() {
    let mut layer = TileLayer::from_config(egui::Context::default(), &config(&["positron", "osm"]));
    assert_eq!(layer.provider_names().collect::<Vec<_>>(), ["positron", "osm"]);
    assert_eq!(layer.selected_provider(), Some("positron"));
    assert_eq!(layer.attribution(), Some("© positron"));

    layer.select_provider(1);
    assert_eq!(layer.selected_provider(), Some("osm"));
    layer.select_provider(7);
    assert_eq!(layer.selected_provider(), Some("osm"));
  }

  #[tokio::test]
  async fn drops_tiles_of_the_previous_base_layer() {
    let mut layer = TileLayer::from_config(egui::Context::default(), &config(&["positron", "osm"]));
    let tile = Tile {
      x: 8_813,
      y: 5_754,
      zoom: 14,
    };
    let image = || ColorImage::from_rgba_unmultiplied([4, 4], &[255; 64]);
    layer.in_flight_tiles.lock().unwrap().insert(tile);

    layer.select_provider(1);
    layer.apply_provider_switch();
    assert!(layer.in_flight_tiles.lock().unwrap().is_empty());

    // The download started for positron finishes after the switch.
    layer.sender.send((0, tile, image())).expect("receiver alive");
    layer.collect_new_tile_data();
    assert_eq!(layer.selected_provider(), Some("osm"));
    assert!(!layer.loaded_tiles.contains_key(&tile));

    layer.sender.send((1, tile, image())).expect("receiver alive");
    layer.collect_new_tile_data();
    assert!(layer.loaded_tiles.contains_key(&tile));
  }

  #[tokio::test]
  async fn works_without_providers() {
    let layer = TileLayer::from_config(egui::Context::default(), &config(&[]));
    assert_eq!(layer.selected_provider(), None);
    assert_eq!(layer.attribution(), None);
  }
}
