use serde::{Deserialize, Serialize};

use super::{PixelCoordinate, TileCoordinate};

/// A tile of the Web Mercator tile pyramid.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Serialize, Deserialize)]
pub struct Tile {
  pub x: u32,
  pub y: u32,
  pub zoom: u8,
}

impl Tile {
  #[must_use]
  pub fn exists(&self) -> bool {
    let tiles_per_side = 1u64 << self.zoom;
    u64::from(self.x) < tiles_per_side && u64::from(self.y) < tiles_per_side
  }

  /// The tile covering this one on the next coarser zoom level.
  #[must_use]
  pub fn parent(&self) -> Option<Self> {
    (self.zoom > 0).then(|| Self {
      x: self.x >> 1,
      y: self.y >> 1,
      zoom: self.zoom - 1,
    })
  }

  /// North-west and south-east corner on the canvas.
  #[must_use]
  #[allow(clippy::cast_precision_loss)]
  pub fn position(&self) -> (PixelCoordinate, PixelCoordinate) {
    let corner = |x: u32, y: u32| {
      PixelCoordinate::from(TileCoordinate {
        x: x as f32,
        y: y as f32,
        zoom: self.zoom,
      })
    };
    (corner(self.x, self.y), corner(self.x + 1, self.y + 1))
  }
}

impl From<TileCoordinate> for Tile {
  #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
  fn from(tc: TileCoordinate) -> Self {
    Self {
      x: tc.x.max(0.).floor() as u32,
      y: tc.y.max(0.).floor() as u32,
      zoom: tc.zoom,
    }
  }
}

/// All existing tiles between two corners, row by row.
pub fn tiles_in_box(nw: TileCoordinate, se: TileCoordinate) -> impl Iterator<Item = Tile> {
  let nw = Tile::from(nw);
  let se = Tile::from(se);
  (nw.y..=se.y)
    .flat_map(move |y| {
      (nw.x..=se.x).map(move |x| Tile {
        x,
        y,
        zoom: nw.zoom,
      })
    })
    .filter(Tile::exists)
}
