use std::ops::{Add, AddAssign, Mul};

use serde::{Deserialize, Serialize};

/// Side length of the canvas all geometry is projected onto.
pub const CANVAS_SIZE: f32 = 2048.;
/// Edge length of one tile on the canvas at zoom level 2.
pub const TILE_SIZE: f32 = 512.;
/// Zoom level at which one canvas unit equals one tile pixel.
const CANVAS_ZOOM: i32 = 2;
const EARTH_RADIUS_METERS: f32 = 6_371_000.;
const PI: f32 = std::f32::consts::PI;

/// Common access to two dimensional values, used by the transform.
pub trait XY:
  Default + Copy + Clone + AddAssign<Self> + Mul<f32, Output = Self> + Add<Self, Output = Self>
{
  fn x(&self) -> f32;
  fn y(&self) -> f32;
  #[must_use]
  fn with_x(self, x: f32) -> Self;
  #[must_use]
  fn with_y(self, y: f32) -> Self;
}

/// A position on the earth, in degrees.
#[derive(Debug, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct WGS84Coordinate {
  #[serde(alias = "latitude")]
  pub lat: f32,
  #[serde(alias = "longitude")]
  pub lon: f32,
}

impl WGS84Coordinate {
  #[must_use]
  pub fn new(lat: f32, lon: f32) -> Self {
    Self { lat, lon }
  }

  #[must_use]
  pub fn is_valid(&self) -> bool {
    (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
  }
}

/// Great circle distance (haversine).
#[must_use]
pub fn distance_in_meters(from: WGS84Coordinate, to: WGS84Coordinate) -> f32 {
  let d_lat = (to.lat - from.lat).to_radians();
  let d_lon = (to.lon - from.lon).to_radians();
  let a = (d_lat / 2.).sin().powi(2)
    + from.lat.to_radians().cos() * to.lat.to_radians().cos() * (d_lon / 2.).sin().powi(2);
  2. * EARTH_RADIUS_METERS * a.sqrt().atan2((1. - a).sqrt())
}

/// A point on the fixed size Web Mercator canvas.
#[derive(Debug, Default, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct PixelCoordinate {
  pub x: f32,
  pub y: f32,
}

impl PixelCoordinate {
  #[must_use]
  pub fn new(x: f32, y: f32) -> Self {
    Self { x, y }
  }
}

/// A pixel in the UI. Converts to and from ``egui::Pos2``.
#[derive(Debug, Default, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct PixelPosition {
  pub x: f32,
  pub y: f32,
}

/// Fractional tile coordinates at some zoom level.
#[derive(Debug, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct TileCoordinate {
  pub x: f32,
  pub y: f32,
  pub zoom: u8,
}

impl TileCoordinate {
  #[must_use]
  pub fn from_coordinate(coord: WGS84Coordinate, zoom: u8) -> Self {
    let n = 2f32.powi(i32::from(zoom));
    let lat = coord.lat.to_radians();
    Self {
      x: (coord.lon + 180.) / 360. * n,
      y: (1. - (lat.tan() + 1. / lat.cos()).ln() / PI) / 2. * n,
      zoom,
    }
  }

  #[must_use]
  pub fn from_pixel_coordinate(pc: PixelCoordinate, zoom: u8) -> Self {
    let scale = 2f32.powi(i32::from(zoom) - CANVAS_ZOOM) / TILE_SIZE;
    Self {
      x: pc.x * scale,
      y: pc.y * scale,
      zoom,
    }
  }
}

impl From<TileCoordinate> for PixelCoordinate {
  fn from(tc: TileCoordinate) -> Self {
    let scale = TILE_SIZE / 2f32.powi(i32::from(tc.zoom) - CANVAS_ZOOM);
    Self {
      x: tc.x * scale,
      y: tc.y * scale,
    }
  }
}

impl From<TileCoordinate> for WGS84Coordinate {
  fn from(tc: TileCoordinate) -> Self {
    let n = 2f32.powi(i32::from(tc.zoom));
    Self {
      lat: (PI * (1. - 2. * tc.y / n)).sinh().atan().to_degrees(),
      lon: tc.x / n * 360. - 180.,
    }
  }
}

impl From<WGS84Coordinate> for PixelCoordinate {
  fn from(coord: WGS84Coordinate) -> Self {
    TileCoordinate::from_coordinate(coord, 2).into()
  }
}

impl From<PixelCoordinate> for WGS84Coordinate {
  fn from(pc: PixelCoordinate) -> Self {
    TileCoordinate::from_pixel_coordinate(pc, 2).into()
  }
}

impl From<egui::Pos2> for PixelPosition {
  fn from(pos: egui::Pos2) -> Self {
    Self { x: pos.x, y: pos.y }
  }
}

impl From<PixelPosition> for egui::Pos2 {
  fn from(pp: PixelPosition) -> Self {
    egui::pos2(pp.x, pp.y)
  }
}

macro_rules! impl_xy {
  ($t:ty) => {
    impl XY for $t {
      fn x(&self) -> f32 {
        self.x
      }

      fn y(&self) -> f32 {
        self.y
      }

      fn with_x(mut self, x: f32) -> Self {
        self.x = x;
        self
      }

      fn with_y(mut self, y: f32) -> Self {
        self.y = y;
        self
      }
    }

    impl Add for $t {
      type Output = Self;

      fn add(self, rhs: Self) -> Self {
        Self {
          x: self.x + rhs.x,
          y: self.y + rhs.y,
        }
      }
    }

    impl AddAssign for $t {
      fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
      }
    }

    impl Mul<f32> for $t {
      type Output = Self;

      fn mul(self, rhs: f32) -> Self {
        Self {
          x: self.x * rhs,
          y: self.y * rhs,
        }
      }
    }
  };
}

impl_xy!(PixelCoordinate);
impl_xy!(PixelPosition);
