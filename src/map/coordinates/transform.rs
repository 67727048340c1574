use std::marker::PhantomData;

use super::XY;

/// A scale-then-translate transform between two kinds of 2D values, typed so that canvas
/// coordinates and screen pixels cannot be mixed up.
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct TTransform<F: XY, T: XY> {
  pub zoom: f32,
  pub trans: T,
  phantom_data: PhantomData<F>,
}

impl<F: XY, T: XY> Default for TTransform<F, T> {
  fn default() -> Self {
    Self {
      zoom: 1.,
      trans: T::default(),
      phantom_data: PhantomData,
    }
  }
}

fn convert<F: XY, T: XY>(from: F) -> T {
  T::default().with_x(from.x()).with_y(from.y())
}

impl<F: XY, T: XY> TTransform<F, T> {
  /// A transform that has not been fitted to a screen yet.
  #[must_use]
  pub fn invalid() -> Self {
    Self {
      zoom: 0.,
      trans: T::default(),
      phantom_data: PhantomData,
    }
  }

  #[must_use]
  pub fn is_invalid(&self) -> bool {
    self.zoom == 0. || self.zoom.is_nan()
  }

  pub fn zoom(&mut self, factor: f32) -> &mut Self {
    self.zoom *= factor;
    self
  }

  pub fn translate(&mut self, delta: T) -> &mut Self {
    self.trans += delta;
    self
  }

  #[must_use]
  pub fn invert(self) -> TTransform<T, F> {
    TTransform {
      zoom: 1. / self.zoom,
      trans: convert::<T, F>(self.trans) * (-1. / self.zoom),
      phantom_data: PhantomData,
    }
  }

  pub fn apply(&self, from: F) -> T {
    convert::<F, T>(from * self.zoom) + self.trans
  }
}
