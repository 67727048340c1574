mod coords;
mod tiles;
mod transform;

/// Geographic, canvas and screen coordinates.
pub use coords::*;
/// Web Mercator tiles.
pub use tiles::*;
use transform::TTransform;

/// Maps canvas coordinates to screen pixels.
pub type Transform = TTransform<PixelCoordinate, PixelPosition>;
