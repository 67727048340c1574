use egui::{ColorImage, Rect};

use crate::map::coordinates::{CANVAS_SIZE, PixelCoordinate, PixelPosition, TILE_SIZE, Transform};

pub const MAX_ZOOM: f32 = 524_288.;
pub const MIN_ZOOM: f32 = 1.;

/// Sets a coordinate to the position in the map.
pub(crate) fn set_coordinate_to_pixel(
  coord: PixelCoordinate,
  cursor: PixelPosition,
  transform: &mut Transform,
) {
  let current_pos_in_gui = coordinate_to_point(coord, transform);
  transform.translate(current_pos_in_gui * (-1.) + cursor);
}

/// Converts a point, e.g. from a click, to a coordinate.
pub(crate) fn point_to_coordinate(point: PixelPosition, transform: &Transform) -> PixelCoordinate {
  let inv = transform.invert();
  inv.apply(point)
}

/// Converts a coordinate to a point on the screen.
pub(crate) fn coordinate_to_point(point: PixelCoordinate, transform: &Transform) -> PixelPosition {
  transform.apply(point)
}

/// Keeps the zoom in range and the canvas on the screen.
pub(crate) fn fit_to_screen(transform: &mut Transform, rect: &Rect) {
  transform.zoom = transform.zoom.clamp(MIN_ZOOM, MAX_ZOOM);

  let inv = transform.invert();
  let PixelCoordinate { x, y } = inv.apply(rect.min.into());
  if x < 0. || y < 0. {
    transform.translate(
      PixelPosition {
        x: x.min(0.),
        y: y.min(0.),
      } * transform.zoom,
    );
  }

  let inv = transform.invert();
  let PixelCoordinate { x, y } = inv.apply(rect.max.into());
  if x > CANVAS_SIZE || y > CANVAS_SIZE {
    transform.translate(
      PixelPosition {
        x: (x - CANVAS_SIZE).max(0.),
        y: (y - CANVAS_SIZE).max(0.),
      } * transform.zoom,
    );
  }
}

/// The transform zoom that shows tiles of `level` for a screen of the size of `rect`.
pub(crate) fn transform_zoom_for_level(level: u8, rect: &Rect) -> f32 {
  let screen_size = rect.width().max(rect.height());
  (2f32.powi(i32::from(level) - 2) * TILE_SIZE / screen_size).clamp(MIN_ZOOM, MAX_ZOOM)
}

/// The tile zoom level matching `transform` on a screen of the size of `rect`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn level_for_transform(transform: &Transform, rect: &Rect) -> u8 {
  let screen_size = rect.width().max(rect.height());
  (transform.zoom * screen_size / TILE_SIZE).log2().round().max(0.) as u8 + 2
}

/// Decodes PNG or JPEG data into an image egui can upload.
pub(crate) fn decode_image(data: &[u8]) -> Result<ColorImage, image::ImageError> {
  let img = image::ImageReader::new(std::io::Cursor::new(data))
    .with_guessed_format()
    .map_err(image::ImageError::IoError)?
    .decode()?;

  let size = [img.width() as usize, img.height() as usize];
  let image_buffer = img.to_rgba8();
  let pixels = image_buffer.as_flat_samples();
  Ok(ColorImage::from_rgba_unmultiplied(size, pixels.as_slice()))
}
