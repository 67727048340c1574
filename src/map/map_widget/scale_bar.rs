use egui::{Align2, Color32, FontId, Rect, Stroke, Ui};

use crate::map::{
  coordinates::{PixelPosition, Transform, WGS84Coordinate, distance_in_meters},
  map_widget::helpers::point_to_coordinate,
};

const MAX_WIDTH: f32 = 100.;
const MARGIN: f32 = 10.;

/// Ground distance covered by one screen pixel at the centre of `rect`.
pub(crate) fn meters_per_pixel(transform: &Transform, rect: &Rect) -> f32 {
  let center = PixelPosition::from(rect.center());
  let half = PixelPosition {
    x: MAX_WIDTH / 2.,
    y: 0.,
  };
  let west = WGS84Coordinate::from(point_to_coordinate(center + half * -1., transform));
  let east = WGS84Coordinate::from(point_to_coordinate(center + half, transform));
  distance_in_meters(west, east) / MAX_WIDTH
}

/// The largest length of the form 1, 2 or 5 times a power of ten not exceeding `max_meters`.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn nice_scale_length(max_meters: f32) -> f32 {
  if max_meters <= 0. || !max_meters.is_finite() {
    return 0.;
  }
  let magnitude = 10f32.powi(max_meters.log10().floor() as i32);
  let fraction = max_meters / magnitude;
  let nice = if fraction >= 5. {
    5.
  } else if fraction >= 2. {
    2.
  } else {
    1.
  };
  nice * magnitude
}

pub(crate) fn scale_label(meters: f32) -> String {
  if meters >= 1000. {
    format!("{} km", meters / 1000.)
  } else {
    format!("{meters} m")
  }
}

/// Draws a metric scale bar into the bottom left corner of `rect`.
pub(crate) fn draw(ui: &Ui, transform: &Transform, rect: Rect) {
  let per_pixel = meters_per_pixel(transform, &rect);
  let meters = nice_scale_length(per_pixel * MAX_WIDTH);
  if meters <= 0. {
    return;
  }
  let width = meters / per_pixel;

  let painter = ui.painter_at(rect);
  let bottom_left = egui::pos2(rect.min.x + MARGIN, rect.max.y - MARGIN);
  let bar = Rect::from_min_max(
    bottom_left - egui::vec2(0., 16.),
    bottom_left + egui::vec2(width, 0.),
  );
  painter.rect_filled(bar, egui::CornerRadius::ZERO, Color32::from_white_alpha(180));
  let stroke = Stroke::new(2., Color32::from_gray(60));
  painter.line_segment([bar.left_bottom(), bar.right_bottom()], stroke);
  painter.line_segment([bar.left_bottom(), bar.left_top()], stroke);
  painter.line_segment([bar.right_bottom(), bar.right_top()], stroke);
  painter.text(
    bar.left_center() + egui::vec2(4., 0.),
    Align2::LEFT_CENTER,
    scale_label(meters),
    FontId::proportional(11.),
    Color32::from_gray(40),
  );
}
