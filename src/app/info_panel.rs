use egui::{Align2, Rect};

const TITLE: &str = "Clothing shops";
const DESCRIPTION: &str = "Clothing shops of the city, taken from OpenStreetMap. \
  Filter them by type with the legend, by category with the drop-down or by name with the \
  search box. Click a shop for its details.";

/// Where the panel sits on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
  Center,
  TopLeft,
}

/// The information panel shown over the map.
///
/// It starts centred. "OK" fades it out, after which it is docked in the top left corner and
/// a toggle button brings it back.
pub struct InfoPanel {
  target_visible: bool,
  animation_progress: f32,
  last_frame_time: f64,
  placement: Placement,
}

impl Default for InfoPanel {
  fn default() -> Self {
    Self {
      target_visible: true,
      animation_progress: 1.0,
      last_frame_time: 0.0,
      placement: Placement::Center,
    }
  }
}

impl InfoPanel {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  pub fn show(&mut self) {
    self.target_visible = true;
  }

  pub fn hide(&mut self) {
    self.target_visible = false;
  }

  /// Whether any part of the panel is drawn.
  #[must_use]
  pub fn is_visible(&self) -> bool {
    self.animation_progress > 0.0
  }

  #[must_use]
  pub fn placement(&self) -> Placement {
    self.placement
  }

  /// Advances the fade. Completes in 0.5 seconds.
  pub fn update_animation(&mut self, ctx: &egui::Context) {
    let current_time = ctx.input(|i| i.time);
    let dt = if self.last_frame_time == 0.0 {
      0.016
    } else {
      (current_time - self.last_frame_time).clamp(0.0, 0.1)
    };
    self.last_frame_time = current_time;

    let animation_speed = 2.0;
    #[allow(clippy::cast_possible_truncation)]
    let delta_per_second = animation_speed * (dt as f32);

    if self.target_visible && self.animation_progress < 1.0 {
      self.animation_progress = (self.animation_progress + delta_per_second).min(1.0);
      ctx.request_repaint();
    } else if !self.target_visible && self.animation_progress > 0.0 {
      self.animation_progress = (self.animation_progress - delta_per_second).max(0.0);
      if self.animation_progress <= 0.0 {
        self.placement = Placement::TopLeft;
      }
      ctx.request_repaint();
    }
  }

  fn alpha(&self) -> f32 {
    ease_out_cubic(self.animation_progress)
  }

  /// Draws the panel, or the toggle button while it is hidden, over `map_rect`.
  pub fn ui(&mut self, ctx: &egui::Context, map_rect: Rect) {
    if self.is_visible() {
      self.show_panel(ctx, map_rect);
    } else if !self.target_visible {
      self.show_toggle_button(ctx, map_rect);
    }
  }

  fn show_panel(&mut self, ctx: &egui::Context, map_rect: Rect) {
    let (pivot, pos) = match self.placement {
      Placement::Center => (Align2::CENTER_CENTER, map_rect.center()),
      Placement::TopLeft => (Align2::LEFT_TOP, map_rect.left_top() + egui::vec2(10., 10.)),
    };
    let alpha = self.alpha();
    egui::Area::new(egui::Id::new("info_panel"))
      .pivot(pivot)
      .fixed_pos(pos)
      .order(egui::Order::Foreground)
      .show(ctx, |ui| {
        ui.set_opacity(alpha);
        egui::Frame::popup(ui.style()).show(ui, |ui| {
          ui.set_max_width(280.);
          ui.strong(TITLE);
          ui.label(DESCRIPTION);
          ui.vertical_centered(|ui| {
            if ui.button("OK").clicked() {
              self.hide();
            }
          });
        });
      });
  }

  fn show_toggle_button(&mut self, ctx: &egui::Context, map_rect: Rect) {
    egui::Area::new(egui::Id::new("info_panel_toggle"))
      .fixed_pos(map_rect.left_top() + egui::vec2(10., 10.))
      .order(egui::Order::Foreground)
      .show(ctx, |ui| {
        let response = ui.add_sized(
          [36.0, 36.0],
          egui::Button::new("📕").fill(egui::Color32::from_rgba_unmultiplied(255, 255, 255, 180)),
        );
        if response.clicked() {
          self.show();
        }
        if response.hovered() {
          ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
          response.on_hover_text("Show information");
        }
      });
  }
}

fn ease_out_cubic(t: f32) -> f32 {
  let t = t - 1.0;
  t * t * t + 1.0
}
