use std::{sync::Arc, time::Instant};

use egui::Widget as _;

use crate::{
  config::Config,
  map::map_widget::Map,
  shops::{
    controller::ShopMapController,
    geolocation::{GeolocationState, LocationProvider},
    reconciler::FADE_STEP_INTERVAL,
    store::{DataSource, FeatureStore},
  },
};

/// Search box, type legend, category drop-down and locate button.
pub mod controls;
/// Information panel over the map.
pub mod info_panel;

use controls::{ControlAction, ControlStatus, FilterControls};
use info_panel::InfoPanel;

/// The shop map: filter controls on the left, the map with its markers in the centre.
pub struct ShopMapApp {
  map: Map,
  controller: ShopMapController,
  controls: FilterControls,
  info_panel: InfoPanel,
}

impl ShopMapApp {
  #[must_use]
  pub fn new(
    ctx: &egui::Context,
    config: &Config,
    location_provider: Arc<dyn LocationProvider>,
  ) -> Self {
    Self {
      map: Map::new(ctx.clone(), config),
      controller: ShopMapController::new(location_provider).with_repaint(ctx.clone()),
      controls: FilterControls::new(),
      info_panel: InfoPanel::new(),
    }
  }

  /// Loads the shops in the background, markers appear once they arrive.
  pub fn start_loading(&mut self, source: DataSource) {
    self.controller.start_loading(source);
  }

  /// Shows an already loaded store.
  pub fn load_store(&mut self, store: FeatureStore) {
    self
      .controller
      .install_store(&mut self.map, store, Instant::now());
  }

  #[must_use]
  pub fn controller(&self) -> &ShopMapController {
    &self.controller
  }

  #[must_use]
  pub fn map(&self) -> &Map {
    &self.map
  }

  #[must_use]
  pub fn info_panel(&self) -> &InfoPanel {
    &self.info_panel
  }

  fn apply(&mut self, action: ControlAction) {
    let now = Instant::now();
    match action {
      ControlAction::SetType(token) => self.controller.set_type_filter(&mut self.map, &token, now),
      ControlAction::SetCategory(category) => {
        self
          .controller
          .set_category_filter(&mut self.map, &category, now);
      }
      ControlAction::Search(query) => self.controller.submit_search(&mut self.map, &query, now),
      ControlAction::Locate => self.controller.request_location(),
    }
  }

  fn control_status(&self) -> ControlStatus {
    ControlStatus {
      visible: self.controller.visible_count(),
      total: self.controller.store().len(),
      loading: self.controller.is_loading(),
      locating: self.controller.location_state() == GeolocationState::Requesting,
    }
  }
}

impl eframe::App for ShopMapApp {
  // eframe 0.34 requires `ui`; all drawing still happens in `update`, which
  // eframe calls right before `ui` each frame.
  fn ui(&mut self, _ui: &mut egui::Ui, _frame: &mut eframe::Frame) {}

  fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
    self.controller.poll(&mut self.map, Instant::now());
    self.info_panel.update_animation(ctx);

    let status = self.control_status();
    let type_tokens = self.controller.type_tokens();
    let categories = self.controller.categories();
    let action = egui::SidePanel::left("filters")
      .default_width(220.0)
      .resizable(false)
      .show(ctx, |ui| {
        self.controls.ui(
          ui,
          self.controller.filter(),
          &type_tokens,
          &categories,
          &status,
        )
      })
      .inner;
    if let Some(action) = action {
      self.apply(action);
    }

    egui::CentralPanel::default()
      .frame(egui::Frame::NONE)
      .show(ctx, |ui| {
        let map_rect = (&mut self.map).ui(ui).rect;
        self.info_panel.ui(ctx, map_rect);
      });

    if self.controller.tick(&mut self.map, Instant::now()) {
      ctx.request_repaint_after(FADE_STEP_INTERVAL);
    }
  }
}
