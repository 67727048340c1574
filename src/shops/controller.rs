use std::{
  sync::{
    Arc,
    mpsc::{Receiver, Sender},
  },
  time::Instant,
};

use log::{error, info};

use super::{
  feature::FeatureId,
  filter::FilterState,
  geolocation::{GeolocationHandler, GeolocationState, LocationProvider},
  reconciler::MarkerReconciler,
  store::{DataLoadError, DataSource, FeatureStore},
};
use crate::map::markers::MarkerSurface;

type LoadResult = Result<FeatureStore, DataLoadError>;

/// Owns all shop state of a session and keeps the map markers in line with the filters.
///
/// Every filter change recomputes the visible set and replaces the markers, even if the
/// value did not change.
pub struct ShopMapController {
  store: FeatureStore,
  filter: FilterState,
  reconciler: MarkerReconciler,
  geolocation: GeolocationHandler,
  load_sender: Sender<LoadResult>,
  load_receiver: Receiver<LoadResult>,
  loading: bool,
  ctx: Option<egui::Context>,
}

impl ShopMapController {
  #[must_use]
  pub fn new(location_provider: Arc<dyn LocationProvider>) -> Self {
    let (load_sender, load_receiver) = std::sync::mpsc::channel();
    Self {
      store: FeatureStore::empty(),
      filter: FilterState::default(),
      reconciler: MarkerReconciler::new(),
      geolocation: GeolocationHandler::new(location_provider),
      load_sender,
      load_receiver,
      loading: false,
      ctx: None,
    }
  }

  /// Repaints `ctx` when background work finishes.
  #[must_use]
  pub fn with_repaint(mut self, ctx: egui::Context) -> Self {
    self.geolocation = self.geolocation.with_repaint(ctx.clone());
    self.ctx = Some(ctx);
    self
  }

  /// Reads the shop document in the background. The result is picked up by [`Self::poll`].
  pub fn start_loading(&mut self, source: DataSource) {
    self.loading = true;
    let sender = self.load_sender.clone();
    let ctx = self.ctx.clone();
    tokio::spawn(async move {
      let _ = sender.send(FeatureStore::load(&source).await);
      if let Some(ctx) = ctx {
        ctx.request_repaint();
      }
    });
  }

  /// Installs a loaded store and consumes location answers.
  pub fn poll(&mut self, surface: &mut dyn MarkerSurface, now: Instant) {
    while let Ok(result) = self.load_receiver.try_recv() {
      self.loading = false;
      match result {
        Ok(store) => self.install_store(surface, store, now),
        Err(e) => error!("GeoJSON load error: {e}"),
      }
    }
    self.geolocation.poll(surface);
  }

  /// Replaces the store and shows the shops matching the current filters.
  pub fn install_store(&mut self, surface: &mut dyn MarkerSurface, store: FeatureStore, now: Instant) {
    info!("{} shops available", store.len());
    self.store = store;
    self.refresh(surface, now);
  }

  pub fn set_type_filter(&mut self, surface: &mut dyn MarkerSurface, type_filter: &str, now: Instant) {
    self.filter.set_type_filter(type_filter);
    self.refresh(surface, now);
  }

  pub fn set_category_filter(
    &mut self,
    surface: &mut dyn MarkerSurface,
    category_filter: &str,
    now: Instant,
  ) {
    self.filter.set_category_filter(category_filter);
    self.refresh(surface, now);
  }

  pub fn submit_search(&mut self, surface: &mut dyn MarkerSurface, query: &str, now: Instant) {
    self.filter.set_search_query(query);
    self.refresh(surface, now);
  }

  /// Recomputes the visible set and replaces all markers.
  pub fn refresh(&mut self, surface: &mut dyn MarkerSurface, now: Instant) {
    let visible = self.filter.visible_set(&self.store);
    self.reconciler.reconcile(surface, &visible, now);
  }

  /// Advances marker fades. Returns whether another frame is needed.
  pub fn tick(&mut self, surface: &mut dyn MarkerSurface, now: Instant) -> bool {
    self.reconciler.tick(surface, now)
  }

  pub fn request_location(&mut self) {
    self.geolocation.request();
  }

  #[must_use]
  pub fn location_state(&self) -> GeolocationState {
    self.geolocation.state()
  }

  #[must_use]
  pub fn filter(&self) -> &FilterState {
    &self.filter
  }

  #[must_use]
  pub fn store(&self) -> &FeatureStore {
    &self.store
  }

  #[must_use]
  pub fn is_loading(&self) -> bool {
    self.loading
  }

  #[must_use]
  pub fn type_tokens(&self) -> Vec<String> {
    self.store.type_tokens()
  }

  #[must_use]
  pub fn categories(&self) -> Vec<String> {
    self.store.categories()
  }

  #[must_use]
  pub fn visible_count(&self) -> usize {
    self.reconciler.len()
  }

  pub fn rendered_features(&self) -> impl Iterator<Item = FeatureId> + '_ {
    self.reconciler.rendered_features()
  }
}
