use std::{path::PathBuf, sync::Arc, time::Duration};

use clothmap::{
  app::{ShopMapApp, info_panel::Placement},
  config::Config,
  map::coordinates::WGS84Coordinate,
  shops::{
    geolocation::{FixedLocationProvider, GeolocationState},
    store::FeatureStore,
  },
};
use eframe::App;
use egui::accesskit::Role;
use egui_kittest::Harness;
use egui_kittest::kittest::Queryable;

const SHOPS: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "geometry": {"type": "Point", "coordinates": [13.04, 47.8]},
      "properties": {"name": "Alpha Boutique", "clothes": "shoes, sport", "category": "Sport"}
    },
    {
      "type": "Feature",
      "geometry": {"type": "Point", "coordinates": [13.045, 47.805]},
      "properties": {"name": "Beta Shirts", "clothes": "shirts", "category": "Casual"}
    },
    {
      "type": "Feature",
      "geometry": {"type": "Point", "coordinates": [13.05, 47.81]},
      "properties": {"name": null, "clothes": "Jackets", "category": "Casual"}
    }
  ]
}"#;

fn offline_config() -> Config {
  let mut config = Config::default();
  config.config_path = None;
  config.tile_provider.clear();
  config.tile_cache_dir = None;
  config.icon_dir = Some(PathBuf::from("does-not-exist"));
  config
}

fn create_test_app() -> ShopMapApp {
  let ctx = egui::Context::default();
  let provider = Arc::new(FixedLocationProvider::new(WGS84Coordinate::new(47.8, 13.04)));
  let mut app = ShopMapApp::new(&ctx, &offline_config(), provider);
  app.load_store(FeatureStore::from_geojson_str(SHOPS).expect("valid test data"));
  app
}

fn harness(app: ShopMapApp) -> Harness<'static, ShopMapApp> {
  Harness::new_state(
    |ctx, app: &mut ShopMapApp| {
      let mut frame = eframe::Frame::_new_kittest();
      app.update(ctx, &mut frame);
    },
    app,
  )
}

/// Fades and the info panel animation keep requesting repaints, so frames are stepped.
fn steps(harness: &mut Harness<'_, ShopMapApp>, count: usize) {
  for _ in 0..count {
    harness.step();
  }
}

#[tokio::test]
async fn controls_list_types_from_the_data() {
  let mut harness = harness(create_test_app());
  steps(&mut harness, 2);

  harness.get_by_label("Find a shop");
  harness.get_by_label("Search");
  harness.get_by_label("All types");
  harness.get_by_label("jackets");
  harness.get_by_label("shirts");
  harness.get_by_label("shoes");
  harness.get_by_label("Locate me");
  harness.get_by_label("3 of 3 shops shown");

  let combo_boxes = harness.get_all_by_role(Role::ComboBox).count();
  assert_eq!(combo_boxes, 1);
  assert_eq!(harness.state().map().marker_count(), 3);
}

#[tokio::test]
async fn legend_click_filters_by_type() {
  let mut harness = harness(create_test_app());
  steps(&mut harness, 2);

  harness.get_by_label("shirts").click();
  steps(&mut harness, 2);

  let controller = harness.state().controller();
  assert_eq!(controller.filter().type_filter(), "shirts");
  assert_eq!(controller.visible_count(), 1);
  harness.get_by_label("1 of 3 shops shown");

  harness.get_by_label("All types").click();
  steps(&mut harness, 2);
  assert_eq!(harness.state().controller().visible_count(), 3);
}

#[tokio::test]
async fn search_applies_on_button_only() {
  let mut harness = harness(create_test_app());
  steps(&mut harness, 2);

  let input = harness.get_by_role(Role::TextInput);
  input.focus();
  input.type_text("alpha");
  steps(&mut harness, 2);
  assert_eq!(harness.state().controller().filter().search_query(), "");
  assert_eq!(harness.state().controller().visible_count(), 3);

  harness.get_by_label("Search").click();
  steps(&mut harness, 2);
  assert_eq!(harness.state().controller().filter().search_query(), "alpha");
  assert_eq!(harness.state().controller().visible_count(), 1);
}

#[tokio::test]
async fn info_panel_docks_after_ok() {
  let mut harness = harness(create_test_app());
  steps(&mut harness, 2);
  assert!(harness.query_by_label("📕").is_none());

  harness.get_by_label("OK").click();
  steps(&mut harness, 60);

  assert!(!harness.state().info_panel().is_visible());
  assert_eq!(harness.state().info_panel().placement(), Placement::TopLeft);
  harness.get_by_label("📕").click();
  steps(&mut harness, 60);

  assert!(harness.state().info_panel().is_visible());
  assert!(harness.query_by_label("📕").is_none());
  harness.get_by_label("OK");
}

#[tokio::test]
async fn locate_me_adds_position_marker() {
  let mut harness = harness(create_test_app());
  steps(&mut harness, 2);

  harness.get_by_label("Locate me").click();
  steps(&mut harness, 1);

  for _ in 0..100 {
    if harness.state().controller().location_state() != GeolocationState::Requesting {
      break;
    }
    tokio::time::sleep(Duration::from_millis(5)).await;
    harness.step();
  }

  assert_eq!(
    harness.state().controller().location_state(),
    GeolocationState::LocationFound(WGS84Coordinate::new(47.8, 13.04))
  );
  assert_eq!(harness.state().map().marker_count(), 4);
}
