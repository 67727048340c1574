use std::{path::PathBuf, sync::Arc};

use clap::Parser as _;
use clothmap::{
  app::ShopMapApp,
  config::Config,
  map::coordinates::WGS84Coordinate,
  shops::{
    geolocation::{FixedLocationProvider, IpLocationProvider, LocationProvider},
    store::DataSource,
  },
};
use log::info;

#[derive(clap::Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
  /// GeoJSON file or http(s) URL with the shops.
  #[arg(short, long)]
  data: Option<String>,

  /// Directory with the marker icons, `<type>.png` and `location.png`.
  #[arg(short, long)]
  icons: Option<PathBuf>,

  /// Answers "Locate me" with this position instead of asking the network, e.g. 47.8,13.04.
  #[arg(short, long, value_parser = parse_location)]
  location: Option<WGS84Coordinate>,
}

fn parse_location(s: &str) -> Result<WGS84Coordinate, String> {
  let (lat, lon) = s
    .split_once(',')
    .ok_or_else(|| format!("expected <lat>,<lon>, got {s}"))?;
  let lat = lat.trim().parse().map_err(|e| format!("latitude: {e}"))?;
  let lon = lon.trim().parse().map_err(|e| format!("longitude: {e}"))?;
  let coordinate = WGS84Coordinate::new(lat, lon);
  if coordinate.is_valid() {
    Ok(coordinate)
  } else {
    Err(format!("{s} is not a valid position"))
  }
}

fn main() -> eframe::Result {
  // init logger.
  env_logger::init();
  let args = Args::parse();

  let mut config = Config::new();
  config.data_source = args.data.or(config.data_source);
  config.icon_dir = args.icons.or(config.icon_dir);
  config.fixed_location = args.location.or(config.fixed_location);

  let location_provider: Arc<dyn LocationProvider> = match config.fixed_location {
    Some(coordinate) => {
      info!("Using fixed location {}, {}", coordinate.lat, coordinate.lon);
      Arc::new(FixedLocationProvider::new(coordinate))
    }
    None => Arc::new(IpLocationProvider::new(config.location_url())),
  };

  // Tokio runtime.
  let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
  let _enter = rt.enter();

  let options = eframe::NativeOptions {
    viewport: egui::ViewportBuilder {
      inner_size: Some(egui::vec2(1280.0, 900.0)),
      clamp_size_to_monitor_size: Some(true),
      ..Default::default()
    },
    ..Default::default()
  };

  eframe::run_native(
    "Clothing shops",
    options,
    Box::new(move |cc| {
      let mut app = ShopMapApp::new(&cc.egui_ctx, &config, location_provider);
      let Ok(source) = config.data_source().parse::<DataSource>();
      app.start_loading(source);
      Ok(Box::new(app))
    }),
  )
}
