use std::sync::{
  Arc,
  mpsc::{Receiver, Sender},
};

use log::{debug, info, warn};
use serde::Deserialize;
use thiserror::Error;

use crate::map::{
  coordinates::WGS84Coordinate,
  markers::{MarkerHandle, MarkerSpec, MarkerSurface},
};

/// The view never zooms in further than this on a found location.
pub const LOCATE_MAX_ZOOM: u8 = 16;
pub const LOCATION_ICON: &str = "location";
pub const LOCATION_POPUP: &str = "You are here";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeolocationError {
  #[error("Location unavailable: {0}")]
  Unavailable(String),
  #[error("Location request failed: {0}")]
  Http(String),
  #[error("Could not decode location response: {0}")]
  Decode(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Located {
  pub coordinate: WGS84Coordinate,
  /// Zoom level matching the accuracy of the fix, if the provider knows it.
  pub zoom_hint: Option<u8>,
}

/// Something that can tell where the user is.
#[async_trait::async_trait]
pub trait LocationProvider: Send + Sync {
  fn name(&self) -> &str;

  async fn locate(&self) -> Result<Located, GeolocationError>;
}

/// Asks a JSON endpoint like `https://ipapi.co/json/` for the position of the caller's IP.
pub struct IpLocationProvider {
  url: String,
  client: surf::Client,
}

#[derive(Deserialize)]
struct IpLocation {
  latitude: f32,
  longitude: f32,
}

impl IpLocationProvider {
  #[must_use]
  pub fn new(url: impl Into<String>) -> Self {
    Self {
      url: url.into(),
      client: surf::Client::new(),
    }
  }
}

#[async_trait::async_trait]
impl LocationProvider for IpLocationProvider {
  fn name(&self) -> &str {
    &self.url
  }

  async fn locate(&self) -> Result<Located, GeolocationError> {
    let mut response = self
      .client
      .get(&self.url)
      .header("User-Agent", concat!("clothmap/", env!("CARGO_PKG_VERSION")))
      .await
      .map_err(|e| GeolocationError::Http(e.to_string()))?;
    if !response.status().is_success() {
      return Err(GeolocationError::Http(format!(
        "status {}",
        response.status()
      )));
    }
    let body = response
      .body_string()
      .await
      .map_err(|e| GeolocationError::Http(e.to_string()))?;
    parse_ip_location(&body)
  }
}

fn parse_ip_location(body: &str) -> Result<Located, GeolocationError> {
  let location: IpLocation =
    serde_json::from_str(body).map_err(|e| GeolocationError::Decode(e.to_string()))?;
  let coordinate = WGS84Coordinate::new(location.latitude, location.longitude);
  if !coordinate.is_valid() {
    return Err(GeolocationError::Decode(format!(
      "{coordinate:?} is not a valid position"
    )));
  }
  Ok(Located {
    coordinate,
    zoom_hint: None,
  })
}

/// Always answers with the same result. For offline use and tests.
pub struct FixedLocationProvider {
  answer: Result<WGS84Coordinate, GeolocationError>,
}

impl FixedLocationProvider {
  #[must_use]
  pub fn new(coordinate: WGS84Coordinate) -> Self {
    Self {
      answer: Ok(coordinate),
    }
  }

  #[must_use]
  pub fn unavailable(reason: impl Into<String>) -> Self {
    Self {
      answer: Err(GeolocationError::Unavailable(reason.into())),
    }
  }
}

#[async_trait::async_trait]
impl LocationProvider for FixedLocationProvider {
  fn name(&self) -> &'static str {
    "fixed"
  }

  async fn locate(&self) -> Result<Located, GeolocationError> {
    self.answer.clone().map(|coordinate| Located {
      coordinate,
      zoom_hint: None,
    })
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeolocationState {
  Idle,
  Requesting,
  LocationFound(WGS84Coordinate),
}

type Answer = (u64, Result<Located, GeolocationError>);

/// Runs location requests on the tokio runtime and turns answers into "you are here" markers.
pub struct GeolocationHandler {
  provider: Arc<dyn LocationProvider>,
  state: GeolocationState,
  request_id: u64,
  sender: Sender<Answer>,
  receiver: Receiver<Answer>,
  ctx: Option<egui::Context>,
  markers: Vec<MarkerHandle>,
}

impl GeolocationHandler {
  #[must_use]
  pub fn new(provider: Arc<dyn LocationProvider>) -> Self {
    let (sender, receiver) = std::sync::mpsc::channel();
    Self {
      provider,
      state: GeolocationState::Idle,
      request_id: 0,
      sender,
      receiver,
      ctx: None,
      markers: Vec::new(),
    }
  }

  /// Repaints `ctx` whenever an answer arrives.
  #[must_use]
  pub fn with_repaint(mut self, ctx: egui::Context) -> Self {
    self.ctx = Some(ctx);
    self
  }

  #[must_use]
  pub fn state(&self) -> GeolocationState {
    self.state
  }

  /// All markers placed so far. Earlier ones are kept when a new location is found.
  #[must_use]
  pub fn markers(&self) -> &[MarkerHandle] {
    &self.markers
  }

  /// Starts a lookup. An answer to an earlier, still running request will be ignored.
  pub fn request(&mut self) {
    self.request_id += 1;
    self.state = GeolocationState::Requesting;
    info!("Requesting location from {}", self.provider.name());

    let id = self.request_id;
    let provider = self.provider.clone();
    let sender = self.sender.clone();
    let ctx = self.ctx.clone();
    tokio::spawn(async move {
      let answer = provider.locate().await;
      let _ = sender.send((id, answer));
      if let Some(ctx) = ctx {
        ctx.request_repaint();
      }
    });
  }

  /// Consumes arrived answers. Returns whether the current request was answered.
  pub fn poll(&mut self, surface: &mut dyn MarkerSurface) -> bool {
    let mut answered = false;
    while let Ok((id, answer)) = self.receiver.try_recv() {
      if id != self.request_id || self.state != GeolocationState::Requesting {
        debug!("Ignoring answer to stale location request {id}");
        continue;
      }
      answered = true;
      match answer {
        Ok(located) => self.place(surface, located),
        Err(e) => {
          warn!("Geolocation failed: {e}");
          self.state = GeolocationState::Idle;
        }
      }
    }
    answered
  }

  fn place(&mut self, surface: &mut dyn MarkerSurface, located: Located) {
    let marker = MarkerSpec::new(located.coordinate, LOCATION_ICON, LOCATION_POPUP).with_open_popup();
    self.markers.push(surface.add_marker(marker));
    let zoom = located
      .zoom_hint
      .map_or(LOCATE_MAX_ZOOM, |z| z.min(LOCATE_MAX_ZOOM));
    surface.focus(located.coordinate, zoom);
    info!("Location found at {:?}", located.coordinate);
    self.state = GeolocationState::LocationFound(located.coordinate);
  }
}
