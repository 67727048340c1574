//! Keeps the shop markers on the map in sync with the visible set.
//!
//! Every pass replaces all markers: the old ones fade out and are removed, the new ones are
//! attached and fade in. Fades are advanced by [`MarkerReconciler::tick`], once per frame.

use std::time::{Duration, Instant};

use log::{debug, trace};

use super::feature::{Feature, FeatureId};
use crate::map::markers::{MarkerHandle, MarkerSpec, MarkerSurface};

/// Zoom level the map jumps to when a shop marker is clicked.
pub const MARKER_CLICK_ZOOM: u8 = 17;
/// Number of discrete opacity steps of one fade.
pub const FADE_STEPS: u32 = 10;
/// Time between two opacity steps.
pub const FADE_STEP_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeDirection {
  In,
  Out,
}

/// One opacity ramp of one marker, on its own schedule.
#[derive(Debug, Clone, Copy)]
pub struct Fade {
  direction: FadeDirection,
  started: Instant,
}

impl Fade {
  #[must_use]
  pub fn new(direction: FadeDirection, started: Instant) -> Self {
    Self { direction, started }
  }

  #[allow(clippy::cast_possible_truncation)]
  fn steps_done(&self, now: Instant) -> u32 {
    let elapsed = now.saturating_duration_since(self.started);
    let steps = elapsed.as_nanos() / FADE_STEP_INTERVAL.as_nanos();
    steps.min(u128::from(FADE_STEPS)) as u32
  }

  /// Opacity at `now`, moving in steps of `1 / FADE_STEPS`.
  #[must_use]
  #[allow(clippy::cast_precision_loss)]
  pub fn opacity(&self, now: Instant) -> f32 {
    let progress = self.steps_done(now) as f32 / FADE_STEPS as f32;
    match self.direction {
      FadeDirection::In => progress,
      FadeDirection::Out => 1. - progress,
    }
  }

  #[must_use]
  pub fn is_finished(&self, now: Instant) -> bool {
    self.steps_done(now) >= FADE_STEPS
  }
}

/// A marker standing for a currently visible shop.
#[derive(Debug, Clone)]
struct RenderedMarker {
  feature: FeatureId,
  handle: MarkerHandle,
  fade_in: Option<Fade>,
}

/// A marker of a previous pass that is fading out before removal.
#[derive(Debug, Clone)]
struct LeavingMarker {
  handle: MarkerHandle,
  fade_out: Fade,
}

#[derive(Debug, Default)]
pub struct MarkerReconciler {
  rendered: Vec<RenderedMarker>,
  leaving: Vec<LeavingMarker>,
}

/// The marker for one shop: icon by canonical type, popup with all properties.
#[must_use]
pub fn shop_marker(feature: &Feature) -> MarkerSpec {
  MarkerSpec::new(
    feature.position(),
    feature.canonical_type(),
    feature.popup_text(),
  )
  .with_click_zoom(MARKER_CLICK_ZOOM)
}

impl MarkerReconciler {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  /// Replaces all rendered markers by markers for `visible`.
  ///
  /// Running fade-ins of the replaced markers are cancelled, and markers still fading out
  /// from an earlier pass are removed right away. Afterwards the rendered set equals
  /// `visible`, independent of any running fade.
  pub fn reconcile(&mut self, surface: &mut dyn MarkerSurface, visible: &[&Feature], now: Instant) {
    let targets: Vec<(FeatureId, MarkerSpec)> = visible
      .iter()
      .map(|feature| (feature.id(), shop_marker(feature)))
      .collect();

    for stale in self.leaving.drain(..) {
      trace!("Cancelling fade-out of {:?}", stale.handle);
      surface.remove_marker(stale.handle);
    }

    let previous = std::mem::take(&mut self.rendered);
    let removed = previous.len();
    for marker in previous {
      if marker.fade_in.is_some() {
        trace!("Cancelling fade-in of {:?}", marker.handle);
      }
      if surface.has_element(marker.handle) {
        surface.set_opacity(marker.handle, 1.);
        self.leaving.push(LeavingMarker {
          handle: marker.handle,
          fade_out: Fade::new(FadeDirection::Out, now),
        });
      } else {
        surface.remove_marker(marker.handle);
      }
    }

    for (feature, spec) in targets {
      let handle = surface.add_marker(spec);
      let fade_in = if surface.has_element(handle) {
        surface.set_opacity(handle, 0.);
        Some(Fade::new(FadeDirection::In, now))
      } else {
        surface.set_opacity(handle, 1.);
        None
      };
      self.rendered.push(RenderedMarker {
        feature,
        handle,
        fade_in,
      });
    }

    debug!(
      "Reconciled markers: {removed} replaced, {} shown",
      self.rendered.len()
    );
  }

  /// Advances all fades. Returns whether any fade is still running.
  pub fn tick(&mut self, surface: &mut dyn MarkerSurface, now: Instant) -> bool {
    self.leaving.retain(|marker| {
      if marker.fade_out.is_finished(now) || !surface.has_element(marker.handle) {
        surface.remove_marker(marker.handle);
        false
      } else {
        surface.set_opacity(marker.handle, marker.fade_out.opacity(now));
        true
      }
    });

    for marker in &mut self.rendered {
      if let Some(fade) = marker.fade_in {
        surface.set_opacity(marker.handle, fade.opacity(now));
        if fade.is_finished(now) {
          marker.fade_in = None;
        }
      }
    }

    self.is_animating()
  }

  #[must_use]
  pub fn is_animating(&self) -> bool {
    !self.leaving.is_empty() || self.rendered.iter().any(|m| m.fade_in.is_some())
  }

  /// The shops that currently have a marker, in the order they were attached.
  pub fn rendered_features(&self) -> impl Iterator<Item = FeatureId> + '_ {
    self.rendered.iter().map(|m| m.feature)
  }

  #[must_use]
  pub fn marker_for(&self, feature: FeatureId) -> Option<MarkerHandle> {
    self
      .rendered
      .iter()
      .find(|m| m.feature == feature)
      .map(|m| m.handle)
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.rendered.len()
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.rendered.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::shops::test_utils::{RecordingSurface, sample_features};
  use assert_approx_eq::assert_approx_eq;

  const SETTLED: Duration = Duration::from_secs(1);

  fn ids(reconciler: &MarkerReconciler) -> Vec<FeatureId> {
    reconciler.rendered_features().collect()
  }

  #[test]
  fn fade_moves_in_discrete_steps() {
    let start = Instant::now();
    let fade = Fade::new(FadeDirection::In, start);
    assert_approx_eq!(fade.opacity(start), 0.);
    assert_approx_eq!(fade.opacity(start + Duration::from_millis(19)), 0.);
    assert_approx_eq!(fade.opacity(start + Duration::from_millis(45)), 0.2);
    assert!(!fade.is_finished(start + Duration::from_millis(199)));
    assert!(fade.is_finished(start + Duration::from_millis(200)));
    assert_approx_eq!(fade.opacity(start + SETTLED), 1.);

    let fade = Fade::new(FadeDirection::Out, start);
    assert_approx_eq!(fade.opacity(start + Duration::from_millis(60)), 0.7);
    assert_approx_eq!(fade.opacity(start + SETTLED), 0.);
  }

  #[test]
  fn initial_pass_attaches_in_visible_order() {
    let features = sample_features();
    let visible: Vec<_> = features.iter().collect();
    let mut surface = RecordingSurface::mounted();
    let mut reconciler = MarkerReconciler::new();
    let now = Instant::now();

    reconciler.reconcile(&mut surface, &visible, now);

    assert_eq!(ids(&reconciler), [FeatureId(0), FeatureId(1), FeatureId(2)]);
    assert_eq!(surface.icons(), ["shoes", "shirts", "jackets"]);
    assert!(surface.markers.values().all(|m| m.opacity == 0.));
    assert!(
      surface
        .markers
        .values()
        .all(|m| m.spec.click_zoom == Some(MARKER_CLICK_ZOOM))
    );

    assert!(!reconciler.tick(&mut surface, now + SETTLED));
    assert!(surface.markers.values().all(|m| m.opacity == 1.));
  }

  #[test]
  fn full_replace_even_for_unchanged_features() {
    let features = sample_features();
    let mut surface = RecordingSurface::mounted();
    let mut reconciler = MarkerReconciler::new();
    let now = Instant::now();

    reconciler.reconcile(&mut surface, &[&features[0], &features[1]], now);
    reconciler.tick(&mut surface, now + SETTLED);
    let first_alpha = reconciler.marker_for(FeatureId(0)).expect("alpha shown");

    let later = now + SETTLED;
    reconciler.reconcile(&mut surface, &[&features[0]], later);

    assert_eq!(ids(&reconciler), [FeatureId(0)]);
    let second_alpha = reconciler.marker_for(FeatureId(0)).expect("alpha shown");
    assert_ne!(first_alpha, second_alpha);
    // Old markers fade out, the new one fades in.
    assert_eq!(surface.markers.len(), 3);
    assert!(reconciler.is_animating());

    assert!(!reconciler.tick(&mut surface, later + SETTLED));
    assert_eq!(surface.markers.len(), 1);
    assert!(surface.markers.contains_key(&second_alpha));
  }

  #[test]
  fn fade_out_removes_after_last_step() {
    let features = sample_features();
    let mut surface = RecordingSurface::mounted();
    let mut reconciler = MarkerReconciler::new();
    let now = Instant::now();

    reconciler.reconcile(&mut surface, &[&features[0]], now);
    reconciler.tick(&mut surface, now + SETTLED);
    let old = reconciler.marker_for(FeatureId(0)).expect("alpha shown");

    let later = now + SETTLED;
    reconciler.reconcile(&mut surface, &[], later);
    assert!(reconciler.is_empty());

    reconciler.tick(&mut surface, later + Duration::from_millis(100));
    assert_approx_eq!(surface.opacity(old).expect("still fading"), 0.5);

    reconciler.tick(&mut surface, later + Duration::from_millis(200));
    assert!(surface.opacity(old).is_none());
    assert_eq!(surface.removals, [old]);
  }

  #[test]
  fn without_element_fades_degrade_to_immediate() {
    let features = sample_features();
    let mut surface = RecordingSurface::default();
    let mut reconciler = MarkerReconciler::new();
    let now = Instant::now();

    reconciler.reconcile(&mut surface, &[&features[0], &features[1]], now);
    assert!(surface.markers.values().all(|m| m.opacity == 1.));
    assert!(!reconciler.is_animating());

    reconciler.reconcile(&mut surface, &[&features[1]], now);
    assert_eq!(surface.markers.len(), 1);
    assert_eq!(surface.removals.len(), 2);
    assert_eq!(ids(&reconciler), [FeatureId(1)]);
    assert!(!reconciler.is_animating());
  }

  #[test]
  fn rapid_second_pass_ends_with_latest_set() {
    let features = sample_features();
    let mut surface = RecordingSurface::mounted();
    let mut reconciler = MarkerReconciler::new();
    let now = Instant::now();

    reconciler.reconcile(&mut surface, &[&features[0], &features[1]], now);
    reconciler.tick(&mut surface, now + SETTLED);

    let later = now + SETTLED;
    reconciler.reconcile(&mut surface, &[&features[2]], later);
    reconciler.tick(&mut surface, later + Duration::from_millis(40));
    // Second trigger while the first one is mid-fade.
    reconciler.reconcile(&mut surface, &[&features[0]], later + Duration::from_millis(40));

    assert_eq!(ids(&reconciler), [FeatureId(0)]);
    // Fade-outs of the first pass are cancelled and removed at once, the half faded-in
    // marker of the cancelled pass fades out.
    assert_eq!(surface.markers.len(), 2);

    reconciler.tick(&mut surface, later + SETTLED);
    assert_eq!(surface.markers.len(), 1);
    assert_eq!(surface.icons(), ["shoes"]);
    let handle = reconciler.marker_for(FeatureId(0)).expect("alpha shown");
    assert_approx_eq!(surface.opacity(handle).expect("alpha placed"), 1.);
  }

  #[test]
  fn removal_of_vanished_marker_is_harmless() {
    let features = sample_features();
    let mut surface = RecordingSurface::mounted();
    let mut reconciler = MarkerReconciler::new();
    let now = Instant::now();

    reconciler.reconcile(&mut surface, &[&features[0]], now);
    let handle = reconciler.marker_for(FeatureId(0)).expect("alpha shown");
    surface.remove_marker(handle);

    reconciler.reconcile(&mut surface, &[&features[1]], now);
    assert!(!reconciler.tick(&mut surface, now + SETTLED));
    assert_eq!(ids(&reconciler), [FeatureId(1)]);
    assert_eq!(surface.markers.len(), 1);
  }
}
