use crate::map::coordinates::WGS84Coordinate;

/// Shown for shops without a name.
pub const UNNAMED_SHOP: &str = "Unnamed Shop";

/// Position of a feature in load order. Stable for the lifetime of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureId(pub usize);

/// One clothing shop.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
  id: FeatureId,
  position: WGS84Coordinate,
  name: Option<String>,
  clothes: String,
  category: String,
  opening_hours: Option<String>,
}

impl Feature {
  #[must_use]
  pub fn new(
    id: FeatureId,
    position: WGS84Coordinate,
    clothes: impl Into<String>,
    category: impl Into<String>,
  ) -> Self {
    Self {
      id,
      position,
      name: None,
      clothes: clothes.into(),
      category: category.into(),
      opening_hours: None,
    }
  }

  #[must_use]
  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = Some(name.into());
    self
  }

  #[must_use]
  pub fn with_opening_hours(mut self, opening_hours: impl Into<String>) -> Self {
    self.opening_hours = Some(opening_hours.into());
    self
  }

  #[must_use]
  pub fn id(&self) -> FeatureId {
    self.id
  }

  #[must_use]
  pub fn position(&self) -> WGS84Coordinate {
    self.position
  }

  #[must_use]
  pub fn name(&self) -> Option<&str> {
    self.name.as_deref()
  }

  /// The name, or [`UNNAMED_SHOP`] if it is missing or empty.
  #[must_use]
  pub fn display_name(&self) -> &str {
    self.name().filter(|n| !n.is_empty()).unwrap_or(UNNAMED_SHOP)
  }

  /// The full comma separated clothing classifier, e.g. `"shoes, sport"`.
  #[must_use]
  pub fn clothes(&self) -> &str {
    &self.clothes
  }

  #[must_use]
  pub fn category(&self) -> &str {
    &self.category
  }

  #[must_use]
  pub fn opening_hours(&self) -> &str {
    self.opening_hours.as_deref().unwrap_or_default()
  }

  /// First segment of the clothing classifier, trimmed and lower-cased. Used as icon key and
  /// as legend entry.
  #[must_use]
  pub fn canonical_type(&self) -> String {
    canonical_type_token(&self.clothes)
  }

  #[must_use]
  pub fn popup_text(&self) -> String {
    format!(
      "{}\nType: {}\nCategory: {}\nOpening hours: {}",
      self.display_name(),
      self.clothes,
      self.category,
      self.opening_hours()
    )
  }
}

#[must_use]
pub fn canonical_type_token(clothes: &str) -> String {
  clothes
    .split(',')
    .next()
    .unwrap_or_default()
    .trim()
    .to_lowercase()
}
