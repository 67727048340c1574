use super::{feature::Feature, store::FeatureStore};

/// Sentinel of the type and category filters that disables them.
pub const ALL: &str = "all";

/// The current type, category and name filters. Owned by the controller, starts as
/// `("all", "all", "")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
  type_filter: String,
  category_filter: String,
  search_query: String,
}

impl Default for FilterState {
  fn default() -> Self {
    Self {
      type_filter: ALL.to_string(),
      category_filter: ALL.to_string(),
      search_query: String::new(),
    }
  }
}

impl FilterState {
  #[must_use]
  pub fn type_filter(&self) -> &str {
    &self.type_filter
  }

  #[must_use]
  pub fn category_filter(&self) -> &str {
    &self.category_filter
  }

  #[must_use]
  pub fn search_query(&self) -> &str {
    &self.search_query
  }

  pub fn set_type_filter(&mut self, type_filter: &str) {
    self.type_filter = type_filter.to_lowercase();
  }

  pub fn set_category_filter(&mut self, category_filter: &str) {
    self.category_filter = category_filter.to_lowercase();
  }

  pub fn set_search_query(&mut self, search_query: &str) {
    self.search_query = search_query.to_lowercase();
  }

  #[must_use]
  pub fn matches(&self, feature: &Feature) -> bool {
    matches(
      feature,
      &self.type_filter,
      &self.category_filter,
      &self.search_query,
    )
  }

  /// The shops passing all three filters, in store order.
  #[must_use]
  pub fn visible_set<'a>(&self, store: &'a FeatureStore) -> Vec<&'a Feature> {
    visible_set(
      store.features(),
      &self.type_filter,
      &self.category_filter,
      &self.search_query,
    )
  }
}

/// A shop passes if
/// * the type filter is `all` or a substring of its full, lower-cased clothing classifier,
/// * the category filter is `all` or equal to its lower-cased category,
/// * the search query is a substring of its lower-cased name.
///
/// A shop without a name only passes the empty query.
#[must_use]
pub fn matches(feature: &Feature, type_filter: &str, category_filter: &str, search_query: &str) -> bool {
  let type_matches = type_filter == ALL || feature.clothes().to_lowercase().contains(type_filter);
  let category_matches =
    category_filter == ALL || feature.category().to_lowercase() == category_filter;
  let name_matches = feature
    .name()
    .unwrap_or_default()
    .to_lowercase()
    .contains(search_query);
  type_matches && category_matches && name_matches
}

/// Full scan over `features`, keeping their order.
#[must_use]
pub fn visible_set<'a>(
  features: &'a [Feature],
  type_filter: &str,
  category_filter: &str,
  search_query: &str,
) -> Vec<&'a Feature> {
  features
    .iter()
    .filter(|f| matches(f, type_filter, category_filter, search_query))
    .collect()
}
