use egui::Ui;

use crate::shops::filter::{ALL, FilterState};

pub const ALL_TYPES: &str = "All types";
pub const ALL_CATEGORIES: &str = "All categories";

/// A filter change requested from the controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlAction {
  SetType(String),
  SetCategory(String),
  Search(String),
  Locate,
}

/// Summary shown below the controls.
pub struct ControlStatus {
  pub visible: usize,
  pub total: usize,
  pub loading: bool,
  pub locating: bool,
}

/// The search box, the type legend, the category drop-down and the locate button.
///
/// The search query is only applied on button press or Enter, the legend and the category
/// right away.
#[derive(Default)]
pub struct FilterControls {
  query: String,
}

impl FilterControls {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  /// The query currently typed, applied or not.
  #[must_use]
  pub fn query(&self) -> &str {
    &self.query
  }

  pub fn ui(
    &mut self,
    ui: &mut Ui,
    filter: &FilterState,
    type_tokens: &[String],
    categories: &[String],
    status: &ControlStatus,
  ) -> Option<ControlAction> {
    let mut action = None;

    ui.heading("Find a shop");
    ui.horizontal(|ui| {
      let response = ui.add(
        egui::TextEdit::singleline(&mut self.query)
          .hint_text("Shop name")
          .desired_width(140.),
      );
      let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
      if ui.button("Search").clicked() || submitted {
        action = Some(ControlAction::Search(self.query.clone()));
      }
    });

    ui.separator();
    ui.heading("Type");
    if let Some(token) = Self::legend(ui, filter.type_filter(), type_tokens) {
      action = Some(ControlAction::SetType(token));
    }

    ui.separator();
    if let Some(category) = Self::category_choice(ui, filter.category_filter(), categories) {
      action = Some(ControlAction::SetCategory(category));
    }

    ui.separator();
    ui.horizontal(|ui| {
      if ui.button("Locate me").clicked() {
        action = Some(ControlAction::Locate);
      }
      if status.locating {
        ui.spinner();
      }
    });

    ui.separator();
    ui.horizontal(|ui| {
      if status.loading {
        ui.spinner();
        ui.label("Loading shops…");
      } else {
        ui.label(format!("{} of {} shops shown", status.visible, status.total));
      }
    });

    action
  }

  fn legend(ui: &mut Ui, active: &str, type_tokens: &[String]) -> Option<String> {
    let mut clicked = None;
    if ui.selectable_label(active == ALL, ALL_TYPES).clicked() {
      clicked = Some(ALL.to_string());
    }
    for token in type_tokens {
      if ui.selectable_label(active == token, token.as_str()).clicked() {
        clicked = Some(token.clone());
      }
    }
    clicked
  }

  fn category_choice(ui: &mut Ui, active: &str, categories: &[String]) -> Option<String> {
    let mut chosen = None;
    let selected_text = if active == ALL { ALL_CATEGORIES } else { active };
    egui::ComboBox::from_label("Category")
      .selected_text(selected_text)
      .show_ui(ui, |ui| {
        if ui.selectable_label(active == ALL, ALL_CATEGORIES).clicked() {
          chosen = Some(ALL.to_string());
        }
        for category in categories {
          if ui.selectable_label(active == category, category.as_str()).clicked() {
            chosen = Some(category.clone());
          }
        }
      });
    chosen
  }
}
