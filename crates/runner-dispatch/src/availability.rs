//! When a command can be invoked, given the categories of the current selection
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "category", rename_all = "snake_case")]
pub enum Availability {
    #[default]
    Always,
    /// Something must be selected
    Selection,
    /// Something must be selected and all of it in this category
    Category(String),
}

impl Availability {
    pub fn is_available<S: AsRef<str>>(&self, selected_categories: &[S]) -> bool {
        match self {
            Availability::Always => true,
            Availability::Selection => !selected_categories.is_empty(),
            Availability::Category(name) => {
                !selected_categories.is_empty()
                    && selected_categories.iter().all(|c| c.as_ref() == name)
            }
        }
    }
}
