//! Value types carried by task and label events.

use nutype::nutype;
use serde::{Deserialize, Serialize};

/// Free-form text describing a task. Surrounding whitespace is dropped.
///
/// Length policy is enforced by the task handlers, not here, so that a short
/// description becomes a typed rejection instead of a construction error.
#[nutype(
    sanitize(trim),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct TaskDescription(String);

impl TaskDescription {
    /// Length in Unicode scalar values.
    pub fn char_count(&self) -> usize {
        self.chars().count()
    }
}

/// How urgent a task is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TaskPriority {
    /// Can wait.
    Low,
    /// The priority of every new task.
    #[default]
    Normal,
    /// Needs attention first.
    High,
}

/// Display name of a label. Surrounding whitespace is dropped.
#[nutype(
    sanitize(trim),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct LabelTitle(String);

/// Color a label is rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LabelColor {
    /// Applied to every freshly created label.
    #[default]
    Gray,
    /// Red.
    Red,
    /// Green.
    Green,
    /// Blue.
    Blue,
}

/// Everything about a label that can be edited.
///
/// Immutable: `with_title` and `with_color` return a new value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelDetails {
    title: LabelTitle,
    color: LabelColor,
}

impl LabelDetails {
    /// Details with an explicit color.
    pub const fn new(title: LabelTitle, color: LabelColor) -> Self {
        Self { title, color }
    }

    /// Details of a freshly created label: the given title, default color.
    pub fn titled(title: LabelTitle) -> Self {
        Self::new(title, LabelColor::default())
    }

    /// Same details with another title.
    #[must_use]
    pub fn with_title(self, title: LabelTitle) -> Self {
        Self { title, ..self }
    }

    /// Same details with another color.
    #[must_use]
    pub fn with_color(self, color: LabelColor) -> Self {
        Self { color, ..self }
    }

    /// The label's title.
    pub const fn title(&self) -> &LabelTitle {
        &self.title
    }

    /// The label's color.
    pub const fn color(&self) -> LabelColor {
        self.color
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn title(text: &str) -> LabelTitle {
        LabelTitle::new(text.to_string())
    }

    #[test]
    fn descriptions_are_trimmed() {
        let description = TaskDescription::new("  water plants \n".to_string());

        assert_eq!(description.to_string(), "water plants");
    }

    #[test]
    fn char_count_counts_scalar_values_not_bytes() {
        let description = TaskDescription::new("çàé".to_string());

        assert_eq!(description.char_count(), 3);
        assert_eq!(description.len(), 6);
    }

    #[test]
    fn titled_details_use_the_default_color() {
        let details = LabelDetails::titled(title("errands"));

        assert_eq!(details.color(), LabelColor::Gray);
    }

    #[test]
    fn with_methods_leave_other_fields_untouched() {
        let original = LabelDetails::titled(title("X"));

        let recolored = original.clone().with_color(LabelColor::Red);
        let renamed = original.clone().with_title(title("Y"));

        assert_eq!(recolored, LabelDetails::new(title("X"), LabelColor::Red));
        assert_eq!(renamed, LabelDetails::new(title("Y"), LabelColor::Gray));
        assert_eq!(original, LabelDetails::titled(title("X")));
    }

    #[test]
    fn default_priority_is_normal() {
        assert_eq!(TaskPriority::default(), TaskPriority::Normal);
    }
}
