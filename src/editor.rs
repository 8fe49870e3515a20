//! Field editing
//!
//! Keyboard editing of an [`InputField`] list, shared by the item form popup
//! and the query parameter panel.

use crate::resource::{CustomAction, FieldType, FieldValue, InputField, SELECT_PLACEHOLDER};
use serde_json::Value;

/// Editable list of fields with a cursor
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEditor {
    pub fields: Vec<InputField>,
    /// Position within the visible fields
    pub selected: usize,
    hidden: Vec<String>,
}

impl FieldEditor {
    pub fn new(fields: Vec<InputField>) -> Self {
        Self {
            fields,
            selected: 0,
            hidden: Vec::new(),
        }
    }

    /// Editor that keeps `hidden` fields out of view but in the result
    pub fn with_hidden(fields: Vec<InputField>, hidden: Vec<String>) -> Self {
        Self {
            fields,
            selected: 0,
            hidden,
        }
    }

    fn visible_indices(&self) -> Vec<usize> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, f)| !self.hidden.contains(&f.name))
            .map(|(i, _)| i)
            .collect()
    }

    /// Fields shown to the user, in order
    pub fn visible_fields(&self) -> Vec<&InputField> {
        self.visible_indices()
            .into_iter()
            .map(|i| &self.fields[i])
            .collect()
    }

    fn current_index(&self) -> Option<usize> {
        self.visible_indices().get(self.selected).copied()
    }

    pub fn current(&self) -> Option<&InputField> {
        self.current_index().map(|i| &self.fields[i])
    }

    fn current_mut(&mut self) -> Option<&mut InputField> {
        let idx = self.current_index()?;
        self.fields.get_mut(idx).filter(|f| !f.readonly)
    }

    pub fn next(&mut self) {
        let count = self.visible_indices().len();
        if count > 0 {
            self.selected = (self.selected + 1).min(count - 1);
        }
    }

    pub fn previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Type a character into a text-like field
    pub fn input_char(&mut self, c: char) {
        let Some(field) = self.current_mut() else {
            return;
        };

        match field.field_type {
            FieldType::Boolean | FieldType::Select => {},
            FieldType::Number if !(c.is_ascii_digit() || c == '-' || c == '.') => {},
            _ => {
                let mut text = field.value.as_query_value();
                text.push(c);
                field.value = FieldValue::text(text);
            },
        }
    }

    pub fn backspace(&mut self) {
        let Some(field) = self.current_mut() else {
            return;
        };

        if matches!(field.field_type, FieldType::Boolean | FieldType::Select) {
            return;
        }

        let mut text = field.value.as_query_value();
        text.pop();
        field.value = FieldValue::text(text);
    }

    /// Flip a boolean or move a select to its next option
    pub fn toggle(&mut self) {
        self.step(1);
    }

    /// Move a select to its previous option
    pub fn toggle_back(&mut self) {
        self.step(-1);
    }

    fn step(&mut self, delta: isize) {
        let Some(field) = self.current_mut() else {
            return;
        };

        match field.field_type {
            FieldType::Boolean => field.value = FieldValue::Bool(!field.value.is_true()),
            FieldType::Select => {
                let mut choices = vec![FieldValue::text(SELECT_PLACEHOLDER)];
                choices.extend(field.options.iter().map(|o| o.value()));

                let current = field.value.as_query_value();
                let pos = choices
                    .iter()
                    .position(|c| c.as_query_value() == current)
                    .unwrap_or(0) as isize;
                let len = choices.len() as isize;
                let next = (pos + delta).rem_euclid(len) as usize;
                field.value = choices[next].clone();
            },
            _ => {},
        }
    }

    pub fn into_fields(self) -> Vec<InputField> {
        self.fields
    }
}

/// What a submitted form does
#[derive(Debug, Clone, PartialEq)]
pub enum FormKind {
    Create,
    Update { original: Value },
    Action { action: CustomAction, item: Value },
}

/// Open form popup
#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    pub kind: FormKind,
    pub title: String,
    pub editor: FieldEditor,
    pub error: Option<String>,
}

impl FormState {
    pub fn new(kind: FormKind, title: String, fields: Vec<InputField>) -> Self {
        Self {
            kind,
            title,
            editor: FieldEditor::new(fields),
            error: None,
        }
    }
}
