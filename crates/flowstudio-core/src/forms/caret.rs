use std::collections::BTreeMap;

use super::form::{FormState, Validator};

/// Field and character offset where the cursor last was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caret {
    pub field: String,
    pub position: usize,
}

/// Last caret position within one form.
#[derive(Debug, Clone, Default)]
pub struct CaretTracker {
    active: Option<Caret>,
}

impl CaretTracker {
    pub fn record(&mut self, field: &str, position: usize) {
        self.active = Some(Caret {
            field: field.to_string(),
            position,
        });
    }

    pub fn active(&self) -> Option<&Caret> {
        self.active.as_ref()
    }

    pub fn clear(&mut self) {
        self.active = None;
    }
}

/// The open forms of a workspace, with variable insertion routed to
/// whichever form was focused last.
#[derive(Default)]
pub struct FormSet {
    forms: BTreeMap<String, FormState>,
    focused: Option<String>,
}

impl FormSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a form, replacing any form with the same name.
    pub fn open(&mut self, form: FormState) {
        self.forms.insert(form.name().to_string(), form);
    }

    pub fn close(&mut self, name: &str) -> Option<FormState> {
        if self.focused.as_deref() == Some(name) {
            self.focused = None;
        }
        self.forms.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&FormState> {
        self.forms.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FormState> {
        self.forms.get_mut(name)
    }

    pub fn focused(&self) -> Option<&str> {
        self.focused.as_deref()
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }

    /// Record focus or caret movement in a form's field.
    pub fn focus(&mut self, form: &str, field: &str, position: usize) -> bool {
        let Some(state) = self.forms.get_mut(form) else {
            return false;
        };
        if state.field(field).is_none() {
            return false;
        }
        state.caret_mut().record(field, position);
        self.focused = Some(form.to_string());
        true
    }

    /// Insert a variable token into the focused form at its caret.
    pub fn insert_variable(&mut self, token: &str, validator: &dyn Validator) -> bool {
        let Some(name) = self.focused.as_deref() else {
            tracing::debug!("No focused form for variable insertion");
            return false;
        };
        match self.forms.get_mut(name) {
            Some(form) => form.insert_variable(token, validator),
            None => false,
        }
    }
}
