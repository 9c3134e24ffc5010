use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use super::caret::CaretTracker;
use super::field::{FieldSchema, FieldType};

/// Error message per field name.
pub type FormErrors = BTreeMap<String, String>;

/// Semantic validation of a whole form's JSON values.
pub trait Validator {
    fn validate(&self, values: &Map<String, Value>) -> FormErrors;
}

impl<F> Validator for F
where
    F: Fn(&Map<String, Value>) -> FormErrors,
{
    fn validate(&self, values: &Map<String, Value>) -> FormErrors {
        self(values)
    }
}

/// Validator that only enforces `required`.
pub struct RequiredFields<'a> {
    fields: &'a [FieldSchema],
}

impl<'a> RequiredFields<'a> {
    pub fn new(fields: &'a [FieldSchema]) -> Self {
        Self { fields }
    }
}

impl Validator for RequiredFields<'_> {
    fn validate(&self, values: &Map<String, Value>) -> FormErrors {
        self.fields
            .iter()
            .filter(|f| f.required && f.is_visible)
            .filter(|f| match values.get(&f.name) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.trim().is_empty(),
                Some(_) => false,
            })
            .map(|f| (f.name.clone(), format!("{} is required", display_name(f))))
            .collect()
    }
}

fn display_name(field: &FieldSchema) -> &str {
    if field.label.is_empty() {
        &field.name
    } else {
        &field.label
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The handler ran once
    Submitted,
    /// The handler did not run
    Invalid(FormErrors),
    Disabled,
}

/// Initial edit text for every field: the stored value, else the field
/// default, else empty.
pub fn default_values(
    fields: &[FieldSchema],
    stored: &Map<String, Value>,
) -> BTreeMap<String, String> {
    fields
        .iter()
        .map(|field| {
            let value = stored
                .get(&field.name)
                .or(field.default.as_ref())
                .unwrap_or(&Value::Null);
            (field.name.clone(), field.strategy().to_text(value))
        })
        .collect()
}

/// JSON value of every field, converted by its type.
pub fn json_values(
    fields: &[FieldSchema],
    values: &BTreeMap<String, String>,
) -> Map<String, Value> {
    fields
        .iter()
        .map(|field| {
            let text = values.get(&field.name).map(String::as_str).unwrap_or("");
            (field.name.clone(), field.strategy().to_json(text))
        })
        .collect()
}

/// Edit state of one node's configuration form.
pub struct FormState {
    name: String,
    fields: Vec<FieldSchema>,
    values: BTreeMap<String, String>,
    input_errors: FormErrors,
    errors: FormErrors,
    touched: BTreeSet<String>,
    submitted: bool,
    unsaved: bool,
    disabled: bool,
    caret: CaretTracker,
}

impl FormState {
    pub fn new(name: &str, fields: Vec<FieldSchema>, stored: &Map<String, Value>) -> Self {
        let values = default_values(&fields, stored);
        Self {
            name: name.to_string(),
            fields,
            values,
            input_errors: FormErrors::new(),
            errors: FormErrors::new(),
            touched: BTreeSet::new(),
            submitted: false,
            unsaved: false,
            disabled: false,
            caret: CaretTracker::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields that are shown; hidden ones keep their values.
    pub fn visible_fields(&self) -> impl Iterator<Item = &FieldSchema> {
        self.fields.iter().filter(|f| f.is_visible)
    }

    pub fn value(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    pub fn json_values(&self) -> Map<String, Value> {
        json_values(&self.fields, &self.values)
    }

    pub fn errors(&self) -> &FormErrors {
        &self.errors
    }

    /// Error to show for a field: only after it was touched or the form
    /// was submitted.
    pub fn visible_error(&self, field: &str) -> Option<&str> {
        if self.submitted || self.touched.contains(field) {
            self.errors.get(field).map(String::as_str)
        } else {
            None
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub fn caret(&self) -> &CaretTracker {
        &self.caret
    }

    pub fn caret_mut(&mut self) -> &mut CaretTracker {
        &mut self.caret
    }

    /// Replace the stored values, e.g. after the node was changed elsewhere.
    pub fn reset(&mut self, stored: &Map<String, Value>) {
        self.values = default_values(&self.fields, stored);
        self.input_errors.clear();
        self.errors.clear();
        self.touched.clear();
        self.submitted = false;
        self.unsaved = false;
    }

    /// Apply one edit. Returns false when the edit was ignored.
    pub fn change(&mut self, field: &str, text: &str, validator: &dyn Validator) -> bool {
        if self.disabled {
            return false;
        }
        let Some(schema) = self.field(field) else {
            tracing::debug!(form = %self.name, field, "Change for unknown field");
            return false;
        };
        if schema.input_type == FieldType::SelectOrVariable && text.is_empty() {
            return false;
        }

        let check = schema.strategy().check(text, schema);
        if check.valid {
            self.input_errors.remove(field);
        } else {
            let message = check.message.unwrap_or_else(|| "Invalid value".to_string());
            self.input_errors.insert(field.to_string(), message);
        }

        self.values.insert(field.to_string(), text.to_string());
        self.touched.insert(field.to_string());
        self.unsaved = true;
        self.revalidate(validator);
        true
    }

    fn revalidate(&mut self, validator: &dyn Validator) {
        let mut errors = validator.validate(&self.json_values());
        for (field, message) in &self.input_errors {
            errors
                .entry(field.clone())
                .or_insert_with(|| message.clone());
        }
        self.errors = errors;
    }

    /// Validate and, when clean, hand the JSON values to `handler` once.
    pub fn submit<H>(&mut self, validator: &dyn Validator, handler: H) -> SubmitOutcome
    where
        H: FnOnce(Map<String, Value>),
    {
        if self.disabled {
            return SubmitOutcome::Disabled;
        }
        self.submitted = true;
        self.revalidate(validator);
        if !self.errors.is_empty() {
            tracing::debug!(form = %self.name, errors = self.errors.len(), "Form has errors");
            return SubmitOutcome::Invalid(self.errors.clone());
        }

        handler(self.json_values());
        self.unsaved = false;
        SubmitOutcome::Submitted
    }

    /// Insert `token` at the last caret position of the focused field.
    pub fn insert_variable(&mut self, token: &str, validator: &dyn Validator) -> bool {
        if self.disabled {
            return false;
        }
        let Some(caret) = self.caret.active().cloned() else {
            return false;
        };
        let current = self.value(&caret.field).unwrap_or("");
        let at = current
            .char_indices()
            .nth(caret.position)
            .map(|(i, _)| i)
            .unwrap_or(current.len());
        let updated = format!("{}{}{}", &current[..at], token, &current[at..]);

        if !self.change(&caret.field, &updated, validator) {
            return false;
        }
        self.caret
            .record(&caret.field, caret.position + token.chars().count());
        true
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn no_errors(_: &Map<String, Value>) -> FormErrors {
        FormErrors::new()
    }

    fn fields() -> Vec<FieldSchema> {
        vec![
            FieldSchema::new("channel", FieldType::SimpleText).required(),
            FieldSchema::new("enabled", FieldType::BooleanOrVariable)
                .with_default(json!(true)),
            FieldSchema::new("retries", FieldType::NumberOrVariable),
        ]
    }

    #[test]
    fn defaults_fill_missing_values() {
        let stored = json!({"retries": 3});
        let form = FormState::new("notify", fields(), stored.as_object().unwrap());
        assert_eq!(form.value("channel"), Some(""));
        assert_eq!(form.value("enabled"), Some("true"));
        assert_eq!(form.value("retries"), Some("3"));
        assert!(!form.has_unsaved_changes());
    }

    #[test]
    fn errors_show_once_touched_or_submitted() {
        let mut form = FormState::new("notify", fields(), &Map::new());
        let fields = form.fields().to_vec();
        let required = RequiredFields::new(&fields);

        form.change("retries", "abc", &required);
        assert!(form.visible_error("retries").is_some());
        assert!(form.errors().contains_key("channel"));
        assert_eq!(form.visible_error("channel"), None);

        let outcome = form.submit(&required, |_| panic!("handler must not run"));
        assert!(matches!(outcome, SubmitOutcome::Invalid(ref e) if e.len() == 2));
        assert!(form.visible_error("channel").is_some());
    }

    #[test]
    fn clean_submit_hands_over_typed_values() {
        let mut form = FormState::new("notify", fields(), &Map::new());
        form.change("channel", "#ops", &no_errors);
        form.change("retries", "5", &no_errors);
        assert!(form.has_unsaved_changes());

        let mut received = Vec::new();
        let outcome = form.submit(&no_errors, |values| received.push(values));
        assert_eq!(outcome, SubmitOutcome::Submitted);
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["retries"], json!(5));
        assert_eq!(received[0]["enabled"], json!(true));
        assert!(!form.has_unsaved_changes());
    }

    #[test]
    fn disabled_forms_ignore_edits() {
        let mut form = FormState::new("notify", fields(), &Map::new());
        form.set_disabled(true);
        assert!(!form.change("channel", "#ops", &no_errors));
        assert_eq!(form.submit(&no_errors, |_| {}), SubmitOutcome::Disabled);
    }

    #[test]
    fn select_ignores_empty_choice() {
        let schema = vec![FieldSchema::new("method", FieldType::SelectOrVariable)
            .with_default(json!("GET"))];
        let mut form = FormState::new("http", schema, &Map::new());
        assert!(!form.change("method", "", &no_errors));
        assert_eq!(form.value("method"), Some("GET"));
    }

    #[test]
    fn variable_lands_at_caret() {
        let mut form = FormState::new("notify", fields(), &Map::new());
        form.change("channel", "#ops-alerts", &no_errors);
        form.caret_mut().record("channel", 4);

        assert!(form.insert_variable("{{env.suffix}}", &no_errors));
        assert_eq!(form.value("channel"), Some("#ops{{env.suffix}}-alerts"));
        assert_eq!(form.caret().active().map(|c| c.position), Some(18));
    }
}
