use serde_json::Value;

use super::field::{FieldSchema, FieldType};
use super::variable::{is_partial_variable, is_variable};

/// Result of checking raw input as it is typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCheck {
    pub valid: bool,
    pub message: Option<String>,
}

impl FieldCheck {
    pub fn ok() -> Self {
        Self {
            valid: true,
            message: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: Some(message.into()),
        }
    }
}

/// Per-type conversion between a field's edited text and its JSON value.
pub trait FieldStrategy: Sync {
    /// Short tag shown next to the field
    fn badge(&self) -> &'static str;

    /// Text shown in the editor for a stored value
    fn to_text(&self, value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn check(&self, text: &str, field: &FieldSchema) -> FieldCheck;

    /// Value handed to the validator and the submit handler
    fn to_json(&self, text: &str) -> Value {
        Value::String(text.to_string())
    }
}

struct PlainText(&'static str);

impl FieldStrategy for PlainText {
    fn badge(&self) -> &'static str {
        self.0
    }

    fn check(&self, _text: &str, _field: &FieldSchema) -> FieldCheck {
        FieldCheck::ok()
    }
}

struct NumberField;

impl FieldStrategy for NumberField {
    fn badge(&self) -> &'static str {
        "num"
    }

    fn check(&self, text: &str, _field: &FieldSchema) -> FieldCheck {
        let trimmed = text.trim();
        if trimmed.is_empty() || is_partial_variable(trimmed) || trimmed.parse::<f64>().is_ok() {
            FieldCheck::ok()
        } else {
            FieldCheck::invalid("Expected a number or a variable")
        }
    }

    fn to_json(&self, text: &str) -> Value {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }
        if let Ok(n) = trimmed.parse::<i64>() {
            return Value::from(n);
        }
        match trimmed.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
            Some(n) => Value::Number(n),
            None => Value::String(text.to_string()),
        }
    }
}

struct BooleanField;

impl FieldStrategy for BooleanField {
    fn badge(&self) -> &'static str {
        "bool"
    }

    fn check(&self, text: &str, _field: &FieldSchema) -> FieldCheck {
        let trimmed = text.trim();
        if trimmed.is_empty() || is_partial_variable(trimmed) || parse_bool(trimmed).is_some() {
            FieldCheck::ok()
        } else {
            FieldCheck::invalid("Expected true, false or a variable")
        }
    }

    fn to_json(&self, text: &str) -> Value {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }
        match parse_bool(trimmed) {
            Some(b) => Value::Bool(b),
            None => Value::String(text.to_string()),
        }
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

struct ObjectField;

impl FieldStrategy for ObjectField {
    fn badge(&self) -> &'static str {
        "obj"
    }

    fn to_text(&self, value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        }
    }

    fn check(&self, text: &str, _field: &FieldSchema) -> FieldCheck {
        let trimmed = text.trim();
        if trimmed.is_empty() || is_partial_variable(trimmed) {
            return FieldCheck::ok();
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(_) => FieldCheck::ok(),
            Err(e) => FieldCheck::invalid(format!("Invalid JSON: {}", e)),
        }
    }

    fn to_json(&self, text: &str) -> Value {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }
        if is_variable(trimmed) {
            return Value::String(trimmed.to_string());
        }
        serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(text.to_string()))
    }
}

struct SelectField;

impl FieldStrategy for SelectField {
    fn badge(&self) -> &'static str {
        "sel"
    }

    fn check(&self, text: &str, field: &FieldSchema) -> FieldCheck {
        if text.is_empty()
            || is_variable(text)
            || field.options.is_empty()
            || field.has_option(text)
        {
            FieldCheck::ok()
        } else {
            FieldCheck::invalid("Not one of the available options")
        }
    }
}

struct AccountField;

impl FieldStrategy for AccountField {
    fn badge(&self) -> &'static str {
        "acct"
    }

    fn check(&self, text: &str, _field: &FieldSchema) -> FieldCheck {
        if text.is_empty() || is_variable(text) {
            FieldCheck::ok()
        } else {
            FieldCheck::invalid("Choose a connected account")
        }
    }
}

struct UnsupportedField;

impl FieldStrategy for UnsupportedField {
    fn badge(&self) -> &'static str {
        "?"
    }

    fn check(&self, _text: &str, field: &FieldSchema) -> FieldCheck {
        FieldCheck::invalid(format!(
            "Unsupported field type '{}'",
            field.input_type.tag()
        ))
    }
}

static SIMPLE_TEXT: PlainText = PlainText("txt");
static JAVASCRIPT: PlainText = PlainText("js");
static HTML: PlainText = PlainText("html");
static XML: PlainText = PlainText("xml");
static TEXT: PlainText = PlainText("text");
static NUMBER: NumberField = NumberField;
static BOOLEAN: BooleanField = BooleanField;
static OBJECT: ObjectField = ObjectField;
static SELECT: SelectField = SelectField;
static ACCOUNT: AccountField = AccountField;
static UNSUPPORTED: UnsupportedField = UnsupportedField;

pub(super) fn for_type(field_type: &FieldType) -> &'static dyn FieldStrategy {
    match field_type {
        FieldType::SimpleText => &SIMPLE_TEXT,
        FieldType::JavascriptOrVariable => &JAVASCRIPT,
        FieldType::NumberOrVariable => &NUMBER,
        FieldType::BooleanOrVariable => &BOOLEAN,
        FieldType::ObjectOrVariable => &OBJECT,
        FieldType::HtmlOrVariable => &HTML,
        FieldType::XmlOrVariable => &XML,
        FieldType::SelectOrVariable => &SELECT,
        FieldType::Text => &TEXT,
        FieldType::Account => &ACCOUNT,
        FieldType::Unsupported(_) => &UNSUPPORTED,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::forms::FieldOption;

    fn check(field_type: FieldType, text: &str) -> FieldCheck {
        let field = FieldSchema::new("f", field_type);
        field.strategy().check(text, &field)
    }

    #[test]
    fn variables_are_valid_for_typed_fields() {
        assert!(check(FieldType::BooleanOrVariable, "{{trigger.enabled}}").valid);
        assert!(check(FieldType::NumberOrVariable, "{{trigger.count}}").valid);
        assert!(check(FieldType::ObjectOrVariable, "{{trigger.body}}").valid);
        assert!(check(FieldType::ObjectOrVariable, "{{trig").valid);

        let boolean = FieldType::BooleanOrVariable.strategy();
        assert_eq!(boolean.to_json("{{trigger.enabled}}"), json!("{{trigger.enabled}}"));
        assert_eq!(boolean.to_json("TRUE"), json!(true));
    }

    #[test]
    fn typed_fields_reject_garbage() {
        assert!(!check(FieldType::BooleanOrVariable, "maybe").valid);
        assert!(!check(FieldType::NumberOrVariable, "12abc").valid);
        let object = check(FieldType::ObjectOrVariable, "{\"a\": ");
        assert!(!object.valid);
        assert!(object.message.unwrap().starts_with("Invalid JSON"));
    }

    #[test]
    fn numbers_keep_integers_integral() {
        let number = FieldType::NumberOrVariable.strategy();
        assert_eq!(number.to_json("42"), json!(42));
        assert_eq!(number.to_json("2.5"), json!(2.5));
        assert_eq!(number.to_json(""), Value::Null);
        assert_eq!(number.to_text(&json!(42)), "42");
    }

    #[test]
    fn objects_round_trip_through_pretty_text() {
        let object = FieldType::ObjectOrVariable.strategy();
        let text = object.to_text(&json!({"channel": "#ops"}));
        assert!(text.contains('\n'));
        assert_eq!(object.to_json(&text), json!({"channel": "#ops"}));
        assert_eq!(object.to_text(&Value::Null), "");
    }

    #[test]
    fn select_checks_options() {
        let field = FieldSchema::new("method", FieldType::SelectOrVariable).with_options(vec![
            FieldOption::new("GET", "GET"),
            FieldOption::new("POST", "POST"),
        ]);
        let select = field.strategy();
        assert!(select.check("POST", &field).valid);
        assert!(select.check("{{trigger.method}}", &field).valid);
        assert!(!select.check("PATCH", &field).valid);
    }

    #[test]
    fn unsupported_fields_never_validate() {
        let result = check(FieldType::from_tag("code_editor"), "anything");
        assert!(!result.valid);
        assert!(result.message.unwrap().contains("code_editor"));
    }
}
