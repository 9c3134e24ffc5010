use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::strategy::{self, FieldStrategy};

/// Input type tag of a form field.
///
/// Unknown tags are kept as [`FieldType::Unsupported`] so a schema from a
/// newer backend still loads; such fields render as "unsupported" and never
/// validate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    SimpleText,
    JavascriptOrVariable,
    NumberOrVariable,
    BooleanOrVariable,
    ObjectOrVariable,
    HtmlOrVariable,
    XmlOrVariable,
    SelectOrVariable,
    Text,
    Account,
    Unsupported(String),
}

impl FieldType {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "simple_text" => Self::SimpleText,
            "javascript_or_variable" => Self::JavascriptOrVariable,
            "number_or_variable" => Self::NumberOrVariable,
            "boolean_or_variable" => Self::BooleanOrVariable,
            "object_or_variable" => Self::ObjectOrVariable,
            "html_or_variable" => Self::HtmlOrVariable,
            "xml_or_variable" => Self::XmlOrVariable,
            "select_or_variable" => Self::SelectOrVariable,
            "text" => Self::Text,
            "account" => Self::Account,
            other => Self::Unsupported(other.to_string()),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            Self::SimpleText => "simple_text",
            Self::JavascriptOrVariable => "javascript_or_variable",
            Self::NumberOrVariable => "number_or_variable",
            Self::BooleanOrVariable => "boolean_or_variable",
            Self::ObjectOrVariable => "object_or_variable",
            Self::HtmlOrVariable => "html_or_variable",
            Self::XmlOrVariable => "xml_or_variable",
            Self::SelectOrVariable => "select_or_variable",
            Self::Text => "text",
            Self::Account => "account",
            Self::Unsupported(tag) => tag,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }

    /// Conversion and checking rules for this type
    pub fn strategy(&self) -> &'static dyn FieldStrategy {
        strategy::for_type(self)
    }
}

impl From<String> for FieldType {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl From<FieldType> for String {
    fn from(field_type: FieldType) -> Self {
        field_type.tag().to_string()
    }
}

/// One choice of a select or account field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    pub value: String,
    #[serde(default)]
    pub label: String,
}

impl FieldOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }

    /// Option referring to a connected provider account
    pub fn account(slug: &str, label: &str) -> Self {
        Self::new(format!("{{{{accounts.{}}}}}", slug), label)
    }
}

/// Declaration of one form field, as served with a node's provider schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchema {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(alias = "input_type")]
    pub input_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_visible", alias = "is_visible")]
    pub is_visible: bool,
    /// Provider whose accounts populate an `account` field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

fn default_visible() -> bool {
    true
}

impl FieldSchema {
    pub fn new(name: &str, input_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            label: name.to_string(),
            input_type,
            description: None,
            options: Vec::new(),
            required: false,
            is_visible: true,
            provider: None,
            default: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_options(mut self, options: Vec<FieldOption>) -> Self {
        self.options = options;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn strategy(&self) -> &'static dyn FieldStrategy {
        self.input_type.strategy()
    }

    pub fn has_option(&self, value: &str) -> bool {
        self.options.iter().any(|o| o.value == value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tags_fall_back_to_unsupported() {
        let field: FieldSchema = serde_json::from_value(serde_json::json!({
            "name": "script",
            "inputType": "code_editor"
        }))
        .unwrap();
        assert_eq!(field.input_type, FieldType::Unsupported("code_editor".into()));
        assert_eq!(field.input_type.tag(), "code_editor");
        assert!(field.is_visible);
        assert!(!field.required);
    }

    #[test]
    fn schema_accepts_snake_case_keys() {
        let field: FieldSchema = serde_json::from_value(serde_json::json!({
            "name": "enabled",
            "input_type": "boolean_or_variable",
            "is_visible": false,
            "required": true
        }))
        .unwrap();
        assert_eq!(field.input_type, FieldType::BooleanOrVariable);
        assert!(!field.is_visible);
        assert!(field.required);
    }

    #[test]
    fn account_options_reference_the_accounts_scope() {
        let option = FieldOption::account("slack-main", "Slack (main)");
        assert_eq!(option.value, "{{accounts.slack-main}}");
        assert_eq!(option.label, "Slack (main)");
    }
}
