use std::cell::Cell;

use flowstudio_core::backend::{account_options, ProviderAccount};
use flowstudio_core::forms::{
    FieldSchema, FieldType, FormErrors, FormSet, FormState, RequiredFields, SubmitOutcome,
};
use serde_json::{json, Map, Value};

fn stored(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn slack_fields() -> Vec<FieldSchema> {
    serde_json::from_value(json!([
        {
            "name": "account",
            "label": "Account",
            "inputType": "account",
            "provider": "slack",
            "required": true
        },
        { "name": "channel", "label": "Channel", "inputType": "simple_text", "required": true },
        {
            "name": "enabled",
            "label": "Enabled",
            "inputType": "boolean_or_variable",
            "default": true
        },
        { "name": "payload", "label": "Payload", "inputType": "object_or_variable" }
    ]))
    .unwrap()
}

#[test]
fn variable_reference_satisfies_boolean_field() {
    let fields = slack_fields();
    let validator = RequiredFields::new(&fields);
    let mut form = FormState::new("notify", fields.clone(), &Map::new());

    assert!(form.change("enabled", "{{trigger.enabled}}", &validator));
    assert_eq!(form.visible_error("enabled"), None);
    assert_eq!(form.json_values()["enabled"], json!("{{trigger.enabled}}"));
}

#[test]
fn one_invalid_required_field_blocks_submit() {
    let fields = slack_fields();
    let validator = RequiredFields::new(&fields);
    let mut form = FormState::new(
        "notify",
        fields.clone(),
        &stored(json!({ "account": "{{accounts.slack}}" })),
    );

    let calls = Cell::new(0);
    let outcome = form.submit(&validator, |_| calls.set(calls.get() + 1));

    assert_eq!(calls.get(), 0);
    match outcome {
        SubmitOutcome::Invalid(errors) => {
            assert_eq!(errors.len(), 1);
            assert!(errors.contains_key("channel"));
        }
        other => panic!("expected invalid submit, got {:?}", other),
    }
    assert!(form.visible_error("channel").is_some());
}

#[test]
fn valid_form_submits_once_with_native_values() {
    let fields = slack_fields();
    let validator = RequiredFields::new(&fields);
    let mut form = FormState::new("notify", fields.clone(), &Map::new());

    form.change("account", "{{accounts.slack}}", &validator);
    form.change("channel", "#billing", &validator);
    form.change("payload", "{\"text\": \"paid\"}", &validator);
    assert!(form.is_valid());

    let mut seen = Vec::new();
    let outcome = form.submit(&validator, |values| seen.push(values));

    assert_eq!(outcome, SubmitOutcome::Submitted);
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0]["payload"], json!({ "text": "paid" }));
    assert_eq!(seen[0]["enabled"], json!(true));
}

#[test]
fn custom_validator_errors_merge_with_input_errors() {
    let fields = vec![
        FieldSchema::new("retries", FieldType::NumberOrVariable),
        FieldSchema::new("url", FieldType::SimpleText),
    ];
    let validator = |values: &Map<String, Value>| -> FormErrors {
        let mut errors = FormErrors::new();
        if !values["url"].as_str().unwrap_or("").starts_with("https://") {
            errors.insert("url".into(), "Must use https".into());
        }
        errors
    };
    let mut form = FormState::new("http", fields, &Map::new());

    form.change("retries", "three", &validator);
    form.change("url", "http://example.com", &validator);

    let errors = form.errors();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors["url"], "Must use https");
    assert!(errors["retries"].contains("number"));
}

#[test]
fn provider_accounts_feed_account_field() {
    let accounts: Vec<ProviderAccount> = serde_json::from_value(json!([
        {
            "account_auth_provider_account_slug": "slack-ops",
            "account_auth_provider_account_label": "Ops workspace"
        }
    ]))
    .unwrap();

    let mut field = FieldSchema::new("account", FieldType::Account);
    field.options = account_options(&accounts);

    let check = field.strategy().check(&field.options[0].value, &field);
    assert!(check.valid);
    assert!(!field.strategy().check("ops", &field).valid);
}

#[test]
fn variable_insertion_targets_last_focused_form() {
    let no_errors = |_: &Map<String, Value>| FormErrors::new();
    let mut forms = FormSet::new();
    forms.open(FormState::new("notify", slack_fields(), &Map::new()));
    forms.open(FormState::new(
        "log",
        vec![FieldSchema::new("message", FieldType::Text)],
        &stored(json!({ "message": "order  paid" })),
    ));

    assert!(forms.focus("notify", "channel", 0));
    assert!(forms.focus("log", "message", 6));
    assert!(forms.insert_variable("{{trigger.order_id}}", &no_errors));

    assert_eq!(
        forms.get("log").and_then(|f| f.value("message")),
        Some("order {{trigger.order_id}} paid")
    );
    assert_eq!(forms.get("notify").and_then(|f| f.value("channel")), Some(""));
    assert!(forms.get("log").is_some_and(|f| f.has_unsaved_changes()));
}
