//! Backend - the hosted workflow API.
//!
//! Local editing never depends on it; callers log failures and carry on.

mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::forms::FieldOption;

pub use http::HttpBackend;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend base URL is not configured")]
    NotConfigured,

    #[error("Invalid backend URL '{0}'")]
    InvalidUrl(String),

    #[error("Missing API key (set {0})")]
    MissingApiKey(String),

    #[error("HTTP request failed: {source}")]
    Request {
        #[source]
        source: reqwest::Error,
    },

    #[error("Backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),
}

/// A workflow as listed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRecord {
    pub workflow_id: String,
    #[serde(default)]
    pub workflow_version_id: Option<String>,
    #[serde(default, alias = "flow_name")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Fields to change on an existing workflow; `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateFlowArgs {
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "flow_name")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderDetails {
    pub provider_name: String,
    #[serde(default)]
    pub provider_label: String,
    #[serde(default)]
    pub provider_icon: Option<String>,
    #[serde(default)]
    pub auth_type: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// A connected account for one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderAccount {
    pub account_auth_provider_account_slug: String,
    #[serde(default)]
    pub account_auth_provider_account_label: String,
    #[serde(default)]
    pub auth_provider_id: Option<String>,
}

impl ProviderAccount {
    pub fn slug(&self) -> &str {
        &self.account_auth_provider_account_slug
    }

    pub fn label(&self) -> &str {
        if self.account_auth_provider_account_label.is_empty() {
            self.slug()
        } else {
            &self.account_auth_provider_account_label
        }
    }
}

/// Select options for an `account` field.
pub fn account_options(accounts: &[ProviderAccount]) -> Vec<FieldOption> {
    accounts
        .iter()
        .map(|a| FieldOption::account(a.slug(), a.label()))
        .collect()
}

/// Operations the studio needs from the hosted backend.
#[async_trait]
pub trait BackendApi: Send + Sync {
    async fn list_flows(&self, account_id: &str) -> Result<Vec<FlowRecord>, BackendError>;

    async fn create_flow(
        &self,
        account_id: &str,
        name: &str,
        description: &str,
        kind: &str,
    ) -> Result<FlowRecord, BackendError>;

    async fn update_flow(
        &self,
        account_id: &str,
        flow_id: &str,
        args: &UpdateFlowArgs,
    ) -> Result<FlowRecord, BackendError>;

    async fn delete_flow(&self, account_id: &str, flow_id: &str) -> Result<(), BackendError>;

    /// Details of a provider, `None` when the backend does not know it
    async fn get_provider(
        &self,
        account_id: &str,
        provider: &str,
    ) -> Result<Option<ProviderDetails>, BackendError>;

    async fn accounts_for_provider(
        &self,
        account_id: &str,
        provider: &str,
    ) -> Result<Vec<ProviderAccount>, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accounts_become_variable_options() {
        let accounts: Vec<ProviderAccount> = serde_json::from_value(serde_json::json!([
            {
                "account_auth_provider_account_slug": "slack",
                "account_auth_provider_account_label": "Slack workspace"
            },
            { "account_auth_provider_account_slug": "slack-2" }
        ]))
        .unwrap();

        let options = account_options(&accounts);
        assert_eq!(options[0].value, "{{accounts.slack}}");
        assert_eq!(options[0].label, "Slack workspace");
        assert_eq!(options[1].label, "slack-2");
    }

    #[test]
    fn update_args_omit_unchanged_fields() {
        let args = UpdateFlowArgs {
            active: Some(true),
            ..UpdateFlowArgs::default()
        };
        assert_eq!(
            serde_json::to_value(&args).unwrap(),
            serde_json::json!({ "active": true })
        );
    }
}
