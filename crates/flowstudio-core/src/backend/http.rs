use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::json;

use super::{
    BackendApi, BackendError, FlowRecord, ProviderAccount, ProviderDetails, UpdateFlowArgs,
};
use crate::config::BackendConfig;

/// JSON REST client for the hosted backend.
pub struct HttpBackend {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Build from config, reading the key from the configured env var.
    pub fn from_config(config: &BackendConfig) -> Result<Self, BackendError> {
        let base_url = config
            .base_url
            .as_deref()
            .ok_or(BackendError::NotConfigured)?;
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| BackendError::MissingApiKey(config.api_key_env.clone()))?;
        Ok(Self::new(base_url, &api_key))
    }

    /// Base URL plus percent-encoded path segments
    fn url(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let invalid = || BackendError::InvalidUrl(self.base_url.clone());
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(
        &self,
        method: Method,
        segments: &[&str],
    ) -> Result<RequestBuilder, BackendError> {
        Ok(self
            .client
            .request(method, self.url(segments)?)
            .bearer_auth(&self.api_key)
            .header("apikey", &self.api_key))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let response = request
            .send()
            .await
            .map_err(|source| BackendError::Request { source })?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), %message, "Backend request failed");
        Err(BackendError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn list_flows(&self, account_id: &str) -> Result<Vec<FlowRecord>, BackendError> {
        self.json(self.request(Method::GET, &["account", account_id, "workflows"])?)
            .await
    }

    async fn create_flow(
        &self,
        account_id: &str,
        name: &str,
        description: &str,
        kind: &str,
    ) -> Result<FlowRecord, BackendError> {
        let body = json!({
            "flow_name": name,
            "description": description,
            "type": kind,
        });
        let record: FlowRecord = self
            .json(
                self.request(Method::POST, &["account", account_id, "workflow"])?
                    .json(&body),
            )
            .await?;
        tracing::info!(workflow_id = %record.workflow_id, name, "Created workflow");
        Ok(record)
    }

    async fn update_flow(
        &self,
        account_id: &str,
        flow_id: &str,
        args: &UpdateFlowArgs,
    ) -> Result<FlowRecord, BackendError> {
        self.json(
            self.request(Method::PUT, &["account", account_id, "workflow", flow_id])?
                .json(args),
        )
        .await
    }

    async fn delete_flow(&self, account_id: &str, flow_id: &str) -> Result<(), BackendError> {
        let request =
            self.request(Method::DELETE, &["account", account_id, "workflow", flow_id])?;
        self.send(request).await?;
        tracing::info!(workflow_id = flow_id, "Deleted workflow");
        Ok(())
    }

    async fn get_provider(
        &self,
        account_id: &str,
        provider: &str,
    ) -> Result<Option<ProviderDetails>, BackendError> {
        // The backend answers with a list even for a single provider.
        let details: Vec<ProviderDetails> = self
            .json(self.request(
                Method::GET,
                &["account", account_id, "auth", "providers", provider],
            )?)
            .await?;
        Ok(details.into_iter().next())
    }

    async fn accounts_for_provider(
        &self,
        account_id: &str,
        provider: &str,
    ) -> Result<Vec<ProviderAccount>, BackendError> {
        self.json(self.request(
            Method::GET,
            &["account", account_id, "auth", "accounts", provider],
        )?)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_join_segments_without_double_slashes() {
        let backend = HttpBackend::new("https://api.example.com/v1/", "key");
        let url = backend.url(&["account", "acc-1", "workflow", "wf-9"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/v1/account/acc-1/workflow/wf-9"
        );
    }

    #[test]
    fn url_segments_are_percent_encoded() {
        let backend = HttpBackend::new("https://api.example.com/v1", "key");
        let url = backend
            .url(&["account", "acc 1", "auth", "providers", "drive#v2?x", "a/b"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/v1/account/acc%201/auth/providers/drive%23v2%3Fx/a%2Fb"
        );
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn unparsable_base_url_is_an_error() {
        let backend = HttpBackend::new("not a url", "key");
        assert!(matches!(
            backend.url(&["account"]),
            Err(BackendError::InvalidUrl(_))
        ));
    }

    #[test]
    fn from_config_requires_base_url() {
        let config = BackendConfig::default();
        assert!(matches!(
            HttpBackend::from_config(&config),
            Err(BackendError::NotConfigured)
        ));
    }
}
