//! Cluster Manager Client
//!
//! HTTP client for the cluster manager REST API.

use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::ControlPlane;
use crate::error::{Error, Result};
use crate::model::{
    ConfigStaleness, EntityStatus, HealthSummary, RestartResult, RoleInstance, RoleState,
};

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_url: String,

    pub cluster: String,

    pub username: Option<String>,

    pub password: Option<String>,

    pub verify_tls: bool,

    pub timeout_secs: u64,

    pub max_retries: u32,

    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_url: "https://localhost:7183/api/v31".to_string(),
            cluster: "cluster".to_string(),
            username: None,
            password: None,
            verify_tls: true,
            timeout_secs: 30,
            max_retries: 3,
            user_agent: format!("rolling-restart/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ApiConfig {
    pub fn with_url(url: &str) -> Self {
        Self {
            api_url: url.to_string(),
            ..Default::default()
        }
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.username = Some(username.to_string());
        self.password = Some(password.to_string());
        self
    }
}

#[derive(Debug, Deserialize)]
struct ItemsResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ServiceResponse {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceRef {
    service_name: String,
}

#[derive(Debug, Deserialize)]
struct HostRef {
    hostname: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleResponse {
    name: String,
    #[serde(rename = "type")]
    role_type: String,
    service_ref: ServiceRef,
    host_ref: HostRef,
    maintenance_mode: bool,
    role_state: Option<RoleState>,
    entity_status: Option<EntityStatus>,
    health_summary: Option<HealthSummary>,
    config_staleness_status: Option<ConfigStaleness>,
}

#[derive(Debug, Deserialize)]
struct CommandListResponse {
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

pub struct ApiClient {
    config: ApiConfig,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| Error::InvalidConfig {
                reason: format!("cannot build HTTP client: {e}"),
            })?;

        Ok(Self { config, http })
    }

    fn services_url(&self) -> String {
        format!(
            "{}/clusters/{}/services",
            self.config.api_url.trim_end_matches('/'),
            urlencoding::encode(&self.config.cluster)
        )
    }

    fn roles_url(&self, service: &str) -> String {
        format!("{}/{}/roles", self.services_url(), urlencoding::encode(service))
    }

    fn role_url(&self, service: &str, name: &str) -> String {
        format!("{}/{}", self.roles_url(service), urlencoding::encode(name))
    }

    fn restart_url(&self, service: &str) -> String {
        format!(
            "{}/{}/roleCommands/restart",
            self.services_url(),
            urlencoding::encode(service)
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.username {
            Some(username) => request.basic_auth(username, self.config.password.as_ref()),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let attempts = self.config.max_retries.max(1);
        let mut attempt = 0;

        loop {
            match self.try_get_json(url).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_recoverable() && attempt + 1 < attempts => {
                    let delay = retry_delay(attempt);
                    tracing::debug!(url, attempt, error = %err, "retrying control plane read");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn try_get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .authorize(self.http.get(url))
            .send()
            .await
            .map_err(|e| Error::ControlPlane {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        parse_response(url, response).await
    }

    async fn post_json<T: DeserializeOwned>(&self, url: &str, body: &serde_json::Value) -> Result<T> {
        let response = self
            .authorize(self.http.post(url))
            .json(body)
            .send()
            .await
            .map_err(|e| Error::ControlPlane {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        parse_response(url, response).await
    }
}

impl ControlPlane for ApiClient {
    async fn list_services(&self) -> Result<Vec<String>> {
        let url = format!("{}/", self.services_url());
        let data: ItemsResponse<ServiceResponse> = self.get_json(&url).await?;
        Ok(data.items.into_iter().map(|service| service.name).collect())
    }

    async fn list_roles(&self, service: &str) -> Result<Vec<RoleInstance>> {
        let url = format!("{}/", self.roles_url(service));
        let data: ItemsResponse<RoleResponse> = self.get_json(&url).await?;
        data.items
            .into_iter()
            .map(|role| convert_role_response(&url, role))
            .collect()
    }

    async fn role_status(&self, service: &str, name: &str) -> Result<RoleInstance> {
        let url = self.role_url(service, name);
        let data: RoleResponse = self.get_json(&url).await?;
        convert_role_response(&url, data)
    }

    async fn restart_role(&self, service: &str, name: &str) -> Result<RestartResult> {
        let url = self.restart_url(service);
        let body = serde_json::json!({ "items": [name] });
        let data: CommandListResponse = self.post_json(&url, &body).await?;
        Ok(convert_command_response(data))
    }
}

/// Backoff before read retry `attempt + 1`: 100ms doubling, exponent capped at 16.
fn retry_delay(attempt: u32) -> Duration {
    Duration::from_millis(100u64.saturating_mul(2u64.pow(attempt.min(16))))
}

async fn parse_response<T: DeserializeOwned>(url: &str, response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Api {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    let text = response.text().await.map_err(|e| Error::ControlPlane {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    serde_json::from_str(&text).map_err(|e| Error::InvalidResponse {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

fn convert_role_response(url: &str, data: RoleResponse) -> Result<RoleInstance> {
    let hostname = data.host_ref.hostname.ok_or_else(|| Error::InvalidResponse {
        url: url.to_string(),
        reason: format!("role {} has no hostRef.hostname", data.name),
    })?;

    Ok(RoleInstance {
        name: data.name,
        hostname,
        service_name: data.service_ref.service_name,
        role_type: data.role_type,
        maintenance_mode: data.maintenance_mode,
        role_state: data.role_state.unwrap_or(RoleState::Unknown),
        entity_status: data.entity_status.unwrap_or(EntityStatus::Unknown),
        health_summary: data.health_summary.unwrap_or(HealthSummary::Unknown),
        config_staleness: data
            .config_staleness_status
            .unwrap_or(ConfigStaleness::Unknown),
    })
}

fn convert_command_response(data: CommandListResponse) -> RestartResult {
    let errors = data
        .errors
        .into_iter()
        .map(|error| match error {
            serde_json::Value::String(message) => message,
            other => other.to_string(),
        })
        .collect();

    RestartResult { errors }
}
