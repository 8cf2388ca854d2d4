use super::{ComputeRepository, ListedInstance};
use crate::auth::GcpCredentials;
use crate::shared::error::{ComputeError, ComputeResult};
use async_trait::async_trait;
use nodefault_core::InstanceStatus;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

pub const COMPUTE_API_BASE: &str = "https://compute.googleapis.com/compute/v1";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AggregatedInstanceList {
    #[serde(default)]
    items: BTreeMap<String, InstancesScopedList>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InstancesScopedList {
    #[serde(default)]
    instances: Vec<InstanceResource>,
}

#[derive(Debug, Deserialize)]
struct InstanceResource {
    name: String,
    status: Option<String>,
}

/// Compute Engine REST repository.
///
/// Expiring credentials are refreshed before the request that would
/// otherwise go out with a stale token.
pub struct RestComputeRepository {
    client: Client,
    base_url: String,
    project_id: String,
    credentials: RwLock<GcpCredentials>,
}

impl RestComputeRepository {
    pub fn new(credentials: GcpCredentials) -> ComputeResult<Self> {
        Self::with_base_url(credentials, COMPUTE_API_BASE)
    }

    pub fn with_base_url(
        credentials: GcpCredentials,
        base_url: impl Into<String>,
    ) -> ComputeResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ComputeError::Http(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            project_id: credentials.project_id.clone(),
            credentials: RwLock::new(credentials),
        })
    }

    fn instance_url(&self, zone: &str, instance: &str) -> String {
        format!(
            "{}/projects/{}/zones/{}/instances/{}",
            self.base_url, self.project_id, zone, instance
        )
    }

    async fn bearer_token(&self) -> ComputeResult<String> {
        {
            let credentials = self.credentials.read().await;
            if !credentials.needs_refresh() {
                return Ok(credentials.access_token.clone());
            }
        }

        let mut credentials = self.credentials.write().await;
        if credentials.needs_refresh() {
            info!(project = %self.project_id, "GCP access token is about to expire");
            credentials.refresh().await?;
        }
        Ok(credentials.access_token.clone())
    }

    async fn request(&self, method: Method, url: &str) -> ComputeResult<RequestBuilder> {
        debug!(%method, %url, "Compute API request");
        let token = self.bearer_token().await?;
        Ok(self.client.request(method, url).bearer_auth(token))
    }

    async fn list_request(&self, page_token: Option<&str>) -> ComputeResult<RequestBuilder> {
        let url = format!(
            "{}/projects/{}/aggregated/instances",
            self.base_url, self.project_id
        );
        let request = self.request(Method::GET, &url).await?;
        Ok(match page_token {
            Some(token) => request.query(&[("pageToken", token)]),
            None => request,
        })
    }

    async fn send(&self, method: Method, url: String) -> ComputeResult<reqwest::Response> {
        let response = self.request(method, &url).await?.send().await?;
        Ok(response)
    }

    async fn expect_success(response: reqwest::Response) -> ComputeResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(ComputeError::Api {
            status: status.as_u16(),
            message: api_error_message(&message),
        })
    }

    async fn lifecycle(&self, verb: &str, zone: &str, instance: &str) -> ComputeResult<()> {
        let url = format!("{}/{}", self.instance_url(zone, instance), verb);
        let response = self.send(Method::POST, url).await?;
        Self::expect_success(response).await?;
        Ok(())
    }
}

/// Pull `error.message` out of a Compute API error body when present.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .and_then(serde_json::Value::as_str)
                .map(ToString::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

/// `zones/us-central1-a` -> `us-central1-a`
fn zone_from_scope(scope: &str) -> &str {
    scope.rsplit('/').next().unwrap_or(scope)
}

fn flatten_page(page: AggregatedInstanceList, out: &mut Vec<ListedInstance>) {
    for (scope, scoped) in page.items {
        let zone = zone_from_scope(&scope);
        for instance in scoped.instances {
            out.push(ListedInstance {
                name: instance.name,
                zone: zone.to_string(),
            });
        }
    }
}

#[async_trait]
impl ComputeRepository for RestComputeRepository {
    fn project(&self) -> &str {
        &self.project_id
    }

    async fn aggregated_list(&self) -> ComputeResult<Vec<ListedInstance>> {
        let mut instances = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let request = self.list_request(page_token.as_deref()).await?;
            let response = Self::expect_success(request.send().await?).await?;
            let page: AggregatedInstanceList = response.json().await?;
            page_token = page.next_page_token.clone().filter(|t| !t.is_empty());
            flatten_page(page, &mut instances);

            if page_token.is_none() {
                break;
            }
        }

        Ok(instances)
    }

    async fn get_status(
        &self,
        zone: &str,
        instance: &str,
    ) -> ComputeResult<Option<InstanceStatus>> {
        let response = self
            .send(Method::GET, self.instance_url(zone, instance))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let resource: InstanceResource = Self::expect_success(response).await?.json().await?;
        let status = resource
            .status
            .ok_or_else(|| ComputeError::Decode(format!("instance {instance} has no status")))?;
        status
            .parse::<InstanceStatus>()
            .map(Some)
            .map_err(|e| ComputeError::Decode(e.to_string()))
    }

    async fn start(&self, zone: &str, instance: &str) -> ComputeResult<()> {
        self.lifecycle("start", zone, instance).await
    }

    async fn stop(&self, zone: &str, instance: &str) -> ComputeResult<()> {
        self.lifecycle("stop", zone, instance).await
    }

    async fn suspend(&self, zone: &str, instance: &str) -> ComputeResult<()> {
        self.lifecycle("suspend", zone, instance).await
    }

    async fn delete(&self, zone: &str, instance: &str) -> ComputeResult<()> {
        let response = self
            .send(Method::DELETE, self.instance_url(zone, instance))
            .await?;
        Self::expect_success(response).await?;
        Ok(())
    }

    async fn reset(&self, zone: &str, instance: &str) -> ComputeResult<()> {
        self.lifecycle("reset", zone, instance).await
    }
}
