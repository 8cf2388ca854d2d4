//! Project and access-token resolution.
//!
//! Environment variables win; otherwise the GCE metadata server of the
//! machine running the fault injector is asked. Tokens from the metadata
//! server carry an expiry and are refreshed from it shortly before they run
//! out; a token supplied through `GOOGLE_OAUTH_ACCESS_TOKEN` is used as is.

use crate::shared::error::{ComputeError, ComputeResult};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{error, info};

const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";
const PROJECT_ENV_VARS: [&str; 2] = ["GOOGLE_CLOUD_PROJECT", "CLOUDSDK_CORE_PROJECT"];
const TOKEN_ENV_VAR: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";
/// Refresh this long before the reported expiry.
pub const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct GcpCredentials {
    pub project_id: String,
    pub access_token: String,
    /// `None` for tokens that cannot be refreshed.
    pub expires_at: Option<Instant>,
}

impl std::fmt::Debug for GcpCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcpCredentials")
            .field("project_id", &self.project_id)
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

impl GcpCredentials {
    pub fn new(project_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            access_token: access_token.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_in: Duration) -> Self {
        self.expires_at = Some(Instant::now() + expires_in);
        self
    }

    pub fn needs_refresh(&self) -> bool {
        self.needs_refresh_at(Instant::now())
    }

    fn needs_refresh_at(&self, now: Instant) -> bool {
        self.expires_at
            .map(|expires_at| now + TOKEN_REFRESH_MARGIN >= expires_at)
            .unwrap_or(false)
    }

    /// Fetch a new token from the metadata server.
    pub async fn refresh(&mut self) -> ComputeResult<()> {
        let token = MetadataClient::from_env()?.access_token().await.map_err(|e| {
            error!(project = %self.project_id, error = %e, "Failed to refresh GCP access token");
            e
        })?;
        self.access_token = token.access_token;
        self.expires_at = Some(Instant::now() + Duration::from_secs(token.expires_in));
        info!(project = %self.project_id, expires_in = token.expires_in, "Refreshed GCP access token");
        Ok(())
    }

    pub async fn resolve() -> ComputeResult<Self> {
        let project_from_env = first_env(&PROJECT_ENV_VARS);
        let token_from_env = first_env(&[TOKEN_ENV_VAR]);

        let metadata = MetadataClient::from_env()?;

        let project_id = match project_from_env {
            Some(project) => project,
            None => metadata.project_id().await.map_err(|e| {
                error!(error = %e, "Error on setting up GCP connection");
                e
            })?,
        };

        let credentials = match token_from_env {
            Some(token) => Self::new(project_id, token),
            None => {
                let token = metadata.access_token().await.map_err(|e| {
                    error!(error = %e, "Error on setting up GCP connection");
                    e
                })?;
                Self::new(project_id, token.access_token)
                    .with_expiry(Duration::from_secs(token.expires_in))
            }
        };

        info!(project = %credentials.project_id, "Resolved GCP credentials");

        Ok(credentials)
    }
}

fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

struct MetadataClient {
    client: reqwest::Client,
    base_url: String,
}

impl MetadataClient {
    fn from_env() -> ComputeResult<Self> {
        let host = std::env::var("GCE_METADATA_HOST")
            .unwrap_or_else(|_| DEFAULT_METADATA_HOST.to_string());
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ComputeError::Credentials(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            base_url: format!("http://{host}/computeMetadata/v1"),
        })
    }

    async fn get(&self, path: &str) -> ComputeResult<reqwest::Response> {
        let response = self
            .client
            .get(format!("{}/{}", self.base_url, path))
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| ComputeError::Credentials(format!("metadata server unreachable: {e}")))?;

        if !response.status().is_success() {
            return Err(ComputeError::Credentials(format!(
                "metadata server returned {} for {path}",
                response.status()
            )));
        }

        Ok(response)
    }

    async fn project_id(&self) -> ComputeResult<String> {
        let project = self
            .get("project/project-id")
            .await?
            .text()
            .await
            .map_err(|e| ComputeError::Credentials(format!("invalid project id: {e}")))?;

        let project = project.trim().to_string();
        if project.is_empty() {
            return Err(ComputeError::Credentials(
                "metadata server returned an empty project id".to_string(),
            ));
        }
        Ok(project)
    }

    async fn access_token(&self) -> ComputeResult<MetadataToken> {
        let token: MetadataToken = self
            .get("instance/service-accounts/default/token")
            .await?
            .json()
            .await
            .map_err(|e| ComputeError::Credentials(format!("invalid token response: {e}")))?;
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_token() {
        let credentials = GcpCredentials::new("chaos-project", "ya29.secret");
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("chaos-project"));
        assert!(!rendered.contains("ya29.secret"));
    }

    #[test]
    fn test_metadata_token_decodes() {
        let token: MetadataToken = serde_json::from_str(
            r#"{"access_token":"ya29.abc","expires_in":3599,"token_type":"Bearer"}"#,
        )
        .unwrap();
        assert_eq!(token.access_token, "ya29.abc");
        assert_eq!(token.expires_in, 3599);
    }

    #[test]
    fn test_env_token_never_needs_refresh() {
        let credentials = GcpCredentials::new("chaos-project", "ya29.static");
        assert!(!credentials.needs_refresh());
        assert!(!credentials.needs_refresh_at(Instant::now() + Duration::from_secs(86_400)));
    }

    #[test]
    fn test_metadata_token_refreshes_before_expiry() {
        let credentials = GcpCredentials::new("chaos-project", "ya29.abc")
            .with_expiry(Duration::from_secs(3599));
        let now = Instant::now();

        assert!(!credentials.needs_refresh_at(now));
        assert!(!credentials.needs_refresh_at(now + Duration::from_secs(3000)));
        assert!(credentials.needs_refresh_at(now + Duration::from_secs(3599) - TOKEN_REFRESH_MARGIN));
        assert!(credentials.needs_refresh_at(now + Duration::from_secs(3700)));
    }

    #[test]
    fn test_short_lived_token_needs_refresh_immediately() {
        let credentials = GcpCredentials::new("chaos-project", "ya29.abc")
            .with_expiry(Duration::from_secs(30));
        assert!(credentials.needs_refresh());
    }

    #[test]
    fn test_first_env_skips_unset() {
        assert_eq!(first_env(&["NODEFAULT_TEST_DEFINITELY_UNSET_VAR"]), None);
    }
}
