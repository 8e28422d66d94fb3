// ABOUTME: HTTP implementation of PlatformClient against the platform's JSON API.
// ABOUTME: Provisioning progress arrives as newline-delimited JSON events.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use super::client::{InfraProgress, PlatformClient};
use super::types::{Identity, InfraRequest, InfraResponse, ProjectDraft, ServerPair};
use crate::error::PlatformError;

/// Default platform API endpoint.
pub const DEFAULT_PLATFORM_URL: &str = "https://api.tandem.dev";

/// One event on the provisioning stream.
///
/// The platform emits `progress` events while it works, then exactly one
/// `complete` or `error` event before closing the stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProvisionEvent {
    Progress {
        percent: u8,
    },
    Complete {
        #[serde(default)]
        pair_id: Option<String>,
        #[serde(default)]
        frontend_id: Option<String>,
        #[serde(default)]
        backend_id: Option<String>,
        #[serde(default)]
        hosting_configured: bool,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: String,
}

#[derive(Debug, Serialize)]
struct MoveRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<&'a str>,
    to: &'a str,
}

#[derive(Debug, Serialize, Deserialize)]
struct SelectedPairBody {
    pair_id: Option<String>,
}

/// Client for the platform's JSON/HTTP API.
#[derive(Debug, Clone)]
pub struct HttpPlatformClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpPlatformClient {
    /// Create a client against the default platform endpoint.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_PLATFORM_URL)
    }

    /// Create a client against a custom endpoint (e.g. a local replica).
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Turn a non-success response into a classified platform error.
    async fn response_error(response: reqwest::Response) -> PlatformError {
        let status = response.status();
        match response.text().await {
            Ok(body) => match serde_json::from_str::<ApiError>(&body) {
                Ok(api) => PlatformError::call(api.error),
                Err(_) => PlatformError::call(format!("HTTP {status}: {body}")),
            },
            Err(e) => PlatformError::Http(e),
        }
    }

    /// Raw provisioning stream for a pair-creation request.
    ///
    /// Yields every [`ProvisionEvent`] the platform emits. The stream
    /// ends after the terminal `complete` event; a platform-reported
    /// `error` event terminates it with a classified error instead.
    pub fn stream_pair_creation(
        &self,
        request: &InfraRequest,
        auth: &Identity,
    ) -> Pin<Box<dyn Stream<Item = Result<ProvisionEvent, PlatformError>> + Send + 'static>> {
        let url = format!("{}/v1/pairs", self.base_url);
        let http = self.http.clone();
        let body = request.clone();
        let principal = auth.principal.clone();

        Box::pin(async_stream::try_stream! {
            let response = http
                .post(&url)
                .header("x-principal", &principal)
                .json(&body)
                .send()
                .await?;

            if !response.status().is_success() {
                Err(Self::response_error(response).await)?;
                return;
            }

            let mut stream = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk) = futures::StreamExt::next(&mut stream).await {
                let chunk = chunk?;
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                // Process complete lines
                while let Some(pos) = buffer.find('\n') {
                    let line = buffer[..pos].trim().to_string();
                    buffer = buffer[pos + 1..].to_string();

                    if line.is_empty() {
                        continue;
                    }

                    let event: ProvisionEvent = serde_json::from_str(&line)?;
                    match event {
                        ProvisionEvent::Error { message } => {
                            Err(PlatformError::call(message))?;
                            return;
                        }
                        ProvisionEvent::Complete { .. } => {
                            yield event;
                            return;
                        }
                        ProvisionEvent::Progress { .. } => yield event,
                    }
                }
            }

            // Stream ended without a terminal event.
            Err(PlatformError::StreamClosed)?;
        })
    }

    fn project_url(&self, project_id: &str, suffix: &str) -> String {
        format!(
            "{}/v1/projects/{}{}",
            self.base_url,
            urlencoding::encode(project_id),
            suffix
        )
    }
}

impl Default for HttpPlatformClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlatformClient for HttpPlatformClient {
    async fn create_project(
        &self,
        draft: &ProjectDraft,
        auth: &Identity,
    ) -> Result<(), PlatformError> {
        let url = format!("{}/v1/projects", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("x-principal", &auth.principal)
            .json(draft)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::response_error(response).await)
        }
    }

    async fn create_pair_infrastructure(
        &self,
        request: &InfraRequest,
        auth: &Identity,
        progress: InfraProgress,
    ) -> Result<InfraResponse, PlatformError> {
        let mut stream = self.stream_pair_creation(request, auth);

        while let Some(event) = futures::StreamExt::next(&mut stream).await {
            match event? {
                ProvisionEvent::Progress { percent } => progress(percent.min(100)),
                ProvisionEvent::Complete {
                    pair_id,
                    frontend_id,
                    backend_id,
                    hosting_configured,
                } => {
                    progress(100);
                    return Ok(InfraResponse {
                        pair_id,
                        frontend_id,
                        backend_id,
                        hosting_configured,
                    });
                }
                // The raw stream turns error events into Err items.
                ProvisionEvent::Error { message } => {
                    return Err(PlatformError::call(message));
                }
            }
        }

        Err(PlatformError::StreamClosed)
    }

    async fn list_project_pairs(
        &self,
        project_id: &str,
        auth: &Identity,
    ) -> Result<Vec<ServerPair>, PlatformError> {
        let url = self.project_url(project_id, "/pairs");
        let response = self
            .http
            .get(&url)
            .header("x-principal", &auth.principal)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::response_error(response).await)
        }
    }

    async fn move_pair(
        &self,
        pair_id: &str,
        from: Option<&str>,
        to: &str,
        auth: &Identity,
    ) -> Result<(), PlatformError> {
        let url = format!(
            "{}/v1/pairs/{}/move",
            self.base_url,
            urlencoding::encode(pair_id)
        );
        let response = self
            .http
            .post(&url)
            .header("x-principal", &auth.principal)
            .json(&MoveRequest { from, to })
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::response_error(response).await)
        }
    }

    async fn read_selected_pair(
        &self,
        project_id: &str,
        auth: &Identity,
    ) -> Result<Option<String>, PlatformError> {
        let url = self.project_url(project_id, "/selected-pair");
        let response = self
            .http
            .get(&url)
            .header("x-principal", &auth.principal)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if response.status().is_success() {
            let body: SelectedPairBody = response.json().await?;
            Ok(body.pair_id)
        } else {
            Err(Self::response_error(response).await)
        }
    }

    async fn write_selected_pair(
        &self,
        project_id: &str,
        pair_id: &str,
        auth: &Identity,
    ) -> Result<(), PlatformError> {
        let url = self.project_url(project_id, "/selected-pair");
        let response = self
            .http
            .put(&url)
            .header("x-principal", &auth.principal)
            .json(&SelectedPairBody {
                pair_id: Some(pair_id.to_string()),
            })
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::response_error(response).await)
        }
    }

    async fn clear_selected_pair(
        &self,
        project_id: &str,
        auth: &Identity,
    ) -> Result<(), PlatformError> {
        let url = self.project_url(project_id, "/selected-pair");
        let response = self
            .http
            .delete(&url)
            .header("x-principal", &auth.principal)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::response_error(response).await)
        }
    }
}
