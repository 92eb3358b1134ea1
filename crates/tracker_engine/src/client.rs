use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tracker_logging::{tracker_debug, tracker_warn};
use url::Url;

use crate::types::SubmitRequest;
use crate::{
    ClientError, FailureKind, LifecycleAction, ResultsPayload, SnapshotPayload, SubmitResponse,
};

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    /// Sent as a bearer token when present.
    pub auth_token: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080/api".to_string(),
            auth_token: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(2),
        }
    }
}

/// Calls understood by the remote scraping service.
#[async_trait::async_trait]
pub trait ScrapingClient: Send + Sync {
    async fn submit(&self, urls: &[String]) -> Result<SubmitResponse, ClientError>;

    async fn dispatch(&self, item_id: &str, action: LifecycleAction) -> Result<(), ClientError>;

    /// Current job snapshot, `None` when no job is running.
    async fn current_snapshot(&self) -> Result<Option<SnapshotPayload>, ClientError>;

    async fn fetch_results(&self, batch_id: &str) -> Result<ResultsPayload, ClientError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestScrapingClient {
    client: reqwest::Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl ReqwestScrapingClient {
    pub fn new(settings: &ClientSettings) -> Result<Self, ClientError> {
        let base_url = Url::parse(&settings.base_url)
            .map_err(|err| ClientError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::new(
                FailureKind::InvalidUrl,
                format!("{base_url} cannot be used as a base url"),
            ));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ClientError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self {
            client,
            base_url,
            auth_token: settings.auth_token.clone(),
        })
    }

    /// Appends percent-encoded path segments to the base url.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::new(FailureKind::InvalidUrl, self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
    ) -> Result<reqwest::Response, ClientError> {
        tracker_debug!("{} {}", method, url);
        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            tracker_warn!("{} {} answered {}", method, url, status);
            return Err(ClientError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        Ok(response)
    }
}

#[async_trait::async_trait]
impl ScrapingClient for ReqwestScrapingClient {
    async fn submit(&self, urls: &[String]) -> Result<SubmitResponse, ClientError> {
        let url = self.endpoint(&["scraping"])?;
        let body = serde_json::to_vec(&SubmitRequest { urls })
            .map_err(|err| ClientError::new(FailureKind::Decode, err.to_string()))?;
        let response = self.send(Method::POST, url, Some(body)).await?;
        decode_json(response).await
    }

    async fn dispatch(&self, item_id: &str, action: LifecycleAction) -> Result<(), ClientError> {
        // Only the status code matters; the body is not inspected.
        let _ = match action.path_segment() {
            Some(segment) => {
                let url = self.endpoint(&["scraping", item_id, segment])?;
                self.send(Method::POST, url, None).await?
            }
            None => {
                let url = self.endpoint(&["scraping", item_id])?;
                self.send(Method::DELETE, url, None).await?
            }
        };
        Ok(())
    }

    async fn current_snapshot(&self) -> Result<Option<SnapshotPayload>, ClientError> {
        let url = self.endpoint(&["scraping", "current"])?;
        let response = self.send(Method::GET, url, None).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice(&body)
            .map_err(|err| ClientError::new(FailureKind::Decode, err.to_string()))
    }

    async fn fetch_results(&self, batch_id: &str) -> Result<ResultsPayload, ClientError> {
        let url = self.endpoint(&["scraping", "results", batch_id])?;
        let response = self.send(Method::GET, url, None).await?;
        decode_json(response).await
    }
}

async fn decode_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let body = response.bytes().await.map_err(map_reqwest_error)?;
    serde_json::from_slice(&body).map_err(|err| ClientError::new(FailureKind::Decode, err.to_string()))
}

fn map_reqwest_error(err: reqwest::Error) -> ClientError {
    if err.is_timeout() {
        return ClientError::new(FailureKind::Timeout, err.to_string());
    }
    ClientError::new(FailureKind::Network, err.to_string())
}
