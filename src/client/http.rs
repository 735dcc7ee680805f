use async_trait::async_trait;
use reqwest::{StatusCode, Url};

use crate::client::api::RosterApi;
use crate::config;
use crate::error::{ClientError, RosterError};
use crate::models::{ErrorResponse, MessageResponse, RosterSnapshot};

/// Roster API over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRosterApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRosterApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(config::roster_api_url())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| connect_failed(&self.base_url, e))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Transport(format!("{} cannot be a base url", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn mutate(
        &self,
        method: reqwest::Method,
        activity: &str,
        action: &str,
        email: &str,
    ) -> Result<String, ClientError> {
        let url = self.url(&["activities", activity, action])?;
        let resp = self
            .client
            .request(method, url.clone())
            .query(&[("email", email)])
            .send()
            .await
            .map_err(|e| connect_failed(url.as_str(), e))?;
        decode_mutation(url.as_str(), resp).await
    }
}

#[async_trait]
impl RosterApi for HttpRosterApi {
    async fn fetch_activities(&self) -> Result<RosterSnapshot, ClientError> {
        let url = self.url(&["activities"])?;
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| connect_failed(url.as_str(), e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::Transport(format!(
                "{} answered {}",
                url, status
            )));
        }
        resp.json::<RosterSnapshot>()
            .await
            .map_err(|e| connect_failed(url.as_str(), e))
    }

    async fn signup(&self, activity: &str, email: &str) -> Result<String, ClientError> {
        self.mutate(reqwest::Method::POST, activity, "signup", email)
            .await
    }

    async fn unregister(&self, activity: &str, email: &str) -> Result<String, ClientError> {
        self.mutate(reqwest::Method::DELETE, activity, "unregister", email)
            .await
    }
}

async fn decode_mutation(url: &str, resp: reqwest::Response) -> Result<String, ClientError> {
    let status = resp.status();
    if status.is_success() {
        let body: MessageResponse = resp.json().await.map_err(|e| connect_failed(url, e))?;
        return Ok(body.message);
    }

    let body: ErrorResponse = resp.json().await.map_err(|e| {
        ClientError::Transport(format!("{} answered {} without a detail: {}", url, status, e))
    })?;
    let err = body
        .error
        .as_deref()
        .and_then(|code| RosterError::from_code(code, &body.detail))
        .or_else(|| error_from_status(status, &body.detail));

    match err {
        Some(e) => Err(ClientError::Rejected(e)),
        None => Err(ClientError::Transport(format!(
            "{} answered {}: {}",
            url, status, body.detail
        ))),
    }
}

// Older servers send only `{detail}`, and report conflicts as 400; fall back
// to what the detail text and status tell us.
fn error_from_status(status: StatusCode, detail: &str) -> Option<RosterError> {
    match status {
        StatusCode::NOT_FOUND => Some(RosterError::NotFound),
        StatusCode::CONFLICT => Some(
            RosterError::from_detail(detail)
                .unwrap_or_else(|| RosterError::Conflict(detail.to_string())),
        ),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Some(
            RosterError::from_detail(detail)
                .unwrap_or_else(|| RosterError::Validation(detail.to_string())),
        ),
        _ => None,
    }
}

fn connect_failed(url: &str, err: impl ToString) -> ClientError {
    ClientError::Transport(format!("{}: {}", url, err.to_string()))
}
