use crate::domain::models::{CalendarEvent, EventDraft};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::event_mapper::{
    decode_error_message, decode_event_list, decode_smart_breaks, encode_event_draft,
    SmartBreaksPayload, SmartBreaksRequest,
};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, COOKIE};
use reqwest::{redirect, Client, RequestBuilder};
use serde_json::Value;
use url::Url;

const JSON_CONTENT_TYPE: &str = "application/json";

/// HTTP surface of the wellness backend consumed by the controller.
#[async_trait]
pub trait WellnessApiClient: Send + Sync {
    async fn list_events(&self) -> Result<Vec<CalendarEvent>, InfraError>;

    async fn add_event(&self, draft: &EventDraft) -> Result<(), InfraError>;

    async fn delete_event(&self, event_id: &str) -> Result<(), InfraError>;

    async fn smart_breaks(&self, auto_schedule: bool) -> Result<SmartBreaksPayload, InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestWellnessApiClient {
    client: Client,
    base_url: Url,
    session_cookie: Option<String>,
}

impl ReqwestWellnessApiClient {
    pub fn new(base_url: Url, session_cookie: Option<String>) -> Result<Self, InfraError> {
        // Login redirects must surface as non-JSON responses, not be followed.
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|error| InfraError::Transport(format!("failed building http client: {error}")))?;

        Ok(Self {
            client,
            base_url,
            session_cookie: session_cookie
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, InfraError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                InfraError::InvalidConfig(format!("base url cannot be a base: {}", self.base_url))
            })?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    fn with_session(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session_cookie.as_deref() {
            Some(cookie) => request.header(COOKIE, cookie),
            None => request,
        }
    }

    /// Sends the request and returns its decoded JSON body.
    ///
    /// The content type is inspected before the body is read: anything other
    /// than JSON is reported as [`InfraError::AuthenticationRequired`], whatever
    /// the status code, proxy error pages included.
    async fn send_json(&self, request: RequestBuilder, operation: &str) -> Result<Value, InfraError> {
        let response = self
            .with_session(request)
            .send()
            .await
            .map_err(|error| InfraError::Transport(format!("network error while {operation}: {error}")))?;

        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_ascii_lowercase().contains(JSON_CONTENT_TYPE))
            .unwrap_or(false);
        if !is_json {
            tracing::warn!(operation, status = status.as_u16(), "non-json response; treating as unauthenticated");
            return Err(InfraError::AuthenticationRequired);
        }

        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Transport(format!("failed reading response while {operation}: {error}")))?;
        let parsed = if body.trim().is_empty() {
            Ok(Value::Null)
        } else {
            serde_json::from_str::<Value>(&body)
        };

        if !status.is_success() {
            return Err(InfraError::Api {
                status: status.as_u16(),
                message: parsed.ok().as_ref().and_then(decode_error_message),
            });
        }

        parsed.map_err(|error| InfraError::InvalidPayload(format!("invalid {operation} payload: {error}")))
    }
}

#[async_trait]
impl WellnessApiClient for ReqwestWellnessApiClient {
    async fn list_events(&self) -> Result<Vec<CalendarEvent>, InfraError> {
        let endpoint = self.endpoint(&["api", "events"])?;
        let body = self
            .send_json(self.client.get(endpoint), "listing events")
            .await?;
        Ok(decode_event_list(body))
    }

    async fn add_event(&self, draft: &EventDraft) -> Result<(), InfraError> {
        let endpoint = self.endpoint(&["api", "events", "add"])?;
        let request = self.client.post(endpoint).json(&encode_event_draft(draft));
        self.send_json(request, "adding event").await?;
        Ok(())
    }

    async fn delete_event(&self, event_id: &str) -> Result<(), InfraError> {
        let event_id = event_id.trim();
        if event_id.is_empty() {
            return Err(InfraError::InvalidPayload("event id must not be empty".to_string()));
        }
        let endpoint = self.endpoint(&["api", "events", event_id])?;
        self.send_json(self.client.delete(endpoint), "deleting event")
            .await?;
        Ok(())
    }

    async fn smart_breaks(&self, auto_schedule: bool) -> Result<SmartBreaksPayload, InfraError> {
        let endpoint = self.endpoint(&["api", "smart-breaks"])?;
        let request = self
            .client
            .post(endpoint)
            .json(&SmartBreaksRequest { auto_schedule });
        let body = self.send_json(request, "generating smart breaks").await?;
        Ok(decode_smart_breaks(&body))
    }
}
