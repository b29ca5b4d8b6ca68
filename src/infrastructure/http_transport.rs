// reqwest-backed transport to the dashboard backend
use crate::application::error::FetchError;
use crate::application::session::Session;
use crate::application::transport::{ApiRequest, ApiResponse, Method, Transport};
use crate::infrastructure::config::join_url;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use std::sync::Arc;

#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    session: Arc<Session>,
}

impl HttpTransport {
    pub fn new(base_url: String, session: Arc<Session>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            session,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, FetchError> {
        let url = join_url(&self.base_url, &request.path);

        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        builder = builder.header(ACCEPT, "application/json");
        if let Some(bearer) = self.session.bearer() {
            builder = builder.header(AUTHORIZATION, bearer);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(ApiResponse {
            status,
            content_type,
            body,
        })
    }
}
