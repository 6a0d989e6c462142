// src/client.rs
// Minimal controller SDK client used by the test harness

use crate::error::{Error, Result};
use crate::settings::Settings;
use crate::version::{self, API_VERSION, API_VERSION_HEADER};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for a Deis controller
#[derive(Debug)]
pub struct Client {
    http: reqwest::Client,
    controller_url: Url,
    token: String,
    username: String,
    user_agent: String,
    response_limit: u64,
    /// Last API version the controller reported
    controller_api_version: Mutex<Option<String>>,
}

impl Client {
    /// Create a client for `controller_url` authenticating with `token`.
    pub fn new(verify_ssl: bool, controller_url: &str, token: &str) -> Result<Self> {
        let controller_url = Url::parse(controller_url)?;
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .danger_accept_invalid_certs(!verify_ssl)
            .build()?;

        Ok(Self {
            http,
            controller_url,
            token: token.to_string(),
            username: String::new(),
            user_agent: version::user_agent(),
            response_limit: crate::settings::DEFAULT_RESPONSE_LIMIT,
            controller_api_version: Mutex::new(None),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut client = Self::new(settings.ssl_verify, &settings.controller, &settings.token)?;
        client.username = settings.username.clone();
        client.response_limit = settings.response_limit;
        Ok(client)
    }

    pub fn controller_url(&self) -> &Url {
        &self.controller_url
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn response_limit(&self) -> u64 {
        self.response_limit
    }

    /// API version reported by the controller on the last response, if any
    pub fn controller_api_version(&self) -> Option<String> {
        self.controller_api_version
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Send a request to the controller.
    ///
    /// Error statuses become [`Error::Status`]. The controller's API version
    /// header is recorded; an incompatible version is logged but the response
    /// is still returned.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response> {
        let url = self.controller_url.join(path)?;
        debug!(%method, %url, "Sending controller request");

        let mut builder = self
            .http
            .request(method, url)
            .header(CONTENT_TYPE, "application/json")
            .header(USER_AGENT, &self.user_agent);
        if !self.token.is_empty() {
            builder = builder.header(AUTHORIZATION, format!("token {}", self.token));
        }
        if let Some(body) = body {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        let response = builder.send().await?;
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!(status = status.as_u16(), error = %e, "Failed to read error response body");
                    format!("<failed to read response body: {e}>")
                }
            };
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }

        if let Some(server_version) = response
            .headers()
            .get(API_VERSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            if let Err(e) = version::check_api_compatibility(server_version, API_VERSION) {
                warn!(error = %e, "Controller API version mismatch");
            }
            *self
                .controller_api_version
                .lock()
                .unwrap_or_else(|e| e.into_inner()) = Some(server_version.to_string());
        }

        Ok(response)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.request(Method::GET, path, None).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        let response = self.request(Method::POST, path, Some(&body)).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Check that the controller is up and speaks a compatible API version
    pub async fn healthcheck(&self) -> Result<()> {
        self.request(Method::GET, "/healthz", None).await?;
        match self.controller_api_version() {
            Some(server) => version::check_api_compatibility(&server, API_VERSION),
            None => Err(Error::ApiMismatch {
                client: API_VERSION.to_string(),
                server: String::new(),
            }),
        }
    }
}
