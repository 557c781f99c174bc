use crate::cors::CorsPolicy;
use crate::error::RelayError;
use crate::io_struct::{
    ChatRequest, DEFAULT_MAX_INPUT_ITEMS, DEFAULT_MODEL, UpstreamRequest, build_input,
    system_preamble,
};
use actix_web::HttpResponse;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::StatusCode;
use std::fmt;
use std::pin::Pin;

pub const DEFAULT_UPSTREAM_URL: &str = "https://api.openai.com/v1/responses";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for field '{field}': {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required field: {field}")]
    MissingRequired { field: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

pub type ProxyStream = Pin<Box<dyn Stream<Item = Result<Bytes, actix_web::Error>> + Send>>;

/// A successful upstream reply whose body has not been read yet.
pub struct ProxyResponse {
    pub status: StatusCode,
    pub body: ProxyStream,
}

impl From<ProxyResponse> for HttpResponse {
    fn from(resp: ProxyResponse) -> Self {
        let status = actix_web::http::StatusCode::from_u16(resp.status.as_u16())
            .unwrap_or(actix_web::http::StatusCode::OK);
        HttpResponse::build(status)
            .content_type("text/event-stream")
            .streaming(resp.body)
    }
}

#[derive(Clone)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub upstream_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub max_input_items: usize,
    pub cors: CorsPolicy,
    pub request_timeout_secs: Option<u64>,
    pub max_payload_size: usize,
    pub log_level: log::LevelFilter,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            max_input_items: DEFAULT_MAX_INPUT_ITEMS,
            cors: CorsPolicy::default(),
            request_timeout_secs: None,
            max_payload_size: 1024 * 1024,
            log_level: log::LevelFilter::Info,
        }
    }
}

// The API key must never reach the logs.
impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("upstream_url", &self.upstream_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("max_input_items", &self.max_input_items)
            .field("cors", &self.cors)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_payload_size", &self.max_payload_size)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl RelayConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.upstream_url.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "upstream_url".to_string(),
            });
        }
        if !self.upstream_url.starts_with("http://") && !self.upstream_url.starts_with("https://")
        {
            return Err(ConfigError::InvalidValue {
                field: "upstream_url".to_string(),
                value: self.upstream_url.clone(),
                reason: "must start with http:// or https://".to_string(),
            });
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "model".to_string(),
            });
        }
        if self.max_input_items == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_input_items".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        for origin in &self.cors.allowed_origins {
            if actix_web::http::header::HeaderValue::from_str(origin).is_err() {
                return Err(ConfigError::InvalidValue {
                    field: "allowed_origins".to_string(),
                    value: origin.clone(),
                    reason: "not a valid header value".to_string(),
                });
            }
        }
        if !self.cors.allowed_origins.contains(&self.cors.primary_origin) {
            return Err(ConfigError::InvalidValue {
                field: "primary_origin".to_string(),
                value: self.cors.primary_origin.clone(),
                reason: "must be one of the allowed origins".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct RelayState {
    pub client: reqwest::Client,
    pub upstream_url: String,
    pub model: String,
    api_key: String,
    pub max_input_items: usize,
    preamble: serde_json::Value,
}

impl RelayState {
    pub fn new(config: &RelayConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(std::time::Duration::from_secs(secs));
        }
        let client = builder.build()?;
        if config.api_key.is_none() {
            log::warn!("No upstream API key configured; upstream calls will be rejected");
        }
        Ok(Self {
            client,
            upstream_url: config.upstream_url.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone().unwrap_or_default(),
            max_input_items: config.max_input_items,
            preamble: serde_json::to_value(system_preamble())?,
        })
    }

    /// Turns a caller payload into the conversation sent upstream.
    pub fn prepare_input(&self, request: &ChatRequest) -> Vec<serde_json::Value> {
        build_input(
            &self.preamble,
            request.normalize_input(),
            self.max_input_items,
        )
    }

    pub async fn forward_chat(&self, request: ChatRequest) -> Result<ProxyResponse, RelayError> {
        let input = self.prepare_input(&request);
        let body = UpstreamRequest::streaming(&self.model, input);

        let resp = self
            .client
            .post(&self.upstream_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                log::error!("Upstream request to {} failed: {}", self.upstream_url, e);
                RelayError::UpstreamUnreachable(e)
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            log::warn!("Upstream responded with status {}", status);
            return Err(RelayError::UpstreamError {
                status: status.as_u16(),
                body: text,
            });
        }

        let resp_stream = resp.bytes_stream().map(|chunk| {
            chunk.map_err(|e| {
                log::warn!("Upstream stream interrupted: {}", e);
                actix_web::error::ErrorBadGateway(e)
            })
        });
        Ok(ProxyResponse {
            status,
            body: Box::pin(resp_stream),
        })
    }
}
