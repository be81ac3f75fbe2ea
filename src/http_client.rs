// HTTP client for the flight-data provider
// All query functions go through FlightApi, which owns the transport, the envelope decoding and the stats

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{ClientConfig, ClientError};
use crate::models::ApiEnvelope;

pub type QueryParams = [(&'static str, String)];

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error: {status_code} - {message}")]
    ApiResponseError { status_code: u16, message: String },

    #[error("Upstream rejected request: {0}")]
    Rejected(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Client error: {0}")]
    ClientError(#[from] ClientError),
}

impl ApiError {
    // Request never produced a usable HTTP response
    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::NetworkError(_))
    }

    // Response arrived but its body did not have the expected shape
    pub fn is_upstream_format(&self) -> bool {
        matches!(self, ApiError::DecodeError(_) | ApiError::Rejected(_))
    }
}

// Issues a GET against the provider and hands back the raw body
#[async_trait]
pub trait HttpTransport: Send + Sync + 'static {
    async fn get(&self, path: &str, params: &QueryParams) -> Result<Bytes, ApiError>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.api_key)
            .map_err(|e| ClientError::ConfigError(format!("api key is not a valid header: {e}")))?;
        let host = HeaderValue::from_str(&config.api_host)
            .map_err(|e| ClientError::ConfigError(format!("api host is not a valid header: {e}")))?;
        headers.insert("x-rapidapi-key", key);
        headers.insert("x-rapidapi-host", host);

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::InitError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, path: &str, params: &QueryParams) -> Result<Bytes, ApiError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| ApiError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::ApiResponseError {
                status_code: status.as_u16(),
                message,
            });
        }

        response
            .bytes()
            .await
            .map_err(|e| ApiError::NetworkError(e.to_string()))
    }
}

#[derive(Debug, Default)]
struct RequestStats {
    requests_sent: AtomicUsize,
    requests_succeeded: AtomicUsize,
    requests_failed: AtomicUsize,
    decode_failures: AtomicUsize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ClientStats {
    pub requests_sent: usize,
    pub requests_succeeded: usize,
    pub requests_failed: usize,
    pub decode_failures: usize,
}

pub struct FlightApi<T> {
    transport: T,
    config: ClientConfig,
    stats: RequestStats,
}

impl FlightApi<ReqwestTransport> {
    pub fn from_config(config: ClientConfig) -> Result<Self, ClientError> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(transport, config))
    }
}

impl<T: HttpTransport> FlightApi<T> {
    pub fn with_transport(transport: T, config: ClientConfig) -> Self {
        Self {
            transport,
            config,
            stats: RequestStats::default(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn stats(&self) -> ClientStats {
        ClientStats {
            requests_sent: self.stats.requests_sent.load(Ordering::SeqCst),
            requests_succeeded: self.stats.requests_succeeded.load(Ordering::SeqCst),
            requests_failed: self.stats.requests_failed.load(Ordering::SeqCst),
            decode_failures: self.stats.decode_failures.load(Ordering::SeqCst),
        }
    }

    // GET `path` and unwrap the `data` member of the envelope.
    // A missing `data` member decodes as the empty value of `D`.
    pub(crate) async fn get_data<D>(&self, path: &str, params: &QueryParams) -> Result<D, ApiError>
    where
        D: DeserializeOwned + Default,
    {
        self.stats.requests_sent.fetch_add(1, Ordering::SeqCst);
        debug!(path, ?params, "issuing request");

        let body = match self.transport.get(path, params).await {
            Ok(body) => body,
            Err(e) => {
                self.stats.requests_failed.fetch_add(1, Ordering::SeqCst);
                return Err(e);
            }
        };

        let envelope: ApiEnvelope<D> = serde_json::from_slice(&body).map_err(|e| {
            self.stats.decode_failures.fetch_add(1, Ordering::SeqCst);
            self.stats.requests_failed.fetch_add(1, Ordering::SeqCst);
            ApiError::DecodeError(format!("{path}: {e}"))
        })?;

        if !envelope.status {
            self.stats.requests_failed.fetch_add(1, Ordering::SeqCst);
            let message = envelope
                .message
                .map(|m| match m {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .unwrap_or_else(|| "status=false".to_string());
            return Err(ApiError::Rejected(message));
        }

        self.stats.requests_succeeded.fetch_add(1, Ordering::SeqCst);
        debug!(path, timestamp = ?envelope.timestamp, "request completed");

        Ok(envelope.data.unwrap_or_else(|| {
            warn!(path, "response carried no data member, treating as empty");
            D::default()
        }))
    }
}
