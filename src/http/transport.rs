use crate::redact::redact_secrets;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
  #[error("network error: {0}")]
  Network(String),
  #[error("invalid request body: {0}")]
  InvalidBody(String),
}

impl From<reqwest::Error> for TransportError {
  fn from(value: reqwest::Error) -> Self {
    Self::Network(redact_secrets(&value.to_string()).into_owned())
  }
}

/// Payload for non-GET requests.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
  #[default]
  Empty,
  Json(Value),
  Form(Vec<(String, String)>),
  Raw {
    content_type: String,
    bytes: Vec<u8>,
  },
}

impl RequestBody {
  pub fn form<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
  where
    K: Into<String>,
    V: Into<String>,
  {
    Self::Form(fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
  }

  pub(crate) fn encode(&self) -> Result<Option<(String, Vec<u8>)>, TransportError> {
    match self {
      Self::Empty => Ok(None),
      Self::Json(value) => {
        let bytes = serde_json::to_vec(value).map_err(|e| TransportError::InvalidBody(e.to_string()))?;
        Ok(Some((JSON_CONTENT_TYPE.to_string(), bytes)))
      }
      Self::Form(fields) => {
        let encoded = fields
          .iter()
          .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
          .collect::<Vec<_>>()
          .join("&");
        Ok(Some((FORM_CONTENT_TYPE.to_string(), encoded.into_bytes())))
      }
      Self::Raw {
        content_type,
        bytes,
      } => Ok(Some((content_type.clone(), bytes.clone()))),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
  pub method: Method,
  pub url: String,
  pub authorization: String,
  pub body: RequestBody,
}

/// Response as received, before any interpretation by the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
  pub status: u16,
  pub status_text: String,
  pub body: Vec<u8>,
}

impl RawResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }

  pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
    serde_json::from_slice(&self.body)
  }
}

#[async_trait]
pub trait Transport: Send + Sync {
  async fn execute(&self, request: OutboundRequest) -> Result<RawResponse, TransportError>;
}

fn build_headers(authorization: &str) -> HeaderMap {
  let mut headers = HeaderMap::new();
  headers.insert(ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE));
  match HeaderValue::from_str(authorization) {
    Ok(mut value) => {
      value.set_sensitive(true);
      headers.insert(AUTHORIZATION, value);
    }
    Err(_) => tracing::warn!("access token is not a valid header value, sending request without it"),
  }
  headers
}

pub struct ReqwestTransport {
  http: reqwest::Client,
}

impl ReqwestTransport {
  pub fn new(timeout: Option<Duration>) -> Result<Self, TransportError> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
      builder = builder.timeout(timeout);
    }
    Ok(Self {
      http: builder.build()?,
    })
  }
}

#[async_trait]
impl Transport for ReqwestTransport {
  async fn execute(&self, request: OutboundRequest) -> Result<RawResponse, TransportError> {
    let mut builder = self
      .http
      .request(request.method, request.url.as_str())
      .headers(build_headers(&request.authorization));

    if let Some((content_type, bytes)) = request.body.encode()? {
      builder = builder.header(CONTENT_TYPE, content_type).body(bytes);
    }

    let res = builder.send().await?;
    let status = res.status();
    let body = res.bytes().await?;

    Ok(RawResponse {
      status: status.as_u16(),
      status_text: status.canonical_reason().unwrap_or_default().to_string(),
      body: body.to_vec(),
    })
  }
}
