use std::time::Duration;

use async_trait::async_trait;
use log::*;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;

use crate::PushError;
use crate::multipart::MultipartForm;
use crate::response::redact_url;

pub const APP_NAME: &str = "pmsg";
pub const CONTENT_TYPE_JSON: &str = "application/json;charset=utf-8";

/// 默认 User-Agent: `pmsg/<version> (<os>; <arch>)`
pub fn default_user_agent() -> String {
    format!(
        "{APP_NAME}/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

/// 传输层配置，启动时构造一次
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// 自定义 User-Agent，为空时使用默认值
    pub user_agent: Option<String>,
    /// 请求超时
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            user_agent: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    pub fn user_agent(&self) -> String {
        match self.user_agent.as_deref().map(str::trim) {
            Some(ua) if !ua.is_empty() => ua.to_string(),
            _ => default_user_agent(),
        }
    }
}

/// 原始 HTTP 响应，不做任何解析
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// HTTP 传输抽象
///
/// 非 2xx 状态码同样返回 `Ok`，只有网络层失败才返回 `NetworkError`。
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<RawResponse, PushError>;

    async fn post(
        &self,
        url: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<RawResponse, PushError>;
}

/// 基于 reqwest 的传输实现
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: Client,
    user_agent: String,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, PushError> {
        let user_agent = config.user_agent();
        let http_client = Client::builder()
            .user_agent(user_agent.clone())
            .timeout(config.timeout)
            .build()
            .map_err(|e| PushError::ConfigError(e.to_string()))?;
        Ok(Self {
            http_client,
            user_agent,
        })
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    async fn read(response: reqwest::Response) -> Result<RawResponse, PushError> {
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| PushError::NetworkError(e.to_string()))?;
        Ok(RawResponse {
            status,
            body: body.to_vec(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<RawResponse, PushError> {
        debug!("GET {}", redact_url(url));
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| PushError::NetworkError(e.without_url().to_string()))?;
        Self::read(response).await
    }

    async fn post(
        &self,
        url: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<RawResponse, PushError> {
        debug!("POST {} ({content_type}, {} bytes)", redact_url(url), body.len());
        let response = self
            .http_client
            .post(url)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| PushError::NetworkError(e.without_url().to_string()))?;
        Self::read(response).await
    }
}

/// 以 JSON 发送请求体
pub async fn post_json<T: Serialize + ?Sized>(
    transport: &dyn Transport,
    url: &str,
    payload: &T,
) -> Result<RawResponse, PushError> {
    let body = serde_json::to_vec(payload).map_err(|e| PushError::DecodeError(e.to_string()))?;
    transport.post(url, CONTENT_TYPE_JSON, body).await
}

/// 以 multipart/form-data 发送文件与字段
pub async fn post_multipart(
    transport: &dyn Transport,
    url: &str,
    form: &MultipartForm,
) -> Result<RawResponse, PushError> {
    let encoded = form.encode().await?;
    transport.post(url, &encoded.content_type, encoded.body).await
}
