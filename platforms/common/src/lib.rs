use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub mod error;
pub mod multipart;
pub mod response;
pub mod token;
pub mod transport;
pub mod variant;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{CommandError, PushError, Step, StepExt};
pub use multipart::{EncodedForm, MultipartForm};
pub use response::{ApiResponse, ResponseCode, classify, de_opt_id, redact_url};
pub use token::{AccessToken, CredentialManager, TokenEndpoint, require_token_or_credential};
pub use transport::{
    HttpTransport, RawResponse, Transport, TransportConfig, default_user_agent, post_json,
    post_multipart,
};
pub use variant::{MessageKind, Validate, non_empty, one_of, parse_json, require};

/// 推送成功的结果，失败一律通过 `Err` 返回
#[derive(Debug, Clone)]
pub struct PushResult {
    /// 消息ID
    pub message_id: Option<String>,
    /// 上传得到的素材ID
    pub media_id: Option<String>,
    /// 时间戳
    pub timestamp: DateTime<Utc>,
}

impl PushResult {
    pub fn ok() -> Self {
        Self {
            message_id: None,
            media_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_message_id(mut self, message_id: Option<String>) -> Self {
        self.message_id = message_id;
        self
    }

    pub fn with_media_id(mut self, media_id: Option<String>) -> Self {
        self.media_id = media_id;
        self
    }
}

impl fmt::Display for PushResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ok")?;
        if let Some(id) = &self.message_id {
            write!(f, "; msgid={id}")?;
        }
        if let Some(id) = &self.media_id {
            write!(f, "; media_id={id}")?;
        }
        Ok(())
    }
}

/// 命令执行上下文：传输层与令牌管理，启动时构造一次
pub struct Context {
    transport: Arc<dyn Transport>,
    credentials: CredentialManager,
}

impl Context {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            credentials: CredentialManager::new(Arc::clone(&transport)),
            transport,
        }
    }

    /// 使用真实 HTTP 客户端
    pub fn http(config: &TransportConfig) -> Result<Self, PushError> {
        Ok(Self::new(Arc::new(HttpTransport::new(config)?)))
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn credentials(&self) -> &CredentialManager {
        &self.credentials
    }

    /// 显式令牌优先，否则向平台获取
    pub async fn access_token(
        &self,
        explicit: Option<&str>,
        endpoint: &dyn TokenEndpoint,
    ) -> Result<String, CommandError> {
        self.credentials
            .resolve(explicit, endpoint)
            .await
            .at(Step::AcquireToken)
    }
}

/// 发送 JSON 消息并按错误码分类响应
pub async fn send_json<T, R>(transport: &dyn Transport, url: &str, payload: &T) -> Result<R, PushError>
where
    T: Serialize + ?Sized,
    R: DeserializeOwned + ApiResponse,
{
    let raw = post_json(transport, url, payload).await?;
    classify(url, &raw)
}

/// 上传表单并按错误码分类响应
pub async fn send_multipart<R>(
    transport: &dyn Transport,
    url: &str,
    form: &MultipartForm,
) -> Result<R, PushError>
where
    R: DeserializeOwned + ApiResponse,
{
    let raw = post_multipart(transport, url, form).await?;
    classify(url, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_result_ok() {
        let result = PushResult::ok();
        assert!(result.message_id.is_none());
        assert!(result.media_id.is_none());
    }

    #[test]
    fn test_push_result_display() {
        let result = PushResult::ok().with_message_id(Some("123".to_string()));
        assert_eq!(result.to_string(), "ok; msgid=123");
        let result = PushResult::ok().with_media_id(Some("MEDIA".to_string()));
        assert_eq!(result.to_string(), "ok; media_id=MEDIA");
        assert_eq!(PushResult::ok().to_string(), "ok");
    }
}
