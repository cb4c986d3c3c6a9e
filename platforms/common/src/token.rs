use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::*;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::PushError;
use crate::response::{ApiResponse, ResponseCode, classify};
use crate::transport::Transport;

/// 令牌过期前提前失效的秒数
const TOKEN_EXPIRY_SKEW_SECS: i64 = 60;

/// 访问令牌
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// `expires_in` 超出时间范围时视为立即过期，令牌只用于本次调用
    pub fn new(token: impl Into<String>, expires_in: i64, now: DateTime<Utc>) -> Self {
        let expires_at = Duration::try_seconds(expires_in)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or_else(|| {
                warn!("expires_in {expires_in} is out of range, token will not be cached");
                now
            });
        Self {
            token: token.into(),
            expires_at,
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.token.is_empty() && now + Duration::seconds(TOKEN_EXPIRY_SKEW_SECS) < self.expires_at
    }
}

/// 获取令牌接口的响应
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(flatten)]
    pub code: ResponseCode,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub expires_in: i64,
}

impl ApiResponse for TokenResponse {
    fn response_code(&self) -> &ResponseCode {
        &self.code
    }
}

/// 平台令牌接口：由各平台的凭证类型实现
pub trait TokenEndpoint: Send + Sync {
    /// 凭证标识，用于进程内缓存，不能包含密钥
    fn cache_key(&self) -> String;

    /// 完整的令牌请求地址（包含凭证参数）
    fn token_url(&self) -> String;

    fn validate(&self) -> Result<(), PushError>;
}

/// 令牌管理
///
/// 每次调用都会请求令牌接口，除非同一进程内已有未过期的令牌。
pub struct CredentialManager {
    transport: Arc<dyn Transport>,
    cache: Mutex<HashMap<String, AccessToken>>,
}

impl CredentialManager {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// 获取令牌：先查进程内缓存，否则请求平台
    pub async fn acquire(&self, endpoint: &dyn TokenEndpoint) -> Result<String, PushError> {
        endpoint.validate()?;
        let key = endpoint.cache_key();

        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.get(&key)
            && cached.is_valid_at(Utc::now())
        {
            debug!("reuse access token for {key}");
            return Ok(cached.token.clone());
        }

        let token = self.fetch(endpoint).await?;
        let value = token.token.clone();
        cache.insert(key, token);
        Ok(value)
    }

    /// 直接请求平台，不读写缓存
    pub async fn fetch(&self, endpoint: &dyn TokenEndpoint) -> Result<AccessToken, PushError> {
        let url = endpoint.token_url();
        let raw = self.transport.get(&url).await?;
        let resp: TokenResponse = classify(&url, &raw)?;
        if resp.access_token.is_empty() {
            return Err(PushError::DecodeError(
                "token response has no access_token".to_string(),
            ));
        }
        info!(
            "fetched access token for {}, expires in {}s",
            endpoint.cache_key(),
            resp.expires_in
        );
        Ok(AccessToken::new(resp.access_token, resp.expires_in, Utc::now()))
    }

    /// 调用方显式提供的令牌优先
    pub async fn resolve(
        &self,
        explicit: Option<&str>,
        endpoint: &dyn TokenEndpoint,
    ) -> Result<String, PushError> {
        match explicit.map(str::trim) {
            Some(token) if !token.is_empty() => Ok(token.to_string()),
            _ => self.acquire(endpoint).await,
        }
    }
}

/// 检查令牌或凭证至少提供其一
pub fn require_token_or_credential(
    access_token: Option<&str>,
    identifier: Option<&str>,
    token_field: &str,
    identifier_field: &str,
) -> Result<(), PushError> {
    let has = |v: Option<&str>| v.is_some_and(|s| !s.trim().is_empty());
    if has(access_token) || has(identifier) {
        Ok(())
    } else {
        Err(PushError::validation(
            format!("{token_field}/{identifier_field}"),
            format!("either {token_field} or {identifier_field} must be set"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;
    use serde_json::json;

    struct TestCredential;

    impl TokenEndpoint for TestCredential {
        fn cache_key(&self) -> String {
            "test:app".to_string()
        }

        fn token_url(&self) -> String {
            "https://api.example.com/token?appid=app&secret=s".to_string()
        }

        fn validate(&self) -> Result<(), PushError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_acquire_returns_token() {
        let transport = Arc::new(MockTransport::new());
        transport.respond_json(200, json!({"access_token": "T", "expires_in": 7200}));
        let manager = CredentialManager::new(transport.clone());

        let token = manager.acquire(&TestCredential).await.unwrap();
        assert_eq!(token, "T");
        assert_eq!(transport.requests().len(), 1);

        // 同一进程内复用未过期的令牌
        let token = manager.acquire(&TestCredential).await.unwrap();
        assert_eq!(token, "T");
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_credentials() {
        let transport = Arc::new(MockTransport::new());
        transport.respond_json(200, json!({"errcode": 40001, "errmsg": "invalid credential"}));
        let manager = CredentialManager::new(transport);

        let err = manager.acquire(&TestCredential).await.unwrap_err();
        assert_eq!(err.vendor_code(), Some(40001));
        assert!(!err.to_string().contains("secret=s"));
    }

    #[tokio::test]
    async fn test_network_failure() {
        let transport = Arc::new(MockTransport::new());
        transport.fail("connection refused");
        let manager = CredentialManager::new(transport);

        let err = manager.acquire(&TestCredential).await.unwrap_err();
        assert!(matches!(err, PushError::NetworkError(_)));
    }

    #[tokio::test]
    async fn test_short_lived_token_is_not_reused() {
        let transport = Arc::new(MockTransport::new());
        transport.respond_json(200, json!({"access_token": "A", "expires_in": 30}));
        transport.respond_json(200, json!({"access_token": "B", "expires_in": 30}));
        let manager = CredentialManager::new(transport.clone());

        assert_eq!(manager.acquire(&TestCredential).await.unwrap(), "A");
        assert_eq!(manager.acquire(&TestCredential).await.unwrap(), "B");
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_huge_expires_in_is_not_cached() {
        let transport = Arc::new(MockTransport::new());
        transport.respond_json(
            200,
            json!({"access_token": "T", "expires_in": 9_000_000_000_000_000_i64}),
        );
        transport.respond_json(200, json!({"access_token": "U", "expires_in": 7200}));
        let manager = CredentialManager::new(transport.clone());

        assert_eq!(manager.acquire(&TestCredential).await.unwrap(), "T");
        assert_eq!(manager.acquire(&TestCredential).await.unwrap(), "U");
        assert_eq!(transport.requests().len(), 2);
    }

    #[test]
    fn test_out_of_range_expiry() {
        let now = Utc::now();
        for expires_in in [i64::MAX, i64::MIN, 9_000_000_000_000_000] {
            let token = AccessToken::new("T", expires_in, now);
            assert!(!token.is_valid_at(now));
        }
    }

    #[tokio::test]
    async fn test_explicit_token_bypasses_endpoint() {
        let transport = Arc::new(MockTransport::new());
        let manager = CredentialManager::new(transport.clone());

        let token = manager.resolve(Some("tok"), &TestCredential).await.unwrap();
        assert_eq!(token, "tok");
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn test_token_validity_window() {
        let now = Utc::now();
        let token = AccessToken::new("T", 7200, now);
        assert!(token.is_valid_at(now));
        assert!(!token.is_valid_at(now + Duration::seconds(7200)));
        assert!(!AccessToken::new("", 7200, now).is_valid_at(now));
    }

    #[test]
    fn test_require_token_or_credential() {
        assert!(require_token_or_credential(Some("tok"), None, "access_token", "app_id").is_ok());
        assert!(require_token_or_credential(None, Some("wx1"), "access_token", "app_id").is_ok());
        let err =
            require_token_or_credential(Some(" "), None, "access_token", "app_id").unwrap_err();
        assert!(err.is_validation());
    }
}
