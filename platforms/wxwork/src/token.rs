use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use pmsg_common::{PushError, TokenEndpoint, require};

use crate::API_BASE;

/// 企业 ID + 应用 Secret
#[derive(Debug, Clone)]
pub struct CorpCredential {
    pub corp_id: String,
    pub corp_secret: String,
}

impl CorpCredential {
    pub fn new(corp_id: impl Into<String>, corp_secret: impl Into<String>) -> Self {
        Self {
            corp_id: corp_id.into(),
            corp_secret: corp_secret.into(),
        }
    }
}

impl TokenEndpoint for CorpCredential {
    fn cache_key(&self) -> String {
        // 同一企业下不同应用的 secret 各自对应不同的令牌
        let mut hasher = DefaultHasher::new();
        self.corp_secret.hash(&mut hasher);
        format!("wxwork:{}:{:x}", self.corp_id, hasher.finish())
    }

    fn token_url(&self) -> String {
        format!(
            "{API_BASE}/cgi-bin/gettoken?corpid={}&corpsecret={}",
            urlencoding::encode(&self.corp_id),
            urlencoding::encode(&self.corp_secret)
        )
    }

    fn validate(&self) -> Result<(), PushError> {
        require("corp_id", &self.corp_id)?;
        require("corp_secret", &self.corp_secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmsg_common::CredentialManager;
    use pmsg_common::testing::MockTransport;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_token_url() {
        let cred = CorpCredential::new("ww1", "abc");
        assert_eq!(
            cred.token_url(),
            "https://qyapi.weixin.qq.com/cgi-bin/gettoken?corpid=ww1&corpsecret=abc"
        );
    }

    #[tokio::test]
    async fn test_gettoken() {
        let transport = Arc::new(MockTransport::new());
        transport.respond_json(
            200,
            json!({"errcode": 0, "errmsg": "ok", "access_token": "T", "expires_in": 7200}),
        );
        let manager = CredentialManager::new(transport.clone());

        let token = manager.acquire(&CorpCredential::new("ww1", "abc")).await.unwrap();
        assert_eq!(token, "T");
    }

    #[tokio::test]
    async fn test_missing_secret_never_requests() {
        let transport = Arc::new(MockTransport::new());
        let manager = CredentialManager::new(transport.clone());

        let err = manager.acquire(&CorpCredential::new("ww1", "")).await.unwrap_err();
        assert_eq!(err.to_string(), "invalid corp_secret: is required");
        assert!(transport.requests().is_empty());
    }
}
