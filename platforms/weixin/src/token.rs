use pmsg_common::{PushError, TokenEndpoint, require};

use crate::API_BASE;

/// 公众号 / 小程序的 appid + secret
#[derive(Debug, Clone)]
pub struct AppCredential {
    pub app_id: String,
    pub app_secret: String,
}

impl AppCredential {
    pub fn new(app_id: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            app_secret: app_secret.into(),
        }
    }
}

impl TokenEndpoint for AppCredential {
    fn cache_key(&self) -> String {
        format!("weixin:{}", self.app_id)
    }

    fn token_url(&self) -> String {
        format!(
            "{API_BASE}/cgi-bin/token?grant_type=client_credential&appid={}&secret={}",
            urlencoding::encode(&self.app_id),
            urlencoding::encode(&self.app_secret)
        )
    }

    fn validate(&self) -> Result<(), PushError> {
        require("app_id", &self.app_id)?;
        require("app_secret", &self.app_secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_url() {
        let cred = AppCredential::new("wx123", "s&cret");
        assert_eq!(
            cred.token_url(),
            "https://api.weixin.qq.com/cgi-bin/token?grant_type=client_credential&appid=wx123&secret=s%26cret"
        );
        assert_eq!(cred.cache_key(), "weixin:wx123");
    }

    #[test]
    fn test_secret_required() {
        let err = AppCredential::new("wx123", "").validate().unwrap_err();
        assert_eq!(err.to_string(), "invalid app_secret: is required");
    }
}
