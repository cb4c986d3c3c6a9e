use std::fmt;

use log::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::PushError;
use crate::transport::RawResponse;

/// 各平台响应共有的错误码部分
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseCode {
    #[serde(default)]
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
}

impl ResponseCode {
    pub fn succeeded(&self) -> bool {
        self.errcode == 0
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "errcode={}, errmsg={}", self.errcode, self.errmsg)
    }
}

/// 所有响应类型都内嵌 `ResponseCode`，分类逻辑只依赖这个能力
pub trait ApiResponse {
    fn response_code(&self) -> &ResponseCode;

    fn succeeded(&self) -> bool {
        self.response_code().succeeded()
    }
}

impl ApiResponse for ResponseCode {
    fn response_code(&self) -> &ResponseCode {
        self
    }
}

/// 解析响应并按错误码判定成功或失败
pub fn classify<R>(endpoint: &str, response: &RawResponse) -> Result<R, PushError>
where
    R: DeserializeOwned + ApiResponse,
{
    let endpoint = redact_url(endpoint);
    let parsed: R = match serde_json::from_slice(&response.body) {
        Ok(parsed) => parsed,
        Err(e) if response.is_success() => {
            return Err(PushError::DecodeError(format!(
                "endpoint={endpoint:?}, {e}, body={}",
                response.text()
            )));
        }
        Err(_) => {
            return Err(PushError::HttpStatusError {
                endpoint,
                status: response.status,
                body: response.text(),
            });
        }
    };

    let code = parsed.response_code();
    // 非 2xx 只有带非零错误码时才算平台错误
    if !response.is_success() && code.succeeded() {
        return Err(PushError::HttpStatusError {
            endpoint,
            status: response.status,
            body: response.text(),
        });
    }
    if code.succeeded() {
        Ok(parsed)
    } else {
        warn!("request failed, endpoint={endpoint:?}, {code}");
        Err(PushError::VendorError {
            endpoint,
            code: code.errcode,
            message: code.errmsg.clone(),
        })
    }
}

const SECRET_PARAMS: [&str; 5] = ["access_token", "secret", "corpsecret", "key", "sign"];

/// 隐去 URL 中的凭证参数
pub fn redact_url(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };
    let query = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) if SECRET_PARAMS.contains(&k) && !v.is_empty() => format!("{k}=***"),
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&");
    format!("{base}?{query}")
}

/// 消息 ID 可能是数字也可能是字符串
pub fn de_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Num(i64),
        Str(String),
    }

    Ok(match Option::<Id>::deserialize(deserializer)? {
        Some(Id::Num(n)) => Some(n.to_string()),
        Some(Id::Str(s)) if !s.is_empty() => Some(s),
        _ => None,
    })
}
