use std::fmt;
use std::path::PathBuf;

/// 推送错误类型
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    /// 输入字段缺失或非法，在任何网络请求之前发现
    #[error("invalid {field}: {reason}")]
    ValidationError { field: String, reason: String },

    /// 网络层错误（连接、超时、DNS）
    #[error("Network error: {0}")]
    NetworkError(String),

    /// 平台返回了非零的错误码
    #[error("request failed, endpoint={endpoint:?}, errcode={code}, errmsg={message}")]
    VendorError {
        endpoint: String,
        code: i64,
        message: String,
    },

    /// 非 2xx 且响应体无法解析
    #[error("request failed, endpoint={endpoint:?}, status={status}, body={body}")]
    HttpStatusError {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// 响应体无法解析
    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("read file {path:?} failed: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl PushError {
    pub fn validation(field: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::ValidationError {
            field: field.into(),
            reason: reason.to_string(),
        }
    }

    /// 缺少必填字段
    pub fn missing(field: impl Into<String>) -> Self {
        Self::validation(field, "is required")
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationError { .. })
    }

    /// 平台错误码，仅 `VendorError` 携带
    pub fn vendor_code(&self) -> Option<i64> {
        match self {
            Self::VendorError { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// 命令执行的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Validate,
    BuildVariant,
    AcquireToken,
    Send,
    Classify,
}

impl Step {
    /// 发送阶段的错误：网络错误归于 Send，其余归于 Classify
    pub fn of_dispatch(err: &PushError) -> Self {
        match err {
            PushError::NetworkError(_) | PushError::IoError { .. } => Step::Send,
            _ => Step::Classify,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Validate => "validate",
            Step::BuildVariant => "build message",
            Step::AcquireToken => "acquire access token",
            Step::Send => "send",
            Step::Classify => "classify response",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 命令失败：出错的阶段 + 原始错误
///
/// 原始错误已经写进提示信息，不作为 source 暴露。
#[derive(Debug, thiserror::Error)]
#[error("{step} failed: {error}")]
pub struct CommandError {
    pub step: Step,
    pub error: PushError,
}

impl CommandError {
    pub fn new(step: Step, error: PushError) -> Self {
        Self { step, error }
    }

    pub fn dispatch(error: PushError) -> Self {
        Self::new(Step::of_dispatch(&error), error)
    }
}

/// 给 `Result<T, PushError>` 标注阶段
pub trait StepExt<T> {
    fn at(self, step: Step) -> Result<T, CommandError>;
}

impl<T> StepExt<T> for Result<T, PushError> {
    fn at(self, step: Step) -> Result<T, CommandError> {
        self.map_err(|e| CommandError::new(step, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_step() {
        let err = CommandError::dispatch(PushError::NetworkError("refused".into()));
        assert_eq!(err.step, Step::Send);

        let err = CommandError::dispatch(PushError::VendorError {
            endpoint: "https://example.com".into(),
            code: 45015,
            message: "response out of time limit".into(),
        });
        assert_eq!(err.step, Step::Classify);
        assert!(err.to_string().starts_with("classify response failed"));
    }

    #[test]
    fn test_missing_field_message() {
        let err = PushError::missing("touser");
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "invalid touser: is required");
    }

    #[test]
    fn test_command_error_prints_cause_once() {
        let err = CommandError::new(
            Step::Send,
            PushError::NetworkError("connection refused".to_string()),
        );
        assert!(std::error::Error::source(&err).is_none());
        let text = err.to_string();
        assert_eq!(text, "send failed: Network error: connection refused");
        assert_eq!(text.matches("connection refused").count(), 1);
    }
}
