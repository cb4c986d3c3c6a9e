use serde::de::DeserializeOwned;

use crate::PushError;

/// 封闭的消息类型集合
pub trait MessageKind: Sized + Copy + 'static {
    /// 所有合法取值
    const ALL: &'static [Self];

    fn as_str(&self) -> &'static str;

    /// 解析类型标识，未知取值是校验错误
    fn parse(raw: &str) -> Result<Self, PushError> {
        let raw = raw.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == raw)
            .ok_or_else(|| {
                let valid = Self::ALL
                    .iter()
                    .map(|k| k.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                PushError::validation("msg_type", format!("unknown {raw:?}, valid: [{valid}]"))
            })
    }
}

/// 消息体自身的必填字段检查，不做任何 I/O
pub trait Validate {
    fn validate(&self) -> Result<(), PushError>;
}

/// 必填字符串字段
pub fn require(field: &str, value: &str) -> Result<(), PushError> {
    if value.trim().is_empty() {
        Err(PushError::missing(field))
    } else {
        Ok(())
    }
}

/// 空字符串视为未填写
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// 把原始数据解析为结构化的消息体
pub fn parse_json<T: DeserializeOwned>(field: &str, raw: &str) -> Result<T, PushError> {
    serde_json::from_str(raw).map_err(|e| PushError::validation(field, format!("invalid json format, {e}")))
}

/// 校验取值属于给定集合
pub fn one_of(field: &str, value: &str, allowed: &[&str]) -> Result<(), PushError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(PushError::validation(
            field,
            format!("unknown {value:?}, valid: [{}]", allowed.join(", ")),
        ))
    }
}
