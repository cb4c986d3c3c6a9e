use std::collections::BTreeMap;

use pmsg_common::{PushError, ResponseCode, Transport, Validate, require, send_json};
use serde::{Deserialize, Serialize};

use crate::API_BASE;
use crate::template::MiniProgram;

/// 订阅消息中一个字段的值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeDataItem {
    pub value: String,
}

pub type SubscribeData = BTreeMap<String, SubscribeDataItem>;

/// 一次性订阅消息的正文
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OnceContent {
    pub value: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OnceData {
    pub content: OnceContent,
}

/// 公众号一次性订阅消息
#[derive(Debug, Clone, Serialize)]
pub struct TemplateSubscribe {
    pub touser: String,
    pub template_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub miniprogram: Option<MiniProgram>,
    /// 订阅场景值，0~10000 的整数
    pub scene: String,
    /// 消息标题，15字以内
    pub title: String,
    pub data: OnceData,
}

const TITLE_MAX_CHARS: usize = 15;
const SCENE_MAX: u32 = 10000;

impl Validate for TemplateSubscribe {
    fn validate(&self) -> Result<(), PushError> {
        require("touser", &self.touser)?;
        require("template_id", &self.template_id)?;
        require("scene", &self.scene)?;
        match self.scene.parse::<u32>() {
            Ok(scene) if scene <= SCENE_MAX => {}
            _ => {
                return Err(PushError::validation(
                    "scene",
                    format!("must be an integer between 0 and {SCENE_MAX}"),
                ));
            }
        }
        require("title", &self.title)?;
        if self.title.chars().count() > TITLE_MAX_CHARS {
            return Err(PushError::validation(
                "title",
                format!("must be at most {TITLE_MAX_CHARS} characters"),
            ));
        }
        require("data.content.value", &self.data.content.value)
    }
}

/// 公众号订阅通知
#[derive(Debug, Clone, Serialize)]
pub struct Subscribe {
    pub touser: String,
    pub template_id: String,
    /// 跳转网页
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub miniprogram: Option<MiniProgram>,
    pub data: SubscribeData,
}

impl Validate for Subscribe {
    fn validate(&self) -> Result<(), PushError> {
        require("touser", &self.touser)?;
        require("template_id", &self.template_id)?;
        if self.data.is_empty() {
            return Err(PushError::missing("data"));
        }
        if let Some(mp) = &self.miniprogram {
            require("miniprogram.appid", &mp.appid)?;
        }
        Ok(())
    }
}

/// 发送一次性订阅消息
pub async fn send_template_subscribe(
    transport: &dyn Transport,
    access_token: &str,
    msg: &TemplateSubscribe,
) -> Result<(), PushError> {
    let url = format!(
        "{API_BASE}/cgi-bin/message/template/subscribe?access_token={token}",
        token = urlencoding::encode(access_token)
    );
    let _: ResponseCode = send_json(transport, &url, msg).await?;
    Ok(())
}

/// 发送订阅通知
pub async fn send_subscribe(
    transport: &dyn Transport,
    access_token: &str,
    msg: &Subscribe,
) -> Result<(), PushError> {
    let url = format!(
        "{API_BASE}/cgi-bin/message/subscribe/bizsend?access_token={token}",
        token = urlencoding::encode(access_token)
    );
    let _: ResponseCode = send_json(transport, &url, msg).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmsg_common::testing::MockTransport;
    use serde_json::json;

    fn once() -> TemplateSubscribe {
        TemplateSubscribe {
            touser: "oUser".to_string(),
            template_id: "tpl".to_string(),
            url: Some("https://example.com".to_string()),
            miniprogram: None,
            scene: "1000".to_string(),
            title: "通知".to_string(),
            data: OnceData {
                content: OnceContent {
                    value: "hello".to_string(),
                    color: String::new(),
                },
            },
        }
    }

    #[test]
    fn test_once_validation() {
        assert!(once().validate().is_ok());

        let mut msg = once();
        msg.scene = "10001".to_string();
        assert!(msg.validate().unwrap_err().to_string().starts_with("invalid scene"));

        let mut msg = once();
        msg.title = "a".repeat(16);
        assert!(msg.validate().unwrap_err().to_string().starts_with("invalid title"));

        let mut msg = once();
        msg.data.content.value.clear();
        assert_eq!(
            msg.validate().unwrap_err().to_string(),
            "invalid data.content.value: is required"
        );
    }

    #[tokio::test]
    async fn test_send_once_shape() {
        let transport = MockTransport::new();
        transport.respond_json(200, json!({"errcode": 0, "errmsg": "ok"}));

        send_template_subscribe(&transport, "tok", &once()).await.unwrap();

        let body = transport.requests()[0].json();
        assert_eq!(
            body,
            json!({
                "touser": "oUser",
                "template_id": "tpl",
                "url": "https://example.com",
                "scene": "1000",
                "title": "通知",
                "data": {"content": {"value": "hello"}}
            })
        );
    }

    #[tokio::test]
    async fn test_send_subscribe_failure() {
        let transport = MockTransport::new();
        transport.respond_json(200, json!({"errcode": 43101, "errmsg": "user refuse to accept the msg"}));

        let mut data = SubscribeData::new();
        data.insert("thing1".to_string(), SubscribeDataItem { value: "x".to_string() });
        let msg = Subscribe {
            touser: "oUser".to_string(),
            template_id: "tpl".to_string(),
            page: None,
            miniprogram: None,
            data,
        };
        let err = send_subscribe(&transport, "tok", &msg).await.unwrap_err();
        assert_eq!(err.vendor_code(), Some(43101));
        assert!(transport.requests()[0].url.contains("/cgi-bin/message/subscribe/bizsend"));
    }
}
