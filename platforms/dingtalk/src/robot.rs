//! 钉钉自定义机器人

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use log::*;
use pmsg_common::{
    MessageKind, PushError, ResponseCode, Transport, Validate, non_empty, parse_json, require,
    send_json,
};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::API_BASE;

type HmacSha256 = Hmac<Sha256>;

/// 机器人 webhook 配置
#[derive(Debug, Clone, Default)]
pub struct DingTalkRobotConfig {
    pub access_token: String,
    /// 加签密钥，未开启加签时为空
    pub secret: Option<String>,
}

impl DingTalkRobotConfig {
    pub fn new(access_token: impl Into<String>, secret: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            secret: non_empty(secret),
        }
    }

    /// `timestamp` 为毫秒时间戳，仅在配置了密钥时参与签名
    pub fn webhook_url(&self, timestamp: i64) -> Result<String, PushError> {
        let mut url = format!(
            "{API_BASE}/robot/send?access_token={}",
            urlencoding::encode(&self.access_token)
        );
        if let Some(secret) = &self.secret {
            let sign = sign(secret, timestamp)?;
            url.push_str(&format!("&timestamp={timestamp}&sign={sign}"));
        }
        Ok(url)
    }
}

/// HMAC-SHA256(`timestamp\nsecret`)，base64 后再做 url 编码
pub fn sign(secret: &str, timestamp: i64) -> Result<String, PushError> {
    let string_to_sign = format!("{timestamp}\n{secret}");
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| PushError::ConfigError(format!("invalid dingtalk secret: {e}")))?;
    mac.update(string_to_sign.as_bytes());
    let signature = BASE64.encode(mac.finalize().into_bytes());
    Ok(urlencoding::encode(&signature).into_owned())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotKind {
    Text,
    Markdown,
    Link,
    ActionCard,
    FeedCard,
}

impl MessageKind for RobotKind {
    const ALL: &'static [Self] = &[
        Self::Text,
        Self::Markdown,
        Self::Link,
        Self::ActionCard,
        Self::FeedCard,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Markdown => "markdown",
            Self::Link => "link",
            Self::ActionCard => "actionCard",
            Self::FeedCard => "feedCard",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMeta {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkdownMeta {
    pub title: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkMeta {
    pub title: String,
    pub text: String,
    pub message_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pic_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionCardButton {
    pub title: String,
    #[serde(rename = "actionURL")]
    pub action_url: String,
}

/// 整体跳转（single_title + single_url）或独立跳转（btns）二选一
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionCardMeta {
    pub title: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub single_title: String,
    #[serde(default, rename = "singleURL", skip_serializing_if = "String::is_empty")]
    pub single_url: String,
    /// "0" 竖直排列，"1" 横向排列
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub btn_orientation: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub btns: Vec<ActionCardButton>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedCardLink {
    pub title: String,
    #[serde(rename = "messageURL")]
    pub message_url: String,
    #[serde(rename = "picURL")]
    pub pic_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedCardMeta {
    pub links: Vec<FeedCardLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RobotPayload {
    #[serde(rename = "text")]
    Text(TextMeta),
    #[serde(rename = "markdown")]
    Markdown(MarkdownMeta),
    #[serde(rename = "link")]
    Link(LinkMeta),
    #[serde(rename = "actionCard")]
    ActionCard(ActionCardMeta),
    #[serde(rename = "feedCard")]
    FeedCard(FeedCardMeta),
}

impl RobotPayload {
    /// 文本消息直接使用原始内容，其余类型解析 JSON
    pub fn build(kind: RobotKind, data: &str) -> Result<Self, PushError> {
        let payload = match kind {
            RobotKind::Text => Self::Text(TextMeta {
                content: data.to_string(),
            }),
            RobotKind::Markdown => Self::Markdown(parse_json("data", data)?),
            RobotKind::Link => Self::Link(parse_json("data", data)?),
            RobotKind::ActionCard => Self::ActionCard(parse_json("data", data)?),
            RobotKind::FeedCard => Self::FeedCard(parse_json("data", data)?),
        };
        payload.validate()?;
        Ok(payload)
    }

    pub fn kind(&self) -> RobotKind {
        match self {
            Self::Text(_) => RobotKind::Text,
            Self::Markdown(_) => RobotKind::Markdown,
            Self::Link(_) => RobotKind::Link,
            Self::ActionCard(_) => RobotKind::ActionCard,
            Self::FeedCard(_) => RobotKind::FeedCard,
        }
    }
}

impl Validate for RobotPayload {
    fn validate(&self) -> Result<(), PushError> {
        match self {
            Self::Text(m) => require("text.content", &m.content),
            Self::Markdown(m) => {
                require("markdown.title", &m.title)?;
                require("markdown.text", &m.text)
            }
            Self::Link(m) => {
                require("link.title", &m.title)?;
                require("link.text", &m.text)?;
                require("link.messageUrl", &m.message_url)
            }
            Self::ActionCard(m) => {
                require("actionCard.title", &m.title)?;
                require("actionCard.text", &m.text)?;
                let single = !m.single_title.is_empty() || !m.single_url.is_empty();
                match (single, m.btns.is_empty()) {
                    (true, true) => {
                        require("actionCard.singleTitle", &m.single_title)?;
                        require("actionCard.singleURL", &m.single_url)
                    }
                    (false, false) => {
                        for b in &m.btns {
                            require("actionCard.btns.title", &b.title)?;
                            require("actionCard.btns.actionURL", &b.action_url)?;
                        }
                        Ok(())
                    }
                    _ => Err(PushError::validation(
                        "actionCard",
                        "exactly one of singleTitle/singleURL or btns must be set",
                    )),
                }
            }
            Self::FeedCard(m) => {
                if m.links.is_empty() {
                    return Err(PushError::missing("feedCard.links"));
                }
                for l in &m.links {
                    require("feedCard.links.title", &l.title)?;
                    require("feedCard.links.messageURL", &l.message_url)?;
                }
                Ok(())
            }
        }
    }
}

/// @ 指定成员
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct At {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub at_mobiles: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub at_user_ids: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_at_all: bool,
}

impl At {
    pub fn is_empty(&self) -> bool {
        self.at_mobiles.is_empty() && self.at_user_ids.is_empty() && !self.is_at_all
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RobotMessage {
    msgtype: &'static str,
    #[serde(flatten)]
    payload: RobotPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    at: Option<At>,
}

impl RobotMessage {
    pub fn new(payload: RobotPayload) -> Self {
        Self {
            msgtype: payload.kind().as_str(),
            payload,
            at: None,
        }
    }

    /// 只有 text 和 markdown 支持 @
    pub fn with_at(mut self, at: At) -> Self {
        let supported = matches!(self.payload.kind(), RobotKind::Text | RobotKind::Markdown);
        if supported && !at.is_empty() {
            self.at = Some(at);
        } else if !at.is_empty() {
            debug!("{} message ignores at list", self.msgtype);
        }
        self
    }

    pub fn msgtype(&self) -> &'static str {
        self.msgtype
    }
}

/// 推送机器人消息，签名使用当前时间
pub async fn send_robot(
    transport: &dyn Transport,
    config: &DingTalkRobotConfig,
    msg: &RobotMessage,
) -> Result<(), PushError> {
    send_robot_at(transport, config, msg, chrono::Utc::now().timestamp_millis()).await
}

pub async fn send_robot_at(
    transport: &dyn Transport,
    config: &DingTalkRobotConfig,
    msg: &RobotMessage,
    timestamp: i64,
) -> Result<(), PushError> {
    require("access_token", &config.access_token)?;
    let url = config.webhook_url(timestamp)?;
    let _: ResponseCode = send_json(transport, &url, msg).await?;
    debug!("dingtalk robot message sent, msgtype={}", msg.msgtype);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmsg_common::testing::MockTransport;
    use serde_json::json;

    #[test]
    fn test_sign() {
        let expected = {
            let mut mac = HmacSha256::new_from_slice(b"SEC").unwrap();
            mac.update(b"1700000000000\nSEC");
            urlencoding::encode(&BASE64.encode(mac.finalize().into_bytes())).into_owned()
        };
        assert_eq!(sign("SEC", 1700000000000).unwrap(), expected);
        assert!(!expected.contains('+'));
        assert!(!expected.contains('='));
    }

    #[test]
    fn test_webhook_url_without_secret() {
        let config = DingTalkRobotConfig::new("TOKEN", Some(" ".to_string()));
        assert!(config.secret.is_none());
        let config = DingTalkRobotConfig::new("TOKEN", None);
        assert_eq!(
            config.webhook_url(1).unwrap(),
            "https://oapi.dingtalk.com/robot/send?access_token=TOKEN"
        );
    }

    #[test]
    fn test_webhook_url_with_secret() {
        let config = DingTalkRobotConfig::new("TOKEN", Some("SEC".to_string()));
        let url = config.webhook_url(1700000000000).unwrap();
        let sign = sign("SEC", 1700000000000).unwrap();
        assert_eq!(
            url,
            format!(
                "https://oapi.dingtalk.com/robot/send?access_token=TOKEN&timestamp=1700000000000&sign={sign}"
            )
        );
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(RobotKind::parse("actionCard").unwrap(), RobotKind::ActionCard);
        assert!(RobotKind::parse("actioncard").is_err());
    }

    #[test]
    fn test_text_with_at() {
        let payload = RobotPayload::build(RobotKind::Text, "deploy done").unwrap();
        let msg = RobotMessage::new(payload).with_at(At {
            at_mobiles: vec!["13800000000".to_string()],
            ..Default::default()
        });
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "msgtype": "text",
                "text": {"content": "deploy done"},
                "at": {"atMobiles": ["13800000000"]}
            })
        );
    }

    #[test]
    fn test_link_ignores_at() {
        let payload = RobotPayload::build(
            RobotKind::Link,
            r#"{"title":"t","text":"x","messageUrl":"https://a"}"#,
        )
        .unwrap();
        let msg = RobotMessage::new(payload).with_at(At {
            is_at_all: true,
            ..Default::default()
        });
        let value = serde_json::to_value(&msg).unwrap();
        assert!(value.get("at").is_none());
        assert_eq!(value["link"]["messageUrl"], "https://a");
    }

    #[test]
    fn test_action_card_requires_one_jump_style() {
        let err = RobotPayload::build(RobotKind::ActionCard, r#"{"title":"t","text":"x"}"#)
            .unwrap_err();
        assert!(err.to_string().starts_with("invalid actionCard:"));

        let ok = RobotPayload::build(
            RobotKind::ActionCard,
            r#"{"title":"t","text":"x","btns":[{"title":"a","actionURL":"https://a"}]}"#,
        )
        .unwrap();
        let value = serde_json::to_value(&ok).unwrap();
        assert_eq!(value["actionCard"]["btns"][0]["actionURL"], "https://a");
    }

    #[test]
    fn test_feed_card_requires_links() {
        let err = RobotPayload::build(RobotKind::FeedCard, r#"{"links":[]}"#).unwrap_err();
        assert_eq!(err.to_string(), "invalid feedCard.links: is required");
    }

    #[tokio::test]
    async fn test_send_signed_message() {
        let transport = MockTransport::new();
        transport.respond_json(200, json!({"errcode": 0, "errmsg": "ok"}));

        let config = DingTalkRobotConfig::new("TOKEN", Some("SEC".to_string()));
        let payload = RobotPayload::build(RobotKind::Markdown, r##"{"title":"t","text":"# hi"}"##)
            .unwrap();
        send_robot_at(&transport, &config, &RobotMessage::new(payload), 42)
            .await
            .unwrap();

        let req = &transport.requests()[0];
        assert!(req.url.contains("&timestamp=42&sign="));
        assert_eq!(req.json()["markdown"]["title"], "t");
    }

    #[tokio::test]
    async fn test_vendor_error_hides_token() {
        let transport = MockTransport::new();
        transport.respond_json(200, json!({"errcode": 310000, "errmsg": "sign not match"}));

        let config = DingTalkRobotConfig::new("TOKEN", Some("SEC".to_string()));
        let payload = RobotPayload::build(RobotKind::Text, "hi").unwrap();
        let err = send_robot(&transport, &config, &RobotMessage::new(payload))
            .await
            .unwrap_err();
        assert_eq!(err.vendor_code(), Some(310000));
        assert!(!err.to_string().contains("TOKEN"));
    }
}
