//! 应用消息（message/send）

use log::*;
use pmsg_common::{
    ApiResponse, MessageKind, PushError, ResponseCode, Transport, Validate, de_opt_id, parse_json,
    require, send_json,
};
use serde::{Deserialize, Serialize};

use crate::API_BASE;
use crate::customer::{MediaMeta, TextMeta};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppKind {
    Text,
    Image,
    Voice,
    Video,
    File,
    TextCard,
    News,
    Markdown,
}

impl MessageKind for AppKind {
    const ALL: &'static [Self] = &[
        Self::Text,
        Self::Image,
        Self::Voice,
        Self::Video,
        Self::File,
        Self::TextCard,
        Self::News,
        Self::Markdown,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Voice => "voice",
            Self::Video => "video",
            Self::File => "file",
            Self::TextCard => "textcard",
            Self::News => "news",
            Self::Markdown => "markdown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMeta {
    pub media_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextCardMeta {
    pub title: String,
    pub description: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub btntxt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub picurl: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub appid: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pagepath: String,
}

/// 图文消息，1到8条图文
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsMeta {
    pub articles: Vec<NewsArticle>,
}

const NEWS_MAX_ARTICLES: usize = 8;

impl Validate for NewsMeta {
    fn validate(&self) -> Result<(), PushError> {
        if self.articles.is_empty() || self.articles.len() > NEWS_MAX_ARTICLES {
            return Err(PushError::validation(
                "news.articles",
                format!("must contain 1 to {NEWS_MAX_ARTICLES} articles"),
            ));
        }
        for a in &self.articles {
            require("news.articles.title", &a.title)?;
            // 点击后跳转链接或小程序，二者必填其一
            if a.url.trim().is_empty() && a.appid.trim().is_empty() {
                return Err(PushError::validation(
                    "news.articles.url",
                    "either url or appid must be set",
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AppPayload {
    #[serde(rename = "text")]
    Text(TextMeta),
    #[serde(rename = "image")]
    Image(MediaMeta),
    #[serde(rename = "voice")]
    Voice(MediaMeta),
    #[serde(rename = "video")]
    Video(VideoMeta),
    #[serde(rename = "file")]
    File(MediaMeta),
    #[serde(rename = "textcard")]
    TextCard(TextCardMeta),
    #[serde(rename = "news")]
    News(NewsMeta),
    #[serde(rename = "markdown")]
    Markdown(TextMeta),
}

impl AppPayload {
    pub fn build(kind: AppKind, data: &str) -> Result<Self, PushError> {
        let media = || MediaMeta {
            media_id: data.to_string(),
        };
        let text = || TextMeta {
            content: data.to_string(),
        };
        let payload = match kind {
            AppKind::Text => Self::Text(text()),
            AppKind::Markdown => Self::Markdown(text()),
            AppKind::Image => Self::Image(media()),
            AppKind::Voice => Self::Voice(media()),
            AppKind::File => Self::File(media()),
            AppKind::Video => Self::Video(parse_json("data", data)?),
            AppKind::TextCard => Self::TextCard(parse_json("data", data)?),
            AppKind::News => Self::News(parse_json("data", data)?),
        };
        payload.validate()?;
        Ok(payload)
    }

    pub fn kind(&self) -> AppKind {
        match self {
            Self::Text(_) => AppKind::Text,
            Self::Image(_) => AppKind::Image,
            Self::Voice(_) => AppKind::Voice,
            Self::Video(_) => AppKind::Video,
            Self::File(_) => AppKind::File,
            Self::TextCard(_) => AppKind::TextCard,
            Self::News(_) => AppKind::News,
            Self::Markdown(_) => AppKind::Markdown,
        }
    }
}

impl Validate for AppPayload {
    fn validate(&self) -> Result<(), PushError> {
        match self {
            Self::Text(m) => require("text.content", &m.content),
            Self::Markdown(m) => require("markdown.content", &m.content),
            Self::Image(m) => require("image.media_id", &m.media_id),
            Self::Voice(m) => require("voice.media_id", &m.media_id),
            Self::File(m) => require("file.media_id", &m.media_id),
            Self::Video(m) => require("video.media_id", &m.media_id),
            Self::TextCard(m) => {
                require("textcard.title", &m.title)?;
                require("textcard.description", &m.description)?;
                require("textcard.url", &m.url)
            }
            Self::News(m) => m.validate(),
        }
    }
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// 应用消息
#[derive(Debug, Clone, Serialize)]
pub struct AppMessage {
    /// 成员ID列表，多个用 `|` 分隔，`@all` 表示全部成员
    #[serde(skip_serializing_if = "Option::is_none")]
    pub touser: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toparty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub totag: Option<String>,
    msgtype: &'static str,
    pub agentid: i64,
    #[serde(flatten)]
    payload: AppPayload,
    /// 是否保密消息
    #[serde(skip_serializing_if = "is_false", serialize_with = "bool_as_int")]
    pub safe: bool,
    #[serde(skip_serializing_if = "is_false", serialize_with = "bool_as_int")]
    pub enable_id_trans: bool,
    #[serde(skip_serializing_if = "is_false", serialize_with = "bool_as_int")]
    pub enable_duplicate_check: bool,
    /// 重复消息检查的时间间隔，默认1800s，最大不超过4小时
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_check_interval: Option<u32>,
}

fn bool_as_int<S: serde::Serializer>(v: &bool, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u8(u8::from(*v))
}

const DUPLICATE_CHECK_INTERVAL_MAX: u32 = 4 * 60 * 60;

impl AppMessage {
    pub fn new(agentid: i64, payload: AppPayload) -> Self {
        Self {
            touser: None,
            toparty: None,
            totag: None,
            msgtype: payload.kind().as_str(),
            agentid,
            payload,
            safe: false,
            enable_id_trans: false,
            enable_duplicate_check: false,
            duplicate_check_interval: None,
        }
    }
}

impl Validate for AppMessage {
    fn validate(&self) -> Result<(), PushError> {
        let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        if !(set(&self.touser) || set(&self.toparty) || set(&self.totag)) {
            return Err(PushError::validation(
                "touser/toparty/totag",
                "at least one recipient must be set",
            ));
        }
        if self.agentid <= 0 {
            return Err(PushError::missing("agentid"));
        }
        if let Some(interval) = self.duplicate_check_interval
            && interval > DUPLICATE_CHECK_INTERVAL_MAX
        {
            return Err(PushError::validation(
                "duplicate_check_interval",
                format!("must not exceed {DUPLICATE_CHECK_INTERVAL_MAX} seconds"),
            ));
        }
        self.payload.validate()
    }
}

/// 应用消息的响应，部分接收人无效时仍然返回成功
#[derive(Debug, Deserialize)]
pub struct AppSendResponse {
    #[serde(flatten)]
    code: ResponseCode,
    #[serde(default)]
    pub invaliduser: String,
    #[serde(default)]
    pub invalidparty: String,
    #[serde(default)]
    pub invalidtag: String,
    #[serde(default)]
    pub unlicenseduser: String,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub msgid: Option<String>,
}

impl ApiResponse for AppSendResponse {
    fn response_code(&self) -> &ResponseCode {
        &self.code
    }
}

/// 发送应用消息
pub async fn send_app(
    transport: &dyn Transport,
    access_token: &str,
    msg: &AppMessage,
) -> Result<AppSendResponse, PushError> {
    let url = format!(
        "{API_BASE}/cgi-bin/message/send?access_token={token}",
        token = urlencoding::encode(access_token)
    );
    let resp: AppSendResponse = send_json(transport, &url, msg).await?;
    if !resp.invaliduser.is_empty() || !resp.invalidparty.is_empty() || !resp.invalidtag.is_empty()
    {
        warn!(
            "some recipients are invalid: user={:?}, party={:?}, tag={:?}",
            resp.invaliduser, resp.invalidparty, resp.invalidtag
        );
    }
    Ok(resp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmsg_common::testing::MockTransport;
    use serde_json::json;

    #[test]
    fn test_every_kind_builds() {
        let samples = [
            (AppKind::Text, "hello"),
            (AppKind::Image, "MEDIA"),
            (AppKind::Voice, "MEDIA"),
            (AppKind::Video, r#"{"media_id":"M","title":"t"}"#),
            (AppKind::File, "MEDIA"),
            (
                AppKind::TextCard,
                r#"{"title":"t","description":"d","url":"https://a","btntxt":"more"}"#,
            ),
            (AppKind::News, r#"{"articles":[{"title":"t","url":"https://a"}]}"#),
            (AppKind::Markdown, "**bold**"),
        ];
        assert_eq!(samples.len(), AppKind::ALL.len());
        for (kind, data) in samples {
            let payload = AppPayload::build(kind, data).unwrap();
            assert_eq!(payload.kind(), kind);
        }
    }

    #[test]
    fn test_news_limits() {
        let err = AppPayload::build(AppKind::News, r#"{"articles":[]}"#).unwrap_err();
        assert!(err.to_string().starts_with("invalid news.articles"));

        let err = AppPayload::build(AppKind::News, r#"{"articles":[{"title":"t"}]}"#).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid news.articles.url: either url or appid must be set"
        );
    }

    #[test]
    fn test_recipient_required() {
        let payload = AppPayload::build(AppKind::Text, "hi").unwrap();
        let mut msg = AppMessage::new(1000002, payload);
        assert!(msg.validate().unwrap_err().to_string().contains("touser/toparty/totag"));

        msg.toparty = Some("2".to_string());
        assert!(msg.validate().is_ok());

        msg.duplicate_check_interval = Some(5 * 60 * 60);
        assert!(msg.validate().is_err());
    }

    #[tokio::test]
    async fn test_send_app_shape() {
        let transport = MockTransport::new();
        transport.respond_json(
            200,
            json!({"errcode": 0, "errmsg": "ok", "invaliduser": "bob", "msgid": "MSG1"}),
        );

        let payload = AppPayload::build(AppKind::Markdown, "# hi").unwrap();
        let mut msg = AppMessage::new(1000002, payload);
        msg.touser = Some("alice|bob".to_string());
        msg.safe = true;
        let resp = send_app(&transport, "tok", &msg).await.unwrap();
        assert_eq!(resp.msgid.as_deref(), Some("MSG1"));
        assert_eq!(resp.invaliduser, "bob");

        assert_eq!(
            transport.requests()[0].json(),
            json!({
                "touser": "alice|bob",
                "msgtype": "markdown",
                "agentid": 1000002,
                "markdown": {"content": "# hi"},
                "safe": 1
            })
        );
    }
}
