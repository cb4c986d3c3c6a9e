//! 企业微信群机器人

use log::*;
use pmsg_common::{
    MessageKind, PushError, ResponseCode, Transport, Validate, parse_json, require, send_json,
};
use serde::{Deserialize, Serialize};

use crate::API_BASE;
use crate::app::NewsArticle;
use crate::customer::MediaMeta;

/// 企业微信机器人配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WxWorkBotConfig {
    /// webhook 地址中的 key
    pub key: String,
}

impl WxWorkBotConfig {
    pub fn webhook_url(&self) -> String {
        format!(
            "{API_BASE}/cgi-bin/webhook/send?key={}",
            urlencoding::encode(&self.key)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotKind {
    Text,
    Markdown,
    News,
    File,
    Voice,
}

impl MessageKind for BotKind {
    const ALL: &'static [Self] = &[
        Self::Text,
        Self::Markdown,
        Self::News,
        Self::File,
        Self::Voice,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Markdown => "markdown",
            Self::News => "news",
            Self::File => "file",
            Self::Voice => "voice",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WxWorkText {
    pub content: String,
    /// userid 列表，`@all` 提醒所有人
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mentioned_list: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mentioned_mobile_list: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WxWorkMarkdown {
    pub content: String,
}

/// 机器人图文，1到8条
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WxWorkNews {
    pub articles: Vec<NewsArticle>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BotPayload {
    #[serde(rename = "text")]
    Text(WxWorkText),
    #[serde(rename = "markdown")]
    Markdown(WxWorkMarkdown),
    #[serde(rename = "news")]
    News(WxWorkNews),
    #[serde(rename = "file")]
    File(MediaMeta),
    #[serde(rename = "voice")]
    Voice(MediaMeta),
}

/// markdown 内容最长 4096 字节
const MARKDOWN_MAX_BYTES: usize = 4096;
/// 文本内容最长 2048 字节
const TEXT_MAX_BYTES: usize = 2048;

impl BotPayload {
    /// 提醒列表只对文本消息生效
    pub fn build(
        kind: BotKind,
        data: &str,
        mentioned_list: Vec<String>,
        mentioned_mobile_list: Vec<String>,
    ) -> Result<Self, PushError> {
        let media = || MediaMeta {
            media_id: data.to_string(),
        };
        let payload = match kind {
            BotKind::Text => Self::Text(WxWorkText {
                content: data.to_string(),
                mentioned_list,
                mentioned_mobile_list,
            }),
            BotKind::Markdown => Self::Markdown(WxWorkMarkdown {
                content: data.to_string(),
            }),
            BotKind::News => Self::News(parse_json("data", data)?),
            BotKind::File => Self::File(media()),
            BotKind::Voice => Self::Voice(media()),
        };
        payload.validate()?;
        Ok(payload)
    }

    pub fn kind(&self) -> BotKind {
        match self {
            Self::Text(_) => BotKind::Text,
            Self::Markdown(_) => BotKind::Markdown,
            Self::News(_) => BotKind::News,
            Self::File(_) => BotKind::File,
            Self::Voice(_) => BotKind::Voice,
        }
    }
}

impl Validate for BotPayload {
    fn validate(&self) -> Result<(), PushError> {
        match self {
            Self::Text(m) => {
                require("text.content", &m.content)?;
                if m.content.len() > TEXT_MAX_BYTES {
                    return Err(PushError::validation(
                        "text.content",
                        format!("must be at most {TEXT_MAX_BYTES} bytes"),
                    ));
                }
                Ok(())
            }
            Self::Markdown(m) => {
                require("markdown.content", &m.content)?;
                if m.content.len() > MARKDOWN_MAX_BYTES {
                    return Err(PushError::validation(
                        "markdown.content",
                        format!("must be at most {MARKDOWN_MAX_BYTES} bytes"),
                    ));
                }
                Ok(())
            }
            Self::News(m) => {
                if m.articles.is_empty() || m.articles.len() > 8 {
                    return Err(PushError::validation(
                        "news.articles",
                        "must contain 1 to 8 articles",
                    ));
                }
                for a in &m.articles {
                    require("news.articles.title", &a.title)?;
                    require("news.articles.url", &a.url)?;
                }
                Ok(())
            }
            Self::File(m) => require("file.media_id", &m.media_id),
            Self::Voice(m) => require("voice.media_id", &m.media_id),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WxWorkBotPayload {
    msgtype: &'static str,
    #[serde(flatten)]
    payload: BotPayload,
}

impl WxWorkBotPayload {
    pub fn new(payload: BotPayload) -> Self {
        Self {
            msgtype: payload.kind().as_str(),
            payload,
        }
    }
}

/// 群机器人推送
pub async fn send_bot(
    transport: &dyn Transport,
    config: &WxWorkBotConfig,
    msg: &WxWorkBotPayload,
) -> Result<(), PushError> {
    require("key", &config.key)?;
    let _: ResponseCode = send_json(transport, &config.webhook_url(), msg).await?;
    debug!("wxwork bot message sent, msgtype={}", msg.msgtype);
    Ok(())
}
