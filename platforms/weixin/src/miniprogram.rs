//! 小程序订阅消息与客服消息

use pmsg_common::{
    MessageKind, PushError, ResponseCode, Transport, Validate, one_of, parse_json, require,
    send_json,
};
use serde::{Deserialize, Serialize};

use crate::API_BASE;
use crate::customer::{MediaMeta, TextMeta};
use crate::subscribe::SubscribeData;

/// 跳转小程序类型
pub const MINIPROGRAM_STATES: [&str; 3] = ["developer", "trial", "formal"];
/// 进入小程序查看的语言类型
pub const LANGS: [&str; 4] = ["zh_CN", "en_US", "zh_HK", "zh_TW"];

/// 小程序订阅消息
#[derive(Debug, Clone, Serialize)]
pub struct MiniSubscribe {
    pub touser: String,
    pub template_id: String,
    /// 点击模板卡片后的跳转页面，仅限本小程序内的页面
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    pub data: SubscribeData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub miniprogram_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

impl Validate for MiniSubscribe {
    fn validate(&self) -> Result<(), PushError> {
        require("touser", &self.touser)?;
        require("template_id", &self.template_id)?;
        if self.data.is_empty() {
            return Err(PushError::missing("data"));
        }
        if let Some(state) = &self.miniprogram_state {
            one_of("miniprogram_state", state, &MINIPROGRAM_STATES)?;
        }
        if let Some(lang) = &self.lang {
            one_of("lang", lang, &LANGS)?;
        }
        Ok(())
    }
}

/// 发送小程序订阅消息
pub async fn send_mini_subscribe(
    transport: &dyn Transport,
    access_token: &str,
    msg: &MiniSubscribe,
) -> Result<(), PushError> {
    let url = format!(
        "{API_BASE}/cgi-bin/message/subscribe/send?access_token={token}",
        token = urlencoding::encode(access_token)
    );
    let _: ResponseCode = send_json(transport, &url, msg).await?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiniCustomerKind {
    Text,
    Image,
    Link,
    MiniProgramPage,
}

impl MessageKind for MiniCustomerKind {
    const ALL: &'static [Self] = &[Self::Text, Self::Image, Self::Link, Self::MiniProgramPage];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Link => "link",
            Self::MiniProgramPage => "miniprogrampage",
        }
    }
}

/// 图文链接
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkMeta {
    pub title: String,
    pub description: String,
    pub url: String,
    pub thumb_url: String,
}

/// 小程序卡片
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub title: String,
    pub pagepath: String,
    pub thumb_media_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MiniCustomerPayload {
    #[serde(rename = "text")]
    Text(TextMeta),
    #[serde(rename = "image")]
    Image(MediaMeta),
    #[serde(rename = "link")]
    Link(LinkMeta),
    #[serde(rename = "miniprogrampage")]
    MiniProgramPage(PageMeta),
}

impl MiniCustomerPayload {
    pub fn build(kind: MiniCustomerKind, data: &str) -> Result<Self, PushError> {
        let payload = match kind {
            MiniCustomerKind::Text => Self::Text(TextMeta {
                content: data.to_string(),
            }),
            MiniCustomerKind::Image => Self::Image(MediaMeta {
                media_id: data.to_string(),
            }),
            MiniCustomerKind::Link => Self::Link(parse_json("data", data)?),
            MiniCustomerKind::MiniProgramPage => Self::MiniProgramPage(parse_json("data", data)?),
        };
        payload.validate()?;
        Ok(payload)
    }

    pub fn kind(&self) -> MiniCustomerKind {
        match self {
            Self::Text(_) => MiniCustomerKind::Text,
            Self::Image(_) => MiniCustomerKind::Image,
            Self::Link(_) => MiniCustomerKind::Link,
            Self::MiniProgramPage(_) => MiniCustomerKind::MiniProgramPage,
        }
    }
}

impl Validate for MiniCustomerPayload {
    fn validate(&self) -> Result<(), PushError> {
        match self {
            Self::Text(m) => require("text.content", &m.content),
            Self::Image(m) => require("image.media_id", &m.media_id),
            Self::Link(m) => {
                require("link.title", &m.title)?;
                require("link.description", &m.description)?;
                require("link.url", &m.url)?;
                require("link.thumb_url", &m.thumb_url)
            }
            Self::MiniProgramPage(m) => {
                require("miniprogrampage.title", &m.title)?;
                require("miniprogrampage.pagepath", &m.pagepath)?;
                require("miniprogrampage.thumb_media_id", &m.thumb_media_id)
            }
        }
    }
}

/// 小程序客服消息
#[derive(Debug, Clone, Serialize)]
pub struct MiniCustomerMessage {
    pub touser: String,
    msgtype: &'static str,
    #[serde(flatten)]
    payload: MiniCustomerPayload,
}

impl MiniCustomerMessage {
    pub fn new(touser: impl Into<String>, payload: MiniCustomerPayload) -> Self {
        Self {
            touser: touser.into(),
            msgtype: payload.kind().as_str(),
            payload,
        }
    }
}

impl Validate for MiniCustomerMessage {
    fn validate(&self) -> Result<(), PushError> {
        require("touser", &self.touser)?;
        self.payload.validate()
    }
}
