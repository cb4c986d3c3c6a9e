//! 公众号客服消息

use pmsg_common::{
    MessageKind, PushError, ResponseCode, Transport, Validate, parse_json, require, send_json,
};
use serde::{Deserialize, Serialize};

use crate::API_BASE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerKind {
    Text,
    Image,
    Voice,
    Video,
    Music,
    News,
    MpNews,
    MpNewsArticle,
    MsgMenu,
    WxCard,
    MiniProgramPage,
}

impl MessageKind for CustomerKind {
    const ALL: &'static [Self] = &[
        Self::Text,
        Self::Image,
        Self::Voice,
        Self::Video,
        Self::Music,
        Self::News,
        Self::MpNews,
        Self::MpNewsArticle,
        Self::MsgMenu,
        Self::WxCard,
        Self::MiniProgramPage,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Voice => "voice",
            Self::Video => "video",
            Self::Music => "music",
            Self::News => "news",
            Self::MpNews => "mpnews",
            Self::MpNewsArticle => "mpnewsarticle",
            Self::MsgMenu => "msgmenu",
            Self::WxCard => "wxcard",
            Self::MiniProgramPage => "miniprogrampage",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMeta {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMeta {
    pub media_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMeta {
    pub media_id: String,
    #[serde(default)]
    pub thumb_media_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MusicMeta {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub musicurl: String,
    pub hqmusicurl: String,
    pub thumb_media_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub picurl: String,
}

/// 图文消息（点击跳转到外链），只支持一条图文
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsMeta {
    pub articles: Vec<NewsArticle>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MpNewsArticleMeta {
    pub article_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgMenuMeta {
    #[serde(default)]
    pub head_content: String,
    pub list: Vec<MenuItem>,
    #[serde(default)]
    pub tail_content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WxCardMeta {
    pub card_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiniProgramPageMeta {
    #[serde(default)]
    pub title: String,
    pub appid: String,
    pub pagepath: String,
    pub thumb_media_id: String,
}

/// 客服消息体，每种类型只有一个对应的字段
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CustomerPayload {
    #[serde(rename = "text")]
    Text(TextMeta),
    #[serde(rename = "image")]
    Image(MediaMeta),
    #[serde(rename = "voice")]
    Voice(MediaMeta),
    #[serde(rename = "video")]
    Video(VideoMeta),
    #[serde(rename = "music")]
    Music(MusicMeta),
    #[serde(rename = "news")]
    News(NewsMeta),
    #[serde(rename = "mpnews")]
    MpNews(MediaMeta),
    #[serde(rename = "mpnewsarticle")]
    MpNewsArticle(MpNewsArticleMeta),
    #[serde(rename = "msgmenu")]
    MsgMenu(MsgMenuMeta),
    #[serde(rename = "wxcard")]
    WxCard(WxCardMeta),
    #[serde(rename = "miniprogrampage")]
    MiniProgramPage(MiniProgramPageMeta),
}

impl CustomerPayload {
    /// 按类型解析原始数据：文本和素材类直接取值，其余为 JSON
    pub fn build(kind: CustomerKind, data: &str) -> Result<Self, PushError> {
        let payload = match kind {
            CustomerKind::Text => Self::Text(TextMeta {
                content: data.to_string(),
            }),
            CustomerKind::Image => Self::Image(media(data)),
            CustomerKind::Voice => Self::Voice(media(data)),
            CustomerKind::MpNews => Self::MpNews(media(data)),
            CustomerKind::MpNewsArticle => Self::MpNewsArticle(MpNewsArticleMeta {
                article_id: data.to_string(),
            }),
            CustomerKind::WxCard => Self::WxCard(WxCardMeta {
                card_id: data.to_string(),
            }),
            CustomerKind::Video => Self::Video(parse_json("data", data)?),
            CustomerKind::Music => Self::Music(parse_json("data", data)?),
            CustomerKind::News => Self::News(parse_json("data", data)?),
            CustomerKind::MsgMenu => Self::MsgMenu(parse_json("data", data)?),
            CustomerKind::MiniProgramPage => Self::MiniProgramPage(parse_json("data", data)?),
        };
        payload.validate()?;
        Ok(payload)
    }

    pub fn kind(&self) -> CustomerKind {
        match self {
            Self::Text(_) => CustomerKind::Text,
            Self::Image(_) => CustomerKind::Image,
            Self::Voice(_) => CustomerKind::Voice,
            Self::Video(_) => CustomerKind::Video,
            Self::Music(_) => CustomerKind::Music,
            Self::News(_) => CustomerKind::News,
            Self::MpNews(_) => CustomerKind::MpNews,
            Self::MpNewsArticle(_) => CustomerKind::MpNewsArticle,
            Self::MsgMenu(_) => CustomerKind::MsgMenu,
            Self::WxCard(_) => CustomerKind::WxCard,
            Self::MiniProgramPage(_) => CustomerKind::MiniProgramPage,
        }
    }
}

fn media(data: &str) -> MediaMeta {
    MediaMeta {
        media_id: data.to_string(),
    }
}

impl Validate for CustomerPayload {
    fn validate(&self) -> Result<(), PushError> {
        match self {
            Self::Text(m) => require("text.content", &m.content),
            Self::Image(m) => require("image.media_id", &m.media_id),
            Self::Voice(m) => require("voice.media_id", &m.media_id),
            Self::MpNews(m) => require("mpnews.media_id", &m.media_id),
            Self::MpNewsArticle(m) => require("mpnewsarticle.article_id", &m.article_id),
            Self::WxCard(m) => require("wxcard.card_id", &m.card_id),
            Self::Video(m) => {
                require("video.media_id", &m.media_id)?;
                require("video.thumb_media_id", &m.thumb_media_id)
            }
            Self::Music(m) => {
                require("music.musicurl", &m.musicurl)?;
                require("music.hqmusicurl", &m.hqmusicurl)?;
                require("music.thumb_media_id", &m.thumb_media_id)
            }
            Self::News(m) => {
                if m.articles.len() != 1 {
                    return Err(PushError::validation(
                        "news.articles",
                        "must contain exactly one article",
                    ));
                }
                for a in &m.articles {
                    require("news.articles.title", &a.title)?;
                    require("news.articles.url", &a.url)?;
                }
                Ok(())
            }
            Self::MsgMenu(m) => {
                if m.list.is_empty() {
                    return Err(PushError::missing("msgmenu.list"));
                }
                for item in &m.list {
                    require("msgmenu.list.id", &item.id)?;
                    require("msgmenu.list.content", &item.content)?;
                }
                Ok(())
            }
            Self::MiniProgramPage(m) => {
                require("miniprogrampage.appid", &m.appid)?;
                require("miniprogrampage.pagepath", &m.pagepath)?;
                require("miniprogrampage.thumb_media_id", &m.thumb_media_id)
            }
        }
    }
}

/// 以某个客服账号发送
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomService {
    pub kf_account: String,
}

/// 客服消息
#[derive(Debug, Clone, Serialize)]
pub struct CustomerMessage {
    pub touser: String,
    msgtype: &'static str,
    #[serde(flatten)]
    payload: CustomerPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customservice: Option<CustomService>,
}

impl CustomerMessage {
    pub fn new(touser: impl Into<String>, payload: CustomerPayload) -> Self {
        Self {
            touser: touser.into(),
            msgtype: payload.kind().as_str(),
            payload,
            customservice: None,
        }
    }

    pub fn with_kf_account(mut self, kf_account: Option<String>) -> Self {
        self.customservice = kf_account
            .filter(|s| !s.trim().is_empty())
            .map(|kf_account| CustomService { kf_account });
        self
    }

    pub fn payload(&self) -> &CustomerPayload {
        &self.payload
    }
}

impl Validate for CustomerMessage {
    fn validate(&self) -> Result<(), PushError> {
        require("touser", &self.touser)?;
        self.payload.validate()
    }
}

/// 发送客服消息（公众号与小程序共用同一个接口）
pub async fn send_customer<T: Serialize + ?Sized>(
    transport: &dyn Transport,
    access_token: &str,
    msg: &T,
) -> Result<(), PushError> {
    let url = format!(
        "{API_BASE}/cgi-bin/message/custom/send?access_token={token}",
        token = urlencoding::encode(access_token)
    );
    let _: ResponseCode = send_json(transport, &url, msg).await?;
    Ok(())
}
