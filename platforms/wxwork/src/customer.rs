//! 微信客服消息（kf/send_msg）

use pmsg_common::{
    ApiResponse, MessageKind, PushError, ResponseCode, Transport, Validate, de_opt_id, one_of,
    parse_json, require, send_json,
};
use serde::{Deserialize, Serialize};

use crate::API_BASE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerKind {
    Text,
    Image,
    Voice,
    Video,
    File,
    Link,
    MiniProgram,
    MsgMenu,
    Location,
}

impl MessageKind for CustomerKind {
    const ALL: &'static [Self] = &[
        Self::Text,
        Self::Image,
        Self::Voice,
        Self::Video,
        Self::File,
        Self::Link,
        Self::MiniProgram,
        Self::MsgMenu,
        Self::Location,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Voice => "voice",
            Self::Video => "video",
            Self::File => "file",
            Self::Link => "link",
            Self::MiniProgram => "miniprogram",
            Self::MsgMenu => "msgmenu",
            Self::Location => "location",
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
pub struct LinkMeta {
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub desc: String,
    pub url: String,
    pub thumb_media_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiniProgramMeta {
    pub appid: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    pub thumb_media_id: String,
    pub pagepath: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuClick {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuView {
    pub url: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuMiniProgram {
    pub appid: String,
    pub pagepath: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuText {
    pub content: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub no_newline: u8,
}

fn is_zero(v: &u8) -> bool {
    *v == 0
}

/// 菜单项：`type` 决定哪个字段有值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub click: Option<MenuClick>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<MenuView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub miniprogram: Option<MenuMiniProgram>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<MenuText>,
}

const MENU_ITEM_TYPES: [&str; 4] = ["click", "view", "miniprogram", "text"];

impl Validate for MenuItem {
    fn validate(&self) -> Result<(), PushError> {
        one_of("msgmenu.list.type", &self.item_type, &MENU_ITEM_TYPES)?;
        let populated = [
            ("click", self.click.is_some()),
            ("view", self.view.is_some()),
            ("miniprogram", self.miniprogram.is_some()),
            ("text", self.text.is_some()),
        ];
        let filled: Vec<&str> = populated
            .iter()
            .filter(|(_, set)| *set)
            .map(|(name, _)| *name)
            .collect();
        match filled.as_slice() {
            [one] if *one == self.item_type => {}
            [] => {
                return Err(PushError::validation(
                    format!("msgmenu.list.{}", self.item_type),
                    "is required",
                ));
            }
            _ => {
                return Err(PushError::validation(
                    "msgmenu.list.type",
                    format!(
                        "type {:?} must populate exactly its own field, got [{}]",
                        self.item_type,
                        filled.join(", ")
                    ),
                ));
            }
        }
        match self.item_type.as_str() {
            "click" => self
                .click
                .as_ref()
                .map_or(Ok(()), |c| require("msgmenu.list.click.content", &c.content)),
            "view" => self.view.as_ref().map_or(Ok(()), |v| {
                require("msgmenu.list.view.url", &v.url)?;
                require("msgmenu.list.view.content", &v.content)
            }),
            "miniprogram" => self.miniprogram.as_ref().map_or(Ok(()), |m| {
                require("msgmenu.list.miniprogram.appid", &m.appid)?;
                require("msgmenu.list.miniprogram.pagepath", &m.pagepath)?;
                require("msgmenu.list.miniprogram.content", &m.content)
            }),
            "text" => self
                .text
                .as_ref()
                .map_or(Ok(()), |t| require("msgmenu.list.text.content", &t.content)),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgMenuMeta {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub head_content: String,
    pub list: Vec<MenuItem>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tail_content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationMeta {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// 客服消息体
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CustomerPayload {
    #[serde(rename = "text")]
    Text(TextMeta),
    #[serde(rename = "image")]
    Image(MediaMeta),
    #[serde(rename = "voice")]
    Voice(MediaMeta),
    #[serde(rename = "video")]
    Video(MediaMeta),
    #[serde(rename = "file")]
    File(MediaMeta),
    #[serde(rename = "link")]
    Link(LinkMeta),
    #[serde(rename = "miniprogram")]
    MiniProgram(MiniProgramMeta),
    #[serde(rename = "msgmenu")]
    MsgMenu(MsgMenuMeta),
    #[serde(rename = "location")]
    Location(LocationMeta),
}

impl CustomerPayload {
    pub fn build(kind: CustomerKind, data: &str) -> Result<Self, PushError> {
        let media = || MediaMeta {
            media_id: data.to_string(),
        };
        let payload = match kind {
            CustomerKind::Text => Self::Text(TextMeta {
                content: data.to_string(),
            }),
            CustomerKind::Image => Self::Image(media()),
            CustomerKind::Voice => Self::Voice(media()),
            CustomerKind::Video => Self::Video(media()),
            CustomerKind::File => Self::File(media()),
            CustomerKind::Link => Self::Link(parse_json("data", data)?),
            CustomerKind::MiniProgram => Self::MiniProgram(parse_json("data", data)?),
            CustomerKind::MsgMenu => Self::MsgMenu(parse_json("data", data)?),
            CustomerKind::Location => Self::Location(parse_json("data", data)?),
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
            Self::File(_) => CustomerKind::File,
            Self::Link(_) => CustomerKind::Link,
            Self::MiniProgram(_) => CustomerKind::MiniProgram,
            Self::MsgMenu(_) => CustomerKind::MsgMenu,
            Self::Location(_) => CustomerKind::Location,
        }
    }
}

impl Validate for CustomerPayload {
    fn validate(&self) -> Result<(), PushError> {
        match self {
            Self::Text(m) => require("text.content", &m.content),
            Self::Image(m) => require("image.media_id", &m.media_id),
            Self::Voice(m) => require("voice.media_id", &m.media_id),
            Self::Video(m) => require("video.media_id", &m.media_id),
            Self::File(m) => require("file.media_id", &m.media_id),
            Self::Link(m) => {
                require("link.title", &m.title)?;
                require("link.url", &m.url)?;
                require("link.thumb_media_id", &m.thumb_media_id)
            }
            Self::MiniProgram(m) => {
                require("miniprogram.appid", &m.appid)?;
                require("miniprogram.thumb_media_id", &m.thumb_media_id)?;
                require("miniprogram.pagepath", &m.pagepath)
            }
            Self::MsgMenu(m) => {
                if m.list.is_empty() {
                    return Err(PushError::missing("msgmenu.list"));
                }
                m.list.iter().try_for_each(Validate::validate)
            }
            Self::Location(m) => {
                if !(-90.0..=90.0).contains(&m.latitude) {
                    return Err(PushError::validation("location.latitude", "out of range"));
                }
                if !(-180.0..=180.0).contains(&m.longitude) {
                    return Err(PushError::validation("location.longitude", "out of range"));
                }
                Ok(())
            }
        }
    }
}

/// 客服消息
#[derive(Debug, Clone, Serialize)]
pub struct CustomerMessage {
    /// 接收消息的客户 UserID
    pub touser: String,
    /// 发送消息的客服帐号ID
    pub open_kfid: String,
    /// 指定的消息ID，不填由系统生成
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msgid: Option<String>,
    msgtype: &'static str,
    #[serde(flatten)]
    payload: CustomerPayload,
}

impl CustomerMessage {
    pub fn new(
        touser: impl Into<String>,
        open_kfid: impl Into<String>,
        payload: CustomerPayload,
    ) -> Self {
        Self {
            touser: touser.into(),
            open_kfid: open_kfid.into(),
            msgid: None,
            msgtype: payload.kind().as_str(),
            payload,
        }
    }

    pub fn with_msgid(mut self, msgid: Option<String>) -> Self {
        self.msgid = msgid.filter(|s| !s.trim().is_empty());
        self
    }
}

impl Validate for CustomerMessage {
    fn validate(&self) -> Result<(), PushError> {
        require("touser", &self.touser)?;
        require("open_kfid", &self.open_kfid)?;
        self.payload.validate()
    }
}

#[derive(Debug, Deserialize)]
struct CustomerSendResponse {
    #[serde(flatten)]
    code: ResponseCode,
    #[serde(default, deserialize_with = "de_opt_id")]
    msgid: Option<String>,
}

impl ApiResponse for CustomerSendResponse {
    fn response_code(&self) -> &ResponseCode {
        &self.code
    }
}

/// 发送客服消息，返回消息ID
pub async fn send_customer(
    transport: &dyn Transport,
    access_token: &str,
    msg: &CustomerMessage,
) -> Result<Option<String>, PushError> {
    let url = format!(
        "{API_BASE}/cgi-bin/kf/send_msg?access_token={token}",
        token = urlencoding::encode(access_token)
    );
    let resp: CustomerSendResponse = send_json(transport, &url, msg).await?;
    Ok(resp.msgid)
}
