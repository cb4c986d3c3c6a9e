//! 企业微信消息推送
//!
//! - 微信客服消息（kf/send_msg）
//! - 应用消息（message/send）
//! - 群机器人（webhook/send）
//! - 临时素材上传

pub mod app;
pub mod bot;
pub mod cmd;
pub mod customer;
pub mod media;
pub mod token;

pub const API_BASE: &str = "https://qyapi.weixin.qq.com";

pub use app::{AppKind, AppMessage, AppPayload};
pub use bot::{BotKind, BotPayload, WxWorkBotConfig, WxWorkBotPayload};
pub use cmd::{
    CmdWorkMediaUploadParams, CmdWorkSendAppParams, CmdWorkSendBotParams,
    CmdWorkSendCustomerParams, CorpAuth,
};
pub use customer::{CustomerKind, CustomerMessage, CustomerPayload};
pub use token::CorpCredential;
