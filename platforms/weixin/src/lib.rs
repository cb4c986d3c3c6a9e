//! 微信公众号与小程序消息推送
//!
//! - 公众号：模板消息、一次性订阅消息、订阅通知、客服消息、临时素材上传
//! - 小程序：订阅消息、客服消息

pub mod cmd;
pub mod customer;
pub mod media;
pub mod miniprogram;
pub mod subscribe;
pub mod template;
pub mod token;

pub const API_BASE: &str = "https://api.weixin.qq.com";

pub use cmd::{
    AppAuth, CmdMediaUploadParams, CmdMiniSendCustomerParams, CmdMiniSendSubscribeParams,
    CmdSendCustomerParams, CmdSendSubscribeParams, CmdSendTemplateParams,
    CmdSendTemplateSubscribeParams,
};
pub use customer::{CustomerKind, CustomerMessage, CustomerPayload};
pub use miniprogram::{MiniCustomerKind, MiniCustomerMessage, MiniCustomerPayload, MiniSubscribe};
pub use subscribe::{Subscribe, TemplateSubscribe};
pub use template::{MiniProgram, Template};
pub use token::AppCredential;
