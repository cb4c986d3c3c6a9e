//! 钉钉自定义机器人消息推送

pub mod cmd;
pub mod robot;

pub const API_BASE: &str = "https://oapi.dingtalk.com";

pub use cmd::CmdDingTalkSendBotParams;
pub use robot::{At, DingTalkRobotConfig, RobotKind, RobotMessage, RobotPayload};
