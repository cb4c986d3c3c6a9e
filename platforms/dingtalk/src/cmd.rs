use pmsg_common::{
    CommandError, Context, MessageKind, PushError, PushResult, Step, StepExt, require,
};

use crate::robot::{At, DingTalkRobotConfig, RobotKind, RobotMessage, RobotPayload, send_robot};

/// 机器人消息，webhook 令牌即凭证，不需要获取 access_token
#[derive(Debug, Clone, Default)]
pub struct CmdDingTalkSendBotParams {
    pub access_token: String,
    pub secret: Option<String>,
    pub msg_type: String,
    pub data: String,
    pub at_mobiles: Vec<String>,
    pub at_user_ids: Vec<String>,
    pub at_all: bool,
}

impl CmdDingTalkSendBotParams {
    pub fn validate(&self) -> Result<(), PushError> {
        require("access_token", &self.access_token)?;
        RobotKind::parse(&self.msg_type).map(|_| ())
    }

    pub fn build(&self) -> Result<RobotMessage, PushError> {
        let kind = RobotKind::parse(&self.msg_type)?;
        let payload = RobotPayload::build(kind, &self.data)?;
        Ok(RobotMessage::new(payload).with_at(At {
            at_mobiles: self.at_mobiles.clone(),
            at_user_ids: self.at_user_ids.clone(),
            is_at_all: self.at_all,
        }))
    }

    pub async fn run(&self, ctx: &Context) -> Result<PushResult, CommandError> {
        self.validate().at(Step::Validate)?;
        let msg = self.build().at(Step::BuildVariant)?;
        let config = DingTalkRobotConfig::new(self.access_token.clone(), self.secret.clone());
        send_robot(ctx.transport(), &config, &msg)
            .await
            .map_err(CommandError::dispatch)?;
        Ok(PushResult::ok())
    }
}
