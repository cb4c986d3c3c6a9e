use anyhow::Result;
use clap::{Args, Subcommand};
use pmsg_common::{Context, PushResult};
use pmsg_dingtalk::CmdDingTalkSendBotParams;

#[derive(Args, Debug)]
pub struct DingtalkArgs {
    #[command(subcommand)]
    command: DingtalkCommand,
}

#[derive(Subcommand, Debug)]
pub enum DingtalkCommand {
    /// 自定义机器人
    Bot(BotArgs),
}

#[derive(Args, Debug)]
pub struct BotArgs {
    /// webhook 中的 access_token
    #[arg(short = 't', long, env = "PMSG_DINGTALK_TOKEN", hide_env_values = true)]
    access_token: String,
    /// 加签密钥
    #[arg(short = 's', long, env = "PMSG_DINGTALK_SECRET", hide_env_values = true)]
    secret: Option<String>,
    /// text, markdown, link, actionCard, feedCard
    #[arg(short = 'm', long)]
    msg_type: String,
    #[arg(short = 'd', long)]
    data: String,
    /// @ 的手机号，逗号分隔
    #[arg(long, value_delimiter = ',')]
    at_mobiles: Vec<String>,
    /// @ 的 userid，逗号分隔
    #[arg(long, value_delimiter = ',')]
    at_user_ids: Vec<String>,
    /// @ 所有人
    #[arg(long)]
    at_all: bool,
}

pub async fn execute(args: DingtalkArgs, ctx: &Context) -> Result<PushResult> {
    let result = match args.command {
        DingtalkCommand::Bot(a) => {
            CmdDingTalkSendBotParams {
                access_token: a.access_token,
                secret: a.secret,
                msg_type: a.msg_type,
                data: a.data,
                at_mobiles: a.at_mobiles,
                at_user_ids: a.at_user_ids,
                at_all: a.at_all,
            }
            .run(ctx)
            .await?
        }
    };
    Ok(result)
}
