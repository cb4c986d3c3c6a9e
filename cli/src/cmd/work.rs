use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use pmsg_common::{Context, PushResult};
use pmsg_wxwork::{
    CmdWorkMediaUploadParams, CmdWorkSendAppParams, CmdWorkSendBotParams,
    CmdWorkSendCustomerParams,
};

use super::CorpAuthArgs;

#[derive(Args, Debug)]
pub struct WorkArgs {
    #[command(subcommand)]
    command: WorkCommand,
}

#[derive(Subcommand, Debug)]
pub enum WorkCommand {
    /// 微信客服消息
    Customer(CustomerArgs),
    /// 应用消息
    App(AppArgs),
    /// 群机器人
    Bot(BotArgs),
    /// 上传临时素材
    Upload(UploadArgs),
}

#[derive(Args, Debug)]
pub struct CustomerArgs {
    #[command(flatten)]
    auth: CorpAuthArgs,
    /// 接收消息的客户 external_userid
    #[arg(short = 'o', long)]
    to_user: String,
    /// 客服帐号ID
    #[arg(short = 'k', long)]
    open_kfid: String,
    /// 消息ID，不填时由系统生成
    #[arg(long)]
    msg_id: Option<String>,
    /// text, image, voice, video, file, link, miniprogram, msgmenu, location
    #[arg(short = 'm', long)]
    msg_type: String,
    #[arg(short = 'd', long)]
    data: String,
}

#[derive(Args, Debug)]
pub struct AppArgs {
    #[command(flatten)]
    auth: CorpAuthArgs,
    /// 成员ID列表，多个用 | 分隔，@all 为全部成员
    #[arg(long)]
    to_user: Option<String>,
    #[arg(long)]
    to_party: Option<String>,
    #[arg(long)]
    to_tag: Option<String>,
    /// 企业应用 id
    #[arg(short = 'a', long)]
    agent_id: i64,
    /// text, image, voice, video, file, textcard, news, markdown
    #[arg(short = 'm', long)]
    msg_type: String,
    #[arg(short = 'd', long)]
    data: String,
    /// 保密消息
    #[arg(long)]
    safe: bool,
    #[arg(long)]
    enable_id_trans: bool,
    #[arg(long)]
    enable_duplicate_check: bool,
    /// 重复消息检查的时间间隔（秒），最长 4 小时
    #[arg(long)]
    duplicate_check_interval: Option<u32>,
}

#[derive(Args, Debug)]
pub struct BotArgs {
    /// webhook key
    #[arg(short = 'k', long, env = "PMSG_WORK_BOT_KEY", hide_env_values = true)]
    key: String,
    /// text, markdown, news, file, voice
    #[arg(short = 'm', long)]
    msg_type: String,
    #[arg(short = 'd', long)]
    data: String,
    /// 提醒的成员 userid，逗号分隔
    #[arg(long, value_delimiter = ',')]
    mentioned_list: Vec<String>,
    /// 提醒的成员手机号，逗号分隔
    #[arg(long, value_delimiter = ',')]
    mentioned_mobile_list: Vec<String>,
}

#[derive(Args, Debug)]
pub struct UploadArgs {
    #[command(flatten)]
    auth: CorpAuthArgs,
    /// image, voice, video, file
    #[arg(short = 'y', long = "type")]
    media_type: String,
    #[arg(short = 'f', long)]
    file: PathBuf,
}

pub async fn execute(args: WorkArgs, ctx: &Context) -> Result<PushResult> {
    let result = match args.command {
        WorkCommand::Customer(a) => {
            CmdWorkSendCustomerParams {
                auth: a.auth.into(),
                to_user: a.to_user,
                open_kfid: a.open_kfid,
                msg_id: a.msg_id,
                msg_type: a.msg_type,
                data: a.data,
            }
            .run(ctx)
            .await?
        }
        WorkCommand::App(a) => {
            CmdWorkSendAppParams {
                auth: a.auth.into(),
                to_user: a.to_user,
                to_party: a.to_party,
                to_tag: a.to_tag,
                agent_id: a.agent_id,
                msg_type: a.msg_type,
                data: a.data,
                safe: a.safe,
                enable_id_trans: a.enable_id_trans,
                enable_duplicate_check: a.enable_duplicate_check,
                duplicate_check_interval: a.duplicate_check_interval,
            }
            .run(ctx)
            .await?
        }
        WorkCommand::Bot(a) => {
            CmdWorkSendBotParams {
                key: a.key,
                msg_type: a.msg_type,
                data: a.data,
                mentioned_list: a.mentioned_list,
                mentioned_mobile_list: a.mentioned_mobile_list,
            }
            .run(ctx)
            .await?
        }
        WorkCommand::Upload(a) => {
            CmdWorkMediaUploadParams {
                auth: a.auth.into(),
                media_type: a.media_type,
                file: a.file,
            }
            .run(ctx)
            .await?
        }
    };
    Ok(result)
}
