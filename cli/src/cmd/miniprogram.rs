use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use pmsg_common::{Context, PushResult};
use pmsg_weixin::{CmdMediaUploadParams, CmdMiniSendCustomerParams, CmdMiniSendSubscribeParams};

use super::AppAuthArgs;

#[derive(Args, Debug)]
pub struct MiniprogramArgs {
    #[command(subcommand)]
    command: MiniprogramCommand,
}

#[derive(Subcommand, Debug)]
pub enum MiniprogramCommand {
    /// 订阅消息
    Subscribe(SubscribeArgs),
    /// 客服消息
    Customer(CustomerArgs),
    /// 上传临时素材
    Upload(UploadArgs),
}

#[derive(Args, Debug)]
pub struct SubscribeArgs {
    #[command(flatten)]
    auth: AppAuthArgs,
    #[arg(short = 'o', long)]
    to_user: String,
    #[arg(short = 'p', long)]
    template_id: String,
    /// 点击后跳转的小程序页面
    #[arg(long)]
    page: Option<String>,
    /// developer, trial, formal
    #[arg(long)]
    miniprogram_state: Option<String>,
    /// zh_CN, en_US, zh_HK, zh_TW
    #[arg(long)]
    lang: Option<String>,
    /// 模板数据，JSON 格式
    #[arg(short = 'd', long)]
    data: String,
}

#[derive(Args, Debug)]
pub struct CustomerArgs {
    #[command(flatten)]
    auth: AppAuthArgs,
    #[arg(short = 'o', long)]
    to_user: String,
    /// text, image, link, miniprogrampage
    #[arg(short = 'm', long)]
    msg_type: String,
    #[arg(short = 'd', long)]
    data: String,
}

#[derive(Args, Debug)]
pub struct UploadArgs {
    #[command(flatten)]
    auth: AppAuthArgs,
    /// image
    #[arg(short = 'y', long = "type", default_value = "image")]
    media_type: String,
    #[arg(short = 'f', long)]
    file: PathBuf,
}

pub async fn execute(args: MiniprogramArgs, ctx: &Context) -> Result<PushResult> {
    let result = match args.command {
        MiniprogramCommand::Subscribe(a) => {
            CmdMiniSendSubscribeParams {
                auth: a.auth.into(),
                to_user: a.to_user,
                template_id: a.template_id,
                page: a.page,
                miniprogram_state: a.miniprogram_state,
                lang: a.lang,
                data: a.data,
            }
            .run(ctx)
            .await?
        }
        MiniprogramCommand::Customer(a) => {
            CmdMiniSendCustomerParams {
                auth: a.auth.into(),
                to_user: a.to_user,
                msg_type: a.msg_type,
                data: a.data,
            }
            .run(ctx)
            .await?
        }
        MiniprogramCommand::Upload(a) => {
            CmdMediaUploadParams {
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
