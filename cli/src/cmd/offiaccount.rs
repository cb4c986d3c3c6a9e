use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use pmsg_common::{Context, PushResult};
use pmsg_weixin::{
    CmdMediaUploadParams, CmdSendCustomerParams, CmdSendSubscribeParams, CmdSendTemplateParams,
    CmdSendTemplateSubscribeParams,
};

use super::AppAuthArgs;

#[derive(Args, Debug)]
pub struct OffiaccountArgs {
    #[command(subcommand)]
    command: OffiaccountCommand,
}

#[derive(Subcommand, Debug)]
pub enum OffiaccountCommand {
    /// 模板消息
    Template(TemplateArgs),
    /// 一次性订阅消息
    TemplateSubscribe(TemplateSubscribeArgs),
    /// 订阅通知
    Subscribe(SubscribeArgs),
    /// 客服消息
    Customer(CustomerArgs),
    /// 上传临时素材
    Upload(UploadArgs),
}

#[derive(Args, Debug)]
pub struct TemplateArgs {
    #[command(flatten)]
    auth: AppAuthArgs,
    /// 接收者 openid
    #[arg(short = 'o', long)]
    to_user: String,
    #[arg(short = 'p', long)]
    template_id: String,
    /// 模板跳转链接
    #[arg(long)]
    url: Option<String>,
    /// 跳转小程序 appid
    #[arg(long)]
    mini_app_id: Option<String>,
    #[arg(long)]
    mini_page_path: Option<String>,
    /// 模板数据，JSON 格式
    #[arg(short = 'd', long)]
    data: String,
    /// 模板内容字体颜色
    #[arg(long)]
    color: Option<String>,
    /// 防重入 id
    #[arg(long)]
    client_msg_id: Option<String>,
}

#[derive(Args, Debug)]
pub struct TemplateSubscribeArgs {
    #[command(flatten)]
    auth: AppAuthArgs,
    #[arg(short = 'o', long)]
    to_user: String,
    #[arg(short = 'p', long)]
    template_id: String,
    #[arg(long)]
    url: Option<String>,
    #[arg(long)]
    mini_app_id: Option<String>,
    #[arg(long)]
    mini_page_path: Option<String>,
    /// 订阅场景值，0 到 10000
    #[arg(long)]
    scene: String,
    /// 消息标题，15 字以内
    #[arg(long)]
    title: String,
    /// 消息正文
    #[arg(short = 'd', long)]
    data: String,
    #[arg(long)]
    color: Option<String>,
}

#[derive(Args, Debug)]
pub struct SubscribeArgs {
    #[command(flatten)]
    auth: AppAuthArgs,
    #[arg(short = 'o', long)]
    to_user: String,
    #[arg(short = 'p', long)]
    template_id: String,
    /// 跳转网页
    #[arg(long)]
    page: Option<String>,
    #[arg(long)]
    mini_app_id: Option<String>,
    #[arg(long)]
    mini_page_path: Option<String>,
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
    /// text, image, voice, video, music, news, mpnews, mpnewsarticle, msgmenu, wxcard, miniprogrampage
    #[arg(short = 'm', long)]
    msg_type: String,
    /// 消息内容，text 为原文，其余类型为 JSON 或 media_id
    #[arg(short = 'd', long)]
    data: String,
    /// 以某个客服帐号发送
    #[arg(long)]
    kf_account: Option<String>,
}

#[derive(Args, Debug)]
pub struct UploadArgs {
    #[command(flatten)]
    auth: AppAuthArgs,
    /// image, voice, video, thumb
    #[arg(short = 'y', long = "type")]
    media_type: String,
    #[arg(short = 'f', long)]
    file: PathBuf,
}

pub async fn execute(args: OffiaccountArgs, ctx: &Context) -> Result<PushResult> {
    let result = match args.command {
        OffiaccountCommand::Template(a) => {
            CmdSendTemplateParams {
                auth: a.auth.into(),
                to_user: a.to_user,
                template_id: a.template_id,
                url: a.url,
                mini_app_id: a.mini_app_id,
                mini_page_path: a.mini_page_path,
                data: a.data,
                color: a.color,
                client_msg_id: a.client_msg_id,
            }
            .run(ctx)
            .await?
        }
        OffiaccountCommand::TemplateSubscribe(a) => {
            CmdSendTemplateSubscribeParams {
                auth: a.auth.into(),
                to_user: a.to_user,
                template_id: a.template_id,
                url: a.url,
                mini_app_id: a.mini_app_id,
                mini_page_path: a.mini_page_path,
                scene: a.scene,
                title: a.title,
                data: a.data,
                color: a.color,
            }
            .run(ctx)
            .await?
        }
        OffiaccountCommand::Subscribe(a) => {
            CmdSendSubscribeParams {
                auth: a.auth.into(),
                to_user: a.to_user,
                template_id: a.template_id,
                page: a.page,
                mini_app_id: a.mini_app_id,
                mini_page_path: a.mini_page_path,
                data: a.data,
            }
            .run(ctx)
            .await?
        }
        OffiaccountCommand::Customer(a) => {
            CmdSendCustomerParams {
                auth: a.auth.into(),
                to_user: a.to_user,
                msg_type: a.msg_type,
                data: a.data,
                kf_account: a.kf_account,
            }
            .run(ctx)
            .await?
        }
        OffiaccountCommand::Upload(a) => {
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
