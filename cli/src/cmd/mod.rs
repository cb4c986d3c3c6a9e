//! 子命令：参数解析后转换为各平台的命令参数

pub mod dingtalk;
pub mod miniprogram;
pub mod offiaccount;
pub mod rabbitmq;
pub mod work;

use clap::Args;
use pmsg_weixin::AppAuth;
use pmsg_wxwork::CorpAuth;

pub use dingtalk::DingtalkArgs;
pub use miniprogram::MiniprogramArgs;
pub use offiaccount::OffiaccountArgs;
pub use rabbitmq::RabbitmqArgs;
pub use work::WorkArgs;

/// 公众号/小程序凭证
#[derive(Args, Debug, Clone)]
pub struct AppAuthArgs {
    /// 接口调用凭证，提供时不再获取
    #[arg(short = 't', long, env = "PMSG_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// appid
    #[arg(short = 'i', long, env = "PMSG_APP_ID")]
    app_id: Option<String>,

    /// app secret
    #[arg(short = 's', long, env = "PMSG_APP_SECRET", hide_env_values = true)]
    app_secret: Option<String>,
}

impl From<AppAuthArgs> for AppAuth {
    fn from(args: AppAuthArgs) -> Self {
        Self {
            access_token: args.access_token,
            app_id: args.app_id,
            app_secret: args.app_secret,
        }
    }
}

/// 企业微信凭证
#[derive(Args, Debug, Clone)]
pub struct CorpAuthArgs {
    /// 接口调用凭证，提供时不再获取
    #[arg(short = 't', long, env = "PMSG_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// 企业ID
    #[arg(short = 'c', long, env = "PMSG_CORP_ID")]
    corp_id: Option<String>,

    /// 应用的凭证密钥
    #[arg(short = 's', long, env = "PMSG_CORP_SECRET", hide_env_values = true)]
    corp_secret: Option<String>,
}

impl From<CorpAuthArgs> for CorpAuth {
    fn from(args: CorpAuthArgs) -> Self {
        Self {
            access_token: args.access_token,
            corp_id: args.corp_id,
            corp_secret: args.corp_secret,
        }
    }
}
