use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use log::*;
use pmsg_common::{Context, TransportConfig};

mod cmd;

use cmd::{DingtalkArgs, MiniprogramArgs, OffiaccountArgs, RabbitmqArgs, WorkArgs};

/// 向微信公众号、小程序、企业微信、钉钉和 RabbitMQ 发送消息
///
///   pmsg offiaccount template --app-id ID --app-secret SECRET --to-user OPENID \
///        --template-id TID --data '{"first":{"value":"hi"}}'
///   pmsg work bot --key KEY --msg-type markdown --data '**done**'
///   pmsg dingtalk bot --access-token TOKEN --secret SEC --msg-type text --data hello
#[derive(Parser, Debug)]
#[command(name = "pmsg", version, propagate_version = true)]
pub struct Cli {
    /// 日志更详细 (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// 只输出错误
    #[arg(short, long, global = true)]
    quiet: bool,

    /// HTTP User-Agent
    #[arg(long, env = "PMSG_USER_AGENT", global = true, value_name = "UA")]
    user_agent: Option<String>,

    /// HTTP 超时（秒）
    #[arg(long, env = "PMSG_TIMEOUT", global = true, default_value_t = 30, value_name = "SECS")]
    timeout: u64,

    #[command(subcommand)]
    command: Platform,
}

#[derive(Subcommand, Debug)]
pub enum Platform {
    /// 微信公众号
    Offiaccount(OffiaccountArgs),
    /// 微信小程序
    Miniprogram(MiniprogramArgs),
    /// 企业微信
    Work(WorkArgs),
    /// 钉钉
    Dingtalk(DingtalkArgs),
    /// RabbitMQ
    Rabbitmq(RabbitmqArgs),
}

fn log_filter(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

impl Cli {
    fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            user_agent: self.user_agent.clone(),
            timeout: Duration::from_secs(self.timeout),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(
        env_logger::Env::new().default_filter_or(log_filter(cli.verbose, cli.quiet)),
    )
    .init();

    let config = cli.transport_config();
    debug!("user agent: {}", config.user_agent());
    let ctx = Context::http(&config).context("failed to create http client")?;

    let result = match cli.command {
        Platform::Offiaccount(args) => cmd::offiaccount::execute(args, &ctx).await?,
        Platform::Miniprogram(args) => cmd::miniprogram::execute(args, &ctx).await?,
        Platform::Work(args) => cmd::work::execute(args, &ctx).await?,
        Platform::Dingtalk(args) => cmd::dingtalk::execute(args, &ctx).await?,
        Platform::Rabbitmq(args) => cmd::rabbitmq::execute(args).await?,
    };
    println!("{result}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_log_filter() {
        assert_eq!(log_filter(0, false), "warn");
        assert_eq!(log_filter(1, false), "info");
        assert_eq!(log_filter(3, false), "debug");
        assert_eq!(log_filter(2, true), "error");
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "pmsg",
            "work",
            "bot",
            "--key",
            "K",
            "--msg-type",
            "text",
            "--data",
            "hi",
            "--timeout",
            "5",
            "--user-agent",
            "ci/1.0",
        ])
        .unwrap();
        let config = cli.transport_config();
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.user_agent(), "ci/1.0");
    }

    #[test]
    fn test_missing_platform_command() {
        assert!(Cli::try_parse_from(["pmsg", "dingtalk"]).is_err());
    }

    #[test]
    fn test_command_error_report_has_no_duplicate_cause() {
        use pmsg_common::{CommandError, PushError, Step};

        let err = anyhow::Error::from(CommandError::new(
            Step::Validate,
            PushError::missing("touser"),
        ));
        let report = format!("{err:?}");
        assert!(report.starts_with("validate failed: invalid touser: is required"));
        assert!(!report.contains("Caused by"));
    }
}
