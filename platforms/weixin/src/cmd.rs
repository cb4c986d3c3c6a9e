//! 命令处理：校验 → 构造消息 → 获取令牌 → 发送 → 分类响应

use std::path::PathBuf;

use log::*;
use pmsg_common::{
    CommandError, Context, MessageKind, PushError, PushResult, Step, StepExt, Validate, non_empty,
    parse_json, require, require_token_or_credential,
};

use crate::customer::{CustomerKind, CustomerMessage, CustomerPayload, send_customer};
use crate::media::{upload_media, validate_media_type};
use crate::miniprogram::{
    MiniCustomerKind, MiniCustomerMessage, MiniCustomerPayload, MiniSubscribe, send_mini_subscribe,
};
use crate::subscribe::{
    OnceContent, OnceData, Subscribe, TemplateSubscribe, send_subscribe, send_template_subscribe,
};
use crate::template::{MiniProgram, Template, send_template};
use crate::token::AppCredential;

/// 令牌或 appid/secret
#[derive(Debug, Clone, Default)]
pub struct AppAuth {
    pub access_token: Option<String>,
    pub app_id: Option<String>,
    pub app_secret: Option<String>,
}

impl AppAuth {
    pub fn validate(&self) -> Result<(), PushError> {
        require_token_or_credential(
            self.access_token.as_deref(),
            self.app_id.as_deref(),
            "access_token",
            "app_id",
        )?;
        if non_empty(self.access_token.clone()).is_none() {
            require("app_secret", self.app_secret.as_deref().unwrap_or_default())?;
        }
        Ok(())
    }

    fn credential(&self) -> AppCredential {
        AppCredential::new(
            self.app_id.clone().unwrap_or_default(),
            self.app_secret.clone().unwrap_or_default(),
        )
    }

    async fn token(&self, ctx: &Context) -> Result<String, CommandError> {
        ctx.access_token(self.access_token.as_deref(), &self.credential())
            .await
    }
}

/// 公众号模板消息
#[derive(Debug, Clone, Default)]
pub struct CmdSendTemplateParams {
    pub auth: AppAuth,
    pub to_user: String,
    pub template_id: String,
    pub url: Option<String>,
    pub mini_app_id: Option<String>,
    pub mini_page_path: Option<String>,
    pub data: String,
    pub color: Option<String>,
    pub client_msg_id: Option<String>,
}

impl CmdSendTemplateParams {
    pub fn validate(&self) -> Result<(), PushError> {
        self.auth.validate()?;
        require("touser", &self.to_user)?;
        require("template_id", &self.template_id)?;
        require("data", &self.data)
    }

    pub fn build(&self) -> Result<Template, PushError> {
        let msg = Template {
            client_msg_id: non_empty(self.client_msg_id.clone()),
            touser: self.to_user.clone(),
            template_id: self.template_id.clone(),
            url: non_empty(self.url.clone()),
            miniprogram: MiniProgram::from_parts(
                self.mini_app_id.clone(),
                self.mini_page_path.clone(),
            ),
            data: parse_json("data", &self.data)?,
            color: non_empty(self.color.clone()),
        };
        msg.validate()?;
        Ok(msg)
    }

    pub async fn run(&self, ctx: &Context) -> Result<PushResult, CommandError> {
        self.validate().at(Step::Validate)?;
        let msg = self.build().at(Step::BuildVariant)?;
        let token = self.auth.token(ctx).await?;
        let msgid = send_template(ctx.transport(), &token, &msg)
            .await
            .map_err(CommandError::dispatch)?;
        Ok(PushResult::ok().with_message_id(msgid))
    }
}

/// 公众号一次性订阅消息
#[derive(Debug, Clone, Default)]
pub struct CmdSendTemplateSubscribeParams {
    pub auth: AppAuth,
    pub to_user: String,
    pub template_id: String,
    pub url: Option<String>,
    pub mini_app_id: Option<String>,
    pub mini_page_path: Option<String>,
    pub scene: String,
    pub title: String,
    pub data: String,
    pub color: Option<String>,
}

impl CmdSendTemplateSubscribeParams {
    pub fn validate(&self) -> Result<(), PushError> {
        self.auth.validate()?;
        require("touser", &self.to_user)?;
        require("template_id", &self.template_id)?;
        require("scene", &self.scene)?;
        require("title", &self.title)
    }

    pub fn build(&self) -> Result<TemplateSubscribe, PushError> {
        let msg = TemplateSubscribe {
            touser: self.to_user.clone(),
            template_id: self.template_id.clone(),
            url: non_empty(self.url.clone()),
            miniprogram: MiniProgram::from_parts(
                self.mini_app_id.clone(),
                self.mini_page_path.clone(),
            ),
            scene: self.scene.clone(),
            title: self.title.clone(),
            data: OnceData {
                content: OnceContent {
                    value: self.data.clone(),
                    color: self.color.clone().unwrap_or_default(),
                },
            },
        };
        msg.validate()?;
        Ok(msg)
    }

    pub async fn run(&self, ctx: &Context) -> Result<PushResult, CommandError> {
        self.validate().at(Step::Validate)?;
        let msg = self.build().at(Step::BuildVariant)?;
        let token = self.auth.token(ctx).await?;
        send_template_subscribe(ctx.transport(), &token, &msg)
            .await
            .map_err(CommandError::dispatch)?;
        Ok(PushResult::ok())
    }
}

/// 公众号订阅通知
#[derive(Debug, Clone, Default)]
pub struct CmdSendSubscribeParams {
    pub auth: AppAuth,
    pub to_user: String,
    pub template_id: String,
    pub page: Option<String>,
    pub mini_app_id: Option<String>,
    pub mini_page_path: Option<String>,
    pub data: String,
}

impl CmdSendSubscribeParams {
    pub fn validate(&self) -> Result<(), PushError> {
        self.auth.validate()?;
        require("touser", &self.to_user)?;
        require("template_id", &self.template_id)?;
        require("data", &self.data)
    }

    pub fn build(&self) -> Result<Subscribe, PushError> {
        let msg = Subscribe {
            touser: self.to_user.clone(),
            template_id: self.template_id.clone(),
            page: non_empty(self.page.clone()),
            miniprogram: MiniProgram::from_parts(
                self.mini_app_id.clone(),
                self.mini_page_path.clone(),
            ),
            data: parse_json("data", &self.data)?,
        };
        msg.validate()?;
        Ok(msg)
    }

    pub async fn run(&self, ctx: &Context) -> Result<PushResult, CommandError> {
        self.validate().at(Step::Validate)?;
        let msg = self.build().at(Step::BuildVariant)?;
        let token = self.auth.token(ctx).await?;
        send_subscribe(ctx.transport(), &token, &msg)
            .await
            .map_err(CommandError::dispatch)?;
        Ok(PushResult::ok())
    }
}

/// 公众号客服消息
#[derive(Debug, Clone, Default)]
pub struct CmdSendCustomerParams {
    pub auth: AppAuth,
    pub to_user: String,
    pub msg_type: String,
    pub data: String,
    pub kf_account: Option<String>,
}

impl CmdSendCustomerParams {
    pub fn validate(&self) -> Result<(), PushError> {
        self.auth.validate()?;
        require("touser", &self.to_user)?;
        CustomerKind::parse(&self.msg_type).map(|_| ())
    }

    pub fn build(&self) -> Result<CustomerMessage, PushError> {
        let kind = CustomerKind::parse(&self.msg_type)?;
        let payload = CustomerPayload::build(kind, &self.data)?;
        let msg = CustomerMessage::new(self.to_user.clone(), payload)
            .with_kf_account(self.kf_account.clone());
        msg.validate()?;
        Ok(msg)
    }

    pub async fn run(&self, ctx: &Context) -> Result<PushResult, CommandError> {
        self.validate().at(Step::Validate)?;
        let msg = self.build().at(Step::BuildVariant)?;
        let token = self.auth.token(ctx).await?;
        send_customer(ctx.transport(), &token, &msg)
            .await
            .map_err(CommandError::dispatch)?;
        Ok(PushResult::ok())
    }
}

/// 小程序订阅消息
#[derive(Debug, Clone, Default)]
pub struct CmdMiniSendSubscribeParams {
    pub auth: AppAuth,
    pub to_user: String,
    pub template_id: String,
    pub page: Option<String>,
    pub miniprogram_state: Option<String>,
    pub lang: Option<String>,
    pub data: String,
}

impl CmdMiniSendSubscribeParams {
    pub fn validate(&self) -> Result<(), PushError> {
        self.auth.validate()?;
        require("touser", &self.to_user)?;
        require("template_id", &self.template_id)?;
        require("data", &self.data)
    }

    pub fn build(&self) -> Result<MiniSubscribe, PushError> {
        let msg = MiniSubscribe {
            touser: self.to_user.clone(),
            template_id: self.template_id.clone(),
            page: non_empty(self.page.clone()),
            data: parse_json("data", &self.data)?,
            miniprogram_state: non_empty(self.miniprogram_state.clone()),
            lang: non_empty(self.lang.clone()),
        };
        msg.validate()?;
        Ok(msg)
    }

    pub async fn run(&self, ctx: &Context) -> Result<PushResult, CommandError> {
        self.validate().at(Step::Validate)?;
        let msg = self.build().at(Step::BuildVariant)?;
        let token = self.auth.token(ctx).await?;
        send_mini_subscribe(ctx.transport(), &token, &msg)
            .await
            .map_err(CommandError::dispatch)?;
        Ok(PushResult::ok())
    }
}

/// 小程序客服消息
#[derive(Debug, Clone, Default)]
pub struct CmdMiniSendCustomerParams {
    pub auth: AppAuth,
    pub to_user: String,
    pub msg_type: String,
    pub data: String,
}

impl CmdMiniSendCustomerParams {
    pub fn validate(&self) -> Result<(), PushError> {
        self.auth.validate()?;
        require("touser", &self.to_user)?;
        MiniCustomerKind::parse(&self.msg_type).map(|_| ())
    }

    pub fn build(&self) -> Result<MiniCustomerMessage, PushError> {
        let kind = MiniCustomerKind::parse(&self.msg_type)?;
        let payload = MiniCustomerPayload::build(kind, &self.data)?;
        let msg = MiniCustomerMessage::new(self.to_user.clone(), payload);
        msg.validate()?;
        Ok(msg)
    }

    pub async fn run(&self, ctx: &Context) -> Result<PushResult, CommandError> {
        self.validate().at(Step::Validate)?;
        let msg = self.build().at(Step::BuildVariant)?;
        let token = self.auth.token(ctx).await?;
        send_customer(ctx.transport(), &token, &msg)
            .await
            .map_err(CommandError::dispatch)?;
        Ok(PushResult::ok())
    }
}

/// 上传临时素材
#[derive(Debug, Clone, Default)]
pub struct CmdMediaUploadParams {
    pub auth: AppAuth,
    pub media_type: String,
    pub file: PathBuf,
}

impl CmdMediaUploadParams {
    pub fn validate(&self) -> Result<(), PushError> {
        self.auth.validate()?;
        validate_media_type(&self.media_type)?;
        if self.file.as_os_str().is_empty() {
            return Err(PushError::missing("file"));
        }
        Ok(())
    }

    pub async fn run(&self, ctx: &Context) -> Result<PushResult, CommandError> {
        self.validate().at(Step::Validate)?;
        let token = self.auth.token(ctx).await?;
        debug!("uploading {} as {}", self.file.display(), self.media_type);
        let media_id = upload_media(ctx.transport(), &token, &self.media_type, &self.file)
            .await
            .map_err(CommandError::dispatch)?;
        Ok(PushResult::ok().with_media_id(Some(media_id)))
    }
}
