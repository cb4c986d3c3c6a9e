use std::path::PathBuf;

use pmsg_common::{
    CommandError, Context, MessageKind, PushError, PushResult, Step, StepExt, Validate, non_empty,
    require, require_token_or_credential,
};

use crate::app::{AppKind, AppMessage, AppPayload, send_app};
use crate::bot::{BotKind, BotPayload, WxWorkBotConfig, WxWorkBotPayload, send_bot};
use crate::customer::{CustomerKind, CustomerMessage, CustomerPayload, send_customer};
use crate::media::{upload_media, validate_media_type};
use crate::token::CorpCredential;

/// 令牌或企业ID/应用Secret
#[derive(Debug, Clone, Default)]
pub struct CorpAuth {
    pub access_token: Option<String>,
    pub corp_id: Option<String>,
    pub corp_secret: Option<String>,
}

impl CorpAuth {
    pub fn validate(&self) -> Result<(), PushError> {
        require_token_or_credential(
            self.access_token.as_deref(),
            self.corp_id.as_deref(),
            "access_token",
            "corp_id",
        )?;
        if non_empty(self.access_token.clone()).is_none() {
            require("corp_secret", self.corp_secret.as_deref().unwrap_or_default())?;
        }
        Ok(())
    }

    async fn token(&self, ctx: &Context) -> Result<String, CommandError> {
        let credential = CorpCredential::new(
            self.corp_id.clone().unwrap_or_default(),
            self.corp_secret.clone().unwrap_or_default(),
        );
        ctx.access_token(self.access_token.as_deref(), &credential)
            .await
    }
}

/// 微信客服消息
#[derive(Debug, Clone, Default)]
pub struct CmdWorkSendCustomerParams {
    pub auth: CorpAuth,
    pub to_user: String,
    pub open_kfid: String,
    pub msg_id: Option<String>,
    pub msg_type: String,
    pub data: String,
}

impl CmdWorkSendCustomerParams {
    pub fn validate(&self) -> Result<(), PushError> {
        self.auth.validate()?;
        require("touser", &self.to_user)?;
        require("open_kfid", &self.open_kfid)?;
        CustomerKind::parse(&self.msg_type).map(|_| ())
    }

    pub fn build(&self) -> Result<CustomerMessage, PushError> {
        let kind = CustomerKind::parse(&self.msg_type)?;
        let payload = CustomerPayload::build(kind, &self.data)?;
        let msg = CustomerMessage::new(self.to_user.clone(), self.open_kfid.clone(), payload)
            .with_msgid(self.msg_id.clone());
        msg.validate()?;
        Ok(msg)
    }

    pub async fn run(&self, ctx: &Context) -> Result<PushResult, CommandError> {
        self.validate().at(Step::Validate)?;
        let msg = self.build().at(Step::BuildVariant)?;
        let token = self.auth.token(ctx).await?;
        let msgid = send_customer(ctx.transport(), &token, &msg)
            .await
            .map_err(CommandError::dispatch)?;
        Ok(PushResult::ok().with_message_id(msgid))
    }
}

/// 应用消息
#[derive(Debug, Clone, Default)]
pub struct CmdWorkSendAppParams {
    pub auth: CorpAuth,
    pub to_user: Option<String>,
    pub to_party: Option<String>,
    pub to_tag: Option<String>,
    pub agent_id: i64,
    pub msg_type: String,
    pub data: String,
    pub safe: bool,
    pub enable_id_trans: bool,
    pub enable_duplicate_check: bool,
    pub duplicate_check_interval: Option<u32>,
}

impl CmdWorkSendAppParams {
    pub fn validate(&self) -> Result<(), PushError> {
        self.auth.validate()?;
        if self.agent_id <= 0 {
            return Err(PushError::missing("agentid"));
        }
        AppKind::parse(&self.msg_type).map(|_| ())
    }

    pub fn build(&self) -> Result<AppMessage, PushError> {
        let kind = AppKind::parse(&self.msg_type)?;
        let payload = AppPayload::build(kind, &self.data)?;
        let mut msg = AppMessage::new(self.agent_id, payload);
        msg.touser = non_empty(self.to_user.clone());
        msg.toparty = non_empty(self.to_party.clone());
        msg.totag = non_empty(self.to_tag.clone());
        msg.safe = self.safe;
        msg.enable_id_trans = self.enable_id_trans;
        msg.enable_duplicate_check = self.enable_duplicate_check;
        msg.duplicate_check_interval = self.duplicate_check_interval;
        msg.validate()?;
        Ok(msg)
    }

    pub async fn run(&self, ctx: &Context) -> Result<PushResult, CommandError> {
        self.validate().at(Step::Validate)?;
        let msg = self.build().at(Step::BuildVariant)?;
        let token = self.auth.token(ctx).await?;
        let resp = send_app(ctx.transport(), &token, &msg)
            .await
            .map_err(CommandError::dispatch)?;
        Ok(PushResult::ok().with_message_id(resp.msgid))
    }
}

/// 群机器人消息
#[derive(Debug, Clone, Default)]
pub struct CmdWorkSendBotParams {
    pub key: String,
    pub msg_type: String,
    pub data: String,
    pub mentioned_list: Vec<String>,
    pub mentioned_mobile_list: Vec<String>,
}

impl CmdWorkSendBotParams {
    pub fn validate(&self) -> Result<(), PushError> {
        require("key", &self.key)?;
        BotKind::parse(&self.msg_type).map(|_| ())
    }

    pub fn build(&self) -> Result<WxWorkBotPayload, PushError> {
        let kind = BotKind::parse(&self.msg_type)?;
        let payload = BotPayload::build(
            kind,
            &self.data,
            self.mentioned_list.clone(),
            self.mentioned_mobile_list.clone(),
        )?;
        Ok(WxWorkBotPayload::new(payload))
    }

    pub async fn run(&self, ctx: &Context) -> Result<PushResult, CommandError> {
        self.validate().at(Step::Validate)?;
        let msg = self.build().at(Step::BuildVariant)?;
        let config = WxWorkBotConfig {
            key: self.key.clone(),
        };
        send_bot(ctx.transport(), &config, &msg)
            .await
            .map_err(CommandError::dispatch)?;
        Ok(PushResult::ok())
    }
}

/// 上传临时素材
#[derive(Debug, Clone, Default)]
pub struct CmdWorkMediaUploadParams {
    pub auth: CorpAuth,
    pub media_type: String,
    pub file: PathBuf,
}

impl CmdWorkMediaUploadParams {
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
        let media_id = upload_media(ctx.transport(), &token, &self.media_type, &self.file)
            .await
            .map_err(CommandError::dispatch)?;
        Ok(PushResult::ok().with_media_id(Some(media_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmsg_common::testing::{Method, MockTransport};
    use serde_json::json;
    use std::sync::Arc;

    fn token_auth() -> CorpAuth {
        CorpAuth {
            access_token: Some("tok".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_send_text_customer_message() {
        let transport = Arc::new(MockTransport::new());
        transport.respond_json(200, json!({"errcode": 0, "msgid": 123}));
        let ctx = Context::new(transport.clone());

        let params = CmdWorkSendCustomerParams {
            auth: token_auth(),
            to_user: "U1".to_string(),
            open_kfid: "kf1".to_string(),
            msg_id: None,
            msg_type: "text".to_string(),
            data: "hello".to_string(),
        };
        let result = params.run(&ctx).await.unwrap();
        assert_eq!(result.message_id.as_deref(), Some("123"));

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::Post);
        assert_eq!(
            requests[0].url,
            "https://qyapi.weixin.qq.com/cgi-bin/kf/send_msg?access_token=tok"
        );
        let body = requests[0].json();
        assert_eq!(body["touser"], "U1");
        assert_eq!(body["msgtype"], "text");
        assert_eq!(body["text"], json!({"content": "hello"}));
        assert!(body.get("msgid").is_none());
        assert!(body.get("image").is_none());
    }

    #[tokio::test]
    async fn test_unknown_kind_is_rejected_without_io() {
        let transport = Arc::new(MockTransport::new());
        let ctx = Context::new(transport.clone());

        for msg_type in ["music", "", "TEXT"] {
            let params = CmdWorkSendCustomerParams {
                auth: token_auth(),
                to_user: "U1".to_string(),
                open_kfid: "kf1".to_string(),
                msg_type: msg_type.to_string(),
                data: "hello".to_string(),
                ..Default::default()
            };
            let err = params.run(&ctx).await.unwrap_err();
            assert_eq!(err.step, Step::Validate);
            assert!(err.error.is_validation());
        }
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_app_message_fetches_corp_token() {
        let transport = Arc::new(MockTransport::new());
        transport.respond_json(
            200,
            json!({"errcode": 0, "errmsg": "ok", "access_token": "CORP", "expires_in": 7200}),
        );
        transport.respond_json(200, json!({"errcode": 0, "errmsg": "ok", "msgid": "M1"}));
        let ctx = Context::new(transport.clone());

        let params = CmdWorkSendAppParams {
            auth: CorpAuth {
                access_token: None,
                corp_id: Some("ww1".to_string()),
                corp_secret: Some("s".to_string()),
            },
            to_user: Some("@all".to_string()),
            agent_id: 1000002,
            msg_type: "text".to_string(),
            data: "hi".to_string(),
            ..Default::default()
        };
        let result = params.run(&ctx).await.unwrap();
        assert_eq!(result.message_id.as_deref(), Some("M1"));

        let requests = transport.requests();
        assert_eq!(requests[0].method, Method::Get);
        assert!(requests[0].url.contains("/cgi-bin/gettoken?corpid=ww1"));
        assert!(requests[1].url.ends_with("/cgi-bin/message/send?access_token=CORP"));
    }

    #[tokio::test]
    async fn test_bot_needs_no_token() {
        let transport = Arc::new(MockTransport::new());
        transport.respond_json(200, json!({"errcode": 0, "errmsg": "ok"}));
        let ctx = Context::new(transport.clone());

        let params = CmdWorkSendBotParams {
            key: "KEY".to_string(),
            msg_type: "markdown".to_string(),
            data: "**done**".to_string(),
            ..Default::default()
        };
        params.run(&ctx).await.unwrap();
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_bot_without_key() {
        let transport = Arc::new(MockTransport::new());
        let ctx = Context::new(transport.clone());

        let params = CmdWorkSendBotParams {
            msg_type: "text".to_string(),
            data: "x".to_string(),
            ..Default::default()
        };
        let err = params.run(&ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "validate failed: invalid key: is required");
    }

    #[tokio::test]
    async fn test_corp_id_without_secret_fails_validation() {
        let transport = Arc::new(MockTransport::new());
        let ctx = Context::new(transport.clone());

        let params = CmdWorkSendCustomerParams {
            auth: CorpAuth {
                corp_id: Some("ww1".to_string()),
                ..Default::default()
            },
            to_user: "U1".to_string(),
            open_kfid: "kf1".to_string(),
            msg_type: "text".to_string(),
            data: "hello".to_string(),
            ..Default::default()
        };
        let err = params.run(&ctx).await.unwrap_err();
        assert_eq!(err.step, Step::Validate);
        assert_eq!(err.error.to_string(), "invalid corp_secret: is required");
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_explicit_token_is_url_encoded() {
        let transport = Arc::new(MockTransport::new());
        transport.respond_json(200, json!({"errcode": 0, "msgid": "m"}));
        let ctx = Context::new(transport.clone());

        let params = CmdWorkSendCustomerParams {
            auth: CorpAuth {
                access_token: Some("a b&c=d".to_string()),
                ..Default::default()
            },
            to_user: "U1".to_string(),
            open_kfid: "kf1".to_string(),
            msg_type: "text".to_string(),
            data: "hello".to_string(),
            ..Default::default()
        };
        params.run(&ctx).await.unwrap();
        assert_eq!(
            transport.requests()[0].url,
            "https://qyapi.weixin.qq.com/cgi-bin/kf/send_msg?access_token=a%20b%26c%3Dd"
        );
    }
}
