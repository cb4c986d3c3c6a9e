use std::collections::BTreeMap;

use log::*;
use pmsg_common::{
    ApiResponse, PushError, ResponseCode, Transport, Validate, de_opt_id, require, send_json,
};
use serde::{Deserialize, Serialize};

use crate::API_BASE;

/// 跳小程序所需数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiniProgram {
    /// 所需跳转到的小程序appid，必须与发消息的公众号已关联
    pub appid: String,
    /// 小程序页面路径，支持带参数（index?foo=bar）
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pagepath: String,
}

impl MiniProgram {
    /// appid 为空时视为不跳转
    pub fn from_parts(app_id: Option<String>, page_path: Option<String>) -> Option<Self> {
        let appid = app_id.filter(|s| !s.trim().is_empty())?;
        Some(Self {
            appid,
            pagepath: page_path.unwrap_or_default(),
        })
    }
}

/// 模版内某个 .DATA 的值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDataItem {
    pub value: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub color: String,
}

pub type TemplateData = BTreeMap<String, TemplateDataItem>;

/// 模板消息
///
/// url 和 miniprogram 都是可选字段，都不传则模板无跳转；都传时优先跳转小程序，
/// 客户端不支持小程序时跳转 url。
#[derive(Debug, Clone, Serialize)]
pub struct Template {
    /// 防重入id，同一个 openid + client_msg_id 10分钟内只发送一条
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_msg_id: Option<String>,
    pub touser: String,
    pub template_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub miniprogram: Option<MiniProgram>,
    pub data: TemplateData,
    /// 模板内容字体颜色，不填默认为黑色
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Validate for Template {
    fn validate(&self) -> Result<(), PushError> {
        require("touser", &self.touser)?;
        require("template_id", &self.template_id)?;
        if self.data.is_empty() {
            return Err(PushError::missing("data"));
        }
        if let Some(mp) = &self.miniprogram {
            require("miniprogram.appid", &mp.appid)?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct TemplateSendResponse {
    #[serde(flatten)]
    code: ResponseCode,
    #[serde(default, deserialize_with = "de_opt_id")]
    msgid: Option<String>,
}

impl ApiResponse for TemplateSendResponse {
    fn response_code(&self) -> &ResponseCode {
        &self.code
    }
}

/// 发送模板消息，返回消息id
pub async fn send_template(
    transport: &dyn Transport,
    access_token: &str,
    msg: &Template,
) -> Result<Option<String>, PushError> {
    let url = format!(
        "{API_BASE}/cgi-bin/message/template/send?access_token={token}",
        token = urlencoding::encode(access_token)
    );
    let resp: TemplateSendResponse = send_json(transport, &url, msg).await?;
    debug!("template message sent to {}, msgid={:?}", msg.touser, resp.msgid);
    Ok(resp.msgid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmsg_common::testing::MockTransport;
    use serde_json::json;

    fn template() -> Template {
        let mut data = TemplateData::new();
        data.insert(
            "first".to_string(),
            TemplateDataItem {
                value: "hello".to_string(),
                color: String::new(),
            },
        );
        Template {
            client_msg_id: None,
            touser: "oUser".to_string(),
            template_id: "tpl".to_string(),
            url: None,
            miniprogram: MiniProgram::from_parts(Some("wxmini".to_string()), None),
            data,
            color: None,
        }
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let value = serde_json::to_value(template()).unwrap();
        assert_eq!(
            value,
            json!({
                "touser": "oUser",
                "template_id": "tpl",
                "miniprogram": {"appid": "wxmini"},
                "data": {"first": {"value": "hello"}}
            })
        );
    }

    #[test]
    fn test_validate_names_missing_field() {
        let mut msg = template();
        msg.data.clear();
        assert_eq!(msg.validate().unwrap_err().to_string(), "invalid data: is required");

        let mut msg = template();
        msg.template_id.clear();
        assert_eq!(
            msg.validate().unwrap_err().to_string(),
            "invalid template_id: is required"
        );
    }

    #[tokio::test]
    async fn test_send_template_returns_msgid() {
        let transport = MockTransport::new();
        transport.respond_json(200, json!({"errcode": 0, "errmsg": "ok", "msgid": 200228332}));

        let msgid = send_template(&transport, "tok", &template()).await.unwrap();
        assert_eq!(msgid.as_deref(), Some("200228332"));

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].url,
            "https://api.weixin.qq.com/cgi-bin/message/template/send?access_token=tok"
        );
        assert_eq!(requests[0].json()["touser"], "oUser");
    }
}
