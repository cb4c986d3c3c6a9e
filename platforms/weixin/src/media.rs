use std::path::Path;

use log::*;
use pmsg_common::{
    ApiResponse, MultipartForm, PushError, ResponseCode, Transport, one_of, send_multipart,
};
use serde::Deserialize;

use crate::API_BASE;

/// 临时素材类型
pub const MEDIA_TYPES: [&str; 4] = ["image", "voice", "video", "thumb"];

/// 上传表单中文件的字段名
pub const MEDIA_FORM_NAME: &str = "media";

#[derive(Debug, Deserialize)]
struct MediaUploadResponse {
    #[serde(flatten)]
    code: ResponseCode,
    #[serde(default)]
    media_id: String,
    #[serde(default)]
    thumb_media_id: String,
}

impl ApiResponse for MediaUploadResponse {
    fn response_code(&self) -> &ResponseCode {
        &self.code
    }
}

pub fn validate_media_type(media_type: &str) -> Result<(), PushError> {
    one_of("media_type", media_type, &MEDIA_TYPES)
}

/// 上传临时素材，返回 media_id
pub async fn upload_media(
    transport: &dyn Transport,
    access_token: &str,
    media_type: &str,
    file: &Path,
) -> Result<String, PushError> {
    validate_media_type(media_type)?;
    let url = format!(
        "{API_BASE}/cgi-bin/media/upload?access_token={token}&type={media_type}",
        token = urlencoding::encode(access_token)
    );
    let form = MultipartForm::new().add_file(MEDIA_FORM_NAME, file);
    let resp: MediaUploadResponse = send_multipart(transport, &url, &form).await?;
    // thumb 类型返回 thumb_media_id
    let media_id = if resp.media_id.is_empty() {
        resp.thumb_media_id
    } else {
        resp.media_id
    };
    if media_id.is_empty() {
        return Err(PushError::DecodeError(
            "upload response has no media_id".to_string(),
        ));
    }
    info!("uploaded {} as {media_type}, media_id={media_id}", file.display());
    Ok(media_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmsg_common::testing::MockTransport;
    use serde_json::json;
    use std::io::Write;

    #[tokio::test]
    async fn test_upload_thumb() {
        let mut file = tempfile::Builder::new().suffix(".jpg").tempfile().unwrap();
        file.write_all(b"jpeg").unwrap();

        let transport = MockTransport::new();
        transport.respond_json(
            200,
            json!({"type": "thumb", "thumb_media_id": "THUMB", "created_at": 1700000000}),
        );

        let media_id = upload_media(&transport, "tok", "thumb", file.path()).await.unwrap();
        assert_eq!(media_id, "THUMB");

        let req = &transport.requests()[0];
        assert!(req.url.ends_with("/cgi-bin/media/upload?access_token=tok&type=thumb"));
        let content_type = req.content_type.as_deref().unwrap();
        assert!(content_type.starts_with("multipart/form-data; boundary="));
        let body = String::from_utf8_lossy(&req.body).to_ascii_lowercase();
        assert!(body.contains("name=\"media\""));
        assert!(body.contains("content-type: image/jpeg"));
    }

    #[tokio::test]
    async fn test_unknown_media_type_is_rejected_before_io() {
        let transport = MockTransport::new();
        let err = upload_media(&transport, "tok", "file", Path::new("a.txt"))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(transport.requests().is_empty());
    }
}
