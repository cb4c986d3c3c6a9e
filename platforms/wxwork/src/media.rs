use std::path::Path;

use log::*;
use pmsg_common::{
    ApiResponse, MultipartForm, PushError, ResponseCode, Transport, one_of, send_multipart,
};
use serde::Deserialize;

use crate::API_BASE;

/// 临时素材类型
pub const MEDIA_TYPES: [&str; 4] = ["image", "voice", "video", "file"];

#[derive(Debug, Deserialize)]
struct MediaUploadResponse {
    #[serde(flatten)]
    code: ResponseCode,
    #[serde(default)]
    media_id: String,
}

impl ApiResponse for MediaUploadResponse {
    fn response_code(&self) -> &ResponseCode {
        &self.code
    }
}

pub fn validate_media_type(media_type: &str) -> Result<(), PushError> {
    one_of("media_type", media_type, &MEDIA_TYPES)
}

/// 上传临时素材，3天内有效
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
    let form = MultipartForm::new().add_file("media", file);
    let resp: MediaUploadResponse = send_multipart(transport, &url, &form).await?;
    if resp.media_id.is_empty() {
        return Err(PushError::DecodeError(
            "upload response has no media_id".to_string(),
        ));
    }
    info!("uploaded {}, media_id={}", file.display(), resp.media_id);
    Ok(resp.media_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmsg_common::testing::MockTransport;
    use serde_json::json;
    use std::io::Write;

    #[tokio::test]
    async fn test_upload_file() {
        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        file.write_all(b"%PDF-1.4").unwrap();

        let transport = MockTransport::new();
        transport.respond_json(
            200,
            json!({"errcode": 0, "errmsg": "", "type": "file", "media_id": "MEDIA", "created_at": "1380000000"}),
        );
        let media_id = upload_media(&transport, "tok", "file", file.path()).await.unwrap();
        assert_eq!(media_id, "MEDIA");

        let req = &transport.requests()[0];
        assert!(req.url.ends_with("&type=file"));
        assert!(String::from_utf8_lossy(&req.body).contains("%PDF-1.4"));
    }

    #[tokio::test]
    async fn test_missing_file_fails_before_request() {
        let transport = MockTransport::new();
        let err = upload_media(&transport, "tok", "image", Path::new("/no/such/file.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, PushError::IoError { .. }));
        assert!(transport.requests().is_empty());
    }
}
