use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use http_body_util::BodyExt;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};

use crate::PushError;

/// 只用于生成请求体，请求不会被发出
const ENCODE_URL: &str = "http://localhost/";

#[derive(Debug, Clone)]
enum FileSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone)]
struct FilePart {
    file_name: String,
    source: FileSource,
}

impl FilePart {
    async fn bytes(&self) -> Result<Vec<u8>, PushError> {
        match &self.source {
            FileSource::Path(path) => {
                tokio::fs::read(path)
                    .await
                    .map_err(|source| PushError::IoError {
                        path: path.clone(),
                        source,
                    })
            }
            FileSource::Bytes(bytes) => Ok(bytes.clone()),
        }
    }

    async fn into_part(&self) -> Result<Part, PushError> {
        let bytes = self.bytes().await?;
        let mime = mime_guess::from_path(&self.file_name).first_or_octet_stream();
        Part::bytes(bytes)
            .file_name(sanitize_file_name(&self.file_name))
            .mime_str(mime.essence_str())
            .map_err(|e| PushError::ConfigError(format!("invalid mime type {mime}: {e}")))
    }
}

/// 文件名中的控制字符会破坏分段头，替换为 `_`
fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_control() { '_' } else { c })
        .collect()
}

/// 编码后的表单
#[derive(Debug, Clone)]
pub struct EncodedForm {
    /// `multipart/form-data; boundary=...`
    pub content_type: String,
    pub body: Vec<u8>,
}

/// 保存文件或其他字段信息
///
/// 同一个表单名只保留最后添加的文件；字段名可以重复，每个值生成一个分段。
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    files: BTreeMap<String, FilePart>,
    params: BTreeMap<String, Vec<String>>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加本地文件，编码时才读取
    pub fn add_file(mut self, form_name: impl Into<String>, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        self.files.insert(
            form_name.into(),
            FilePart {
                file_name,
                source: FileSource::Path(path.to_path_buf()),
            },
        );
        self
    }

    /// 添加内存中的文件内容
    pub fn add_file_bytes(
        mut self,
        form_name: impl Into<String>,
        file_name: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        self.files.insert(
            form_name.into(),
            FilePart {
                file_name: file_name.into(),
                source: FileSource::Bytes(bytes.into()),
            },
        );
        self
    }

    pub fn add_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.entry(key.into()).or_default().push(value.into());
        self
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn param_count(&self) -> usize {
        self.params.values().map(Vec::len).sum()
    }

    /// 转换为 reqwest 表单，文件在这里读取
    pub async fn to_form(&self) -> Result<Form, PushError> {
        let mut form = Form::new();
        for (form_name, file) in &self.files {
            form = form.part(form_name.clone(), file.into_part().await?);
        }
        for (key, values) in &self.params {
            for value in values {
                form = form.text(key.clone(), value.clone());
            }
        }
        Ok(form)
    }

    /// 编码为完整的请求体，boundary 由 reqwest 生成
    pub async fn encode(&self) -> Result<EncodedForm, PushError> {
        let form = self.to_form().await?;
        let encode_err = |e: reqwest::Error| {
            PushError::ConfigError(format!("encode multipart form failed: {}", e.without_url()))
        };
        let mut request = Client::builder()
            .build()
            .and_then(|client| client.post(ENCODE_URL).multipart(form).build())
            .map_err(encode_err)?;

        let content_type = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                PushError::ConfigError("multipart request has no content type".to_string())
            })?;
        let body = match request.body_mut().take() {
            Some(body) => body.collect().await.map_err(encode_err)?.to_bytes().to_vec(),
            None => Vec::new(),
        };

        Ok(EncodedForm { content_type, body })
    }
}
