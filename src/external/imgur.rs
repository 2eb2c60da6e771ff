use crate::config::ImgurConfig;
use crate::error::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize)]
pub struct ImgurResponse {
    pub data: Option<ImgurImageData>,
    pub success: bool,
    pub status: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImgurImageData {
    pub id: String,
    pub link: String,
    #[serde(default)]
    pub deletehash: Option<String>,
}

/// Imgur 图床适配器：上传二进制图片，返回可长期访问的外链。
/// 上传失败不在本地重试，直接向调用方报 UpstreamUnavailable。
#[derive(Clone)]
pub struct ImgurService {
    client: Client,
    config: ImgurConfig,
}

impl ImgurService {
    pub fn new(config: ImgurConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.upload_timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, config }
    }

    /// 上传图片并返回外链。
    /// 声明的 content type 不是 image/* 时直接拒绝，不发起网络请求。
    pub async fn upload_image(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
        filename: &str,
    ) -> AppResult<String> {
        if !content_type.starts_with("image/") {
            return Err(AppError::ValidationError(format!(
                "Not an image content type: {content_type}"
            )));
        }
        if bytes.is_empty() {
            return Err(AppError::ValidationError("Empty image file".to_string()));
        }

        let url = format!("{}/3/image", self.config.base_url);

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(content_type)
            .map_err(|e| AppError::ValidationError(format!("Invalid content type: {e}")))?;
        let form = reqwest::multipart::Form::new().part("image", part);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Client-ID {}", self.config.client_id),
            )
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                log::error!("Imgur upload request failed: {e}");
                AppError::UpstreamUnavailable(format!("Imgur request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::error!("Imgur upload failed: {status}, Error: {error_text}");
            return Err(AppError::UpstreamUnavailable(format!(
                "Imgur returned {status}"
            )));
        }

        let result: ImgurResponse = response.json().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("Invalid Imgur response: {e}"))
        })?;

        if !result.success {
            return Err(AppError::UpstreamUnavailable(format!(
                "Imgur upload rejected with status {}",
                result.status
            )));
        }

        let data = result
            .data
            .ok_or_else(|| {
                AppError::UpstreamUnavailable("Empty Imgur response data".to_string())
            })?;

        log::info!("Image uploaded to Imgur: {}", data.link);
        Ok(data.link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> ImgurService {
        ImgurService::new(ImgurConfig {
            client_id: "test-client-id".to_string(),
            base_url: "https://api.imgur.com".to_string(),
            upload_timeout_secs: 5,
        })
    }

    #[tokio::test]
    async fn test_rejects_non_image_content_type() {
        let service = test_service();
        let result = service
            .upload_image(vec![1, 2, 3], "text/plain", "notes.txt")
            .await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_rejects_empty_file() {
        let service = test_service();
        let result = service.upload_image(Vec::new(), "image/png", "empty.png").await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }
}
