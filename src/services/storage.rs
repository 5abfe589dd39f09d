use anyhow::{anyhow, Result};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::config::StorageConfig;

/// Unsigned uploads to the image CDN.
#[derive(Clone)]
pub struct ImageStorageService {
    client: Client,
    config: StorageConfig,
}

impl ImageStorageService {
    pub fn new(config: StorageConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, config }
    }

    pub fn max_image_bytes(&self) -> usize {
        self.config.max_image_bytes
    }

    fn upload_url(&self) -> String {
        format!("{}/{}/image/upload", self.config.api_url, self.config.cloud_name)
    }

    /// Uploads the image and returns its public https URL.
    pub async fn upload_image(&self, bytes: Vec<u8>, file_name: &str, content_type: &str) -> Result<String> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)?;
        let form = Form::new()
            .part("file", part)
            .text("upload_preset", self.config.upload_preset.clone());

        let response = self.client.post(self.upload_url()).multipart(form).send().await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(anyhow!("Image upload failed: {}", error_text));
        }

        let body: Value = response.json().await?;
        let url = extract_secure_url(&body)?;
        log::info!("Uploaded image {} to {}", file_name, url);
        Ok(url)
    }
}

fn extract_secure_url(body: &Value) -> Result<String> {
    body.get("secure_url")
        .and_then(|v| v.as_str())
        .filter(|url| url.starts_with("https://"))
        .map(|url| url.to_string())
        .ok_or_else(|| anyhow!("No secure_url in upload response"))
}
