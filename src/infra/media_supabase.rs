use super::media::object_key;
use crate::app::ports::MediaStorePort;
use crate::error::{InspectionError, Result};
use async_trait::async_trait;
use tracing::{debug, warn};

/// Uploads media to a Supabase Storage bucket and returns its public URL.
pub struct SupabaseMediaStore {
    client: reqwest::Client,
    base_url: String,
    service_role_key: String,
    bucket: String,
    prefix: String,
}

impl SupabaseMediaStore {
    pub fn new(
        base_url: impl Into<String>,
        service_role_key: impl Into<String>,
        bucket: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_role_key: service_role_key.into(),
            bucket: bucket.into(),
            prefix: prefix.into().trim_matches('/').to_string(),
        }
    }

    fn object_path(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", self.prefix, key)
        }
    }

    pub fn upload_endpoint(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path)
    }

    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, path
        )
    }
}

#[async_trait]
impl MediaStorePort for SupabaseMediaStore {
    async fn put(&self, folder: &str, bytes: &[u8], content_type: &str) -> Result<String> {
        let path = self.object_path(&object_key(folder, bytes, content_type)?);
        let endpoint = self.upload_endpoint(&path);

        // Upsert keeps re-uploads of identical content idempotent
        let resp = self
            .client
            .put(&endpoint)
            .header("Authorization", format!("Bearer {}", self.service_role_key))
            .header("apikey", self.service_role_key.clone())
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "true")
            .body(bytes.to_vec())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("Supabase upload of {} failed with {}", path, status);
            return Err(InspectionError::Media(format!(
                "Supabase upload failed: {status} - {body}"
            )));
        }

        debug!("Uploaded {} bytes to {}", bytes.len(), path);
        Ok(self.public_url(&path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_endpoints_with_prefix() {
        let store = SupabaseMediaStore::new("https://proj.supabase.co/", "key", "inspections", "/prod/");
        let path = store.object_path("signatures/1/ab/abc.png");
        assert_eq!(path, "prod/signatures/1/ab/abc.png");
        assert_eq!(
            store.upload_endpoint(&path),
            "https://proj.supabase.co/storage/v1/object/inspections/prod/signatures/1/ab/abc.png"
        );
        assert_eq!(
            store.public_url(&path),
            "https://proj.supabase.co/storage/v1/object/public/inspections/prod/signatures/1/ab/abc.png"
        );
    }
}
