use crate::error::Result;
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq)]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub attachments: Vec<EmailAttachment>,
}

#[async_trait]
pub trait MailerPort: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<()>;
}

/// Object storage for signature images and damage photos.
#[async_trait]
pub trait MediaStorePort: Send + Sync {
    /// Stores `bytes` under `folder` and returns the URL it can be fetched from.
    async fn put(&self, folder: &str, bytes: &[u8], content_type: &str) -> Result<String>;
}
