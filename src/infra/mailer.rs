use crate::app::ports::{MailerPort, OutgoingEmail};
use crate::error::{InspectionError, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

const SENDGRID_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";

/// Delivers mail through the SendGrid v3 HTTP API.
pub struct SendGridMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    from: String,
}

impl SendGridMailer {
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: SENDGRID_ENDPOINT.to_string(),
            api_key: api_key.into(),
            from: from.into(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn payload(&self, email: &OutgoingEmail) -> serde_json::Value {
        let attachments: Vec<serde_json::Value> = email
            .attachments
            .iter()
            .map(|a| {
                json!({
                    "content": STANDARD.encode(&a.bytes),
                    "filename": a.filename,
                    "type": a.content_type,
                    "disposition": "attachment",
                })
            })
            .collect();

        let mut payload = json!({
            "personalizations": [{ "to": [{ "email": email.to }] }],
            "from": { "email": self.from },
            "subject": email.subject,
            "content": [{ "type": "text/html", "value": email.html_body }],
        });
        if !attachments.is_empty() {
            payload["attachments"] = serde_json::Value::Array(attachments);
        }
        payload
    }
}

#[async_trait]
impl MailerPort for SendGridMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.payload(email))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(InspectionError::Mail(format!(
                "SendGrid responded {status}: {body}"
            )));
        }
        info!(to = %email.to, subject = %email.subject, "Email sent");
        Ok(())
    }
}

/// Used when no mail provider is configured: logs the message instead of sending it.
#[derive(Default)]
pub struct LogMailer;

#[async_trait]
impl MailerPort for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        warn!(
            to = %email.to,
            subject = %email.subject,
            attachments = email.attachments.len(),
            "No mail provider configured; email not delivered"
        );
        Ok(())
    }
}

/// Keeps every message in memory. Handy for tests and local runs.
#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<OutgoingEmail>>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MailerPort for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        self.sent
            .lock()
            .map_err(|_| InspectionError::Mail("recording mailer lock poisoned".to_string()))?
            .push(email.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::EmailAttachment;
    use axum::{http::HeaderMap, http::StatusCode, routing::post, Router};

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            to: "guest@example.com".to_string(),
            subject: "Golf Cart Inspection #12".to_string(),
            html_body: "<p>Hi</p>".to_string(),
            attachments: vec![EmailAttachment {
                filename: "report.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                bytes: b"%PDF".to_vec(),
            }],
        }
    }

    #[test]
    fn sendgrid_payload_encodes_attachments() {
        let mailer = SendGridMailer::new("key", "inspections@example.com");
        let payload = mailer.payload(&email());
        assert_eq!(payload["personalizations"][0]["to"][0]["email"], "guest@example.com");
        assert_eq!(payload["from"]["email"], "inspections@example.com");
        assert_eq!(payload["attachments"][0]["content"], "JVBERg==");
        assert_eq!(payload["attachments"][0]["disposition"], "attachment");
    }

    #[tokio::test]
    async fn recording_mailer_keeps_messages() {
        let mailer = RecordingMailer::new();
        mailer.send(&email()).await.unwrap();
        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].attachments[0].filename, "report.pdf");
    }

    /// Local stand-in for the SendGrid endpoint that answers every POST with `status`
    /// and reports back the bearer token it was called with.
    async fn sendgrid_stub(status: StatusCode) -> (String, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&seen);
        let app = Router::new().route(
            "/v3/mail/send",
            post(move |headers: HeaderMap| {
                let recorded = Arc::clone(&recorded);
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    recorded.lock().unwrap().push(auth);
                    (status, "stub response")
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/v3/mail/send"), seen)
    }

    #[tokio::test]
    async fn sendgrid_error_status_is_a_mail_error() {
        let (endpoint, seen) = sendgrid_stub(StatusCode::INTERNAL_SERVER_ERROR).await;
        let mailer = SendGridMailer::new("key", "inspections@example.com").with_endpoint(endpoint);

        let err = mailer.send(&email()).await.unwrap_err();
        match err {
            InspectionError::Mail(message) => {
                assert!(message.contains("500"));
                assert!(message.contains("stub response"));
            }
            other => panic!("expected a mail error, got {other}"),
        }
        assert_eq!(*seen.lock().unwrap(), vec!["Bearer key".to_string()]);
    }

    #[tokio::test]
    async fn sendgrid_accepted_is_delivered() {
        let (endpoint, seen) = sendgrid_stub(StatusCode::ACCEPTED).await;
        let mailer = SendGridMailer::new("key", "inspections@example.com").with_endpoint(endpoint);

        mailer.send(&email()).await.unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
