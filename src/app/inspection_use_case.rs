use crate::app::ports::{EmailAttachment, MailerPort, MediaStorePort, OutgoingEmail};
use crate::constants::{
    section_category, section_part_name, CATEGORY_EXTERIOR, DAMAGE_PHOTO_FOLDER,
    DAMAGE_SECTIONS, DEFAULT_CART_PARTS, DEFAULT_DAMAGE_TYPES, DEFAULT_PROPERTY_NAME,
    DEFAULT_TOKEN_TTL_DAYS, GENERAL_DAMAGE_TYPE, SIGNATURE_FOLDER,
};
use crate::domain::requests::{
    CreateInspectionRequest, CreateInspectionResponse, GuestSignRequest, GuestSignResponse,
    GuestView, InspectionDetail, InspectionFilter, InspectionSummary, SendInspectionResponse,
};
use crate::domain::validation::{validate_create, validate_sign};
use crate::domain::{
    CartPart, DamageRecord, DamageType, Inspection, InspectionStatus, Property,
};
use crate::error::{InspectionError, Result};
use crate::infra::media::{decode_data_url, is_data_url};
use crate::metrics::{self, MetricName};
use crate::report::{render_pdf, report_filename, InspectionReport};
use crate::storage::Storage;
use crate::templates::{ReviewEmailTemplate, SignedEmailTemplate};
use askama::Template;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Result of sending an inspection out for review. The email goes out on a
/// detached task; await `email_task` only if you need to observe delivery.
pub struct SendOutcome {
    pub response: SendInspectionResponse,
    pub email_task: JoinHandle<()>,
}

/// Result of a guest sign-off. The manager notification (PDF attached) runs
/// on a detached task and is absent when the report could not be prepared.
pub struct SignOutcome {
    pub response: GuestSignResponse,
    pub notification_task: Option<JoinHandle<()>>,
}

#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Inspector and guest operations over an inspection's lifecycle.
#[derive(Clone)]
pub struct InspectionUseCase {
    storage: Arc<dyn Storage>,
    mailer: Arc<dyn MailerPort>,
    media: Arc<dyn MediaStorePort>,
    public_base_url: String,
    manager_email: String,
    token_ttl: Duration,
}

fn category_for_part(name: &str) -> &'static str {
    DEFAULT_CART_PARTS
        .iter()
        .find(|(part, _)| part.eq_ignore_ascii_case(name))
        .map(|(_, category)| *category)
        .unwrap_or(CATEGORY_EXTERIOR)
}

fn trimmed(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

fn pending_record(part: &CartPart, damage_type: &DamageType) -> Result<DamageRecord> {
    let (Some(part_id), Some(damage_type_id)) = (part.id, damage_type.id) else {
        return Err(InspectionError::Storage {
            message: "catalog entry has not been persisted".to_string(),
        });
    };
    Ok(DamageRecord {
        id: None,
        inspection_id: 0,
        part_id,
        damage_type_id,
        description: String::new(),
        quantity: 1,
        photo_url: None,
        created_at: Utc::now(),
    })
}

impl InspectionUseCase {
    pub fn new(
        storage: Arc<dyn Storage>,
        mailer: Arc<dyn MailerPort>,
        media: Arc<dyn MediaStorePort>,
        public_base_url: impl Into<String>,
        manager_email: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            mailer,
            media,
            public_base_url: public_base_url.into(),
            manager_email: manager_email.into(),
            token_ttl: Duration::days(DEFAULT_TOKEN_TTL_DAYS),
        }
    }

    /// How long the guest link stays valid once the inspection is sent.
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    pub fn review_url(&self, token: &str) -> String {
        format!("{}/review/{}", self.public_base_url.trim_end_matches('/'), token)
    }

    /// Ensures the default parts, damage types and property exist.
    pub async fn seed_catalog(&self) -> Result<()> {
        for (name, category) in DEFAULT_CART_PARTS {
            self.storage.get_or_create_cart_part(name, category).await?;
        }
        for (name, severity) in DEFAULT_DAMAGE_TYPES {
            self.storage.get_or_create_damage_type(name, severity).await?;
        }
        self.storage.get_or_create_property(DEFAULT_PROPERTY_NAME).await?;
        info!("Catalog seeded");
        Ok(())
    }

    /// Validates the request, resolves catalog rows and uploads images first, then
    /// stores the inspection and all of its damage records in one write.
    #[instrument(skip(self, request))]
    pub async fn create_inspection(
        &self,
        request: CreateInspectionRequest,
    ) -> Result<CreateInspectionResponse> {
        let validated = validate_create(&request)?;

        let property_name = request
            .property_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_PROPERTY_NAME);
        let property = self.storage.get_or_create_property(property_name).await?;

        let mut records = Vec::new();
        let general = self
            .storage
            .get_or_create_damage_type(GENERAL_DAMAGE_TYPE, 1)
            .await?;
        for section in DAMAGE_SECTIONS {
            let text = request.section_text(section);
            if text.is_empty() {
                continue;
            }
            let part = self
                .storage
                .get_or_create_cart_part(&section_part_name(section), section_category(section))
                .await?;
            let mut record = pending_record(&part, &general)?;
            record.description = text.to_string();
            records.push(record);
        }

        for item in &validated.damages {
            let part = self
                .storage
                .get_or_create_cart_part(&item.part, category_for_part(&item.part))
                .await?;
            let damage_type = self
                .storage
                .get_or_create_damage_type(&item.damage_type, 1)
                .await?;
            let mut record = pending_record(&part, &damage_type)?;
            record.description = item.description.clone();
            record.quantity = item.quantity;
            record.photo_url = match &item.photo {
                Some(photo) => self.store_image(photo, DAMAGE_PHOTO_FOLDER).await,
                None => None,
            };
            records.push(record);
        }

        let inspector_signature = Some(trimmed(&request.inspector_signature))
            .filter(|signature| !signature.is_empty());
        let inspector_signature_url = match &inspector_signature {
            Some(signature) => self.store_image(signature, SIGNATURE_FOLDER).await,
            None => None,
        };

        let now = Utc::now();
        let mut inspection = Inspection {
            id: None,
            cart_number: validated.cart_number,
            property_id: property.id,
            guest_name: validated.guest_name,
            guest_email: validated.guest_email,
            guest_phone: trimmed(&request.guest_phone),
            guest_room: trimmed(&request.guest_room),
            inspector_name: trimmed(&request.inspector_name),
            inspection_date: request.inspection_date.unwrap_or_else(|| now.date_naive()),
            front_damage: request.section_text("front").to_string(),
            back_damage: request.section_text("back").to_string(),
            left_damage: request.section_text("left").to_string(),
            right_damage: request.section_text("right").to_string(),
            interior_damage: request.section_text("interior").to_string(),
            additional_notes: trimmed(&request.additional_notes),
            inspector_signature,
            inspector_signature_url,
            guest_signature: None,
            guest_signature_url: None,
            guest_confirms_damages: false,
            guest_accepts_terms: false,
            guest_comments: String::new(),
            status: InspectionStatus::Pending,
            access_token: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            sent_at: None,
            signed_at: None,
            token_expires_at: None,
        };
        self.storage
            .create_inspection(&mut inspection, &mut records)
            .await?;
        let id = inspection.require_id()?;

        metrics::increment(MetricName::InspectionsCreated);
        info!(
            inspection_id = id,
            cart = %inspection.cart_number,
            damage_records = records.len(),
            "Inspection created"
        );

        Ok(CreateInspectionResponse {
            id,
            access_token: inspection.access_token,
            status: "success".to_string(),
            message: "Inspection created successfully".to_string(),
        })
    }

    /// Marks the inspection as sent, starts the link's validity window and
    /// emails the guest a review link.
    #[instrument(skip(self))]
    pub async fn send_for_review(&self, id: i64) -> Result<SendOutcome> {
        let mut inspection = self
            .storage
            .get_inspection(id)
            .await?
            .ok_or_else(|| InspectionError::NotFound(format!("Inspection {id}")))?;

        let previous = inspection.status;
        if previous == InspectionStatus::Signed {
            return Err(InspectionError::InvalidState(format!(
                "Inspection {id} has already been signed"
            )));
        }

        let review_url = self.review_url(&inspection.access_token);
        let email = self.review_email(&inspection, &review_url)?;

        let now = Utc::now();
        let expires_at = now + self.token_ttl;
        inspection.status = InspectionStatus::Sent;
        inspection.sent_at = Some(now);
        inspection.updated_at = now;
        inspection.token_expires_at = Some(expires_at);
        self.storage
            .transition_inspection(&inspection, previous)
            .await?;

        let email_task = self.spawn_email(email);
        metrics::increment(MetricName::InspectionsSent);
        info!(inspection_id = id, review_url = %review_url, %expires_at, "Inspection sent for review");

        Ok(SendOutcome {
            response: SendInspectionResponse {
                status: InspectionStatus::Sent,
                message: format!("Email sent to {}", inspection.guest_email),
                review_url,
                expires_at,
            },
            email_task,
        })
    }

    pub async fn guest_view(&self, token: &str) -> Result<GuestView> {
        let inspection = self.find_for_guest(token).await?;
        let damages = self
            .storage
            .list_damage_details(inspection.require_id()?)
            .await?;
        Ok(GuestView::new(&inspection, damages))
    }

    /// Records the guest's signature and acknowledgements, then notifies the manager.
    /// Only one submission can move a given inspection from `sent` to `signed`.
    #[instrument(skip(self, request))]
    pub async fn guest_sign(&self, token: &str, request: GuestSignRequest) -> Result<SignOutcome> {
        let mut inspection = self.find_for_guest(token).await?;
        let id = inspection.require_id()?;

        match inspection.status {
            InspectionStatus::Signed => {
                return Err(InspectionError::InvalidState(format!(
                    "Inspection {id} has already been signed"
                )))
            }
            InspectionStatus::Pending => {
                return Err(InspectionError::InvalidState(format!(
                    "Inspection {id} has not been sent for review yet"
                )))
            }
            InspectionStatus::Sent => {}
        }

        let sign_off = validate_sign(&request)?;
        if is_data_url(&sign_off.signature) {
            inspection.guest_signature_url =
                self.store_image(&sign_off.signature, SIGNATURE_FOLDER).await;
        }

        let now = Utc::now();
        inspection.guest_signature = Some(sign_off.signature);
        inspection.guest_confirms_damages = true;
        inspection.guest_accepts_terms = true;
        inspection.guest_comments = sign_off.comments;
        inspection.status = InspectionStatus::Signed;
        inspection.signed_at = Some(now);
        inspection.updated_at = now;
        self.storage
            .transition_inspection(&inspection, InspectionStatus::Sent)
            .await?;

        metrics::increment(MetricName::InspectionsSigned);
        info!(inspection_id = id, guest = %inspection.guest_name, "Inspection signed");

        let notification_task = match self.signed_notification(inspection).await {
            Ok(email) => Some(self.spawn_email(email)),
            Err(e) => {
                error!(inspection_id = id, error = %e, "Could not prepare signed notification");
                None
            }
        };

        Ok(SignOutcome {
            response: GuestSignResponse {
                status: InspectionStatus::Signed,
                message: "Inspection signed successfully".to_string(),
            },
            notification_task,
        })
    }

    pub async fn inspection_by_token(&self, token: &str) -> Result<InspectionDetail> {
        let report = self.load_report(token).await?;
        let id = report.inspection.require_id()?;
        Ok(InspectionDetail::new(
            id,
            report.inspection,
            report.property,
            report.damages,
        ))
    }

    pub async fn list_inspections(&self, filter: InspectionFilter) -> Result<Vec<InspectionSummary>> {
        let status = match filter.status.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => Some(s.parse::<InspectionStatus>()?),
            _ => None,
        };
        let inspections = self.storage.list_inspections(status).await?;
        inspections
            .iter()
            .map(|i| Ok(InspectionSummary::from_inspection(i.require_id()?, i)))
            .collect()
    }

    pub async fn cart_parts(&self) -> Result<Vec<CartPart>> {
        self.storage.list_cart_parts().await
    }

    pub async fn damage_types(&self) -> Result<Vec<DamageType>> {
        self.storage.list_damage_types().await
    }

    pub async fn properties(&self) -> Result<Vec<Property>> {
        self.storage.list_properties().await
    }

    /// Inspection plus its property and damage records, looked up by access token.
    pub async fn load_report(&self, token: &str) -> Result<InspectionReport> {
        let inspection = self.find_by_token(token).await?;
        self.assemble_report(inspection).await
    }

    /// Same as `load_report`, but refuses links whose validity window has passed.
    pub async fn guest_report(&self, token: &str) -> Result<InspectionReport> {
        let inspection = self.find_for_guest(token).await?;
        self.assemble_report(inspection).await
    }

    pub async fn report_pdf(&self, token: &str) -> Result<RenderedReport> {
        let report = self.load_report(token).await?;
        let bytes = render_pdf(&report, Utc::now().date_naive())?;
        let filename = report_filename(&report.inspection);
        info!(filename = %filename, "PDF report generated");
        Ok(RenderedReport { filename, bytes })
    }

    async fn find_by_token(&self, token: &str) -> Result<Inspection> {
        self.storage
            .get_inspection_by_token(token)
            .await?
            .ok_or_else(|| InspectionError::NotFound("Inspection".to_string()))
    }

    async fn find_for_guest(&self, token: &str) -> Result<Inspection> {
        let inspection = self.find_by_token(token).await?;
        if inspection.token_expired(Utc::now()) {
            warn!(inspection_id = ?inspection.id, "Expired review link used");
            return Err(InspectionError::TokenExpired);
        }
        Ok(inspection)
    }

    async fn assemble_report(&self, inspection: Inspection) -> Result<InspectionReport> {
        let property = match inspection.property_id {
            Some(property_id) => self.storage.get_property(property_id).await?,
            None => None,
        };
        let damages = self
            .storage
            .list_damage_details(inspection.require_id()?)
            .await?;
        Ok(InspectionReport {
            inspection,
            property,
            damages,
        })
    }

    /// Uploads a data-URL image; hosted URLs pass through. Failures are logged
    /// and yield `None` so the surrounding write still goes ahead.
    async fn store_image(&self, value: &str, folder: &str) -> Option<String> {
        let value = value.trim();
        if value.starts_with("http://") || value.starts_with("https://") || value.starts_with('/') {
            return Some(value.to_string());
        }
        if !is_data_url(value) {
            warn!(folder, "Ignoring image that is neither a data URL nor a link");
            return None;
        }
        let uploaded = match decode_data_url(value) {
            Ok(data) => self.media.put(folder, &data.bytes, &data.content_type).await,
            Err(e) => Err(e),
        };
        match uploaded {
            Ok(url) => {
                metrics::increment(MetricName::MediaUploads);
                Some(url)
            }
            Err(e) => {
                metrics::increment(MetricName::MediaUploadsFailed);
                warn!(folder, error = %e, "Image upload failed");
                None
            }
        }
    }

    fn review_email(&self, inspection: &Inspection, review_url: &str) -> Result<OutgoingEmail> {
        let html_body = ReviewEmailTemplate {
            guest_name: inspection.guest_name.clone(),
            cart_number: inspection.cart_number.clone(),
            inspection_date: inspection.inspection_date.format("%d/%m/%Y").to_string(),
            inspector_name: if inspection.inspector_name.is_empty() {
                "Our inspector".to_string()
            } else {
                inspection.inspector_name.clone()
            },
            review_url: review_url.to_string(),
        }
        .render()?;
        Ok(OutgoingEmail {
            to: inspection.guest_email.clone(),
            subject: format!("Golf Cart Inspection #{}", inspection.cart_number),
            html_body,
            attachments: Vec::new(),
        })
    }

    async fn signed_notification(&self, inspection: Inspection) -> Result<OutgoingEmail> {
        let report = self.assemble_report(inspection).await?;
        let pdf = render_pdf(&report, Utc::now().date_naive())?;
        let inspection = &report.inspection;

        let html_body = SignedEmailTemplate {
            guest_name: inspection.guest_name.clone(),
            cart_number: inspection.cart_number.clone(),
            signed_at: inspection
                .signed_at
                .map(|at| at.format("%d/%m/%Y %H:%M UTC").to_string())
                .unwrap_or_default(),
            guest_comments: inspection.guest_comments.clone(),
        }
        .render()?;

        Ok(OutgoingEmail {
            to: self.manager_email.clone(),
            subject: format!("Signed inspection - Golf Cart {}", inspection.cart_number),
            html_body,
            attachments: vec![EmailAttachment {
                filename: report_filename(inspection),
                content_type: "application/pdf".to_string(),
                bytes: pdf,
            }],
        })
    }

    fn spawn_email(&self, email: OutgoingEmail) -> JoinHandle<()> {
        let mailer = Arc::clone(&self.mailer);
        tokio::spawn(async move {
            match mailer.send(&email).await {
                Ok(()) => {
                    metrics::increment(MetricName::EmailsSent);
                    info!(to = %email.to, subject = %email.subject, "Email delivered");
                }
                Err(e) => {
                    metrics::increment(MetricName::EmailsFailed);
                    error!(to = %email.to, error = %e, "Failed to send email");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::requests::{CartId, DamageItem};
    use crate::infra::{FsMediaStore, RecordingMailer};
    use crate::storage::InMemoryStorage;
    use tempfile::{tempdir, TempDir};

    struct Harness {
        use_case: InspectionUseCase,
        mailer: RecordingMailer,
        storage: Arc<InMemoryStorage>,
        _media_dir: TempDir,
    }

    fn harness() -> Harness {
        harness_with_ttl(Duration::days(DEFAULT_TOKEN_TTL_DAYS))
    }

    fn harness_with_ttl(ttl: Duration) -> Harness {
        let media_dir = tempdir().unwrap();
        let storage = Arc::new(InMemoryStorage::new());
        let mailer = RecordingMailer::new();
        let use_case = InspectionUseCase::new(
            storage.clone(),
            Arc::new(mailer.clone()),
            Arc::new(FsMediaStore::new(media_dir.path(), "/media")),
            "http://localhost:8000/",
            "manager@example.com",
        )
        .with_token_ttl(ttl);
        Harness {
            use_case,
            mailer,
            storage,
            _media_dir: media_dir,
        }
    }

    fn create_request() -> CreateInspectionRequest {
        CreateInspectionRequest {
            cart_id: Some(CartId::Number(12)),
            property_name: Some("Villa Mar".to_string()),
            guest_name: Some("Jordan Price".to_string()),
            guest_email: Some("jordan@example.com".to_string()),
            guest_room: Some("301".to_string()),
            inspector_name: Some("Ruth".to_string()),
            front: Some("Scratched bumper".to_string()),
            interior: Some("  ".to_string()),
            inspector_signature: Some("data:image/png;base64,aGVsbG8=".to_string()),
            damages: vec![DamageItem {
                part: Some("Roof".to_string()),
                damage_type: Some("Damage/Bumps".to_string()),
                quantity: 2,
                description: Some("Two dents".to_string()),
                photo: Some("data:image/jpeg;base64,aGVsbG8=".to_string()),
            }],
            ..Default::default()
        }
    }

    fn sign_request() -> GuestSignRequest {
        GuestSignRequest {
            guest_signature: Some("data:image/png;base64,c2lnbmVk".to_string()),
            guest_confirms_damages: Some(true),
            guest_accepts_terms: Some(true),
            guest_comments: Some("Looks right".to_string()),
        }
    }

    #[tokio::test]
    async fn create_persists_fields_and_damage_records() {
        let h = harness();
        let created = h.use_case.create_inspection(create_request()).await.unwrap();
        assert_eq!(created.status, "success");

        let stored = h.storage.get_inspection(created.id).await.unwrap().unwrap();
        assert_eq!(stored.cart_number, "12");
        assert_eq!(stored.guest_room, "301");
        assert_eq!(stored.front_damage, "Scratched bumper");
        assert_eq!(stored.interior_damage, "");
        assert_eq!(stored.status, InspectionStatus::Pending);
        assert_eq!(stored.access_token, created.access_token);
        assert!(stored
            .inspector_signature_url
            .as_deref()
            .unwrap()
            .starts_with("/media/signatures/"));

        let damages = h.storage.list_damage_details(created.id).await.unwrap();
        assert_eq!(damages.len(), 2);
        assert_eq!(damages[0].part, "Front");
        assert_eq!(damages[0].damage_type, GENERAL_DAMAGE_TYPE);
        assert_eq!(damages[1].part, "Roof");
        assert_eq!(damages[1].quantity, 2);
        assert!(damages[1].photo_url.as_deref().unwrap().ends_with(".jpg"));
    }

    #[tokio::test]
    async fn access_tokens_are_unique() {
        let h = harness();
        let a = h.use_case.create_inspection(create_request()).await.unwrap();
        let b = h.use_case.create_inspection(create_request()).await.unwrap();
        assert_ne!(a.access_token, b.access_token);
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn send_marks_sent_and_emails_guest_once() {
        let h = harness();
        let created = h.use_case.create_inspection(create_request()).await.unwrap();

        let outcome = h.use_case.send_for_review(created.id).await.unwrap();
        outcome.email_task.await.unwrap();

        assert_eq!(outcome.response.status, InspectionStatus::Sent);
        assert_eq!(
            outcome.response.review_url,
            format!("http://localhost:8000/review/{}", created.access_token)
        );

        let stored = h.storage.get_inspection(created.id).await.unwrap().unwrap();
        assert_eq!(stored.status, InspectionStatus::Sent);
        assert!(stored.sent_at.is_some());

        let sent = h.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "jordan@example.com");
        assert!(sent[0].html_body.contains(&outcome.response.review_url));
    }

    #[tokio::test]
    async fn send_unknown_inspection_is_not_found() {
        let h = harness();
        let err = h.use_case.send_for_review(999).await.err().unwrap();
        assert!(matches!(err, InspectionError::NotFound(_)));
    }

    #[tokio::test]
    async fn sign_requires_sent_and_all_fields() {
        let h = harness();
        let created = h.use_case.create_inspection(create_request()).await.unwrap();

        let err = h
            .use_case
            .guest_sign(&created.access_token, sign_request())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, InspectionError::InvalidState(_)));

        h.use_case.send_for_review(created.id).await.unwrap().email_task.await.unwrap();

        let mut incomplete = sign_request();
        incomplete.guest_confirms_damages = None;
        let err = h
            .use_case
            .guest_sign(&created.access_token, incomplete)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, InspectionError::MissingField(ref f) if f == "guest_confirms_damages"));

        let stored = h.storage.get_inspection(created.id).await.unwrap().unwrap();
        assert_eq!(stored.status, InspectionStatus::Sent);
    }

    #[tokio::test]
    async fn sign_transitions_and_notifies_manager_with_pdf() {
        let h = harness();
        let created = h.use_case.create_inspection(create_request()).await.unwrap();
        h.use_case.send_for_review(created.id).await.unwrap().email_task.await.unwrap();

        let outcome = h
            .use_case
            .guest_sign(&created.access_token, sign_request())
            .await
            .unwrap();
        assert_eq!(outcome.response.status, InspectionStatus::Signed);
        outcome.notification_task.unwrap().await.unwrap();

        let stored = h.storage.get_inspection(created.id).await.unwrap().unwrap();
        assert_eq!(stored.status, InspectionStatus::Signed);
        assert!(stored.signed_at.is_some());
        assert!(stored.guest_accepts_terms && stored.guest_confirms_damages);
        assert_eq!(stored.guest_comments, "Looks right");
        assert!(stored.guest_signature_url.is_some());

        let sent = h.mailer.sent();
        assert_eq!(sent.len(), 2);
        let notification = &sent[1];
        assert_eq!(notification.to, "manager@example.com");
        assert_eq!(notification.attachments.len(), 1);
        assert!(notification.attachments[0].bytes.starts_with(b"%PDF"));

        let again = h
            .use_case
            .guest_sign(&created.access_token, sign_request())
            .await
            .err()
            .unwrap();
        assert!(matches!(again, InspectionError::InvalidState(_)));
        assert!(matches!(
            h.use_case.send_for_review(created.id).await.err().unwrap(),
            InspectionError::InvalidState(_)
        ));
    }

    #[tokio::test]
    async fn token_lookup_hides_signatures_and_nests_property() {
        let h = harness();
        let created = h.use_case.create_inspection(create_request()).await.unwrap();
        let detail = h
            .use_case
            .inspection_by_token(&created.access_token)
            .await
            .unwrap();
        assert_eq!(detail.property.unwrap().name, "Villa Mar");
        assert_eq!(detail.damages.len(), 2);

        let json = serde_json::to_value(
            h.use_case
                .inspection_by_token(&created.access_token)
                .await
                .unwrap(),
        )
        .unwrap();
        assert!(json.get("inspector_signature").is_none());
        assert!(json.get("guest_signature").is_none());
        assert_eq!(json["damages"][1]["type"], "Damage/Bumps");

        assert!(matches!(
            h.use_case.inspection_by_token("missing").await,
            Err(InspectionError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn report_uses_stored_data() {
        let h = harness();
        let mut request = create_request();
        request.inspection_date = chrono::NaiveDate::from_ymd_opt(2025, 3, 9);
        let created = h.use_case.create_inspection(request).await.unwrap();

        let rendered = h.use_case.report_pdf(&created.access_token).await.unwrap();
        assert_eq!(rendered.filename, "inspection_golfcart_12_20250309.pdf");
        assert!(rendered.bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn seeding_catalog_is_idempotent() {
        let h = harness();
        h.use_case.seed_catalog().await.unwrap();
        h.use_case.seed_catalog().await.unwrap();
        assert_eq!(h.use_case.cart_parts().await.unwrap().len(), DEFAULT_CART_PARTS.len());
        assert_eq!(
            h.use_case.damage_types().await.unwrap().len(),
            DEFAULT_DAMAGE_TYPES.len()
        );
        assert_eq!(h.use_case.properties().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let h = harness();
        let first = h.use_case.create_inspection(create_request()).await.unwrap();
        h.use_case.create_inspection(create_request()).await.unwrap();
        h.use_case.send_for_review(first.id).await.unwrap().email_task.await.unwrap();

        let sent = h
            .use_case
            .list_inspections(InspectionFilter {
                status: Some("sent".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].id, first.id);

        let pending = h
            .use_case
            .list_inspections(InspectionFilter {
                status: Some("draft".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);

        assert!(h
            .use_case
            .list_inspections(InspectionFilter {
                status: Some("archived".to_string()),
            })
            .await
            .is_err());
    }

    #[tokio::test]
    async fn send_opens_a_seven_day_window_and_resend_extends_it() {
        let h = harness();
        let created = h.use_case.create_inspection(create_request()).await.unwrap();
        assert!(h
            .storage
            .get_inspection(created.id)
            .await
            .unwrap()
            .unwrap()
            .token_expires_at
            .is_none());

        let before = Utc::now();
        let first = h.use_case.send_for_review(created.id).await.unwrap();
        first.email_task.await.unwrap();
        let window = first.response.expires_at - before;
        assert!(window >= Duration::days(7) - Duration::minutes(1));
        assert!(window <= Duration::days(7) + Duration::minutes(1));

        let stored = h.storage.get_inspection(created.id).await.unwrap().unwrap();
        assert_eq!(stored.token_expires_at, Some(first.response.expires_at));

        let second = h.use_case.send_for_review(created.id).await.unwrap();
        second.email_task.await.unwrap();
        assert!(second.response.expires_at >= first.response.expires_at);
        assert_eq!(h.mailer.sent().len(), 2);
    }

    #[tokio::test]
    async fn expired_links_are_refused_to_guests_only() {
        let h = harness_with_ttl(Duration::seconds(-1));
        let created = h.use_case.create_inspection(create_request()).await.unwrap();
        h.use_case.send_for_review(created.id).await.unwrap().email_task.await.unwrap();

        let token = created.access_token.as_str();
        assert!(matches!(
            h.use_case.guest_view(token).await,
            Err(InspectionError::TokenExpired)
        ));
        assert!(matches!(
            h.use_case.guest_report(token).await,
            Err(InspectionError::TokenExpired)
        ));
        assert!(matches!(
            h.use_case.guest_sign(token, sign_request()).await.err().unwrap(),
            InspectionError::TokenExpired
        ));

        let stored = h.storage.get_inspection(created.id).await.unwrap().unwrap();
        assert_eq!(stored.status, InspectionStatus::Sent);
        assert!(h.use_case.inspection_by_token(token).await.is_ok());
        assert!(h.use_case.report_pdf(token).await.is_ok());
    }

    #[tokio::test]
    async fn unsent_inspections_have_no_expiry() {
        let h = harness_with_ttl(Duration::seconds(-1));
        let created = h.use_case.create_inspection(create_request()).await.unwrap();
        assert!(h.use_case.guest_view(&created.access_token).await.is_ok());
    }

    #[tokio::test]
    async fn concurrent_signatures_sign_once_and_notify_once() {
        let h = harness();
        let created = h.use_case.create_inspection(create_request()).await.unwrap();
        h.use_case.send_for_review(created.id).await.unwrap().email_task.await.unwrap();

        let token = created.access_token.as_str();
        let (a, b) = tokio::join!(
            h.use_case.guest_sign(token, sign_request()),
            h.use_case.guest_sign(token, sign_request())
        );

        let (winner, loser) = match (a, b) {
            (Ok(winner), Err(loser)) | (Err(loser), Ok(winner)) => (winner, loser),
            (a, b) => panic!("expected one success, got {:?} and {:?}", a.is_ok(), b.is_ok()),
        };
        assert!(matches!(loser, InspectionError::InvalidState(_)));
        winner.notification_task.unwrap().await.unwrap();

        let sent = h.mailer.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(
            sent.iter().filter(|e| e.to == "manager@example.com").count(),
            1
        );
    }

    #[tokio::test]
    async fn scriptable_signature_images_are_not_stored() {
        let h = harness();
        let mut request = create_request();
        request.inspector_signature =
            Some("data:image/svg+xml;base64,PHN2Zz48c2NyaXB0Lz48L3N2Zz4=".to_string());
        let created = h.use_case.create_inspection(request).await.unwrap();

        let stored = h.storage.get_inspection(created.id).await.unwrap().unwrap();
        assert!(stored.inspector_signature.is_some());
        assert!(stored.inspector_signature_url.is_none());
    }

    #[tokio::test]
    async fn damage_photos_share_one_content_addressed_folder() {
        let h = harness();
        let a = h.use_case.create_inspection(create_request()).await.unwrap();
        let b = h.use_case.create_inspection(create_request()).await.unwrap();

        let first = h.storage.list_damage_details(a.id).await.unwrap();
        let second = h.storage.list_damage_details(b.id).await.unwrap();
        let url = first[1].photo_url.clone().unwrap();
        assert!(url.starts_with("/media/inspections/images/"));
        assert_eq!(second[1].photo_url.as_deref(), Some(url.as_str()));
    }
}
