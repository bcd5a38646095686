use super::{DamageDetail, Inspection, InspectionStatus, Property};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The cart identifier arrives as either a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CartId {
    Number(i64),
    Text(String),
}

/// Body of `POST /api/inspections`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateInspectionRequest {
    #[serde(default, alias = "cart_number")]
    pub cart_id: Option<CartId>,
    #[serde(default)]
    pub property_name: Option<String>,
    #[serde(default)]
    pub guest_name: Option<String>,
    #[serde(default)]
    pub guest_email: Option<String>,
    #[serde(default)]
    pub guest_phone: Option<String>,
    #[serde(default)]
    pub guest_room: Option<String>,
    #[serde(default)]
    pub inspector_name: Option<String>,
    #[serde(default)]
    pub inspection_date: Option<NaiveDate>,
    #[serde(default, alias = "front_damage")]
    pub front: Option<String>,
    #[serde(default, alias = "back_damage")]
    pub back: Option<String>,
    #[serde(default, alias = "left_damage")]
    pub left: Option<String>,
    #[serde(default, alias = "right_damage")]
    pub right: Option<String>,
    #[serde(default, alias = "interior_damage")]
    pub interior: Option<String>,
    #[serde(default)]
    pub additional_notes: Option<String>,
    #[serde(default)]
    pub inspector_signature: Option<String>,
    #[serde(default)]
    pub damages: Vec<DamageItem>,
}

impl CreateInspectionRequest {
    pub fn section_text(&self, section: &str) -> &str {
        let text = match section {
            "front" => &self.front,
            "back" => &self.back,
            "left" => &self.left,
            "right" => &self.right,
            "interior" => &self.interior,
            _ => &None,
        };
        text.as_deref().map(str::trim).unwrap_or("")
    }
}

/// A structured damage entry picked from the catalog.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DamageItem {
    #[serde(default, alias = "section")]
    pub part: Option<String>,
    #[serde(default, alias = "damageType")]
    pub damage_type: Option<String>,
    /// Signed so that a negative count is reported as a validation error.
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    #[serde(default)]
    pub description: Option<String>,
    /// A base64 data URL to upload, or an already hosted http(s) URL.
    #[serde(default)]
    pub photo: Option<String>,
}

fn default_quantity() -> i64 {
    1
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateInspectionResponse {
    pub id: i64,
    pub access_token: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendInspectionResponse {
    pub status: InspectionStatus,
    pub message: String,
    pub review_url: String,
    pub expires_at: DateTime<Utc>,
}

/// Body of `POST /api/guest/:token`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GuestSignRequest {
    #[serde(default)]
    pub guest_signature: Option<String>,
    #[serde(default)]
    pub guest_confirms_damages: Option<bool>,
    #[serde(default)]
    pub guest_accepts_terms: Option<bool>,
    #[serde(default)]
    pub guest_comments: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GuestSignResponse {
    pub status: InspectionStatus,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionDamages {
    pub front: String,
    pub back: String,
    pub left: String,
    pub right: String,
    pub interior: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GuestReadonlyData {
    pub cart_number: String,
    pub guest_name: String,
    pub inspection_date: NaiveDate,
    pub damages: SectionDamages,
    pub damage_records: Vec<DamageDetail>,
    pub inspector_notes: String,
    pub inspector_name: String,
    pub status: InspectionStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct GuestRequiredFields {
    pub guest_signature: Option<String>,
    pub guest_confirms_damages: bool,
    pub guest_accepts_terms: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GuestOptionalFields {
    pub guest_comments: String,
}

/// What the guest sees before signing, plus the fields they still owe.
#[derive(Debug, Clone, Serialize)]
pub struct GuestView {
    pub readonly_data: GuestReadonlyData,
    pub required_fields: GuestRequiredFields,
    pub optional_fields: GuestOptionalFields,
}

impl GuestView {
    pub fn new(inspection: &Inspection, damage_records: Vec<DamageDetail>) -> Self {
        Self {
            readonly_data: GuestReadonlyData {
                cart_number: inspection.cart_number.clone(),
                guest_name: inspection.guest_name.clone(),
                inspection_date: inspection.inspection_date,
                damages: SectionDamages {
                    front: inspection.front_damage.clone(),
                    back: inspection.back_damage.clone(),
                    left: inspection.left_damage.clone(),
                    right: inspection.right_damage.clone(),
                    interior: inspection.interior_damage.clone(),
                },
                damage_records,
                inspector_notes: inspection.additional_notes.clone(),
                inspector_name: inspection.inspector_name.clone(),
                status: inspection.status,
            },
            required_fields: GuestRequiredFields {
                guest_signature: None,
                guest_confirms_damages: false,
                guest_accepts_terms: false,
            },
            optional_fields: GuestOptionalFields {
                guest_comments: String::new(),
            },
        }
    }
}

/// Inspection as returned by token lookup. Signature payloads are never exposed.
#[derive(Debug, Clone, Serialize)]
pub struct InspectionDetail {
    pub id: i64,
    pub cart_number: String,
    pub property: Option<Property>,
    pub status: InspectionStatus,
    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: String,
    pub guest_room: String,
    pub inspector_name: String,
    pub inspection_date: NaiveDate,
    pub front_damage: String,
    pub back_damage: String,
    pub left_damage: String,
    pub right_damage: String,
    pub interior_damage: String,
    pub additional_notes: String,
    pub inspector_signature_url: Option<String>,
    pub guest_signature_url: Option<String>,
    pub guest_confirms_damages: bool,
    pub guest_accepts_terms: bool,
    pub guest_comments: String,
    pub access_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub signed_at: Option<DateTime<Utc>>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub damages: Vec<DamageDetail>,
}

impl InspectionDetail {
    pub fn new(
        id: i64,
        inspection: Inspection,
        property: Option<Property>,
        damages: Vec<DamageDetail>,
    ) -> Self {
        Self {
            id,
            cart_number: inspection.cart_number,
            property,
            status: inspection.status,
            guest_name: inspection.guest_name,
            guest_email: inspection.guest_email,
            guest_phone: inspection.guest_phone,
            guest_room: inspection.guest_room,
            inspector_name: inspection.inspector_name,
            inspection_date: inspection.inspection_date,
            front_damage: inspection.front_damage,
            back_damage: inspection.back_damage,
            left_damage: inspection.left_damage,
            right_damage: inspection.right_damage,
            interior_damage: inspection.interior_damage,
            additional_notes: inspection.additional_notes,
            inspector_signature_url: inspection.inspector_signature_url,
            guest_signature_url: inspection.guest_signature_url,
            guest_confirms_damages: inspection.guest_confirms_damages,
            guest_accepts_terms: inspection.guest_accepts_terms,
            guest_comments: inspection.guest_comments,
            access_token: inspection.access_token,
            created_at: inspection.created_at,
            updated_at: inspection.updated_at,
            sent_at: inspection.sent_at,
            signed_at: inspection.signed_at,
            token_expires_at: inspection.token_expires_at,
            damages,
        }
    }
}

/// Row in the inspection listing.
#[derive(Debug, Clone, Serialize)]
pub struct InspectionSummary {
    pub id: i64,
    pub cart_number: String,
    pub guest_name: String,
    pub guest_email: String,
    pub inspection_date: NaiveDate,
    pub status: InspectionStatus,
    pub created_at: DateTime<Utc>,
}

impl InspectionSummary {
    pub fn from_inspection(id: i64, inspection: &Inspection) -> Self {
        Self {
            id,
            cart_number: inspection.cart_number.clone(),
            guest_name: inspection.guest_name.clone(),
            guest_email: inspection.guest_email.clone(),
            inspection_date: inspection.inspection_date,
            status: inspection.status,
            created_at: inspection.created_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InspectionFilter {
    #[serde(default)]
    pub status: Option<String>,
}
