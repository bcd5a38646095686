//! Inspection records and the lookup tables they reference.

pub mod requests;
pub mod validation;

use crate::constants::{STATUS_DRAFT_ALIAS, STATUS_PENDING, STATUS_SENT, STATUS_SIGNED};
use crate::error::InspectionError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where an inspection sits in its lifecycle: pending -> sent -> signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InspectionStatus {
    #[serde(alias = "draft")]
    Pending,
    Sent,
    Signed,
}

impl InspectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InspectionStatus::Pending => STATUS_PENDING,
            InspectionStatus::Sent => STATUS_SENT,
            InspectionStatus::Signed => STATUS_SIGNED,
        }
    }
}

impl fmt::Display for InspectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InspectionStatus {
    type Err = InspectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            STATUS_PENDING | STATUS_DRAFT_ALIAS => Ok(InspectionStatus::Pending),
            STATUS_SENT => Ok(InspectionStatus::Sent),
            STATUS_SIGNED => Ok(InspectionStatus::Signed),
            other => Err(InspectionError::Validation(format!(
                "unknown inspection status '{other}'"
            ))),
        }
    }
}

/// A single golf-cart damage assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inspection {
    pub id: Option<i64>,
    pub cart_number: String,
    pub property_id: Option<i64>,
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
    pub inspector_signature: Option<String>,
    pub inspector_signature_url: Option<String>,
    pub guest_signature: Option<String>,
    pub guest_signature_url: Option<String>,
    pub guest_confirms_damages: bool,
    pub guest_accepts_terms: bool,
    pub guest_comments: String,
    pub status: InspectionStatus,
    pub access_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub signed_at: Option<DateTime<Utc>>,
    /// Set when the inspection is sent; the guest link stops working afterwards.
    pub token_expires_at: Option<DateTime<Utc>>,
}

impl Inspection {
    /// Damage text for a free-text section (front, back, left, right, interior).
    pub fn section_damage(&self, section: &str) -> &str {
        match section {
            "front" => &self.front_damage,
            "back" => &self.back_damage,
            "left" => &self.left_damage,
            "right" => &self.right_damage,
            "interior" => &self.interior_damage,
            _ => "",
        }
    }

    pub fn token_expired(&self, now: DateTime<Utc>) -> bool {
        self.token_expires_at.map_or(false, |expires| expires <= now)
    }

    pub fn require_id(&self) -> Result<i64, InspectionError> {
        self.id.ok_or_else(|| InspectionError::Storage {
            message: "inspection has not been persisted".to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartPart {
    pub id: Option<i64>,
    pub name: String,
    pub description: String,
    pub category: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageType {
    pub id: Option<i64>,
    pub name: String,
    pub description: String,
    pub severity_level: i64,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: Option<i64>,
    pub name: String,
    pub location: String,
    pub active: bool,
}

/// One reported defect tied to a cart part and damage type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DamageRecord {
    pub id: Option<i64>,
    pub inspection_id: i64,
    pub part_id: i64,
    pub damage_type_id: i64,
    pub description: String,
    pub quantity: u32,
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A damage record joined with its part and damage type names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageDetail {
    pub id: i64,
    #[serde(rename = "type")]
    pub damage_type: String,
    pub part: String,
    pub location: String,
    pub description: String,
    pub quantity: u32,
    pub photo_url: Option<String>,
}
