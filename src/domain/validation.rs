//! Presence and format checks applied before anything is written.

use super::requests::{CartId, CreateInspectionRequest, GuestSignRequest};
use crate::constants::MAX_CART_NUMBER;
use crate::error::{InspectionError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\S+@\S+\.\S+$").expect("email pattern is valid"));

/// Required inspector-side fields after normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedInspection {
    pub cart_number: String,
    pub guest_name: String,
    pub guest_email: String,
    pub damages: Vec<ValidatedDamage>,
}

/// A structured damage entry with its part and type names resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedDamage {
    pub part: String,
    pub damage_type: String,
    pub quantity: u32,
    pub description: String,
    pub photo: Option<String>,
}

/// Everything a guest must hand over to sign off.
#[derive(Debug, Clone, PartialEq)]
pub struct GuestSignOff {
    pub signature: String,
    pub comments: String,
}

fn required(value: &Option<String>, field: &str) -> Result<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(InspectionError::MissingField(field.to_string())),
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

pub fn cart_number(cart_id: &Option<CartId>) -> Result<u32> {
    let raw = match cart_id {
        None => return Err(InspectionError::MissingField("cart_id".to_string())),
        Some(CartId::Number(n)) => *n,
        Some(CartId::Text(s)) if s.trim().is_empty() => {
            return Err(InspectionError::MissingField("cart_id".to_string()))
        }
        Some(CartId::Text(s)) => s.trim().parse::<i64>().map_err(|_| {
            InspectionError::Validation("Cart number must be a valid number".to_string())
        })?,
    };

    if raw <= 0 {
        return Err(InspectionError::Validation(
            "Cart number must be a positive number".to_string(),
        ));
    }
    if raw > i64::from(MAX_CART_NUMBER) {
        return Err(InspectionError::Validation(format!(
            "Cart number cannot exceed {MAX_CART_NUMBER}"
        )));
    }
    Ok(raw as u32)
}

pub fn validate_create(request: &CreateInspectionRequest) -> Result<ValidatedInspection> {
    let guest_name = required(&request.guest_name, "guest_name")?;
    let guest_email = required(&request.guest_email, "guest_email")?;
    if !is_valid_email(&guest_email) {
        return Err(InspectionError::Validation("Invalid email format".to_string()));
    }
    let cart_number = cart_number(&request.cart_id)?;

    let mut damages = Vec::with_capacity(request.damages.len());
    for (index, item) in request.damages.iter().enumerate() {
        let part = required(&item.part, &format!("damages[{index}].part"))?;
        let damage_type = required(&item.damage_type, &format!("damages[{index}].damage_type"))?;
        let quantity = u32::try_from(item.quantity)
            .ok()
            .filter(|q| *q >= 1)
            .ok_or_else(|| {
                InspectionError::Validation(format!(
                    "Damage quantity for '{part}' must be at least 1"
                ))
            })?;
        damages.push(ValidatedDamage {
            part,
            damage_type,
            quantity,
            description: item
                .description
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string(),
            photo: item
                .photo
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
        });
    }

    Ok(ValidatedInspection {
        cart_number: cart_number.to_string(),
        guest_name,
        guest_email,
        damages,
    })
}

/// Signature, damage confirmation and terms acceptance are all mandatory.
pub fn validate_sign(request: &GuestSignRequest) -> Result<GuestSignOff> {
    let signature = required(&request.guest_signature, "guest_signature")?;
    if request.guest_confirms_damages != Some(true) {
        return Err(InspectionError::MissingField(
            "guest_confirms_damages".to_string(),
        ));
    }
    if request.guest_accepts_terms != Some(true) {
        return Err(InspectionError::MissingField("guest_accepts_terms".to_string()));
    }
    Ok(GuestSignOff {
        signature,
        comments: request
            .guest_comments
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string(),
    })
}
