// Inspection statuses as stored and serialized
pub const STATUS_PENDING: &str = "pending";
pub const STATUS_SENT: &str = "sent";
pub const STATUS_SIGNED: &str = "signed";
/// Older clients still submit this for a fresh inspection.
pub const STATUS_DRAFT_ALIAS: &str = "draft";

pub const DEFAULT_PROPERTY_NAME: &str = "Default Property";
pub const DEFAULT_PROPERTY_LOCATION: &str = "Default Location";
pub const GENERAL_DAMAGE_TYPE: &str = "General";

pub const CATEGORY_EXTERIOR: &str = "Exterior";
pub const CATEGORY_INTERIOR: &str = "Interior";

pub const MAX_CART_NUMBER: u32 = 9999;

/// How long a guest review link stays valid after the inspection is sent.
pub const DEFAULT_TOKEN_TTL_DAYS: i64 = 7;

pub const DAMAGE_PHOTO_FOLDER: &str = "inspections/images";
pub const SIGNATURE_FOLDER: &str = "signatures";

/// Free-text damage sections captured on the inspector form.
pub const DAMAGE_SECTIONS: [&str; 5] = ["front", "back", "left", "right", "interior"];

/// Cart parts offered by the inspector form, with their category.
pub const DEFAULT_CART_PARTS: [(&str, &str); 10] = [
    ("Front Left Side", CATEGORY_EXTERIOR),
    ("Front Right Side", CATEGORY_EXTERIOR),
    ("Rear Left Side", CATEGORY_EXTERIOR),
    ("Rear Right Side", CATEGORY_EXTERIOR),
    ("Roof", CATEGORY_EXTERIOR),
    ("Seats", CATEGORY_INTERIOR),
    ("Steering & Dashboard", CATEGORY_INTERIOR),
    ("Wheels & Tires", CATEGORY_EXTERIOR),
    ("Front Lights", CATEGORY_EXTERIOR),
    ("Rear Lights", CATEGORY_EXTERIOR),
];

/// Damage types with their severity level.
pub const DEFAULT_DAMAGE_TYPES: [(&str, i64); 4] = [
    ("Scratches", 1),
    ("Missing parts", 3),
    ("Damage/Bumps", 2),
    (GENERAL_DAMAGE_TYPE, 1),
];

/// Capitalized part name used for a free-text damage section.
pub fn section_part_name(section: &str) -> String {
    let mut chars = section.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn section_category(section: &str) -> &'static str {
    if section == "interior" {
        CATEGORY_INTERIOR
    } else {
        CATEGORY_EXTERIOR
    }
}
