use askama::Template;

use crate::domain::DamageDetail;

pub struct SectionRow {
    pub label: String,
    pub text: String,
}

/// Guest-facing review and sign-off page.
#[derive(Template)]
#[template(path = "review.html")]
pub struct ReviewTemplate {
    pub token: String,
    pub cart_number: String,
    pub property_name: String,
    pub guest_name: String,
    pub inspector_name: String,
    pub inspection_date: String,
    pub status: String,
    pub signed: bool,
    /// Not sent yet, so the guest cannot sign.
    pub awaiting_send: bool,
    pub sections: Vec<SectionRow>,
    pub damages: Vec<DamageDetail>,
    pub notes: String,
    pub pdf_url: String,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub title: String,
    pub message: String,
}

/// Invitation sent to the guest when the inspection goes out for review.
#[derive(Template)]
#[template(path = "email/inspection_review.html")]
pub struct ReviewEmailTemplate {
    pub guest_name: String,
    pub cart_number: String,
    pub inspection_date: String,
    pub inspector_name: String,
    pub review_url: String,
}

/// Notification to the property manager once the guest has signed.
#[derive(Template)]
#[template(path = "email/inspection_signed.html")]
pub struct SignedEmailTemplate {
    pub guest_name: String,
    pub cart_number: String,
    pub signed_at: String,
    pub guest_comments: String,
}
