use axum::extract::rejection::JsonRejection;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InspectionError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Template rendering failed: {0}")]
    Template(#[from] askama::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("The field {0} is required")]
    MissingField(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Access link has expired")]
    TokenExpired,

    #[error("Media upload failed: {0}")]
    Media(String),

    #[error("Email delivery failed: {0}")]
    Mail(String),

    #[error("PDF generation failed: {0}")]
    Pdf(String),

    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl From<JsonRejection> for InspectionError {
    fn from(rejection: JsonRejection) -> Self {
        InspectionError::Validation(rejection.body_text())
    }
}

pub type Result<T> = std::result::Result<T, InspectionError>;
