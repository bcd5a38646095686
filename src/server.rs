use crate::app::InspectionUseCase;
use crate::error::InspectionError;
use crate::handlers::{
    cart_parts, create_inspection, damage_types, guest_sign, guest_view, health,
    inspection_by_token, list_inspections, properties, report_pdf, review_page, send_for_review,
};
use axum::{
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub use_case: Arc<InspectionUseCase>,
}

impl IntoResponse for InspectionError {
    fn into_response(self) -> Response {
        let status = match &self {
            InspectionError::NotFound(_) => StatusCode::NOT_FOUND,
            InspectionError::Validation(_) | InspectionError::MissingField(_) => {
                StatusCode::BAD_REQUEST
            }
            InspectionError::InvalidState(_) => StatusCode::CONFLICT,
            InspectionError::TokenExpired => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// Build the router with all API, page and media routes.
pub fn create_router(use_case: Arc<InspectionUseCase>, media_root: impl Into<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/inspections", post(create_inspection).get(list_inspections))
        .route("/api/inspections/:id/send", post(send_for_review))
        .route("/api/inspections/token/:token", get(inspection_by_token))
        .route("/api/guest/:token", get(guest_view).post(guest_sign))
        .route("/api/catalog/cart-parts", get(cart_parts))
        .route("/api/catalog/damage-types", get(damage_types))
        .route("/api/catalog/properties", get(properties))
        .route("/api/pdf/:token", get(report_pdf))
        .route("/review/:token", get(review_page))
        .nest_service("/media", ServeDir::new(media_root.into()))
        .with_state(AppState { use_case })
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

/// Start the HTTP server on the given host and port
pub async fn start_server(
    use_case: Arc<InspectionUseCase>,
    media_root: PathBuf,
    host: &str,
    port: u16,
) -> std::io::Result<()> {
    let app = create_router(use_case, media_root);
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("HTTP server running on http://{addr}");
    info!("Health check: http://{addr}/health");

    axum::serve(listener, app).await
}
