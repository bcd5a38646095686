use crate::domain::requests::{
    CreateInspectionRequest, CreateInspectionResponse, GuestSignRequest, GuestSignResponse,
    GuestView, InspectionDetail, InspectionFilter, InspectionSummary, SendInspectionResponse,
};
use crate::constants::{section_part_name, DAMAGE_SECTIONS};
use crate::domain::{CartPart, DamageType, Inspection, InspectionStatus, Property};
use crate::error::{InspectionError, Result};
use crate::report::InspectionReport;
use crate::server::AppState;
use crate::templates::{ErrorTemplate, ReviewTemplate, SectionRow};
use askama::Template;
use axum::{
    extract::{FromRequest, Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};

/// JSON body whose rejections come back as 400 with an `{"error": ...}` body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(InspectionError))]
pub struct ApiJson<T>(pub T);

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "cart-inspections",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub async fn create_inspection(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateInspectionRequest>,
) -> Result<Json<CreateInspectionResponse>> {
    Ok(Json(state.use_case.create_inspection(request).await?))
}

pub async fn list_inspections(
    State(state): State<AppState>,
    Query(filter): Query<InspectionFilter>,
) -> Result<Json<Vec<InspectionSummary>>> {
    Ok(Json(state.use_case.list_inspections(filter).await?))
}

pub async fn send_for_review(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SendInspectionResponse>> {
    // The email task keeps running after the handle is dropped.
    let outcome = state.use_case.send_for_review(id).await?;
    Ok(Json(outcome.response))
}

pub async fn inspection_by_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<InspectionDetail>> {
    Ok(Json(state.use_case.inspection_by_token(&token).await?))
}

pub async fn guest_view(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<GuestView>> {
    Ok(Json(state.use_case.guest_view(&token).await?))
}

pub async fn guest_sign(
    State(state): State<AppState>,
    Path(token): Path<String>,
    ApiJson(request): ApiJson<GuestSignRequest>,
) -> Result<Json<GuestSignResponse>> {
    let outcome = state.use_case.guest_sign(&token, request).await?;
    Ok(Json(outcome.response))
}

pub async fn cart_parts(State(state): State<AppState>) -> Result<Json<Vec<CartPart>>> {
    Ok(Json(state.use_case.cart_parts().await?))
}

pub async fn damage_types(State(state): State<AppState>) -> Result<Json<Vec<DamageType>>> {
    Ok(Json(state.use_case.damage_types().await?))
}

pub async fn properties(State(state): State<AppState>) -> Result<Json<Vec<Property>>> {
    Ok(Json(state.use_case.properties().await?))
}

pub async fn report_pdf(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Response> {
    let rendered = state.use_case.report_pdf(&token).await?;
    let disposition = format!("attachment; filename=\"{}\"", rendered.filename);
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        rendered.bytes,
    )
        .into_response())
}

fn section_rows(inspection: &Inspection) -> Vec<SectionRow> {
    DAMAGE_SECTIONS
        .iter()
        .map(|section| SectionRow {
            label: section_part_name(section),
            text: inspection.section_damage(section).to_string(),
        })
        .filter(|row| !row.text.is_empty())
        .collect()
}

fn render_review(token: &str, report: InspectionReport) -> Result<String> {
    let inspection = &report.inspection;
    let template = ReviewTemplate {
        token: token.to_string(),
        cart_number: inspection.cart_number.clone(),
        property_name: report
            .property
            .as_ref()
            .map(|p| p.name.clone())
            .unwrap_or_default(),
        guest_name: inspection.guest_name.clone(),
        inspector_name: inspection.inspector_name.clone(),
        inspection_date: inspection.inspection_date.format("%d/%m/%Y").to_string(),
        status: inspection.status.to_string(),
        signed: inspection.status == InspectionStatus::Signed,
        awaiting_send: inspection.status == InspectionStatus::Pending,
        sections: section_rows(inspection),
        notes: inspection.additional_notes.clone(),
        pdf_url: format!("/api/pdf/{token}"),
        damages: report.damages,
    };
    Ok(template.render()?)
}

fn error_page(status: StatusCode, title: &str, message: &str) -> Response {
    let template = ErrorTemplate {
        title: title.to_string(),
        message: message.to_string(),
    };
    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(_) => (status, Html(format!("<h1>{title}</h1>"))).into_response(),
    }
}

/// Server-rendered page the guest opens from the review email.
pub async fn review_page(State(state): State<AppState>, Path(token): Path<String>) -> Response {
    let rendered = state
        .use_case
        .guest_report(&token)
        .await
        .and_then(|report| render_review(&token, report));
    match rendered {
        Ok(html) => Html(html).into_response(),
        Err(InspectionError::NotFound(_)) => error_page(
            StatusCode::NOT_FOUND,
            "Inspection not found",
            "This review link is invalid or the inspection no longer exists.",
        ),
        Err(InspectionError::TokenExpired) => error_page(
            StatusCode::FORBIDDEN,
            "This review link has expired",
            "Please ask the rental desk to send you a new link.",
        ),
        Err(e) => {
            tracing::error!(error = %e, "Review page failed");
            error_page(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong",
                "The inspection could not be displayed. Please try again later.",
            )
        }
    }
}
