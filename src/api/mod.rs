//! HTTP surface. Handlers stay thin: resolve the caller, load through the
//! role-scoped gateway, run the workflow guard, persist, respond.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::{header, request::Parts, HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use futures::Stream;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::db::{Database, StoreError};
use crate::export::{self, ExportError};
use crate::integrations::{GoogleClient, IntegrationError};
use crate::models::{
    ApproveReportInput, CreateRealizationInput, RejectReportInput, ReviewRabInput,
    SaveMemoInput, SaveRabInput, SaveRealizationItemsInput, SaveReportInput, SessionContext,
    SignInInput, SignUpInput, UpdateProfileInput,
};
use crate::workflow::{self, WorkflowError};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub google: Option<Arc<GoogleClient>>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/auth/signup", post(sign_up))
        .route("/auth/signin", post(sign_in))
        .route("/auth/signout", post(sign_out))
        .route("/auth/password-reset/request", post(request_password_reset))
        .route("/auth/password-reset/confirm", post(confirm_password_reset))
        .route("/views", get(list_views))
        .route("/profiles", get(list_profiles))
        .route("/profiles/me", get(get_me))
        .route("/profiles/{id}", put(update_profile))
        .route("/reports", get(list_reports).post(save_report))
        .route("/reports/events", get(report_events))
        .route("/reports/{id}", get(get_report).delete(delete_report))
        .route("/reports/{id}/submit", post(submit_report))
        .route("/reports/{id}/approve", post(approve_report))
        .route("/reports/{id}/reject", post(reject_report))
        .route("/reports/{id}/export/pdf", get(report_pdf))
        .route("/reports/{id}/export/spreadsheet", get(report_spreadsheet))
        .route("/reports/{id}/export/google-drive", post(report_to_google_drive))
        .route("/rabs", get(list_rabs).post(save_rab))
        .route("/rabs/{id}", get(get_rab).delete(delete_rab))
        .route("/rabs/{id}/submit", post(submit_rab))
        .route("/rabs/{id}/approve", post(approve_rab))
        .route("/rabs/{id}/reject", post(reject_rab))
        .route("/rabs/{id}/export/pdf", get(rab_pdf))
        .route("/rabs/{id}/export/spreadsheet", get(rab_spreadsheet))
        .route("/rabs/{id}/export/google-sheet", post(rab_to_google_sheet))
        .route("/realizations", get(list_realizations).post(create_realization))
        .route("/realizations/{id}", get(get_realization))
        .route("/realizations/{id}/items", put(save_realization_items))
        .route("/realizations/{id}/submit", post(submit_realization))
        .route("/realizations/{id}/approve", post(approve_realization))
        .route("/realizations/{id}/complete", post(complete_realization))
        .route("/memos", get(list_memos).post(save_memo))
        .route("/memos/{id}", get(get_memo).delete(delete_memo))
        .route("/memos/{id}/finalize", post(finalize_memo))
        .route("/memos/{id}/send", post(send_memo))
        .route("/memos/{id}/duplicate", post(duplicate_memo))
        .route("/integrations/google/authorize", get(google_authorize))
        .route("/integrations/google/callback", post(google_callback))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// -----------------------------------------------------------------------------
// Errors
// -----------------------------------------------------------------------------

#[derive(Debug)]
pub enum ApiError {
    Workflow(WorkflowError),
    Store(StoreError),
    Export(ExportError),
    Integration(IntegrationError),
    Unauthorized,
    NotFound,
    IntegrationUnavailable,
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        Self::Workflow(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        Self::Export(err)
    }
}

impl From<IntegrationError> for ApiError {
    fn from(err: IntegrationError) -> Self {
        Self::Integration(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            // Authorization failures stay generic: no detail about which
            // guard tripped.
            Self::Workflow(WorkflowError::Forbidden) | Self::Store(StoreError::Forbidden) => {
                (StatusCode::FORBIDDEN, "permission denied".to_string())
            }
            Self::Workflow(err) => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
            Self::Store(StoreError::NotFound(_)) | Self::NotFound => {
                (StatusCode::NOT_FOUND, "not found".to_string())
            }
            Self::Store(StoreError::UsernameTaken) => {
                (StatusCode::CONFLICT, StoreError::UsernameTaken.to_string())
            }
            Self::Store(StoreError::InvalidCredentials) => {
                (StatusCode::UNAUTHORIZED, StoreError::InvalidCredentials.to_string())
            }
            Self::Store(StoreError::InvalidToken) | Self::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "invalid or expired token".to_string())
            }
            Self::Store(err) => {
                tracing::error!(error = %err, "store failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
            Self::Export(err) => {
                tracing::error!(error = %err, "export failure");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            Self::Integration(err) => {
                tracing::warn!(error = %err, "integration failure");
                (StatusCode::BAD_GATEWAY, err.to_string())
            }
            Self::IntegrationUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "google integration not configured".to_string(),
            ),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

// -----------------------------------------------------------------------------
// Actor extraction
// -----------------------------------------------------------------------------

impl FromRequestParts<AppState> for SessionContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(ApiError::Unauthorized)?;
        Ok(state.db.resolve_session(&token)?)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
}

// -----------------------------------------------------------------------------
// Auth
// -----------------------------------------------------------------------------

async fn sign_up(
    State(state): State<AppState>,
    Json(input): Json<SignUpInput>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.db.sign_up(input)?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn sign_in(
    State(state): State<AppState>,
    Json(input): Json<SignInInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.db.sign_in(input)?))
}

async fn sign_out(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    if let Some(token) = bearer_token(&headers) {
        state.db.sign_out(&token)?;
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct ResetRequestInput {
    username: String,
}

/// Issues the reset token. Handing it to the mailer is the deployment's
/// job; it is returned here so the flow is completable without one.
async fn request_password_reset(
    State(state): State<AppState>,
    Json(input): Json<ResetRequestInput>,
) -> Result<impl IntoResponse, ApiError> {
    let token = state.db.request_password_reset(&input.username)?;
    Ok(Json(json!({ "reset_token": token })))
}

#[derive(Deserialize)]
struct ResetConfirmInput {
    token: String,
    new_password: String,
}

async fn confirm_password_reset(
    State(state): State<AppState>,
    Json(input): Json<ResetConfirmInput>,
) -> Result<StatusCode, ApiError> {
    state.db.confirm_password_reset(&input.token, &input.new_password)?;
    Ok(StatusCode::NO_CONTENT)
}

// -----------------------------------------------------------------------------
// Views and profiles
// -----------------------------------------------------------------------------

async fn list_views(ctx: SessionContext) -> impl IntoResponse {
    Json(crate::access::visible_views(ctx.role))
}

async fn list_profiles(
    State(state): State<AppState>,
    ctx: SessionContext,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.db.list_profiles(&ctx)?))
}

async fn get_me(
    State(state): State<AppState>,
    ctx: SessionContext,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state.db.get_profile(ctx.user_id)?.ok_or(ApiError::NotFound)?;
    Ok(Json(profile))
}

async fn update_profile(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateProfileInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.db.update_profile(&ctx, id, input)?))
}

// -----------------------------------------------------------------------------
// Reports
// -----------------------------------------------------------------------------

async fn list_reports(
    State(state): State<AppState>,
    ctx: SessionContext,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.db.fetch_reports(&ctx)?))
}

async fn save_report(
    State(state): State<AppState>,
    ctx: SessionContext,
    Json(input): Json<SaveReportInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.db.save_report(&ctx, input)?))
}

async fn get_report(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.db.get_report(&ctx, id)?.ok_or(ApiError::NotFound)?;
    Ok(Json(report))
}

async fn delete_report(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.db.delete_report(&ctx, id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn submit_report(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut report = state.db.get_report(&ctx, id)?.ok_or(ApiError::NotFound)?;
    workflow::submit_report(&ctx, &mut report, Utc::now())?;
    state.db.persist_report_transition(&report)?;
    Ok(Json(report))
}

async fn approve_report(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
    Json(input): Json<ApproveReportInput>,
) -> Result<impl IntoResponse, ApiError> {
    let mut report = state.db.get_report(&ctx, id)?.ok_or(ApiError::NotFound)?;
    workflow::approve_report(&ctx, &mut report, input)?;
    state.db.persist_report_transition(&report)?;
    Ok(Json(report))
}

async fn reject_report(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
    Json(input): Json<RejectReportInput>,
) -> Result<impl IntoResponse, ApiError> {
    let mut report = state.db.get_report(&ctx, id)?.ok_or(ApiError::NotFound)?;
    workflow::reject_report(&ctx, &mut report, input)?;
    state.db.persist_report_transition(&report)?;
    Ok(Json(report))
}

async fn report_events(
    State(state): State<AppState>,
    _ctx: SessionContext,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.db.subscribe_reports();
    let stream = futures::stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(change) => {
                    let Ok(event) = Event::default()
                        .event(change.op.as_str())
                        .json_data(change)
                    else {
                        continue;
                    };
                    return Some((Ok::<_, Infallible>(event), rx));
                }
                // A lagged subscriber missed events; it should refetch the
                // list, which the next event will prompt anyway.
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return None,
            }
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

// -----------------------------------------------------------------------------
// RABs
// -----------------------------------------------------------------------------

async fn list_rabs(
    State(state): State<AppState>,
    ctx: SessionContext,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.db.fetch_rabs(&ctx)?))
}

async fn save_rab(
    State(state): State<AppState>,
    ctx: SessionContext,
    Json(input): Json<SaveRabInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.db.save_rab(&ctx, input)?))
}

async fn get_rab(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let rab = state.db.get_rab(&ctx, id)?.ok_or(ApiError::NotFound)?;
    Ok(Json(rab))
}

async fn delete_rab(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.db.delete_rab(&ctx, id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn submit_rab(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rab = state.db.get_rab(&ctx, id)?.ok_or(ApiError::NotFound)?;
    workflow::submit_rab(&ctx, &mut rab, Utc::now())?;
    state.db.persist_rab_transition(&rab)?;
    Ok(Json(rab))
}

async fn approve_rab(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
    Json(input): Json<ReviewRabInput>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rab = state.db.get_rab(&ctx, id)?.ok_or(ApiError::NotFound)?;
    workflow::approve_rab(&ctx, &mut rab, input, Utc::now())?;
    state.db.persist_rab_transition(&rab)?;
    Ok(Json(rab))
}

async fn reject_rab(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
    Json(input): Json<ReviewRabInput>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rab = state.db.get_rab(&ctx, id)?.ok_or(ApiError::NotFound)?;
    workflow::reject_rab(&ctx, &mut rab, input, Utc::now())?;
    state.db.persist_rab_transition(&rab)?;
    Ok(Json(rab))
}

// -----------------------------------------------------------------------------
// Realizations
// -----------------------------------------------------------------------------

async fn list_realizations(
    State(state): State<AppState>,
    ctx: SessionContext,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.db.fetch_realizations(&ctx)?))
}

async fn create_realization(
    State(state): State<AppState>,
    ctx: SessionContext,
    Json(input): Json<CreateRealizationInput>,
) -> Result<impl IntoResponse, ApiError> {
    // Run the workflow guard against the loaded plan first so the status
    // check fails with its user-visible message.
    let rab = state.db.get_rab(&ctx, input.rab_id)?.ok_or(ApiError::NotFound)?;
    workflow::ensure_realization_creatable(&ctx, &rab)?;
    let realization = state.db.create_realization(&ctx, input.rab_id)?;
    Ok((StatusCode::CREATED, Json(realization)))
}

async fn get_realization(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let realization = state.db.get_realization(&ctx, id)?.ok_or(ApiError::NotFound)?;
    Ok(Json(realization))
}

async fn save_realization_items(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
    Json(input): Json<SaveRealizationItemsInput>,
) -> Result<impl IntoResponse, ApiError> {
    let realization = state.db.get_realization(&ctx, id)?.ok_or(ApiError::NotFound)?;
    workflow::ensure_realization_items_editable(&ctx, &realization)?;
    Ok(Json(state.db.save_realization_items(&ctx, id, input)?))
}

async fn submit_realization(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut realization = state.db.get_realization(&ctx, id)?.ok_or(ApiError::NotFound)?;
    workflow::submit_realization(&ctx, &mut realization)?;
    state.db.persist_realization_transition(&realization)?;
    Ok(Json(realization))
}

async fn approve_realization(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut realization = state.db.get_realization(&ctx, id)?.ok_or(ApiError::NotFound)?;
    workflow::approve_realization(&ctx, &mut realization)?;
    state.db.persist_realization_transition(&realization)?;
    Ok(Json(realization))
}

async fn complete_realization(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut realization = state.db.get_realization(&ctx, id)?.ok_or(ApiError::NotFound)?;
    workflow::complete_realization(&ctx, &mut realization)?;
    state.db.persist_realization_transition(&realization)?;
    Ok(Json(realization))
}

// -----------------------------------------------------------------------------
// Memos
// -----------------------------------------------------------------------------

async fn list_memos(
    State(state): State<AppState>,
    ctx: SessionContext,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.db.fetch_memos(&ctx)?))
}

async fn save_memo(
    State(state): State<AppState>,
    ctx: SessionContext,
    Json(input): Json<SaveMemoInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.db.save_memo(&ctx, input)?))
}

async fn get_memo(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let memo = state.db.get_memo(&ctx, id)?.ok_or(ApiError::NotFound)?;
    Ok(Json(memo))
}

async fn delete_memo(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.db.delete_memo(&ctx, id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn finalize_memo(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut memo = state.db.get_memo(&ctx, id)?.ok_or(ApiError::NotFound)?;
    workflow::finalize_memo(&ctx, &mut memo)?;
    state.db.persist_memo_transition(&memo)?;
    Ok(Json(memo))
}

async fn send_memo(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut memo = state.db.get_memo(&ctx, id)?.ok_or(ApiError::NotFound)?;
    workflow::send_memo_to_foundation(&ctx, &mut memo)?;
    state.db.persist_memo_transition(&memo)?;
    Ok(Json(memo))
}

async fn duplicate_memo(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let memo = state.db.get_memo(&ctx, id)?.ok_or(ApiError::NotFound)?;
    let copy = workflow::duplicate_memo(&ctx, &memo, Utc::now().date_naive())?;
    state.db.insert_duplicated_memo(&copy)?;
    Ok((StatusCode::CREATED, Json(copy)))
}

// -----------------------------------------------------------------------------
// Exports
// -----------------------------------------------------------------------------

async fn report_pdf(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let report = state.db.get_report(&ctx, id)?.ok_or(ApiError::NotFound)?;
    let bytes = export::report_pdf(&report)?;
    let name = export::export_file_name(
        &["laporan", &report.school_name, report.period.label()],
        "pdf",
    );
    Ok(download_response(bytes, "application/pdf", &name))
}

async fn report_spreadsheet(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let report = state.db.get_report(&ctx, id)?.ok_or(ApiError::NotFound)?;
    let workbook = export::report_workbook(&report);
    let name = export::export_file_name(
        &["laporan", &report.school_name, report.period.label()],
        "csv",
    );
    Ok(download_response(workbook.to_csv_bytes(), "text/csv", &name))
}

async fn rab_pdf(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let rab = state.db.get_rab(&ctx, id)?.ok_or(ApiError::NotFound)?;
    let bytes = export::rab_pdf(&rab)?;
    let name = export::export_file_name(&["rab", &rab.institution_name, &rab.period], "pdf");
    Ok(download_response(bytes, "application/pdf", &name))
}

async fn rab_spreadsheet(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let rab = state.db.get_rab(&ctx, id)?.ok_or(ApiError::NotFound)?;
    let workbook = export::rab_workbook(&rab);
    let name = export::export_file_name(&["rab", &rab.institution_name, &rab.period], "csv");
    Ok(download_response(workbook.to_csv_bytes(), "text/csv", &name))
}

fn download_response(bytes: Vec<u8>, content_type: &str, file_name: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

// -----------------------------------------------------------------------------
// Google integration
// -----------------------------------------------------------------------------

#[derive(Deserialize)]
struct AuthorizeQuery {
    #[serde(default)]
    state: String,
}

async fn google_authorize(
    State(state): State<AppState>,
    _ctx: SessionContext,
    Query(query): Query<AuthorizeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let google = state.google.as_ref().ok_or(ApiError::IntegrationUnavailable)?;
    Ok(Json(json!({ "authorize_url": google.authorize_url(&query.state) })))
}

#[derive(Deserialize)]
struct CallbackInput {
    code: String,
}

async fn google_callback(
    State(state): State<AppState>,
    _ctx: SessionContext,
    Json(input): Json<CallbackInput>,
) -> Result<StatusCode, ApiError> {
    let google = state.google.as_ref().ok_or(ApiError::IntegrationUnavailable)?;
    google.exchange_code(&input.code).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize, Default)]
struct DriveUploadInput {
    #[serde(default)]
    folder_id: Option<String>,
}

async fn report_to_google_drive(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
    Json(input): Json<DriveUploadInput>,
) -> Result<impl IntoResponse, ApiError> {
    let google = state.google.as_ref().ok_or(ApiError::IntegrationUnavailable)?;
    let report = state.db.get_report(&ctx, id)?.ok_or(ApiError::NotFound)?;
    let bytes = export::report_pdf(&report)?;
    let name = export::export_file_name(
        &["laporan", &report.school_name, report.period.label()],
        "pdf",
    );
    let file_id = google
        .upload_file(&name, "application/pdf", bytes, input.folder_id.as_deref())
        .await?;
    Ok(Json(json!({ "file_id": file_id })))
}

async fn rab_to_google_sheet(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let google = state.google.as_ref().ok_or(ApiError::IntegrationUnavailable)?;
    let rab = state.db.get_rab(&ctx, id)?.ok_or(ApiError::NotFound)?;
    let workbook = export::rab_workbook(&rab);
    let spreadsheet_id = google.create_and_populate_spreadsheet(&workbook).await?;
    Ok(Json(json!({ "spreadsheet_id": spreadsheet_id })))
}
