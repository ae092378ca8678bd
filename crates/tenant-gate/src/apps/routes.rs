//! Admin JSON API over the app directory

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use uuid::Uuid;

use super::directory::AppDirectory;
use super::error::AppError;
use super::model::{App, AppInput, Page, PageRequest};
use crate::auth::Claims;
use crate::constants::MAX_JSON_BODY_BYTES;

/// Routes for `/v1/apps`; expects the claims middleware to run first
pub fn router(directory: AppDirectory) -> Router {
    Router::new()
        .route("/v1/apps", get(list_apps).post(create_app))
        .route(
            "/v1/apps/{id}",
            get(get_app).put(update_app).delete(delete_app),
        )
        .with_state(directory)
}

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    page: Option<u32>,
    page_size: Option<u32>,
}

type MaybeClaims = Option<Extension<Claims>>;

async fn list_apps(
    State(directory): State<AppDirectory>,
    claims: MaybeClaims,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<App>>, ApiError> {
    let claims = authenticated(claims)?;
    let page = PageRequest::new(query.page, query.page_size);
    Ok(Json(directory.list(Some(&claims), page).await?))
}

async fn create_app(
    State(directory): State<AppDirectory>,
    claims: MaybeClaims,
    body: Body,
) -> Result<(StatusCode, Json<App>), ApiError> {
    let claims = authenticated(claims)?;
    let owner = claims.user_id().ok_or_else(|| {
        tracing::warn!(sub = %claims.sub, "Subject is not a user id");
        ApiError::Unauthorized
    })?;
    let input: AppInput = read_json(body).await?;

    let app = directory.create(Some(&claims), owner, input).await?;
    Ok((StatusCode::CREATED, Json(app)))
}

async fn get_app(
    State(directory): State<AppDirectory>,
    claims: MaybeClaims,
    Path(id): Path<Uuid>,
) -> Result<Json<App>, ApiError> {
    let claims = authenticated(claims)?;
    Ok(Json(directory.get(Some(&claims), id).await?))
}

async fn update_app(
    State(directory): State<AppDirectory>,
    claims: MaybeClaims,
    Path(id): Path<Uuid>,
    body: Body,
) -> Result<Json<App>, ApiError> {
    let claims = authenticated(claims)?;
    let input: AppInput = read_json(body).await?;
    Ok(Json(directory.update(Some(&claims), id, input).await?))
}

async fn delete_app(
    State(directory): State<AppDirectory>,
    claims: MaybeClaims,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let claims = authenticated(claims)?;
    directory.delete(Some(&claims), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn authenticated(claims: MaybeClaims) -> Result<Claims, ApiError> {
    claims.map(|Extension(c)| c).ok_or(ApiError::Unauthorized)
}

/// Oversized bodies are cut off before parsing and reported as malformed
async fn read_json<T: DeserializeOwned>(body: Body) -> Result<T, ApiError> {
    let bytes = axum::body::to_bytes(body, MAX_JSON_BODY_BYTES)
        .await
        .map_err(|_| ApiError::InvalidJson)?;
    serde_json::from_slice(&bytes).map_err(|_| ApiError::InvalidJson)
}

#[derive(Debug)]
enum ApiError {
    Unauthorized,
    InvalidJson,
    App(AppError),
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self::App(err)
    }
}

const fn app_error_code(err: &AppError) -> &'static str {
    match err {
        AppError::NameRequired => "name_required",
        AppError::InvalidRateLimit => "invalid_rate_limit",
        AppError::OwnerNotFound => "owner_not_found",
        AppError::NotFound => "not_found",
        AppError::Store(_) => "internal_error",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, description) = match &self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            Self::InvalidJson => (StatusCode::BAD_REQUEST, "invalid_json", None),
            Self::App(err) => {
                let status = if err.is_validation() {
                    StatusCode::BAD_REQUEST
                } else if err.is_not_found() {
                    StatusCode::NOT_FOUND
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                // logged by the directory; store details stay server-side
                let description = (!err.is_store()).then_some(err);
                (status, app_error_code(err), description)
            }
        };

        let body = match description {
            Some(err) => json!({ "error": code, "error_description": err.to_string() }),
            None => json!({ "error": code }),
        };
        (status, Json(body)).into_response()
    }
}
