pub mod auth;
pub mod docs;
pub mod health_check;
pub mod projects;
pub mod tasks;
pub mod users;

pub use health_check::{healthcheck, root};

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    error::{ApiError, ErrorBody},
    model::Id,
    schemas::UserBrief,
    startup::AppState,
};

/// Loads the short form of a user referenced by another row.
pub(crate) async fn user_brief(state: &AppState, user_id: Id) -> Result<UserBrief, ApiError> {
    state
        .store
        .user_by_id(user_id)
        .await?
        .map(|user| UserBrief::from(&user))
        .ok_or_else(|| ApiError::Internal(format!("user {user_id} is referenced but missing")))
}

pub async fn not_found() -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            detail: "Not Found".to_string(),
        }),
    )
}

/// Gives the router's bodiless `405` answers the usual error body. The
/// `Allow` header is kept.
pub async fn method_not_allowed(response: Response) -> Response {
    if response.status() != StatusCode::METHOD_NOT_ALLOWED {
        return response;
    }

    let allow = response.headers().get(header::ALLOW).cloned();
    let mut replaced = (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorBody {
            detail: "Method Not Allowed".to_string(),
        }),
    )
        .into_response();
    if let Some(allow) = allow {
        replaced.headers_mut().insert(header::ALLOW, allow);
    }
    replaced
}
