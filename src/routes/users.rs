use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    auth::CurrentUser,
    error::ApiError,
    schemas::{SearchParams, UserBrief},
    startup::AppState,
};

const SEARCH_LIMIT: usize = 10;

/// Finds users by username fragment, used when adding project members.
#[utoipa::path(
    get,
    path = "/api/users/search",
    tag = "users",
    security(("bearer" = [])),
    params(
        ("q" = String, Query, description = "Case-insensitive username fragment")
    ),
    responses(
        (status = 200, description = "Up to ten matching users", body = [UserBrief]),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 422, description = "Missing or empty query", body = ErrorBody),
    )
)]
pub async fn search_users(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<UserBrief>>, ApiError> {
    let q = match params.q {
        Some(q) if !q.is_empty() => q,
        Some(_) => return Err(ApiError::validation("q should have at least 1 characters")),
        None => return Err(ApiError::validation("q is required")),
    };

    let users = state.store.search_users(&q, SEARCH_LIMIT).await?;
    Ok(Json(users.iter().map(UserBrief::from).collect()))
}
