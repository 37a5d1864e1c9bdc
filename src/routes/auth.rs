use axum::{extract::State, http::StatusCode, Json};

use crate::{
    auth::{hash_password, verify_password, CurrentUser},
    error::ApiError,
    schemas::{LoginForm, Token, UserCreate, UserResponse},
    startup::AppState,
    store::StoreError,
    validate::{ValidForm, ValidJson},
};

#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = UserCreate,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Username already registered", body = ErrorBody),
        (status = 422, description = "Invalid username or password", body = ErrorBody),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<UserCreate>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let hashed = hash_password(input.password).await?;

    let user = match state.store.create_user(&input.username, &hashed).await {
        Ok(user) => user,
        Err(StoreError::Conflict(_)) => {
            return Err(ApiError::bad_request("Username already registered"))
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(user_id = user.id, username = %user.username, "user registered");
    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Access token issued", body = Token),
        (status = 401, description = "Incorrect username or password", body = ErrorBody),
        (status = 422, description = "Missing form fields", body = ErrorBody),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidForm(form): ValidForm<LoginForm>,
) -> Result<Json<Token>, ApiError> {
    let rejected = || ApiError::unauthorized("Incorrect username or password");

    let Some(user) = state.store.user_by_username(&form.username).await? else {
        tracing::debug!(username = %form.username, "login for unknown user");
        return Err(rejected());
    };

    if !verify_password(form.password, user.hashed_password.clone()).await? {
        tracing::debug!(user_id = user.id, "login with wrong password");
        return Err(rejected());
    }

    let token = state
        .tokens
        .issue(user.id)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    tracing::info!(user_id = user.id, "access token issued");
    Ok(Json(Token::bearer(token)))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The authenticated user", body = UserResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
    )
)]
pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from(&user))
}
