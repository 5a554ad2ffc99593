use crate::{json_body, ApiError, ApiResult, AppState};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use collecthub_core::{
    DocumentStore, Filter, LoginRequest, PasswordHasher, RecordId, User, UserProfile,
};
use serde::Serialize;
use tracing::info;

#[derive(Serialize)]
pub struct CreateUserResponse {
    pub id: RecordId,
    pub name: String,
    pub email: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub user: UserProfile,
}

const PARSE_ERROR: &str = "cannot parse JSON";
const INVALID_LOGIN: &str = "invalid email or password";

async fn find_by_email(state: &AppState, email: &str) -> ApiResult<Option<User>> {
    let document = state
        .store
        .find_one(User::COLLECTION, &Filter::eq("email", email))
        .await
        .map_err(|e| ApiError::internal("failed to find user", e))?;

    document
        .map(User::from_document)
        .transpose()
        .map_err(|e| ApiError::internal("failed to find user", e))
}

// Argon2 is CPU-bound; keep it off the async workers.
async fn hash_password(hasher: &PasswordHasher, password: String) -> ApiResult<String> {
    let hasher = hasher.clone();
    tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|e| ApiError::internal("failed to hash password", e))?
        .map_err(|e| ApiError::internal("failed to hash password", e))
}

async fn verify_password(
    hasher: &PasswordHasher,
    password: String,
    hash: String,
) -> ApiResult<bool> {
    let hasher = hasher.clone();
    let verified = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
        .await
        .map_err(|e| ApiError::internal("failed to verify password", e))?;
    // A stored hash that does not parse can never match.
    Ok(matches!(verified, Ok(true)))
}

/// `POST /api/users`
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<User>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreateUserResponse>)> {
    let mut user = json_body(payload, PARSE_ERROR)?;
    if user.name.is_empty() || user.email.is_empty() || user.password.is_empty() {
        return Err(ApiError::BadRequest(
            "name, email, and password are required".to_string(),
        ));
    }

    if find_by_email(&state, &user.email).await?.is_some() {
        return Err(ApiError::Conflict(
            "user with this email already exists".to_string(),
        ));
    }

    user.id = None;
    user.password = hash_password(&state.hasher, std::mem::take(&mut user.password)).await?;

    let document = user.to_document()?;
    let id = state
        .store
        .insert_one(User::COLLECTION, document)
        .await
        .map_err(|e| ApiError::internal("failed to insert user", e))?;

    info!("Registered user {}", id);
    Ok((
        StatusCode::CREATED,
        Json(CreateUserResponse {
            id,
            name: user.name,
            email: user.email,
            message: "user created successfully".to_string(),
        }),
    ))
}

/// `GET /api/users`, without password hashes.
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<UserProfile>>> {
    let documents = state
        .store
        .find(User::COLLECTION, &Filter::all())
        .await
        .map_err(|e| ApiError::internal("failed to fetch users", e))?;

    let users = documents
        .into_iter()
        .map(|document| User::from_document(document).map(|user| user.profile()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ApiError::internal("failed to decode users", e))?;

    Ok(Json(users))
}

/// `POST /api/users/login`
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let request = json_body(payload, PARSE_ERROR)?;
    if request.email.is_empty() || request.password.is_empty() {
        return Err(ApiError::BadRequest(
            "email and password are required".to_string(),
        ));
    }

    let user = find_by_email(&state, &request.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_LOGIN.to_string()))?;

    if !verify_password(&state.hasher, request.password, user.password.clone()).await? {
        return Err(ApiError::Unauthorized(INVALID_LOGIN.to_string()));
    }

    Ok(Json(LoginResponse {
        message: "login successful".to_string(),
        user: user.profile(),
    }))
}
