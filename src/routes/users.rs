use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, OriginalUri, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_macros::debug_handler;
use log::{debug, info};

use super::{decode, location, parse_id, ApiError, AppState};
use crate::{
    auth,
    model::{
        database,
        user::{Mode, User},
    },
};

#[debug_handler]
pub async fn create(
    State(state): State<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
    body: Result<Json<User>, JsonRejection>,
) -> Result<Response, ApiError> {
    let mut user = decode(body)?;

    user.validate(Mode::Default)?;
    user.password_hash = hash_password(user.password.clone()).await?;

    let mut user = state.users.create(&state.context(), user).await?;
    user.password.clear();

    info!("Created user {}: {}", user.id, user.username);

    let location = location(&uri, user.id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(user)).into_response())
}

#[debug_handler]
pub async fn get_all(State(state): State<Arc<AppState>>) -> Result<Json<Vec<User>>, ApiError> {
    let users = state.users.get_all_users(&state.context()).await?;
    Ok(Json(users))
}

#[debug_handler]
pub async fn get_one(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let id = parse_id(&id)?;
    let user = state.users.get_one(&state.context(), id).await?;
    Ok(Json(user))
}

#[debug_handler]
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<User>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    let user = decode(body)?;

    // Username and password are required here too, even though only the
    // names, email and picture are written.
    user.validate(Mode::Default)?;

    state.users.update(&state.context(), id, &user).await?;

    info!("Updated user {}", id);
    Ok(StatusCode::OK)
}

#[debug_handler]
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    state.users.delete(&state.context(), id).await?;

    info!("Deleted user {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Check a username, email and password against the stored user.
///
/// Nothing is issued on success; the stored user is returned.
#[debug_handler]
pub async fn login(
    State(state): State<Arc<AppState>>,
    body: Result<Json<User>, JsonRejection>,
) -> Result<Json<User>, ApiError> {
    let credentials = decode(body)?;
    credentials.validate(Mode::Login)?;

    debug!("Got login request for user: {}", credentials.username);

    let mut user = match state
        .users
        .get_by_username(&state.context(), &credentials.username)
        .await
    {
        Ok(user) => user,
        Err(database::Error::NotFound(_)) => {
            debug!("User not found: {}", credentials.username);
            return Err(ApiError::Unauthorized);
        }
        Err(err) => return Err(err.into()),
    };

    if user.email != credentials.email {
        debug!("Email does not match for user: {}", user.username);
        return Err(ApiError::Unauthorized);
    }

    let hash = std::mem::take(&mut user.password_hash);
    if !check_password(credentials.password, hash).await? {
        debug!("Password incorrect for user: {}", user.username);
        return Err(ApiError::Unauthorized);
    }

    Ok(Json(user))
}

async fn hash_password(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || auth::hash::hash_password(&password))
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?
        .map_err(|err| ApiError::BadRequest(err.to_string()))
}

async fn check_password(password: String, hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || auth::hash::check_passwords(&password, &hash))
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))
}
