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
use crate::model::Post;

#[debug_handler]
pub async fn create(
    State(state): State<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
    body: Result<Json<Post>, JsonRejection>,
) -> Result<Response, ApiError> {
    let post = decode(body)?;

    let post = state
        .posts
        .create(&state.context(), post)
        .await
        .map_err(ApiError::rejected_input)?;

    info!("Created post {} for user {}", post.id, post.user_id);

    let location = location(&uri, post.id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(post)).into_response())
}

#[debug_handler]
pub async fn get_all(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Post>>, ApiError> {
    let posts = state.posts.get_all(&state.context()).await?;
    Ok(Json(posts))
}

#[debug_handler]
pub async fn get_one(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Post>, ApiError> {
    let id = parse_id(&id)?;
    let post = state.posts.get_one(&state.context(), id).await?;
    Ok(Json(post))
}

/// Posts of one user. Having none at all answers 404.
#[debug_handler]
pub async fn get_by_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let user_id = parse_id(&user_id)?;
    let posts = state.posts.get_by_user(&state.context(), user_id).await?;

    if posts.is_empty() {
        debug!("User {} has no posts", user_id);
        return Err(ApiError::NotFound("Post not found".to_string()));
    }

    Ok(Json(posts))
}

#[debug_handler]
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<Post>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    let post = decode(body)?;

    state
        .posts
        .update(&state.context(), id, &post)
        .await
        .map_err(ApiError::rejected_input)?;

    info!("Updated post {}", id);
    Ok(StatusCode::OK)
}

#[debug_handler]
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    state.posts.delete(&state.context(), id).await?;

    info!("Deleted post {}", id);
    Ok(StatusCode::NO_CONTENT)
}
