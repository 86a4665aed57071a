use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use folio_core::model::{Album, AlbumId};

use crate::{app_state::SharedState, http_error::ApiResult};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(get_all_albums).post(create_album))
        .route(
            "/:id",
            get(get_album).put(update_album).delete(delete_album),
        )
}

#[tracing::instrument(skip(app_state))]
pub async fn get_all_albums(State(app_state): State<SharedState>) -> ApiResult<Json<Vec<Album>>> {
    Ok(Json(app_state.store.list().await))
}

#[tracing::instrument(skip(app_state))]
pub async fn get_album(
    Path(id): Path<AlbumId>,
    State(app_state): State<SharedState>,
) -> ApiResult<Json<Album>> {
    Ok(Json(app_state.store.get(&id).await?))
}

#[tracing::instrument(skip_all, fields(album_id = %album.id))]
pub async fn create_album(
    State(app_state): State<SharedState>,
    Json(album): Json<Album>,
) -> ApiResult<(StatusCode, Json<Album>)> {
    let created = app_state.store.create(album).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[tracing::instrument(skip(app_state, album))]
pub async fn update_album(
    Path(id): Path<AlbumId>,
    State(app_state): State<SharedState>,
    Json(album): Json<Album>,
) -> ApiResult<Json<Album>> {
    Ok(Json(app_state.store.replace(&id, album).await?))
}

#[tracing::instrument(skip(app_state))]
pub async fn delete_album(
    Path(id): Path<AlbumId>,
    State(app_state): State<SharedState>,
) -> ApiResult<StatusCode> {
    app_state.store.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
