use std::sync::Arc;

use axum::{http::Method, Router};
use camino::Utf8Path as Path;
use eyre::{Context, Result};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::MakeRequestUuid,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
    ServiceBuilderExt,
};

use app_state::{AppState, SharedState};
use store::AlbumStore;

pub mod app_state;
pub mod http_error;
pub mod routes;
pub mod store;

/// Opens the album store in `data_dir` and prepares the upload directory next to it
pub async fn open_state(data_dir: &Path, public_url: &str) -> Result<SharedState> {
    let store = AlbumStore::open(data_dir)
        .await
        .wrap_err(format!("Error opening album store in {}", data_dir))?;
    let uploads_dir = data_dir.join("uploads");
    tokio::fs::create_dir_all(&uploads_dir)
        .await
        .wrap_err("Error creating upload directory")?;
    Ok(Arc::new(AppState {
        store,
        uploads_dir,
        public_url: public_url.trim_end_matches('/').to_owned(),
    }))
}

pub fn app(shared_state: SharedState, max_upload_size: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
        .allow_origin(Any);
    let uploads = ServeDir::new(shared_state.uploads_dir.as_std_path());
    Router::new()
        .nest("/albums", routes::album::router())
        .nest("/upload", routes::upload::router(max_upload_size))
        .nest_service("/uploads", uploads)
        .layer(
            ServiceBuilder::new()
                .set_x_request_id(MakeRequestUuid)
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().include_headers(true))
                        .on_response(DefaultOnResponse::new().include_headers(true)),
                )
                .propagate_x_request_id(),
        )
        .layer(cors)
        .with_state(shared_state)
}
