use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use eyre;

use crate::store::StoreError;

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    err: eyre::Error,
}

impl HttpError {
    pub fn new(status: StatusCode, err: impl Into<eyre::Error>) -> Self {
        HttpError {
            status,
            err: err.into(),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("{:?}", self.err);
            (self.status, format!("Server error: {}", self.err)).into_response()
        } else {
            (self.status, self.err.to_string()).into_response()
        }
    }
}

macro_rules! impl_from {
    ($from:ty) => {
        impl From<$from> for HttpError {
            fn from(err: $from) -> Self {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, err)
            }
        }
    };
}

impl_from!(std::io::Error);
impl_from!(color_eyre::Report);

impl From<StoreError> for HttpError {
    fn from(err: StoreError) -> Self {
        let status = match &err {
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Conflict(_) => StatusCode::CONFLICT,
            StoreError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            StoreError::Io(_) | StoreError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err)
    }
}

impl From<MultipartError> for HttpError {
    fn from(err: MultipartError) -> Self {
        Self::new(err.status(), eyre::eyre!(err.body_text()))
    }
}

pub type ApiResult<T> = Result<T, HttpError>;

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.err)
    }
}
