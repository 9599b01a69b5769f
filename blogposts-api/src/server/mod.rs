use axum::{
    Router,
    extract::{
        FromRef,
        rejection::{JsonRejection, PathRejection},
    },
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use blogposts_common::{
    model::{Id, post::PostMarker},
    validation::ValidationError,
};
use blogposts_db::store::{DbError, PostStore};
use json::Json;
use serde::{Deserialize, Serialize};
use std::{io, net::SocketAddr, sync::Arc};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

mod json;
mod routes;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, Debug, FromRef)]
pub struct ServerState {
    pub store: Arc<dyn PostStore>,
}

impl ServerState {
    #[must_use]
    pub fn new(store: Arc<dyn PostStore>) -> Self {
        Self { store }
    }
}

pub fn routes() -> ServerRouter {
    routes::routes()
        .fallback(fallback)
        .method_not_allowed_fallback(fallback)
}

/// The complete application: routes, access logging and state.
pub fn app(state: ServerState) -> Router {
    routes()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn fallback(method: Method, uri: Uri) -> ServerError {
    ServerError::UnknownRoute(method, uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0} {1}")]
    UnknownRoute(Method, Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(..)
            | ServerError::PathRejection(_)
            | ServerError::PostByIdNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::JsonRejection(_) | ServerError::Validation(_) => StatusCode::BAD_REQUEST,
            ServerError::JsonResponse(_) | ServerError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The message shown to clients. Internal failures stay generic.
    pub fn message(&self) -> String {
        match self {
            ServerError::UnknownRoute(..) | ServerError::PathRejection(_) => "Not Found".to_owned(),
            ServerError::JsonResponse(_) | ServerError::Database(_) => {
                "Internal server error".to_owned()
            }
            ServerError::JsonRejection(rejection) => rejection.body_text(),
            ServerError::Validation(_) | ServerError::PostByIdNotFound(_) => self.to_string(),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!(error = %self, %status, "Replying with error");
        } else {
            debug!(error = %self, %status, "Replying with error");
        }

        let error_response = ErrorResponse {
            message: self.message(),
        };
        (status, Json(error_response)).into_response()
    }
}

/// A bound listener together with the application it will serve.
pub struct Server {
    listener: TcpListener,
    app: Router,
}

impl Server {
    pub async fn bind(address: SocketAddr, state: ServerState) -> io::Result<Self> {
        let listener = TcpListener::bind(address).await?;

        Ok(Self {
            listener,
            app: app(state),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves requests until `shutdown` is cancelled, then lets in-flight
    /// requests finish.
    pub async fn run(self, shutdown: CancellationToken) -> io::Result<()> {
        info!(address = %self.local_addr()?, "Listening");

        axum::serve(self.listener, self.app)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await?;

        info!("Server stopped");
        Ok(())
    }
}
