use crate::{
    app::{App, AppError},
    auth::{self, AuthContext},
    records::{ArchivedRecord, Collection, Record},
    search::SearchOutcome,
};
use axum::{
    extract::{DefaultBodyLimit, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::signal;

#[derive(Clone)]
struct SharedState {
    app: Arc<App>,
}

async fn start_app(app: App) {
    let uploads_dir = app.config().read().unwrap().uploads_dir();
    let app = Arc::new(app);

    let shared_state = Arc::new(SharedState { app });

    async fn shutdown_signal() {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    }

    let router = router(shared_state).nest_service(
        "/api/file/",
        tower_http::services::ServeDir::new(uploads_dir),
    );

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await.unwrap();
    log::info!("listening on 0.0.0.0:8080");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

fn router(state: Arc<SharedState>) -> Router {
    Router::new()
        .route("/api/records/search", post(search))
        .route("/api/records/create", post(create))
        .route("/api/records/archive", post(archive))
        .route("/api/records/restore", post(restore))
        .route("/api/records/list", post(list))
        .layer(DefaultBodyLimit::max(100 * 1024 * 1024))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(state)
}

pub fn start_daemon(app: App) {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(async { start_app(app).await });
}

#[cfg(test)]
pub(crate) fn test_router(app: Arc<App>) -> Router {
    router(Arc::new(SharedState { app }))
}

#[derive(Debug)]
struct HttpError(AppError);

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        match self.0 {
            AppError::NotAuthorized => (
                axum::http::StatusCode::UNAUTHORIZED,
                json!({"error": self.0.to_string()}).to_string(),
            ),
            AppError::InvalidScreenshot => (
                axum::http::StatusCode::BAD_REQUEST,
                json!({"error": self.0.to_string()}).to_string(),
            ),
            AppError::Base64(_) => {
                log::error!("{self:?}");
                (
                    axum::http::StatusCode::BAD_REQUEST,
                    json!({"error": self.0.to_string()}).to_string(),
                )
            }
            AppError::Store(crate::records::StoreError::Validation(_)) => (
                axum::http::StatusCode::UNPROCESSABLE_ENTITY,
                json!({"error": self.0.to_string()}).to_string(),
            ),
            AppError::Store(_) | AppError::Io(_) | AppError::Other(_) => {
                log::error!("{self:?}");
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": self.0.to_string()}).to_string(),
                )
            }
        }
        .into_response()
    }
}

impl<E> From<E> for HttpError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

/// Resolve the request's bearer token into an auth context. Mutating routes
/// demand an admin context; without a configured api_token every mutation is
/// refused.
fn request_context(state: &SharedState, headers: &HeaderMap) -> AuthContext {
    let expected = {
        let config = state.app.config();
        let config = config.read().unwrap();
        config.auth.api_token.clone()
    };

    let Some(expected) = expected else {
        return AuthContext::anonymous();
    };

    let provided = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(auth::extract_bearer_token);

    match provided {
        Some(token) if auth::validate_token(token, &expected) => AuthContext::admin("daemon"),
        _ => AuthContext::anonymous(),
    }
}

#[derive(Debug, Clone, Deserialize)]
struct SearchRequest {
    query: String,
    collection: Collection,
    #[serde(default = "default_k")]
    k: usize,
}

fn default_k() -> usize {
    5
}

async fn search(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchOutcome>, HttpError> {
    log::debug!("payload: {payload:?}");

    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        app.search(&payload.query, payload.collection, payload.k)
            .map(Json)
            .map_err(Into::into)
    })
}

#[derive(Debug, Clone, Deserialize)]
struct CreateRequest {
    collection: Collection,
    description: String,
    /// Screenshot bytes, base64-encoded
    screenshot: String,
    original_link: String,
    #[serde(default)]
    additional_links: String,
}

async fn create(
    State(state): State<Arc<SharedState>>,
    headers: HeaderMap,
    Json(payload): Json<CreateRequest>,
) -> Result<Json<Record>, HttpError> {
    let ctx = request_context(&state, &headers);
    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        let screenshot = STANDARD
            .decode(payload.screenshot.as_bytes())
            .map_err(AppError::Base64)?;

        app.create_record(
            &ctx,
            payload.collection,
            payload.description,
            screenshot,
            payload.original_link,
            payload.additional_links,
        )
        .map(Json)
        .map_err(Into::into)
    })
}

#[derive(Debug, Clone, Deserialize)]
struct LifecycleRequest {
    collection: Collection,
    id: u64,
}

#[derive(Debug, Clone, Serialize)]
struct LifecycleResponse {
    moved: bool,
}

async fn archive(
    State(state): State<Arc<SharedState>>,
    headers: HeaderMap,
    Json(payload): Json<LifecycleRequest>,
) -> Result<Json<LifecycleResponse>, HttpError> {
    let ctx = request_context(&state, &headers);
    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        app.archive_record(&ctx, payload.collection, payload.id)
            .map(|moved| Json(LifecycleResponse { moved }))
            .map_err(Into::into)
    })
}

async fn restore(
    State(state): State<Arc<SharedState>>,
    headers: HeaderMap,
    Json(payload): Json<LifecycleRequest>,
) -> Result<Json<LifecycleResponse>, HttpError> {
    let ctx = request_context(&state, &headers);
    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        app.restore_record(&ctx, payload.collection, payload.id)
            .map(|moved| Json(LifecycleResponse { moved }))
            .map_err(Into::into)
    })
}

#[derive(Debug, Clone, Deserialize)]
struct ListRequest {
    collection: Collection,
    #[serde(default)]
    archived: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum ListResponse {
    Active(Vec<Record>),
    Archived(Vec<ArchivedRecord>),
}

async fn list(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<ListRequest>,
) -> Result<Json<ListResponse>, HttpError> {
    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        if payload.archived {
            app.list_archived(payload.collection)
                .map(|records| Json(ListResponse::Archived(records)))
                .map_err(Into::into)
        } else {
            app.list_active(payload.collection)
                .map(|records| Json(ListResponse::Active(records)))
                .map_err(Into::into)
        }
    })
}
