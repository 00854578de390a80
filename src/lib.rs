use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod storage;
pub mod tier;

// One router per trust tier (Unauthenticated, Visiting, Authenticated).
pub mod routes;
use auth::{TierGate, tier_middleware};
use routes::{TierRoutes, authenticated, public, visiting};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use repository::{PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// OpenAPI description of every handler and wire model, served at
/// `/api-docs/openapi.json` and rendered by the Swagger UI.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::public::health, handlers::public::get_public_stats, handlers::public::login,
        handlers::visiting::visit_folder, handlers::visiting::visit_media,
        handlers::visiting::visit_comments, handlers::visiting::visit_add_comment,
        handlers::visiting::visit_set_description, handlers::visiting::visit_activity,
        handlers::authenticated::get_me, handlers::authenticated::logout,
        handlers::authenticated::list_folders, handlers::authenticated::create_folder,
        handlers::authenticated::update_folder, handlers::authenticated::delete_folder,
        handlers::authenticated::rehash_folder, handlers::authenticated::list_folder_media,
        handlers::authenticated::request_media_upload, handlers::authenticated::delete_media,
        handlers::authenticated::list_media_comments, handlers::authenticated::delete_comment,
        handlers::authenticated::folder_activity
    ),
    components(
        schemas(
            models::User, models::Folder, models::Media, models::Comment, models::Description,
            models::ActivityEntry, models::HashKind, models::LoginRequest,
            models::CreateFolderRequest, models::UpdateFolderRequest,
            models::CreateCommentRequest, models::SetDescriptionRequest,
            models::MediaUploadRequest, models::SessionGrant, models::FolderSummary,
            models::MediaItem, models::MediaUploadResponse, models::PublicStats,
        )
    ),
    tags(
        (name = "media-library", description = "Media library API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, cloneable container of everything handlers need. Shared across all
/// requests; contains no per-request data (that lives in `auth::SessionContext`).
#[derive(Clone)]
pub struct AppState {
    /// Persistence, including the identity and folder stores used for credentials.
    pub repo: RepositoryState,
    /// Object storage for media bytes.
    pub storage: StorageState,
    /// The loaded, immutable configuration.
    pub config: AppConfig,
    /// Outbound HTTP client for the auth provider. Built once; clones share its
    /// connection pool and timeout.
    pub http: reqwest::Client,
}

/// Builds the outbound HTTP client used for auth-provider calls. Every request it
/// sends is bounded by `timeout`.
pub fn build_http_client(timeout: std::time::Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(timeout).build()
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// Wraps a tier's router in the credential-resolving middleware for that tier.
fn gated(routes: TierRoutes, state: &AppState) -> Router<AppState> {
    let tier = routes.tier();
    routes
        .into_router()
        .route_layer(middleware::from_fn_with_state(
            TierGate {
                tier,
                state: state.clone(),
            },
            tier_middleware,
        ))
}

/// create_router
///
/// Assembles the three tier routers, each behind its own credential middleware, and
/// applies the global observability and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(gated(public::public_routes(), &state))
        .nest("/visit", gated(visiting::visiting_routes(), &state))
        .merge(gated(authenticated::authenticated_routes(), &state))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                // Request ID generation, one UUID per incoming request.
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    MakeRequestUuid,
                ))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // Echo the x-request-id header back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span so every log line of one request carries its
/// `x-request-id`. The query string is left out of the span because it may carry
/// credentials.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        path = %request.uri().path(),
        req_id = %request_id,
    )
}
