use std::time::Instant;

use axum::{
    Router,
    extract::FromRef,
    http::{HeaderName, HeaderValue, Method, header},
    middleware,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod password;
pub mod repository;
pub mod validation;

// Routers grouped by access level (public, authenticated, citizen, staff, admin).
pub mod routes;
use routes::{admin, authenticated, citizen, public, staff};

// --- Public Re-exports ---

pub use auth::TokenService;
pub use config::{AppConfig, Env};
pub use error::ApiError;
pub use repository::{PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Auto-generated OpenAPI document, served at `/api-docs/openapi.json` and browsable
/// through Swagger UI at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::root, handlers::health,
        handlers::auth::register, handlers::auth::login, handlers::auth::profile,
        handlers::auth::verify,
        handlers::grievances::list_grievances, handlers::grievances::get_grievance,
        handlers::grievances::create_grievance, handlers::grievances::update_grievance,
        handlers::announcements::list_announcements, handlers::announcements::get_announcement,
        handlers::announcements::create_announcement,
        handlers::announcements::update_announcement,
        handlers::announcements::delete_announcement,
        handlers::catalog::list_services, handlers::catalog::get_service,
        handlers::catalog::list_zones, handlers::catalog::get_zone,
        handlers::citizens::get_my_profile,
        handlers::dashboard::get_citizen_stats, handlers::dashboard::get_provider_stats,
        handlers::dashboard::get_admin_stats,
    ),
    components(
        schemas(
            models::Role, models::GrievanceStatus, models::Priority, models::Audience,
            models::SortField, models::SortOrder,
            models::Citizen, models::Grievance, models::GrievanceSummary,
            models::Announcement, models::Service, models::Zone, models::Vehicle,
            models::House, models::Residence,
            models::RegisterRequest, models::LoginRequest, models::CreateGrievanceRequest,
            models::UpdateGrievanceRequest, models::CreateAnnouncementRequest,
            models::UpdateAnnouncementRequest,
            models::RegisterResponse, models::LoginResponse, models::ProfileResponse,
            models::TokenIdentity, models::VerifyResponse, models::Pagination,
            models::GrievanceList, models::AnnouncementEnvelope, models::ServiceList,
            models::ServiceEnvelope, models::ZoneList, models::ZoneEnvelope,
            models::CitizenProfile, models::CitizenStats, models::ProviderStats,
            models::StatusCount, models::ServiceCount, models::AdminStats,
            error::ErrorBody, handlers::HealthResponse, handlers::Banner,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "grievance-portal", description = "Civic Grievance Portal API")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

/// AppState
///
/// The single immutable container shared by every request: the database collaborator,
/// the token service built from the configured secret, and the configuration itself.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub tokens: TokenService,
    pub config: AppConfig,
    // Process start, reported by /health.
    pub started_at: Instant,
}

impl AppState {
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self {
            repo,
            tokens: TokenService::new(&config.jwt_secret, config.jwt_ttl_secs),
            config,
            started_at: Instant::now(),
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

// Let handlers and middleware pull only the piece of state they need.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for TokenService {
    fn from_ref(app_state: &AppState) -> TokenService {
        app_state.tokens.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// api_routes
///
/// Everything under `/api`. Only the credential exchange is reachable without a token;
/// every other group is wrapped in `authenticate`, applied after the merge so it runs
/// before each group's own role check.
fn api_routes(state: &AppState) -> Router<AppState> {
    let protected = authenticated::authenticated_routes()
        .merge(citizen::citizen_routes())
        .merge(staff::staff_routes())
        .merge(staff::provider_routes())
        .merge(admin::admin_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::authenticate,
        ));

    public::auth_routes().merge(protected)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    match config.env {
        Env::Local => cors.allow_origin(Any),
        Env::Production => match HeaderValue::from_str(&config.frontend_url) {
            Ok(origin) => cors.allow_origin(origin).allow_credentials(true),
            Err(_) => {
                tracing::warn!(
                    frontend_url = %config.frontend_url,
                    "FRONTEND_URL is not a valid origin; cross-origin requests will be refused"
                );
                cors
            }
        },
    }
}

/// create_router
///
/// Assembles the application's routing structure, applies global and scoped middleware,
/// and registers the application state.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let env = state.config.env;

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    let router = Router::new()
        // Documentation: serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .nest("/api", api_routes(&state))
        .fallback(handlers::route_not_found)
        .with_state(state);

    // Development only: surface the cause of a 500 in the response body.
    let router = match env {
        Env::Local => router.layer(middleware::map_response(error::expose_internal_details)),
        Env::Production => router,
    };

    router
        .layer(
            ServiceBuilder::new()
                // Generates a unique id for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // Echo x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span so every log line of a request carries its `x-request-id`
/// alongside the method and URI.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
