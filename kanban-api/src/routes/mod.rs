//! REST API Routes Module
//!
//! Route handlers organized by entity type:
//! - Projects and membership (bootstrap for the access gate)
//! - Generic container operations (list, bulk reorder, normalize, delete)
//! - Cards, board columns, list columns, tags and skills
//! - Health checks (no principal required)
//! - CORS support for browser-based clients

pub mod board;
pub mod card;
pub mod container;
pub mod health;
pub mod list;
pub mod project;
pub mod skill;
pub mod tag;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::from_fn,
    Router,
};
use kanban_core::{ContainerKind, ItemId, PositionedItem, Principal};
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    config::ApiConfig,
    error::{ApiError, ApiResult},
    middleware::{principal_middleware, PRINCIPAL_ADMIN_HEADER, PRINCIPAL_ID_HEADER},
    services::PositionService,
    state::AppState,
};

// ============================================================================
// SHARED HANDLER HELPERS
// ============================================================================

/// Resolve an item addressed through a kind-specific route. Items of
/// another kind are reported as missing.
pub(crate) async fn require_kind(
    positions: &PositionService,
    principal: &Principal,
    item_id: ItemId,
    kind: ContainerKind,
) -> ApiResult<PositionedItem> {
    let item = positions.get_item(principal, item_id).await?;
    if item.payload.container_kind() != kind {
        return Err(ApiError::entity_not_found(entity_name(kind), item_id));
    }
    Ok(item)
}

fn entity_name(kind: ContainerKind) -> &'static str {
    match kind {
        ContainerKind::Status => "Card",
        ContainerKind::Board => "Board column",
        ContainerKind::List => "List column",
        ContainerKind::Tags => "Tag",
        ContainerKind::Skills => "Skill",
    }
}

// ============================================================================
// ROUTER BUILDER
// ============================================================================

/// Builds the API router.
///
/// All `/api/v1/*` routes sit behind the principal middleware. Health
/// routes are public. CORS and request tracing wrap everything.
pub struct SecureRouterBuilder {
    state: AppState,
    api_config: ApiConfig,
}

impl SecureRouterBuilder {
    /// Create a new builder. In production the configuration is validated
    /// first and startup fails on missing settings.
    pub fn new(state: AppState, api_config: ApiConfig) -> ApiResult<Self> {
        api_config.validate_for_production()?;
        Ok(Self { state, api_config })
    }

    /// Entity routes, relative to `/api/v1`.
    fn build_entity_routes() -> Router<AppState> {
        Router::new()
            .merge(project::create_router())
            .merge(container::create_router())
            .merge(card::create_router())
            .merge(board::create_router())
            .merge(list::create_router())
            .merge(tag::create_router())
            .merge(skill::create_router())
    }

    /// Build the complete router.
    ///
    /// # Middleware Order (outer to inner)
    /// 1. CORS (outermost) - handles preflight requests
    /// 2. Trace - one span per request
    /// 3. Principal (only on /api/v1/*) - resolves the caller
    pub fn build(self) -> Router {
        let api_routes = Self::build_entity_routes().layer(from_fn(principal_middleware));
        let cors = build_cors_layer(&self.api_config);

        Router::new()
            .nest("/api/v1", api_routes)
            .merge(health::create_router())
            .with_state(self.state)
            .layer(TraceLayer::new_for_http())
            .layer(cors)
    }
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// In development mode (empty origins), allows all origins.
/// In production mode, only allows configured origins.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(PRINCIPAL_ID_HEADER),
            HeaderName::from_static(PRINCIPAL_ADMIN_HEADER),
        ])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any).allow_headers(Any)
    } else {
        tracing::info!(
            "CORS: Production mode - allowing origins: {:?}",
            config.cors_origins
        );
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        if config.cors_allow_credentials {
            cors.allow_origin(origins).allow_credentials(true)
        } else {
            cors.allow_origin(origins)
        }
    }
}

/// Create the complete API router.
///
/// # Security
/// - All /api/v1/* routes require a forwarded principal
/// - In production, validates configuration at startup
pub fn create_api_router(state: AppState, api_config: &ApiConfig) -> ApiResult<Router> {
    SecureRouterBuilder::new(state, api_config.clone()).map(|builder| builder.build())
}

/// Create an API router where requests without principal headers run as a
/// local administrator.
///
/// **WARNING**: This should only be used for testing or development.
#[cfg(any(test, feature = "dev"))]
pub fn create_api_router_unauthenticated(state: AppState, api_config: &ApiConfig) -> Router {
    use crate::middleware::dev_principal_middleware;

    let api_routes =
        SecureRouterBuilder::build_entity_routes().layer(from_fn(dev_principal_middleware));

    Router::new()
        .nest("/api/v1", api_routes)
        .merge(health::create_router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(api_config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    fn state() -> AppState {
        AppState::in_memory(Default::default())
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let router = create_api_router(state(), &ApiConfig::default()).unwrap();
        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_api_requires_principal() {
        let router = create_api_router(state(), &ApiConfig::default()).unwrap();
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/v1/containers/skills/items")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_dev_router_defaults_to_admin() {
        let router = create_api_router_unauthenticated(state(), &ApiConfig::default());
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/skills")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"name": "triage"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[test]
    fn test_production_router_requires_cors_origins() {
        let config = ApiConfig {
            environment: "production".to_string(),
            ..ApiConfig::default()
        };
        assert!(create_api_router(state(), &config).is_err());
    }
}
