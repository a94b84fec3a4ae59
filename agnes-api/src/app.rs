/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use agnes_api::{app::{build_router, AppState}, config::Config};
/// use agnes_shared::db::create_pool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(config.database.clone()).await?;
/// let app = build_router(AppState::postgres(pool, config));
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use crate::error::ApiError;
use crate::routes::{self, entity::Resource};
use agnes_shared::models::{Category, Device, Location, Reading, User};
use agnes_shared::services::{DeviceRelations, EntityService, ReadingRelations};
use agnes_shared::store::{MemoryStore, PgStore, Repository};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn Repository<User>>,
    pub categories: Arc<dyn Repository<Category>>,
    pub locations: Arc<dyn Repository<Location>>,
    pub devices: Arc<dyn Repository<Device>>,
    pub readings: Arc<dyn Repository<Reading>>,

    /// `None` when running on in-memory stores
    pub db: Option<PgPool>,

    pub config: Arc<Config>,
}

impl AppState {
    /// Repositories backed by PostgreSQL
    pub fn postgres(db: PgPool, config: Config) -> Self {
        Self {
            users: Arc::new(PgStore::<User>::new(db.clone())),
            categories: Arc::new(PgStore::<Category>::new(db.clone())),
            locations: Arc::new(PgStore::<Location>::new(db.clone())),
            devices: Arc::new(PgStore::<Device>::new(db.clone())),
            readings: Arc::new(PgStore::<Reading>::new(db.clone())),
            db: Some(db),
            config: Arc::new(config),
        }
    }

    /// Empty process-local repositories
    pub fn in_memory(config: Config) -> Self {
        Self {
            users: Arc::new(MemoryStore::<User>::new()),
            categories: Arc::new(MemoryStore::<Category>::new()),
            locations: Arc::new(MemoryStore::<Location>::new()),
            devices: Arc::new(MemoryStore::<Device>::new()),
            readings: Arc::new(MemoryStore::<Reading>::new()),
            db: None,
            config: Arc::new(config),
        }
    }

    pub fn service<E: Resource>(&self) -> EntityService<E> {
        EntityService::new(E::repository(self))
    }

    pub fn device_relations(&self) -> DeviceRelations {
        DeviceRelations::new(self.categories.clone(), self.locations.clone())
    }

    pub fn reading_relations(&self) -> ReadingRelations {
        ReadingRelations::new(
            self.users.clone(),
            self.devices.clone(),
            self.device_relations(),
        )
    }
}

/// list / create / read / update / delete for one entity
fn resource_routes<E: Resource>() -> Router<AppState> {
    use routes::entity;

    Router::new()
        .route("/", get(entity::list::<E>).post(entity::create::<E>))
        .route(
            "/:id",
            get(entity::read::<E>)
                .put(entity::update::<E>)
                .delete(entity::delete::<E>),
        )
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins = config.api.allowed_origins();
    if !config.api.is_production() || origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Builds the router
///
/// ```text
/// /api
/// ├── GET  /health-check
/// ├── /users        (+ DELETE /users/:ids/bulk)
/// ├── /categories
/// ├── /locations
/// ├── /devices      (nested category and location)
/// └── /readings     (nested user and device)
/// ```
///
/// Each resource serves `GET /`, `POST /`, `GET /:id`, `PUT /:id` and
/// `DELETE /:id`.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health-check", get(routes::health::health_check))
        .nest(
            "/users",
            resource_routes::<User>().route("/:id/bulk", delete(routes::users::bulk_delete)),
        )
        .nest("/categories", resource_routes::<Category>())
        .nest("/locations", resource_routes::<Location>())
        .nest("/devices", resource_routes::<Device>())
        .nest("/readings", resource_routes::<Reading>());

    let cors = cors_layer(&state.config);

    Router::new()
        .nest("/api", api)
        .fallback(|| async { ApiError::NotFound("Route not found".to_string()) })
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(cors),
        )
        .with_state(state)
}
