/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskclock_api::{app::AppState, config::Config};
/// use taskclock_shared::db::pool::{create_pool, DatabaseConfig};
/// use taskclock_shared::store::postgres::PgStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(DatabaseConfig::from_url(&config.database.url)).await?;
/// let state = AppState::new(Arc::new(PgStore::new(pool)), config);
/// let app = taskclock_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;
use taskclock_shared::{
    auth::middleware::authenticate,
    commands::Commands,
    store::Store,
    time::{Clock, SystemClock},
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Storage, for the reads that are not commands (users, health)
    pub store: Arc<dyn Store>,

    /// Command layer over the same store
    pub commands: Commands,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates application state on the wall clock
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), config)
    }

    /// Creates application state with an explicit clock
    pub fn with_clock(store: Arc<dyn Store>, clock: Arc<dyn Clock>, config: Config) -> Self {
        Self {
            commands: Commands::new(store.clone(), clock),
            store,
            config: Arc::new(config),
        }
    }

    /// Access-token signing key
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// Refresh-token signing key
    pub fn jwt_refresh_secret(&self) -> &str {
        &self.config.jwt.refresh_secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                                  # Health check (public)
/// └── /v1/
///     ├── /auth/                               # public
///     │   ├── POST /register
///     │   ├── POST /login
///     │   ├── POST /refresh
///     │   └── POST /logout                     # authenticated
///     ├── /projects/                           # authenticated
///     │   ├── GET    /
///     │   ├── POST   /
///     │   ├── GET    /mine
///     │   ├── GET    /:project_id
///     │   ├── DELETE /:project_id
///     │   ├── GET    /:project_id/time
///     │   ├── POST   /:project_id/members
///     │   ├── DELETE /:project_id/members/:user_id
///     │   ├── POST   /:project_id/tasks
///     │   ├── DELETE /:project_id/tasks/:task_id
///     │   ├── POST   /:project_id/tasks/:task_id/assign
///     │   └── PATCH  /:project_id/tasks/:task_id/status
///     └── /users/                              # authenticated
///         └── GET    /:dev_id/time
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Authentication (per-route basis)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let auth_layer = axum::middleware::from_fn_with_state(state.clone(), jwt_auth_layer);

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .merge(
            Router::new()
                .route("/logout", post(routes::auth::logout))
                .layer(auth_layer.clone()),
        );

    let project_routes = Router::new()
        .route(
            "/",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route("/mine", get(routes::projects::list_my_projects))
        .route(
            "/:project_id",
            get(routes::projects::get_project).delete(routes::projects::delete_project),
        )
        .route("/:project_id/time", get(routes::projects::project_time))
        .route("/:project_id/members", post(routes::projects::add_member))
        .route(
            "/:project_id/members/:user_id",
            delete(routes::projects::remove_member),
        )
        .route("/:project_id/tasks", post(routes::tasks::create_task))
        .route("/:project_id/tasks/:task_id", delete(routes::tasks::delete_task))
        .route(
            "/:project_id/tasks/:task_id/assign",
            post(routes::tasks::assign_task),
        )
        .route(
            "/:project_id/tasks/:task_id/status",
            patch(routes::tasks::change_task_status),
        )
        .layer(auth_layer.clone());

    let user_routes = Router::new()
        .route("/:dev_id/time", get(routes::users::developer_time))
        .layer(auth_layer);

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/projects", project_routes)
        .nest("/users", user_routes);

    let cors = if state.config.cors_permissive() {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// JWT authentication middleware layer
///
/// Validates the bearer access token and injects
/// [`taskclock_shared::auth::middleware::AuthContext`] into the request
/// extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_context = authenticate(req.headers(), state.jwt_secret())?;
    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
