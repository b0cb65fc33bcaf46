use axum::{
    routing::{get, patch, post},
    Router,
};
use quiz_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    routes, AppState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    let base_routes = Router::new().route("/health", get(routes::health::health));

    let quiz_api = Router::new()
        .route("/api/quiz/grades", get(routes::catalog::list_grades))
        .route("/api/quiz/subjects", get(routes::catalog::list_subjects))
        .route("/api/quiz/units", get(routes::catalog::list_units))
        .route("/api/quiz/topics", get(routes::catalog::list_topics))
        .route("/api/quiz/session/start", post(routes::quiz::start_session))
        .route("/api/quiz/session/:token", get(routes::quiz::get_session))
        .route(
            "/api/quiz/session/:token/questions",
            get(routes::quiz::get_session_questions),
        )
        .route(
            "/api/quiz/session/:token/answer",
            post(routes::quiz::submit_answer),
        )
        .route(
            "/api/quiz/session/:token/complete",
            post(routes::quiz::complete_session),
        )
        .route(
            "/api/quiz/session/:token/results",
            get(routes::quiz::get_session_results),
        )
        .route(
            "/api/quiz/session/:token/status",
            get(routes::quiz::get_session_status),
        )
        .route(
            "/api/quiz/session/:token/timer",
            patch(routes::quiz::update_timer),
        )
        .layer(axum::middleware::from_fn_with_state(
            quiz_backend::middleware::rate_limit::new_rps_state(config.quiz_api_rps),
            quiz_backend::middleware::rate_limit::rps_middleware,
        ));

    let app = base_routes
        .merge(quiz_api)
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
