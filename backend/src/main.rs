use actix_web::{App, HttpServer, middleware, web};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use manga_reader::{
    AppState, Config, HealthService, LeaderboardResetJob, Repositories, handlers, open_store,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "manga_reader=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(std::io::Error::other)?;

    info!("Starting manga reader server on {}:{}", config.host, config.port);

    // Create database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .map_err(std::io::Error::other)?;

    info!("Database connection pool established");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .map_err(std::io::Error::other)?;

    info!("Database migrations completed");

    let store = open_store(&config.redis).await;

    let app_state = AppState::new(
        config.clone(),
        store.clone(),
        Repositories::postgres(db_pool.clone()),
    );
    info!(cache_enabled = app_state.cache.is_enabled(), "Entity cache initialized");

    let health_service = web::Data::new(HealthService::new(
        Some(db_pool.clone()),
        store,
        app_state.cache.metrics(),
        app_state.cache.is_enabled(),
    ));

    // Start leaderboard window rollover
    let reset_job = LeaderboardResetJob::new(
        app_state.analytics.clone(),
        config.leaderboard_job.clone(),
    );
    let reset_shutdown = reset_job.start();

    let app_state = web::Data::new(app_state);
    let server_addr = format!("{}:{}", config.host, config.port);

    let result = HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(health_service.clone())
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(handlers::configure_routes)
    })
    .bind(&server_addr)?
    .run()
    .await;

    let _ = reset_shutdown.send(true);
    info!("Server stopped");
    result
}
