use mimalloc::MiMalloc;
use squaregate::SquareClient;
use squaregate::server::{SquaregateState, squaregate_router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Deployed stages inject real env vars; local runs read `.env`.
    if std::env::var_os("ENV_STAGE").is_none() {
        dotenvy::dotenv().ok();
    }

    let cfg = &squaregate::config::CONFIG;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.log_filter()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_level(true)
                .with_target(false),
        )
        .init();

    let square_cfg = Arc::new(cfg.square());

    info!(
        project = %cfg.basic.project_name,
        version = %cfg.basic.project_version,
        description = %cfg.basic.project_description,
        listen_addr = %cfg.basic.listen_addr,
        listen_port = cfg.basic.listen_port,
        api_prefix = %cfg.basic.api_prefix,
        cors_origins = ?cfg.basic.cors_origins,
        loglevel = %cfg.basic.log_filter(),
        "Basic config loaded"
    );
    info!(
        square_base_url = %square_cfg.base_url,
        square_version = %square_cfg.square_version,
        square_application_id = %square_cfg.application_id,
        square_link_encoding = ?square_cfg.link_encoding,
        square_retry_tries = square_cfg.session.retry.tries,
        square_retry_interval = ?square_cfg.session.retry.interval,
        square_retry_deadline = ?square_cfg.session.retry.total_timeout,
        "Square config (effective)"
    );
    if square_cfg.application_id.is_empty() {
        warn!("square.application_id is empty; callers must pass client_id explicitly");
    }

    let square = SquareClient::new(&square_cfg)?;
    square.setup()?;
    let square = Arc::new(square);

    let state = SquaregateState::new(square.clone(), square_cfg);
    let app = squaregate_router(state, &cfg.basic);

    let addr = SocketAddr::from((cfg.basic.listen_addr, cfg.basic.listen_port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    match Arc::into_inner(square) {
        Some(square) => square.shutdown().await,
        None => warn!("Square client still shared at teardown; skipping graceful close"),
    }
    info!("Server has shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
