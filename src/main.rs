use axum::{body::Body, http::Request, ServiceExt};
use config::Config;
use log::{error, info, warn};
use model::{database, Database};
use routes::AppState;
use std::{fs, net::SocketAddr, path::PathBuf, sync::Arc};

mod auth;
mod config;
mod logger;
mod model;
mod routes;

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid configuration: {}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = logger::init(config.log_level) {
        eprintln!("Failed to initialize logger: {}", err);
        std::process::exit(1);
    }

    if let Err(err) = run(config).await {
        error!("{}", err);
        std::process::exit(1);
    }
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("failed to read schema {0}: {1}")]
    Schema(PathBuf, #[source] std::io::Error),
    #[error("failed to open database {0}: {1}")]
    Database(PathBuf, #[source] database::Error),
    #[error("failed to bind {0}: {1}")]
    Bind(SocketAddr, #[source] BoxError),
    #[error("server error: {0}")]
    Serve(#[source] BoxError),
}

async fn run(config: Config) -> Result<(), StartupError> {
    let schema = fs::read_to_string(&config.schema_path)
        .map_err(|err| StartupError::Schema(config.schema_path.clone(), err))?;

    let database = Database::open(&config.database_path, &schema)
        .map_err(|err| StartupError::Database(config.database_path.clone(), err))?;

    let state = Arc::new(AppState::new(
        database.clone(),
        database,
        config.request_timeout,
    ));
    let app = routes::app(state);

    info!("Starting microblog server at {}", config.bind_addr);

    axum::Server::try_bind(&config.bind_addr)
        .map_err(|err| StartupError::Bind(config.bind_addr, err.into()))?
        .serve(ServiceExt::<Request<Body>>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| StartupError::Serve(err.into()))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", err);
        std::future::pending::<()>().await;
    }

    warn!("Received Ctrl+C, shutting down");
}
