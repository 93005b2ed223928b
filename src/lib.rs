use actix_web::{
    middleware::{NormalizePath, TrailingSlash},
    web::Data,
    App, HttpServer,
};
use config::Config;
use tracing::level_filters::LevelFilter;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter, FmtSubscriber};

pub mod api;
pub mod config;
pub mod credential;
pub mod error;
pub mod gcp;
pub mod iam;
pub mod identity;
pub mod operation;
pub mod secrets;
pub mod service;
pub mod utils;

fn init_tracing() -> eyre::Result<()> {
    let filter = EnvFilter::builder()
        .with_env_var("KEYROT_LOG")
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()?;

    #[cfg(debug_assertions)]
    FmtSubscriber::builder()
        .pretty()
        .with_env_filter(filter)
        .finish()
        .try_init()?;

    #[cfg(not(debug_assertions))]
    FmtSubscriber::builder()
        .json()
        .with_env_filter(filter)
        .finish()
        .try_init()?;

    Ok(())
}

/// Returns a builder for the main application.
///
/// Without an explicit `config`, configuration is read from the environment.
#[bon::builder(finish_fn = start)]
pub async fn run(config: Option<Config>) -> eyre::Result<()> {
    init_tracing()?;

    let config = match config {
        Some(config) => config,
        None => Config::load()?,
    };

    let service = service::Service::connect_with(&config)?;
    let data = Data::new(service);

    tracing::info!(
        host = config.host(),
        port = config.port(),
        backend = ?config.backend,
        "Starting key rotation service"
    );

    HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(NormalizePath::new(TrailingSlash::Trim))
            .app_data(data.clone())
            .configure(api::configure)
    })
    .bind((config.host(), config.port()))?
    .run()
    .await?;

    Ok(())
}
