pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod entities;
pub mod services;
pub mod state;

use tokio::signal;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands, ReferralCommands};
pub use config::Config;
use state::SharedState;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::InitConfig { path, force }) = &cli.command {
        return cli::cmd_init_config(path, *force);
    }

    let config = Config::load()?;
    config.validate()?;

    let prometheus_handle = if config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        Some(handle)
    } else {
        None
    };

    init_tracing(&config)?;

    match cli.command {
        None | Some(Commands::Serve) => run_server(config, prometheus_handle).await,

        Some(Commands::CreateAdmin { username, password }) => {
            let shared = SharedState::new(config).await?;
            cli::cmd_create_admin(&shared, &username, &password).await
        }

        Some(Commands::ListUsers) => {
            let shared = SharedState::new(config).await?;
            cli::cmd_list_users(&shared).await
        }

        Some(Commands::Referral { command }) => {
            let shared = SharedState::new(config).await?;
            match command {
                ReferralCommands::Create {
                    code,
                    description,
                    limit,
                    expires,
                } => cli::cmd_referral_create(&shared, code, description, limit, expires).await,
                ReferralCommands::List => cli::cmd_referral_list(&shared).await,
                ReferralCommands::Delete { id } => cli::cmd_referral_delete(&shared, id).await,
            }
        }

        Some(Commands::InitConfig { .. }) => Ok(()),
    }
}

fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;

        let mut builder = tracing_loki::builder();
        for (key, value) in &config.observability.loki_labels {
            builder = builder.label(key.as_str(), value.as_str())?;
        }
        let (layer, task) = builder.build_url(url)?;

        tokio::spawn(task);

        registry.with(layer).init();
        info!(
            "Loki logging initialized at {}",
            config.observability.loki_url
        );
    } else {
        registry.init();
    }

    Ok(())
}

async fn run_server(
    config: Config,
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
) -> anyhow::Result<()> {
    info!(
        "Commission desk v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let addr = format!("{}:{}", config.server.bind_address, config.server.port);
    let api_state = api::create_app_state_from_config(config, prometheus_handle).await?;

    let app = api::router(api_state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(event = "server_started", %addr, "Web API listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Web server error")?;

    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Error listening for shutdown: {}", e),
    }
}
