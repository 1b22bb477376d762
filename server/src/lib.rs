pub mod cli;
pub mod commands;
pub mod error;

use docsift_core::{AppState, Config};

/// Initialize tracing/logging with the given directives
pub fn init_logging(directives: &[&str]) {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in directives {
        match directive.parse::<tracing_subscriber::filter::Directive>() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("Ignoring invalid log directive '{}': {}", directive, e),
        }
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Open the local stores and serve the HTTP trigger until Ctrl+C.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    config.ensure_dirs()?;
    tracing::info!("Data directory: {:?}", config.data_dir);

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config)?;
    let app = commands::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
            }
            tracing::info!("Shutting down...");
        })
        .await?;

    Ok(())
}
