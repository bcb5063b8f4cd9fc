use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;

use irrigation_analytics_rs::routes::metrics::RequestMetrics;
use irrigation_analytics_rs::state::AppState;
use irrigation_analytics_rs::{cli, config, db, openapi, routes, seed};

async fn bind_listener(addr: &str) -> Result<TcpListener> {
    match TcpListener::bind(addr).await {
        Ok(listener) => Ok(listener),
        Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
            anyhow::bail!(
                "Failed to bind {addr}: the port is already in use. Stop the process using it or re-run with --port to pick another port."
            )
        }
        Err(err) => Err(err).with_context(|| format!("failed to bind listener on {addr}")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();

    if args.print_openapi {
        println!("{}", serde_json::to_string_pretty(&openapi::openapi_json())?);
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = config::AppConfig::from_env()?;
    let pool = db::connect_lazy(&config)?;

    if args.seed {
        seed::seed_database(&pool).await?;
        return Ok(());
    }

    let state = AppState {
        config,
        db: pool,
        metrics: Arc::new(RequestMetrics::default()),
    };

    let app = routes::router(state);
    let addr = format!("{}:{}", args.host, args.port);
    let listener = bind_listener(&addr).await?;
    tracing::info!(addr = %addr, "irrigation analytics server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bind_listener_reports_port_conflicts() {
        let holder = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = holder.local_addr().unwrap().to_string();

        let err = bind_listener(&addr).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("already in use"), "message: {message}");
        assert!(message.contains("--port"), "message: {message}");
    }

    #[tokio::test]
    async fn bind_listener_succeeds_on_free_port() {
        let listener = bind_listener("127.0.0.1:0").await.unwrap();
        assert!(listener.local_addr().is_ok());
    }
}
