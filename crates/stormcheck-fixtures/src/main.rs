//! stormcheck fixture server - serves SPC storm report fixtures over HTTP.

use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stormcheck_fixtures::{build_router, AppState, FixtureStore};

/// Fixture server standing in for the NOAA SPC report feed
#[derive(Parser, Debug)]
#[command(name = "stormcheck-fixtures")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding `{YYMMDD}_rpts_{torn|hail|wind}.csv` fixtures
    #[arg(short, long, default_value = "/data", env = "DATA_DIR")]
    data_dir: String,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0", env = "HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "PORT")]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let store = FixtureStore::new(&args.data_dir);
    match store.inventory() {
        Ok(inventory) if inventory.is_empty() => {
            tracing::warn!("No fixtures found in {}", args.data_dir);
        }
        Ok(inventory) => {
            for fixture in inventory {
                tracing::info!(
                    kind = %fixture.kind,
                    rows = fixture.rows,
                    path = %fixture.path.display(),
                    "fixture available"
                );
            }
        }
        Err(e) => tracing::warn!("Fixture inventory failed: {e}"),
    }

    let app = build_router(Arc::new(AppState { store }));

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        "Fixture server listening on http://{} (data_dir={})",
        addr,
        args.data_dir
    );

    axum::serve(listener, app).await?;

    Ok(())
}
