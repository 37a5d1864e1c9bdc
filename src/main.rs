use std::{sync::Arc, time::Duration};

use clap::Parser;
use taskflow::{
    auth::TokenKeys,
    cli::Args,
    startup::{run_server, HttpSettings},
    store::{MemoryStore, PgStore, Repository},
    telemetry, AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    telemetry::init_subscriber("taskflow", args.log_format)?;

    let store: Arc<dyn Repository> = match &args.database_uri {
        Some(uri) => {
            tracing::info!("connecting to the database ...");
            Arc::new(PgStore::connect(uri, args.max_connections).await?)
        }
        None => {
            tracing::warn!("no database configured, data is kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let tokens = TokenKeys::new(
        &args.secret_key,
        chrono::Duration::minutes(args.access_token_expire_minutes),
    );
    let settings = HttpSettings {
        request_timeout: Duration::from_secs(args.request_timeout_secs),
        cors_origins: args.cors_origins.clone(),
    };

    let (join_handle, addr, close_tx) =
        run_server(&args.service_address(), AppState::new(store, tokens), settings).await?;
    tracing::info!("taskflow api serving on http://{addr}");

    join_handle.await?;

    tracing::debug!("waiting for {} connections to finish", close_tx.receiver_count());
    close_tx.closed().await;

    tracing::info!("shutdown complete");
    Ok(())
}
