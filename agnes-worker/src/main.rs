//! # Agnes Worker
//!
//! ```bash
//! # poll QUEUE_URL until Ctrl-C
//! cargo run -p agnes-worker
//!
//! # handle one SQS event read from stdin and print the batch response
//! cargo run -p agnes-worker -- handle < event.json
//! ```

use std::io::Read;
use std::sync::Arc;

use agnes_shared::db::{close_pool, create_pool, run_migrations};
use agnes_shared::models::User;
use agnes_shared::queue::SqsQueue;
use agnes_shared::services::EntityService;
use agnes_shared::state;
use agnes_shared::store::PgStore;
use agnes_worker::config::WorkerConfig;
use agnes_worker::consumer::Consumer;
use agnes_worker::handler::{handle_event, SqsEvent};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logs go to stderr so `handle` keeps stdout for its response.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "agnes_worker=debug,agnes_shared=info".into());

    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    tracing::info!("Agnes Worker v{} starting", env!("CARGO_PKG_VERSION"));

    let config = WorkerConfig::from_env()?;
    let pool = create_pool(config.database.clone()).await?;
    run_migrations(&pool).await?;
    let users = EntityService::<User>::new(Arc::new(PgStore::<User>::new(pool.clone())));

    match std::env::args().nth(1).as_deref() {
        Some("handle") => {
            let mut raw = String::new();
            std::io::stdin().read_to_string(&mut raw)?;
            let event: SqsEvent = serde_json::from_str(&raw)?;

            let response = handle_event(&users, event).await;
            println!("{}", serde_json::to_string(&response)?);
        }
        None | Some("consume") => {
            let queue = SqsQueue::connect(&config.queue.aws, config.queue_url()?).await;
            let mut consumer = Consumer::new(Arc::new(queue), users, config.consumer.clone());
            if let Some(state_config) = &config.state {
                consumer = consumer.with_state(state::connect(state_config).await?);
            }

            let token = consumer.shutdown_token();
            tokio::spawn(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "Failed to listen for shutdown signal");
                }
                tracing::info!("Shutdown signal received");
                token.cancel();
            });

            consumer.run().await?;
        }
        Some(other) => anyhow::bail!("unknown command '{}', expected 'consume' or 'handle'", other),
    }

    close_pool(pool).await;
    Ok(())
}
