use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Initialize the subscriber: env-driven filtering, human-readable output in
/// development, JSON lines when KINDRED_ENV=production.
pub fn init_tracing(service: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("info,{service}=debug,tower_http=debug")));

    let production = matches!(std::env::var("KINDRED_ENV").as_deref(), Ok("production"));

    let fmt = if production {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry().with(filter).with(fmt).init();

    tracing::info!(service, "tracing initialized");
}
