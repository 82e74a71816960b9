//! `ckpt` binary entry point

use ckpt_cli::{run, Command};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let command = Command::parse(std::env::args().skip(1))?;
    tracing::debug!(?command, "Running command");

    let mut stdout = std::io::stdout().lock();
    run(&command, &mut stdout).await
}
