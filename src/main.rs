//! txfold - rebuild contract state from transaction history
//!
//! Replays every call made to a contract over a block range and prints the
//! state those calls produced.

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;
use txfold::cli::{self, Cli};

#[tokio::main]
async fn main() {
    // Logs go to stderr so stdout only carries the rendered result.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();

    let cancel = CancellationToken::new();
    let run = cli::run(args, cancel.clone());
    tokio::pin!(run);

    // Ctrl+C cancels the replay; the run then winds down and reports it.
    let result = tokio::select! {
        result = &mut run => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
            cancel.cancel();
            run.await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
