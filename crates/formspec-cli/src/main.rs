//! formspec CLI entry point.
//!
//! Binary name: `formspec`
//!
//! Parses CLI arguments, loads the engine configuration and the demo
//! catalog, then dispatches to the form command handlers.

mod cli;
mod config;
mod demo;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use clap_complete::generate;
use formspec_core::factory::FormFactory;
use formspec_observe::tracing_setup::{init_tracing, shutdown_tracing, verbosity_directive};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

use cli::surface::TerminalSurface;
use cli::{Cli, Commands};

/// How long shutdown waits for blocking tasks. A prompt abandoned by Ctrl+C
/// keeps its thread parked on terminal input until the user presses Enter.
const BLOCKING_SHUTDOWN_GRACE: Duration = Duration::from_millis(200);

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(verbosity_directive(cli.verbose, cli.quiet), cli.otel)
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start tokio runtime")?;
    let result = runtime.block_on(run(cli));
    shutdown_runtime(runtime);

    shutdown_tracing();
    result
}

/// Shut the runtime down without waiting on prompts still blocked in
/// `spawn_blocking`.
fn shutdown_runtime(runtime: Runtime) {
    runtime.shutdown_timeout(BLOCKING_SHUTDOWN_GRACE);
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Shell completions don't need the catalog
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "formspec", &mut std::io::stdout());
        return Ok(());
    }

    let config = config::load_engine_config(cli.config.as_deref()).await?;
    let catalog = Arc::new(demo::demo_catalog()?);

    // Ctrl+C cancels the active run at its next suspension point
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("interrupt received, cancelling run");
            on_interrupt.cancel();
        }
    });

    let surface = TerminalSurface::new(&config);
    let factory = FormFactory::new(catalog, surface)
        .with_config(config)
        .with_cancellation(cancel);

    match cli.command {
        Commands::List => cli::form::list_forms(&factory, cli.json)?,
        Commands::Plan { form } => cli::form::show_plan(&factory, &form, cli.json)?,
        Commands::Check => cli::form::check_forms(&factory, cli.json)?,
        Commands::Run { form, sets } => {
            cli::form::run_form(&factory, &form, &sets, cli.json).await?;
        }
        // Handled before the catalog is loaded
        Commands::Completions { .. } => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Instant;

    #[test]
    fn test_shutdown_does_not_wait_for_blocked_prompt() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        let (tx, rx) = mpsc::channel::<()>();
        // Stands in for a dialoguer read that never receives input
        let _blocked = runtime.spawn_blocking(move || rx.recv());

        let started = Instant::now();
        shutdown_runtime(runtime);
        assert!(started.elapsed() < Duration::from_secs(2));
        drop(tx);
    }
}
