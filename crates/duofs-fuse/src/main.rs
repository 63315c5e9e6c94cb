//! duofs binary
//!
//! ## Usage
//!
//! ```bash
//! duofs <mount-point> <backend-a> <backend-b> [--stripe-unit N] [--config FILE]
//! ```
//!
//! Logs go to stderr; set `RUST_LOG=duofs_kernel=debug` to trace every call.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use duofs_fuse::Cli;
use duofs_kernel::constants::DEFAULT_LOG_FILTER;
use duofs_kernel::vfs::physical;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = cli.into_config().context("loading mount options")?;
    config.validate().context("invalid mount configuration")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("duofs-worker")
        .build()
        .context("building tokio runtime")?;

    // Requested modes must reach the backends unmasked.
    let previous = physical::clear_umask();
    tracing::debug!(previous = format_args!("{previous:03o}"), "umask cleared");

    let mount_point = config.mount_point.clone();
    duofs_fuse::mount(Arc::new(config), runtime.handle().clone())
        .with_context(|| format!("mounting {}", mount_point.display()))?;

    tracing::info!("duofs exited");
    Ok(())
}
