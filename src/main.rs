//! hostfile-sync daemon entry point.

use clap::Parser;
use hostfile_sync::{JsonFileStore, Reconciler, Scheduler, SyncConfig, TracingSink, util};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Keep the hosts file in sync with the hostfile-sync registry.
#[derive(Parser, Debug)]
#[command(name = "hostfile-sync")]
#[command(version, about, long_about = None)]
struct Args {
    /// Hosts file to manage.
    #[arg(long, env = "HOSTFILE_SYNC_HOSTS", default_value = hostfile_sync::config::DEFAULT_HOSTS_FILE)]
    hosts_file: PathBuf,

    /// Registry store document (JSON).
    #[arg(long, env = "HOSTFILE_SYNC_STORE", default_value = hostfile_sync::config::DEFAULT_STORE_PATH)]
    store: PathBuf,

    /// Service namespace in the store; entries live under `<namespace>/hosts`.
    #[arg(long, env = "HOSTFILE_SYNC_NAMESPACE", default_value = hostfile_sync::config::DEFAULT_NAMESPACE)]
    namespace: String,

    /// Log level filter, overridden by `RUST_LOG`.
    #[arg(long, env = "HOSTFILE_SYNC_LOG", default_value = "info")]
    log_level: String,

    /// Run a single tick and exit.
    #[arg(long)]
    once: bool,
}

fn init_tracing(level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let config = SyncConfig::new()
        .with_hosts_file(args.hosts_file)
        .with_store_path(args.store)
        .with_namespace(args.namespace);

    info!(
        hosts_file = %config.hosts_file.display(),
        store = %config.store_path.display(),
        namespace = %config.service_namespace,
        "Starting hostfile-sync"
    );
    if !util::is_root() {
        warn!("Not running as root; writing system files will likely fail");
    }

    let store = Arc::new(JsonFileStore::new(&config.store_path));
    let engine = Reconciler::from_config(&config, store, TracingSink);
    let (mut scheduler, first) = Scheduler::start(engine)?;

    if args.once {
        return first.outcome.map(|_| ()).map_err(Into::into);
    }

    scheduler.run(util::shutdown_signal()?).await;

    info!("hostfile-sync shutdown complete");
    Ok(())
}
