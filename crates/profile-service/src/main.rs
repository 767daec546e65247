use anyhow::Context;
use clap::Parser;
use profile_service::config::{AppConfig, EnvType, StorageKind};
use profile_service::grpc::{serve_grpc, shutdown_signal};
use profile_service::telemetry::init_tracing;
use profile_service::ServiceState;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "profiled", version, about = "Profile gRPC service")]
struct Cli {
    /// YAML or TOML configuration file.
    #[arg(long, env = "CONFIG_PATH")]
    config: Option<PathBuf>,
    /// gRPC socket address to bind, e.g. 127.0.0.1:50051
    #[arg(long)]
    listen: Option<SocketAddr>,
    /// Storage backend.
    #[arg(long, value_enum)]
    storage: Option<StorageKind>,
    /// Deployment environment; selects log format and default level.
    #[arg(long, value_enum)]
    env: Option<EnvType>,
    /// Log filter, e.g. `info` or `profile_core=debug,info`.
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn apply(self, config: &mut AppConfig) {
        if let Some(listen) = self.listen {
            config.grpc.listen_addr = listen;
        }
        if let Some(storage) = self.storage {
            config.storage = storage;
        }
        if let Some(env) = self.env {
            config.env = env;
        }
        if let Some(level) = self.log_level {
            config.log_level = Some(level);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    cli.apply(&mut config);

    init_tracing(config.env, &config.log_filter())?;

    let state = ServiceState::bootstrap(config.storage, &config.database)
        .await
        .context("initializing profile storage")?;

    let addr = config.grpc.listen_addr;
    info!(
        env = ?config.env,
        storage = state.storage_label(),
        "profiled gRPC listening on {}",
        addr
    );

    serve_grpc(state.clone(), addr, shutdown_signal()).await?;

    state.shutdown().await;
    info!("profiled gracefully stopped");
    Ok(())
}
