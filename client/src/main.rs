mod config;
mod fs;
mod rpc_server;

use crate::config::Config;
use crate::fs::{FsWrapper, RemoteFS};
use clap::Parser;
use daemonize::Daemonize;
use fuser::MountOption;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "nmfs-client")]
struct Args {
    /// Where to mount the filesystem.
    mountpoint: String,

    /// Path to a TOML config file.
    #[arg(long, default_value = "client.toml")]
    config: String,

    #[arg(long)]
    objectd_addr: Option<String>,

    #[arg(long)]
    data_addr: Option<String>,

    #[arg(long)]
    coordinator_addr: Option<String>,

    #[arg(long)]
    self_rpc_addr: Option<String>,

    /// Stay attached to the terminal instead of forking into the background.
    #[arg(long)]
    foreground: bool,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nmfs_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let mut cfg: Config = nmfs_core::config::load_config(&args.config);
    if let Some(v) = args.objectd_addr {
        cfg.objectd_addr = v;
    }
    if let Some(v) = args.data_addr {
        cfg.data_addr = v;
    }
    if let Some(v) = args.coordinator_addr {
        cfg.coordinator_addr = v;
    }
    if let Some(v) = args.self_rpc_addr {
        cfg.self_rpc_addr = v;
    }

    if !args.foreground {
        if let Err(e) = Daemonize::new().start() {
            tracing::warn!(error = %e, "failed to daemonize, continuing in foreground");
        }
    }

    let filesystem = RemoteFS::new(cfg);
    let rpc_bind_addr = filesystem.self_rpc_bind_addr();
    let runtime_handle = filesystem.runtime.handle().clone();
    let shared = Arc::new(Mutex::new(filesystem));
    let wrapper = FsWrapper(shared.clone());

    runtime_handle.spawn(async move {
        let app = rpc_server::build_router(shared);
        let addr: SocketAddr = rpc_bind_addr.parse().expect("invalid self_rpc_addr");
        tracing::info!(%addr, "peer RPC server listening");
        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                if let Err(e) = axum::serve(listener, app).await {
                    tracing::error!(error = %e, "peer RPC server stopped");
                }
            }
            Err(e) => tracing::error!(error = %e, "failed to bind peer RPC server"),
        }
    });

    let options = vec![
        MountOption::AutoUnmount,
        MountOption::FSName("nmfs".to_string()),
    ];
    tracing::info!(mountpoint = %args.mountpoint, "mounting filesystem");
    if let Err(e) = fuser::mount2(wrapper, &args.mountpoint, &options) {
        tracing::error!(error = %e, "failed to mount filesystem");
    }
}
