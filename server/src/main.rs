use clap::Parser;
use nmfs_objectd::{build_router, config::ObjectdConfig, storage::Store};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "nmfs-objectd")]
struct Args {
    /// Path to a TOML config file; overrides the defaults, not the flags
    /// below if those are also given.
    #[arg(long, default_value = "objectd.toml")]
    config: String,

    #[arg(long)]
    bind_addr: Option<String>,

    #[arg(long)]
    data_dir: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nmfs_objectd=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let mut cfg: ObjectdConfig = nmfs_core::config::load_config(&args.config);
    if let Some(bind_addr) = args.bind_addr {
        cfg.bind_addr = bind_addr;
    }
    if let Some(data_dir) = args.data_dir {
        cfg.data_dir = data_dir;
    }

    let store = Arc::new(Store::new(&cfg.data_dir).expect("failed to initialize data directory"));
    let app = build_router(store);

    let addr: SocketAddr = cfg.bind_addr.parse().expect("invalid bind_addr");
    tracing::info!(%addr, data_dir = %cfg.data_dir, "nmfs-objectd listening");
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
