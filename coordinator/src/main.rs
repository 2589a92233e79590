use clap::Parser;
use nmfs_core::lease::LeaseTable;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "nmfs-coordinatord")]
struct Args {
    #[arg(long, default_value = "127.0.0.1:9000")]
    bind_addr: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nmfs_coordinatord=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let table = Arc::new(LeaseTable::new());
    let app = nmfs_coordinatord::build_router(table);

    let addr: SocketAddr = args.bind_addr.parse().expect("invalid bind_addr");
    tracing::info!(%addr, "nmfs-coordinatord listening");
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
