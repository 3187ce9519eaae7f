use std::net::{IpAddr, SocketAddr};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pool_scheduler::config::ServerConfig;
use pool_scheduler::node::Server;
use pool_scheduler::shutdown::install_shutdown_handler;

#[derive(Parser, Debug)]
#[command(name = "pool-scheduler")]
#[command(version)]
#[command(about = "Books per-category worker capacity for submitted jobs")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the scheduler HTTP server
    Server(ServerArgs),
}

#[derive(Parser, Debug)]
struct ServerArgs {
    /// Address to bind the HTTP API to
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port for the HTTP API
    #[arg(long, default_value = "8000")]
    port: u16,

    /// Log filter used when RUST_LOG is not set (e.g. "debug", "pool_scheduler=trace")
    #[arg(long, default_value = "info")]
    log_level: String,
}

async fn run_server(args: ServerArgs) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = ServerConfig::new(SocketAddr::new(args.host, args.port))
        .with_log_level(args.log_level);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    tracing::info!(
        listen_addr = %config.listen_addr,
        "Starting pool-scheduler"
    );

    let shutdown = install_shutdown_handler();
    Server::new(config).run(shutdown).await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    match args.command {
        Commands::Server(server_args) => {
            run_server(server_args).await?;
        }
    }

    Ok(())
}
