use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sheetgate::{AppState, GatewayConfig, GatewayServer};

#[derive(Parser, Debug)]
#[command(name = "sheetgate-server", version, about = "Google Sheets and OAuth2 relay gateway")]
struct Args {
    /// TOML config file; defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override `server.listen`
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Log filter, used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    #[arg(long)]
    json_logs: bool,

    /// Load and validate the config, then exit
    #[arg(long)]
    check_config: bool,
}

fn init_tracing(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if args.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args);

    let mut config = GatewayConfig::load_with_env(args.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }

    if args.check_config {
        println!(
            "config ok: listen={} mode={}",
            config.server.listen,
            config.credentials.mode.as_str()
        );
        return Ok(());
    }

    let state = AppState::new(config).context("failed to initialise gateway")?;
    GatewayServer::new(state)
        .run()
        .await
        .context("server error")?;

    Ok(())
}
