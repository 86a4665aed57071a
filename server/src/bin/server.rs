use std::net::{IpAddr, SocketAddr};

use camino::Utf8PathBuf as PathBuf;
use clap::Parser;
use eyre::{self, Context, Result};
use tokio::signal;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{prelude::*, EnvFilter};

use folio_core::config::{read_config, Config};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Config file, defaults are used for everything if not given
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "1")
    }
    if std::env::var("RUST_SPANTRACE").is_err() {
        std::env::set_var("RUST_SPANTRACE", "1");
    }
    color_eyre::install()?;
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("FOLIO_LOG").unwrap_or_else(|_| EnvFilter::new("debug,hyper=info")),
        )
        .with(ErrorLayer::default())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let (config, config_dir) = match args.config {
        Some(config) => {
            let config_path = PathBuf::from(config);
            let config = read_config(&config_path).await?;
            // all paths in config are relative to this
            let config_dir = config_path
                .parent()
                .map(|p| p.to_owned())
                .unwrap_or_default();
            (config, config_dir)
        }
        None => (Config::default(), PathBuf::from(".")),
    };

    let addr: IpAddr = config
        .server
        .address
        .as_ref()
        .map(|a| a.parse().wrap_err("error parsing listening address"))
        .transpose()?
        .unwrap_or(IpAddr::from([127, 0, 0, 1]));
    let port = config.server.port;
    let public_url = config
        .server
        .public_url
        .clone()
        .unwrap_or_else(|| format!("http://{}", SocketAddr::new(addr, port)));
    let max_upload_size = usize::try_from(config.server.max_upload_size)
        .wrap_err("max_upload_size is too large for this platform")?;

    let data_dir_path = if config.data_dir.path.is_absolute() {
        config.data_dir.path.clone()
    } else {
        config_dir.join(&config.data_dir.path)
    };
    info!(data_dir = %data_dir_path, "Starting up...");
    let shared_state = folio_server::open_state(&data_dir_path, &public_url).await?;
    let app = folio_server::app(shared_state, max_upload_size);

    let listener = tokio::net::TcpListener::bind(SocketAddr::new(addr, port))
        .await
        .wrap_err("Error binding socket")?;
    info!(%public_url, "Listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("Server error")?;
    info!("Shutting down...");

    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => {}
        Err(err) => {
            eprintln!("Unable to listen for shutdown signal: {}", err);
            // we also shut down in case of error
            std::process::exit(1);
        }
    }
}
