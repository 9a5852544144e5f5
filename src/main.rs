use std::sync::Arc;

use clap::Parser;

mod config;
mod error;
mod fs;
mod handler;
mod http;
mod logger;
mod server;

#[derive(Parser, Debug)]
#[command(name = "rust_fileserver", version, about = "Static HTTP file server")]
struct Cli {
    /// Configuration file, extension optional
    #[arg(short, long, default_value = "config")]
    config: String,

    /// Directory to serve, overrides `files.root`
    #[arg(short, long)]
    root: Option<String>,

    /// Port to listen on, overrides `server.port`
    #[arg(short, long)]
    port: Option<u16>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut cfg = config::Config::load_from(&cli.config)?;
    if let Some(root) = cli.root {
        cfg.files.root = root;
    }
    if let Some(port) = cli.port {
        cfg.server.port = port;
    }

    logger::init(&cfg.logging);

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let state = Arc::new(config::AppState::new(cfg)?);

    let listener = server::create_reusable_listener(addr)?;
    logger::log_server_start(&addr, &state.config, &state.handler.config().root);

    let signals = Arc::new(server::SignalHandler::new());
    server::start_signal_handler(Arc::clone(&signals));

    server::run_server(listener, state, signals).await?;
    Ok(())
}
