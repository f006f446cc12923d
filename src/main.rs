use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Notify;

mod api;
mod config;
mod handler;
mod headers;
mod http;
mod logger;
mod server;

/// Local development server for cextup extension projects
///
/// Serves the project's API handlers and static files the way the hosting
/// platform would, including header rules from `vercel.json`.
#[derive(Debug, Parser)]
#[command(name = "cextup-serve", version)]
struct Cli {
    /// Configuration file, extension optional (toml, json or yaml)
    #[arg(short, long, default_value = "cextup")]
    config: String,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory to serve static files from
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Header rules file [default: <root>/vercel.json when --root is given]
    #[arg(long)]
    headers: Option<PathBuf>,
}

impl Cli {
    /// Flags win over the config file and environment
    fn apply_to(self, cfg: &mut config::Config) {
        if let Some(host) = self.host {
            cfg.server.host = host;
        }
        if let Some(port) = self.port {
            cfg.server.port = port;
        }
        if let Some(root) = self.root {
            // Only a still-default rules file follows the root
            let default_headers = config::Config::default().project.headers_file;
            if self.headers.is_none() && cfg.project.headers_file == default_headers {
                cfg.project.headers_file = root.join("vercel.json");
            }
            cfg.project.static_dir = root;
        }
        if let Some(headers) = self.headers {
            cfg.project.headers_file = headers;
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut cfg = config::Config::load_from(&cli.config)?;
    cli.apply_to(&mut cfg);
    logger::init(&cfg)?;

    // Size the runtime from `server.workers`, CPU count otherwise
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }

    let runtime = runtime_builder.build()?;
    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let listener = server::create_reusable_listener(cfg.get_socket_addr()?)?;
    let local_addr = listener.local_addr()?;

    let state = Arc::new(config::AppState::new(cfg));
    logger::log_server_start(&local_addr, &state.config);
    tracing::info!(routes = ?state.handlers.routes(), "Registered API handlers");

    let shutdown = Arc::new(Notify::new());
    server::signal::start_signal_handler(Arc::clone(&shutdown));
    server::run(listener, state, shutdown).await;
    Ok(())
}
