//! keyspan server entry point: argument parsing, logging setup, and the
//! accept loop wiring sockets to connection sessions.

use keyspan::commands::Dispatcher;
use keyspan::connection::{handle_connection, ConnectionStats};
use keyspan::pubsub::PubSubHub;
use keyspan::store::MemoryStore;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Server configuration.
struct Config {
    host: String,
    port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: keyspan::DEFAULT_HOST.to_string(),
            port: keyspan::DEFAULT_PORT,
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments.
    fn from_args() -> Self {
        let mut config = Config::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    if i + 1 < args.len() {
                        config.host = args[i + 1].clone();
                        i += 2;
                    } else {
                        eprintln!("Error: --host requires a value");
                        std::process::exit(1);
                    }
                }
                "--port" | "-p" => {
                    if i + 1 < args.len() {
                        config.port = args[i + 1].parse().unwrap_or_else(|_| {
                            eprintln!("Error: invalid port number");
                            std::process::exit(1);
                        });
                        i += 2;
                    } else {
                        eprintln!("Error: --port requires a value");
                        std::process::exit(1);
                    }
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("keyspan version {}", keyspan::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        config
    }

    fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn print_help() {
    println!(
        r#"
keyspan - A Redis-wire gateway over an ordered key-value engine

USAGE:
    keyspan [OPTIONS]

OPTIONS:
    -h, --host <HOST>    Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>    Port to listen on (default: 6379)
    -v, --version        Print version information
        --help           Print this help message

CONNECTING:
    Any Redis client works:
    $ redis-cli -p 6379
    127.0.0.1:6379> SET user:101 alice
    OK
    127.0.0.1:6379> SCAN 0 MATCH user:* COUNT 100
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_args();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    println!(
        "keyspan v{} - Redis-wire gateway over an ordered key-value engine",
        keyspan::VERSION
    );

    let store = Arc::new(MemoryStore::new());
    let pubsub = Arc::new(PubSubHub::new());
    let dispatcher = Arc::new(Dispatcher::new(store, Arc::clone(&pubsub)));
    let stats = Arc::new(ConnectionStats::new());

    let listener = TcpListener::bind(config.bind_address()).await?;
    info!("listening on {}", config.bind_address());

    let shutdown = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
        info!("shutdown signal received, stopping server");
    };

    tokio::select! {
        _ = accept_loop(listener, dispatcher, stats) => {}
        _ = shutdown => {}
    }

    info!("server shutdown complete");
    Ok(())
}

/// Accepts connections forever, one session task each.
async fn accept_loop(
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    stats: Arc<ConnectionStats>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let dispatcher = Arc::clone(&dispatcher);
                let stats = Arc::clone(&stats);
                tokio::spawn(async move {
                    handle_connection(stream, addr, dispatcher, stats).await;
                });
            }
            Err(e) => {
                error!("failed to accept connection: {}", e);
            }
        }
    }
}
