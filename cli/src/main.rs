//! Backend Resources - CLI Server
//!
//! ```sh
//! # Run with default config (~/.config/backend-resources/config.toml)
//! backend-resources
//!
//! # Custom config path and port
//! backend-resources --config /etc/backend-resources/config.toml --port 8081
//!
//! # Validate config without starting
//! backend-resources --check
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use backend_resources::config::AppConfig;
use backend_resources::server::{init_tracing, ServerHandle, ServerOptions};

/// User management REST API backed by Keycloak.
#[derive(Parser, Debug)]
#[command(
    name = "backend-resources",
    version,
    about = "User management REST API backed by the Keycloak admin API",
    long_about = "Creates and looks up Keycloak users on behalf of moderators.\n\n\
                  Default config: ~/.config/backend-resources/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "BACKEND_RESOURCES_CONFIG")]
    config: Option<PathBuf>,

    /// Override the REST API listen port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration and exit without starting the server.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .unwrap_or_else(backend_resources::default_config_path);

    let mut config = match AppConfig::load(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", config_path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    if cli.check {
        return match config.validate() {
            Ok(()) => {
                println!("Configuration is valid");
                println!("   Config file : {}", config_path.display());
                println!("   API address : {}", config.server.address());
                println!("   Keycloak    : {}", config.keycloak.server_url);
                println!("   Realm       : {}", config.keycloak.realm);
                println!("   Role        : {}", config.security.required_role);
                println!("   Log level   : {}", config.logging.level);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Configuration is invalid: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    init_tracing(&config);
    info!("Configuration loaded from {}", config_path.display());

    let handle = match ServerHandle::start(ServerOptions { config }).await {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to start server: {}", e);
            return ExitCode::FAILURE;
        }
    };

    handle.install_signal_handler();
    info!("Press Ctrl+C to shutdown gracefully.");

    handle.wait().await;
    ExitCode::SUCCESS
}
