//! Server runtime
//!
//! [`ServerHandle`] wires the Keycloak adapter, the user service and the
//! REST router together, serves them and coordinates graceful shutdown.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::application::UserService;
use crate::config::{AppConfig, ConfigError, LogFormat};
use crate::infrastructure::KeycloakClient;
use crate::interfaces::http::create_api_router;
use crate::interfaces::http::middleware::{AuthState, RequiredRole};
use crate::shared::shutdown::{listen_for_shutdown_signals, ShutdownSignal};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to build Keycloak HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Failed to install Prometheus recorder: {0}")]
    Metrics(#[from] BuildError),

    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Options for starting the server.
#[derive(Debug, Clone, Default)]
pub struct ServerOptions {
    pub config: AppConfig,
}

/// Handle to a running server.
///
/// ```rust,no_run
/// use backend_resources::server::{ServerHandle, ServerOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handle = ServerHandle::start(ServerOptions::default()).await?;
///     handle.install_signal_handler();
///     handle.wait().await;
///     Ok(())
/// }
/// ```
pub struct ServerHandle {
    /// The configuration the server was started with.
    pub config: AppConfig,
    /// Address the listener is bound to.
    pub local_addr: SocketAddr,

    shutdown: ShutdownSignal,
    api_task: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// Validate the configuration, build the Keycloak client and start
    /// serving the REST API.
    pub async fn start(opts: ServerOptions) -> Result<Self, ServerError> {
        let app_cfg = opts.config;
        app_cfg.validate()?;

        info!("Starting backend-resources...");

        let prometheus_handle = prometheus_handle()?;

        let jwt_config = app_cfg.security.jwt_config()?;
        let grant = app_cfg.keycloak.grant()?;
        info!(
            server_url = %app_cfg.keycloak.server_url,
            realm = %app_cfg.keycloak.realm,
            grant = ?grant,
            "Keycloak admin client configured"
        );

        let keycloak = KeycloakClient::new(&app_cfg.keycloak, grant)?;
        let user_service = Arc::new(UserService::new(Arc::new(keycloak)));

        let router = create_api_router(
            user_service,
            AuthState { jwt_config },
            RequiredRole(app_cfg.security.required_role.clone()),
            prometheus_handle,
        );

        let address = app_cfg.server.address();
        let listener = tokio::net::TcpListener::bind(&address)
            .await
            .map_err(|source| ServerError::Bind {
                address: address.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| ServerError::Bind {
            address: address.clone(),
            source,
        })?;
        info!("REST API server listening on http://{}", local_addr);
        info!("Swagger UI available at http://{}/docs/", local_addr);

        let shutdown = ShutdownSignal::new();
        let api_shutdown = shutdown.clone();
        let api_server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown(
            async move {
                api_shutdown.wait().await;
                info!("REST API server received shutdown signal");
            },
        );

        let api_task = tokio::spawn(async move {
            if let Err(e) = api_server.await {
                error!("REST API server error: {}", e);
            }
        });

        Ok(Self {
            config: app_cfg,
            local_addr,
            shutdown,
            api_task,
        })
    }

    /// Get a cloneable shutdown signal.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Install OS signal listeners (SIGTERM, SIGINT) that trigger shutdown.
    pub fn install_signal_handler(&self) {
        tokio::spawn(listen_for_shutdown_signals(self.shutdown.clone()));
    }

    /// Trigger graceful shutdown (non-blocking).
    pub fn trigger_shutdown(&self) {
        self.shutdown.trigger();
    }

    /// Wait for the server to stop.
    ///
    /// In-flight requests get `server.shutdown_timeout` seconds after the
    /// signal before the server task is aborted.
    pub async fn wait(self) {
        let timeout = Duration::from_secs(self.config.server.shutdown_timeout);
        let mut api_task = self.api_task;

        tokio::select! {
            result = &mut api_task => {
                log_task_result(result);
                info!("backend-resources shutdown complete");
                return;
            }
            _ = self.shutdown.wait() => {
                info!("Starting graceful shutdown (timeout: {}s)...", timeout.as_secs());
            }
        }

        match tokio::time::timeout(timeout, &mut api_task).await {
            Ok(result) => log_task_result(result),
            Err(_) => {
                warn!("Graceful shutdown timed out after {}s", timeout.as_secs());
                api_task.abort();
            }
        }
        info!("backend-resources shutdown complete");
    }

    /// Trigger shutdown and wait for completion.
    pub async fn shutdown(self) {
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished()
    }
}

fn log_task_result(result: Result<(), tokio::task::JoinError>) {
    match result {
        Ok(()) => info!("REST API server stopped"),
        Err(e) => error!("REST API server task panicked: {}", e),
    }
}

/// The global metrics recorder can only be installed once per process;
/// later starts reuse its handle. The lock keeps concurrent starts from
/// racing on the installation.
fn prometheus_handle() -> Result<PrometheusHandle, ServerError> {
    static PROM_HANDLE: Mutex<Option<PrometheusHandle>> = Mutex::new(None);

    let mut slot = PROM_HANDLE.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(handle) = slot.as_ref() {
        return Ok(handle.clone());
    }
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("Prometheus metrics recorder installed");
    *slot = Some(handle.clone());
    Ok(handle)
}

/// Initialize tracing (logging) from the application config.
///
/// `RUST_LOG` takes precedence over `logging.level`. Call once at process
/// startup, before [`ServerHandle::start`].
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.server.host = "127.0.0.1".into();
        config.server.port = 0;
        config.server.shutdown_timeout = 2;
        config.security.jwt_secret = Some("server-test".into());
        config
    }

    #[tokio::test]
    async fn serves_health_and_shuts_down() {
        let handle = ServerHandle::start(ServerOptions {
            config: test_config(),
        })
        .await
        .unwrap();
        assert!(handle.is_running());

        let url = format!("http://{}/health", handle.local_addr);
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);

        let metrics = reqwest::get(format!("http://{}/metrics", handle.local_addr))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(metrics.contains("http_requests_total"));

        tokio::time::timeout(Duration::from_secs(5), handle.shutdown())
            .await
            .unwrap();
    }

    #[test]
    fn concurrent_recorder_setup_shares_one_handle() {
        let threads: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(prometheus_handle))
            .collect();
        for thread in threads {
            assert!(thread.join().unwrap().is_ok());
        }
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let mut config = test_config();
        config.security.jwt_secret = None;

        let result = ServerHandle::start(ServerOptions { config }).await;
        assert!(matches!(result, Err(ServerError::Config(_))));
    }
}
