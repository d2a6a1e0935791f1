//! Process entrypoint: loads configuration, wires up the shared services,
//! and runs the WebSocket acceptor, the HTTP control plane and the
//! operator console concurrently until shutdown.

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ocpp_csms::application::control::ControlPlane;
use ocpp_csms::application::orchestrator::command_sender::CommandSender;
use ocpp_csms::application::orchestrator::state::Services;
use ocpp_csms::application::session::registry::SessionRegistry;
use ocpp_csms::config::{self, AppConfig};
use ocpp_csms::domain::station::StationRegistry;
use ocpp_csms::domain::vid::IdentityTable;
use ocpp_csms::domain::wallet::Wallet;
use ocpp_csms::infrastructure::{console, ws_server::WsServer};
use ocpp_csms::interfaces::http::{build_router, AppState};
use ocpp_csms::support::shutdown::ShutdownCoordinator;

#[derive(Parser, Debug)]
#[command(name = "ocpp-csms", about = "OCPP 1.6J central system")]
struct Cli {
    /// Path to a TOML config file. Defaults to `$OCPP_CONFIG`, then the
    /// platform config directory.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    let config_path = config::resolve_config_path(cli.config);
    let config = match AppConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "warning: could not load config from {}: {e} — using defaults",
                config_path.display()
            );
            AppConfig::default()
        }
    };

    init_tracing(&config);
    info!(path = %config_path.display(), "starting OCPP 1.6J central system");

    let sessions = SessionRegistry::shared();
    let services = Services::new(
        IdentityTable::shared(),
        Wallet::shared(),
        StationRegistry::shared(),
        sessions.clone(),
        CommandSender::shared(sessions),
        config.payment.qr_code_url.clone(),
    );
    let control = ControlPlane::new(services.clone());

    let shutdown = ShutdownCoordinator::new(config.server.shutdown_timeout_secs);
    shutdown.start_signal_listener();

    let ws_server = WsServer::new(config.ws_address(), services.clone())
        .with_shutdown(shutdown.signal());
    let ws_handle = tokio::spawn(async move {
        if let Err(e) = ws_server.run().await {
            error!(error = %e, "OCPP WebSocket acceptor exited with an error");
        }
    });

    let api_addr = config.api_address();
    let app_state = AppState {
        control: control.clone(),
        api_key: config.security.api_key.clone(),
    };
    let router = build_router(app_state);
    let http_shutdown = shutdown.signal();
    let http_handle = tokio::spawn(async move {
        let listener = match tokio::net::TcpListener::bind(&api_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(addr = %api_addr, error = %e, "failed to bind HTTP control-plane listener");
                return;
            }
        };
        info!(addr = %api_addr, "HTTP control plane listening");
        let serve = axum::serve(listener, router).with_graceful_shutdown(async move {
            http_shutdown.notified().wait().await;
        });
        if let Err(e) = serve.await {
            error!(error = %e, "HTTP control plane exited with an error");
        }
    });

    let console_shutdown = shutdown.signal();
    let console_handle = tokio::spawn(console::run(control, console_shutdown));

    shutdown.wait_for_shutdown().await;

    for handle in [ws_handle, http_handle, console_handle] {
        if let Err(e) = handle.await {
            warn!(error = %e, "a server task panicked during shutdown");
        }
    }

    info!("shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_new(&config.logging.level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if config.logging.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
