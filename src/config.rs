//! TOML-backed application configuration, with environment and CLI
//! overrides layered on top — mirroring the teacher's
//! `AppConfig::load` / `Cli` pattern, scoped down to this service's
//! single OCPP 1.6J listener, single HTTP control plane and single
//! static control-plane key (no database, no JWT).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Environment variable naming an explicit config file path, checked
/// before falling back to [`default_config_path`].
pub const CONFIG_PATH_ENV: &str = "OCPP_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Host the OCPP 1.6J WebSocket listener binds.
    pub ws_host: String,
    /// Port the OCPP 1.6J WebSocket listener binds — 9000 per §6.
    pub ws_port: u16,
    /// Host the HTTP control-plane API binds.
    pub api_host: String,
    /// Port the HTTP control-plane API binds — 8080 per §6.
    pub api_port: u16,
    /// Grace period for in-flight connections during shutdown.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            ws_host: "0.0.0.0".to_string(),
            ws_port: 9000,
            api_host: "0.0.0.0".to_string(),
            api_port: 8080,
            shutdown_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// `tracing_subscriber::EnvFilter` directive, e.g. "info" or "debug".
    pub level: String,
    /// Emit structured JSON log lines instead of the plain formatter.
    pub json: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySection {
    /// `X-Api-Key` value the HTTP control plane requires. `None` disables
    /// the check entirely — "authorization beyond a single static
    /// control-plane key" is explicitly out of scope per §1.
    pub api_key: Option<String>,
}

impl Default for SecuritySection {
    fn default() -> Self {
        Self { api_key: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentSection {
    /// URL pushed to a station's connector 1 during post-boot
    /// reconfiguration, per §4.4's BootNotification handling.
    pub qr_code_url: Option<String>,
}

impl Default for PaymentSection {
    fn default() -> Self {
        Self { qr_code_url: None }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSection,
    pub logging: LoggingSection,
    pub security: SecuritySection,
    pub payment: PaymentSection,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl AppConfig {
    /// Load configuration from `path`. Missing file or parse failure is an
    /// error the caller decides how to handle — the binary falls back to
    /// [`AppConfig::default`] and logs a warning, matching the teacher's
    /// `AppConfig::load` fallback idiom.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn ws_address(&self) -> String {
        format!("{}:{}", self.server.ws_host, self.server.ws_port)
    }

    pub fn api_address(&self) -> String {
        format!("{}:{}", self.server.api_host, self.server.api_port)
    }
}

/// `~/.config/ocpp-csms/config.toml` (or platform equivalent via
/// `dirs_next::config_dir`), falling back to the current directory if the
/// platform has no notion of a config dir.
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ocpp-csms")
        .join("config.toml")
}

/// Resolve the config path: `OCPP_CONFIG` env var, or
/// [`default_config_path`].
pub fn resolve_config_path(cli_override: Option<PathBuf>) -> PathBuf {
    cli_override
        .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
        .unwrap_or_else(default_config_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_spec_mandated_ports() {
        let config = AppConfig::default();
        assert_eq!(config.server.ws_port, 9000);
        assert_eq!(config.server.api_port, 8080);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = AppConfig::load(Path::new("/nonexistent/ocpp-csms.toml"));
        assert!(matches!(err, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn load_parses_partial_toml_with_defaults() {
        let dir = std::env::temp_dir().join(format!("ocpp-csms-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[server]\nws_port = 9100\n").unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.server.ws_port, 9100);
        assert_eq!(config.server.api_port, 8080);

        std::fs::remove_file(&path).ok();
        std::fs::remove_dir(&dir).ok();
    }
}
