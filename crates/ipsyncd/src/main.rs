// # ipsyncd - IP Sync Daemon
//
// Thin integration layer: all sync logic lives in ipsync-core.
//
// The ipsyncd daemon is responsible for:
// 1. Reading the environment and the YAML configuration file
// 2. Initializing logging and the runtime
// 3. Building the TransIP client and the HTTP IP source
// 4. Running the sync engine until SIGTERM or SIGINT
//
// ## Environment
//
// - `CONFIG_PATH`: Path of the YAML configuration (default `./config.yaml`)
// - `PRIVATE_KEY_PATH`: Private key path, overrides `account.private_key_path`
// - `LOGLEVEL`: trace, debug, info, warn or error, or -1 to 5 (default info)
//
// ## Example
//
// ```bash
// export CONFIG_PATH=/etc/ipsync/config.yaml
// export LOGLEVEL=debug
//
// ipsyncd
// ```

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

use ipsync_core::{EngineEvent, MemoryTokenCache, SyncConfig, SyncEngine};
use ipsync_ip_http::HttpIpSource;
use ipsync_provider_transip::TransipClient;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Default configuration file, relative to the working directory
const DEFAULT_CONFIG_PATH: &str = "./config.yaml";

/// Exit codes for different termination scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IpsyncExitCode {
    /// Configuration error or startup failure
    ConfigError,
    /// Stopped by SIGTERM or SIGINT
    Terminated,
    /// Runtime error (unexpected failure)
    RuntimeError,
}

impl IpsyncExitCode {
    fn code(self) -> u8 {
        match self {
            IpsyncExitCode::ConfigError | IpsyncExitCode::Terminated => 1,
            IpsyncExitCode::RuntimeError => 2,
        }
    }
}

impl From<IpsyncExitCode> for ExitCode {
    fn from(code: IpsyncExitCode) -> Self {
        ExitCode::from(code.code())
    }
}

/// Settings taken from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
struct DaemonEnv {
    config_path: PathBuf,
    private_key_path: Option<PathBuf>,
    log_level: String,
}

impl DaemonEnv {
    fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any variable lookup; empty values count as unset
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            config_path: var("CONFIG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
            private_key_path: var("PRIVATE_KEY_PATH").map(PathBuf::from),
            log_level: var("LOGLEVEL").unwrap_or_else(|| "info".to_string()),
        }
    }
}

/// Parse `LOGLEVEL`
///
/// Accepts level names as well as numeric levels:
/// -1 trace, 0 debug, 1 info, 2 warn, 3 and above error.
fn parse_log_level(level: &str) -> Result<Level> {
    if let Ok(numeric) = level.trim().parse::<i8>() {
        return match numeric {
            -1 => Ok(Level::TRACE),
            0 => Ok(Level::DEBUG),
            1 => Ok(Level::INFO),
            2 => Ok(Level::WARN),
            3.. => Ok(Level::ERROR),
            _ => anyhow::bail!("LOGLEVEL '{}' is below the lowest level (-1)", level),
        };
    }

    match level.trim().to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "LOGLEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error, or -1 to 5",
            level
        ),
    }
}

fn main() -> ExitCode {
    let env = DaemonEnv::from_env();

    // Initialize tracing
    let log_level = match parse_log_level(&env.log_level) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return IpsyncExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return IpsyncExitCode::ConfigError.into();
    }

    info!("Starting ipsyncd");

    // Load and validate configuration
    let config = match load_config(&env) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            return IpsyncExitCode::ConfigError.into();
        }
    };
    info!(
        "Configuration loaded: {} domain(s), sync every {}s",
        config.domains.len(),
        config.sync_interval
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return IpsyncExitCode::ConfigError.into();
        }
    };

    rt.block_on(async {
        let (engine, events) = match build_engine(&config) {
            Ok(parts) => parts,
            Err(e) => {
                error!("Startup failed: {:#}", e);
                return IpsyncExitCode::ConfigError;
            }
        };

        tokio::spawn(log_events(events));

        run_daemon(engine).await
    })
    .into()
}

fn load_config(env: &DaemonEnv) -> Result<SyncConfig> {
    let config = SyncConfig::load(&env.config_path, env.private_key_path.clone())?;
    config.validate()?;
    Ok(config)
}

/// Build the TransIP client, the IP source and the engine
fn build_engine(
    config: &SyncConfig,
) -> Result<(SyncEngine, tokio::sync::mpsc::Receiver<EngineEvent>)> {
    let key_path = config
        .account
        .private_key_path
        .as_deref()
        .context("No private key path resolved")?;

    let zone_api = TransipClient::from_key_file(
        config.account.name.as_str(),
        key_path,
        Arc::new(MemoryTokenCache::new()),
    )
    .context("Failed to create TransIP client")?
    .with_whitelisted_only(config.account.whitelisted_only)
    .with_dry_run(config.dry_run);

    if zone_api.is_dry_run() {
        info!("Dry-run mode: zones are read, records are never written");
    }

    let ip_source = HttpIpSource::new(
        config.ip_source_url_v4.as_deref(),
        config.ip_source_url_v6.as_deref(),
    )
    .context("Failed to create IP source")?;

    let engine = SyncEngine::new(Box::new(ip_source), Box::new(zone_api), config)?;
    Ok(engine)
}

/// Run the engine until a termination signal arrives
async fn run_daemon(engine: SyncEngine) -> IpsyncExitCode {
    let shutdown = match shutdown_signal() {
        Ok(shutdown) => shutdown,
        Err(e) => {
            error!("Failed to install signal handlers: {:#}", e);
            return IpsyncExitCode::ConfigError;
        }
    };

    let result = engine
        .run_until(async {
            let signal = shutdown.await;
            info!("Received shutdown signal: {}", signal);
        })
        .await;

    match result {
        Ok(()) => {
            info!("Shutting down ipsyncd");
            IpsyncExitCode::Terminated
        }
        Err(e) => {
            error!("Daemon error: {}", e);
            IpsyncExitCode::RuntimeError
        }
    }
}

/// Log cycle outcomes reported by the engine
async fn log_events(mut events: tokio::sync::mpsc::Receiver<EngineEvent>) {
    while let Some(event) = events.recv().await {
        if let EngineEvent::CycleCompleted { cycle, report } = &event {
            if !report.is_clean() {
                debug!(
                    "Cycle {}: {} domain(s) skipped, {} failed",
                    cycle,
                    report.skipped(),
                    report.failed()
                );
            }
        }
    }
}

/// Install SIGTERM and SIGINT handlers
///
/// Returns a future resolving to the name of the first signal received.
#[cfg(unix)]
fn shutdown_signal() -> Result<impl std::future::Future<Output = &'static str>> {
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        }
    })
}

/// Install a Ctrl-C handler
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl std::future::Future<Output = &'static str>> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to wait for CTRL-C: {}", e);
            std::future::pending::<()>().await;
        }
        "SIGINT"
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(vars: &[(&str, &str)]) -> DaemonEnv {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DaemonEnv::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn env_defaults() {
        let env = env_from(&[]);

        assert_eq!(env.config_path, PathBuf::from("./config.yaml"));
        assert_eq!(env.private_key_path, None);
        assert_eq!(env.log_level, "info");
    }

    #[test]
    fn env_overrides() {
        let env = env_from(&[
            ("CONFIG_PATH", "/etc/ipsync/config.yaml"),
            ("PRIVATE_KEY_PATH", "/run/secrets/transip.key"),
            ("LOGLEVEL", "debug"),
        ]);

        assert_eq!(env.config_path, PathBuf::from("/etc/ipsync/config.yaml"));
        assert_eq!(
            env.private_key_path,
            Some(PathBuf::from("/run/secrets/transip.key"))
        );
        assert_eq!(env.log_level, "debug");
    }

    #[test]
    fn empty_env_values_count_as_unset() {
        let env = env_from(&[("CONFIG_PATH", ""), ("PRIVATE_KEY_PATH", " ")]);

        assert_eq!(env.config_path, PathBuf::from("./config.yaml"));
        assert_eq!(env.private_key_path, None);
    }

    #[test]
    fn log_levels() {
        assert_eq!(parse_log_level("trace").unwrap(), Level::TRACE);
        assert_eq!(parse_log_level("WARN").unwrap(), Level::WARN);
        assert_eq!(parse_log_level(" error ").unwrap(), Level::ERROR);
        assert!(parse_log_level("verbose").is_err());
    }

    #[test]
    fn numeric_log_levels() {
        assert_eq!(parse_log_level("-1").unwrap(), Level::TRACE);
        assert_eq!(parse_log_level("0").unwrap(), Level::DEBUG);
        assert_eq!(parse_log_level("1").unwrap(), Level::INFO);
        assert_eq!(parse_log_level("2").unwrap(), Level::WARN);
        assert_eq!(parse_log_level("3").unwrap(), Level::ERROR);
        assert_eq!(parse_log_level(" 5 ").unwrap(), Level::ERROR);
        assert!(parse_log_level("-2").is_err());
    }

    #[test]
    fn exit_codes() {
        assert_eq!(IpsyncExitCode::ConfigError.code(), 1);
        assert_eq!(IpsyncExitCode::Terminated.code(), 1);
        assert_eq!(IpsyncExitCode::RuntimeError.code(), 2);
    }

    #[test]
    fn missing_config_file_is_a_startup_error() {
        let env = env_from(&[("CONFIG_PATH", "/nonexistent/ipsync/config.yaml")]);
        assert!(load_config(&env).is_err());
    }

    #[test]
    fn missing_key_file_fails_engine_construction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "account:\n  name: acme\ndomains: [example.com]\n").unwrap();

        let env = env_from(&[("CONFIG_PATH", path.to_str().unwrap())]);
        let config = load_config(&env).unwrap();
        assert_eq!(
            config.account.private_key_path,
            Some(dir.path().join("private.key"))
        );

        let err = build_engine(&config).err().expect("no key file present");
        assert!(format!("{:#}", err).contains("TransIP client"));
    }
}
