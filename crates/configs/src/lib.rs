use anyhow::{Context, Result};
use serde::Deserialize;
use anyhow::anyhow;
use std::io::ErrorKind;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_WORKER_THREADS: usize = 4;
const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            worker_threads: Some(DEFAULT_WORKER_THREADS),
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `compact` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self { Self { format: default_log_format() } }
}

fn default_host() -> String { DEFAULT_HOST.to_string() }
fn default_port() -> u16 { 8080 }
fn default_shutdown_timeout() -> u64 { DEFAULT_SHUTDOWN_TIMEOUT_SECS }
fn default_log_format() -> String { "compact".to_string() }

fn config_path() -> String {
    std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string())
}

pub fn load_default() -> Result<Option<AppConfig>> {
    load_from_file(&config_path())
}

/// `Ok(None)` only when the file does not exist. Read and parse errors are returned.
pub fn load_from_file(path: &str) -> Result<Option<AppConfig>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("cannot read config file {path}")),
    };
    parse(&content)
        .with_context(|| format!("cannot parse config file {path}"))
        .map(Some)
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Config file first (`CONFIG_PATH`, default `config.toml`), environment
    /// only when that file does not exist. The flag reports whether the file was used.
    pub fn load_and_validate() -> Result<(Self, bool)> {
        Self::load_and_validate_from(&config_path())
    }

    pub fn load_and_validate_from(path: &str) -> Result<(Self, bool)> {
        match load_from_file(path)? {
            Some(mut cfg) => {
                cfg.normalize_and_validate()
                    .with_context(|| format!("invalid config file {path}"))?;
                Ok((cfg, true))
            }
            None => {
                let mut cfg = Self::from_env();
                cfg.normalize_and_validate()?;
                Ok((cfg, false))
            }
        }
    }

    /// Config without a file: `SERVER_HOST`, `SERVER_PORT` and
    /// `TOKIO_WORKER_THREADS` override the defaults.
    pub fn from_env() -> Self {
        let mut cfg = AppConfig::default();
        if let Ok(host) = std::env::var("SERVER_HOST") {
            cfg.server.host = host;
        }
        if let Some(port) = std::env::var("SERVER_PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            cfg.server.port = port;
        }
        if let Some(w) = std::env::var("TOKIO_WORKER_THREADS").ok().and_then(|v| v.parse::<usize>().ok()) {
            cfg.server.worker_threads = Some(w);
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            cfg.logging.format = format;
        }
        cfg
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.logging.validate()?;
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = DEFAULT_HOST.to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        match self.worker_threads {
            Some(w) if w > 0 => {}
            _ => self.worker_threads = Some(DEFAULT_WORKER_THREADS),
        }
        if self.shutdown_timeout_secs == 0 {
            self.shutdown_timeout_secs = DEFAULT_SHUTDOWN_TIMEOUT_SECS;
        }
        Ok(())
    }
}

impl LoggingConfig {
    fn validate(&self) -> Result<()> {
        match self.format.trim().to_ascii_lowercase().as_str() {
            "compact" | "json" => Ok(()),
            other => Err(anyhow!("logging.format must be `compact` or `json`, got `{other}`")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() -> Result<()> {
        let mut cfg = parse("")?;
        cfg.normalize_and_validate()?;
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.server.worker_threads, Some(4));
        assert_eq!(cfg.server.shutdown_timeout_secs, 5);
        assert_eq!(cfg.logging.format, "compact");
        assert_eq!(cfg.bind_addr(), "127.0.0.1:8080");
        Ok(())
    }

    #[test]
    fn normalize_fills_blank_host_and_zero_threads() -> Result<()> {
        let mut cfg = parse(
            r#"
            [server]
            host = "  "
            port = 9000
            worker_threads = 0
            shutdown_timeout_secs = 0

            [logging]
            format = "json"
            "#,
        )?;
        cfg.normalize_and_validate()?;
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.worker_threads, Some(4));
        assert_eq!(cfg.server.shutdown_timeout_secs, 5);
        assert_eq!(cfg.logging.format, "json");
        Ok(())
    }

    #[test]
    fn zero_port_rejected() -> Result<()> {
        let mut cfg = parse("[server]\nport = 0\n")?;
        assert!(cfg.normalize_and_validate().is_err());
        Ok(())
    }

    #[test]
    fn unknown_log_format_rejected() -> Result<()> {
        let mut cfg = parse("[logging]\nformat = \"xml\"\n")?;
        assert!(cfg.normalize_and_validate().is_err());
        Ok(())
    }

    fn write_temp(name: &str, content: &str) -> Result<String> {
        let path = std::env::temp_dir().join(format!("configs-{}-{name}.toml", std::process::id()));
        std::fs::write(&path, content)?;
        Ok(path.to_string_lossy().into_owned())
    }

    #[test]
    fn missing_file_is_none() -> Result<()> {
        assert!(load_from_file("/nonexistent/config-for-tests.toml")?.is_none());
        Ok(())
    }

    #[test]
    fn missing_file_falls_back_to_environment() -> Result<()> {
        let (_, from_file) = AppConfig::load_and_validate_from("/nonexistent/config-for-tests.toml")?;
        assert!(!from_file);
        Ok(())
    }

    #[test]
    fn present_file_is_used() -> Result<()> {
        let path = write_temp("valid", "[server]\nport = 9100\n")?;
        let loaded = AppConfig::load_and_validate_from(&path);
        std::fs::remove_file(&path)?;
        let (cfg, from_file) = loaded?;
        assert!(from_file);
        assert_eq!(cfg.server.port, 9100);
        Ok(())
    }

    #[test]
    fn invalid_file_is_an_error_not_a_fallback() -> Result<()> {
        let zero_port = write_temp("zero-port", "[server]\nport = 0\n")?;
        let bad_format = write_temp("xml-format", "[logging]\nformat = \"xml\"\n")?;
        let unparsable = write_temp("unparsable", "[server\nport = ")?;

        let results = [
            AppConfig::load_and_validate_from(&zero_port),
            AppConfig::load_and_validate_from(&bad_format),
            AppConfig::load_and_validate_from(&unparsable),
        ];
        for path in [&zero_port, &bad_format, &unparsable] {
            std::fs::remove_file(path)?;
        }

        for result in results {
            let err = result.expect_err("invalid file must not fall back to the environment");
            assert!(err.to_string().contains("config file"), "unexpected error: {err:#}");
        }
        Ok(())
    }
}
