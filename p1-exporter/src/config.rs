use serde::Deserialize;
use std::{
    fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

/// Environment variable naming the config file when `--config` is not given.
pub const CONFIG_ENV: &str = "P1_EXPORTER_CONFIG";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    None,
    Even,
    Odd,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub device: String,
    pub baud_rate: u32,
    pub parity: Parity,
    pub read_timeout_ms: u64,
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
            parity: Parity::None,
            read_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Serial,
    File,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Capture file replayed when `kind = "file"`.
    pub file_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Capacity of the queue between the line pump and the framer.
    pub line_buffer: usize,
    /// Upper bound on one collection, open to reading.
    pub cycle_deadline_ms: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            line_buffer: 100,
            cycle_deadline_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind_addr: String,
    pub metrics_path: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: ":8080".to_string(),
            metrics_path: "/metrics".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub serial: SerialConfig,
    pub source: SourceConfig,
    pub collector: CollectorConfig,
    pub http: HttpConfig,
}

impl AppConfig {
    /// Load from `path`, else from `$P1_EXPORTER_CONFIG`, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let from_env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        match path.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let cfg: AppConfig = toml::from_str(contents)?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.serial.baud_rate == 0 {
            return Err(ConfigError::Validation("serial.baud_rate must be positive".to_string()));
        }
        if self.serial.read_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "serial.read_timeout_ms must be positive".to_string(),
            ));
        }
        if self.collector.line_buffer == 0 {
            return Err(ConfigError::Validation(
                "collector.line_buffer must be positive".to_string(),
            ));
        }
        if self.collector.cycle_deadline_ms == 0 {
            return Err(ConfigError::Validation(
                "collector.cycle_deadline_ms must be positive".to_string(),
            ));
        }
        if self.source.kind == SourceKind::File && self.source.file_path.is_none() {
            return Err(ConfigError::Validation(
                "source.file_path is required when source.kind = \"file\"".to_string(),
            ));
        }
        if !self.http.metrics_path.starts_with('/') {
            return Err(ConfigError::Validation(
                "http.metrics_path must start with '/'".to_string(),
            ));
        }
        parse_listen_addr(&self.http.bind_addr)?;
        Ok(())
    }
}

/// Parse a listen address; a bare `:port` binds every interface.
pub fn parse_listen_addr(addr: &str) -> Result<SocketAddr, ConfigError> {
    let full = if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_string()
    };
    full.parse()
        .map_err(|e| ConfigError::Validation(format!("invalid listen address '{addr}': {e}")))
}
