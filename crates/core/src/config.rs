use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TraceTreeError};
use crate::time::parse_duration_str;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub ingest_http_addr: String,
    pub ingest_grpc_addr: String,
    pub query_tcp_addr: String,
    pub uds_path: PathBuf,
    pub retention_ttl: Duration,
    pub max_traces: usize,
}

impl Default for Config {
    fn default() -> Self {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let data_root = env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(home).join(".local/share"));

        let uds_path = env::var("XDG_RUNTIME_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_root.join("tracetree"))
            .join("tracetree.sock");

        Self {
            ingest_http_addr: "127.0.0.1:4318".to_string(),
            ingest_grpc_addr: "127.0.0.1:4317".to_string(),
            query_tcp_addr: "127.0.0.1:1777".to_string(),
            uds_path,
            retention_ttl: Duration::from_secs(60 * 60),
            max_traces: 10_000,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(file_overrides) = load_file_overrides(&config_file_path())? {
            apply_overrides(&mut cfg, file_overrides, "config file")?;
        }
        apply_overrides(&mut cfg, load_env_overrides()?, "environment")?;
        Ok(cfg)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigOverrides {
    ingest_http_addr: Option<String>,
    ingest_grpc_addr: Option<String>,
    query_tcp_addr: Option<String>,
    uds_path: Option<PathBuf>,
    retention_ttl: Option<String>,
    max_traces: Option<usize>,
}

fn config_file_path() -> PathBuf {
    if let Ok(path) = env::var("TRACETREE_CONFIG") {
        return PathBuf::from(path);
    }

    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(home).join(".config"))
        .join("tracetree/config.toml")
}

fn load_file_overrides(path: &PathBuf) -> Result<Option<ConfigOverrides>> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(path).map_err(|e| {
        TraceTreeError::Config(format!("failed reading {}: {e}", path.display()))
    })?;
    parse_overrides(&raw)
        .map(Some)
        .map_err(|e| TraceTreeError::Config(format!("failed parsing {}: {e}", path.display())))
}

fn parse_overrides(raw: &str) -> std::result::Result<ConfigOverrides, toml::de::Error> {
    toml::from_str(raw)
}

fn load_env_overrides() -> Result<ConfigOverrides> {
    let max_traces = match env::var("TRACETREE_MAX_TRACES") {
        Ok(v) => Some(v.parse::<usize>().map_err(|e| {
            TraceTreeError::Config(format!("bad TRACETREE_MAX_TRACES in environment: {e}"))
        })?),
        Err(_) => None,
    };

    Ok(ConfigOverrides {
        ingest_http_addr: env::var("TRACETREE_INGEST_HTTP_ADDR").ok(),
        ingest_grpc_addr: env::var("TRACETREE_INGEST_GRPC_ADDR").ok(),
        query_tcp_addr: env::var("TRACETREE_QUERY_TCP_ADDR").ok(),
        uds_path: env::var("TRACETREE_QUERY_UDS_PATH").ok().map(PathBuf::from),
        retention_ttl: env::var("TRACETREE_RETENTION_TTL").ok(),
        max_traces,
    })
}

fn apply_overrides(cfg: &mut Config, overrides: ConfigOverrides, source: &str) -> Result<()> {
    if let Some(v) = overrides.ingest_http_addr {
        cfg.ingest_http_addr = v;
    }
    if let Some(v) = overrides.ingest_grpc_addr {
        cfg.ingest_grpc_addr = v;
    }
    if let Some(v) = overrides.query_tcp_addr {
        cfg.query_tcp_addr = v;
    }
    if let Some(v) = overrides.uds_path {
        cfg.uds_path = v;
    }
    if let Some(v) = overrides.retention_ttl {
        cfg.retention_ttl = parse_duration_str(&v).map_err(|e| {
            TraceTreeError::Config(format!("bad retention_ttl in {source}: {e}"))
        })?;
    }
    if let Some(v) = overrides.max_traces {
        if v == 0 {
            return Err(TraceTreeError::Config(format!(
                "max_traces in {source} must be at least 1"
            )));
        }
        cfg.max_traces = v;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_expected_ports() {
        let cfg = Config::default();
        assert_eq!(cfg.ingest_http_addr, "127.0.0.1:4318");
        assert_eq!(cfg.ingest_grpc_addr, "127.0.0.1:4317");
        assert_eq!(cfg.query_tcp_addr, "127.0.0.1:1777");
        assert!(cfg.uds_path.ends_with("tracetree.sock"));
    }

    #[test]
    fn default_has_retention() {
        let cfg = Config::default();
        assert_eq!(cfg.retention_ttl, Duration::from_secs(3_600));
        assert_eq!(cfg.max_traces, 10_000);
    }

    #[test]
    fn file_overrides_parse_and_apply() {
        let overrides = parse_overrides(
            r#"
            ingest_http_addr = "0.0.0.0:9411"
            retention_ttl = "15m"
            max_traces = 64
            "#,
        )
        .unwrap();

        let mut cfg = Config::default();
        apply_overrides(&mut cfg, overrides, "config file").unwrap();
        assert_eq!(cfg.ingest_http_addr, "0.0.0.0:9411");
        assert_eq!(cfg.retention_ttl, Duration::from_secs(900));
        assert_eq!(cfg.max_traces, 64);
        assert_eq!(cfg.query_tcp_addr, "127.0.0.1:1777");
    }

    #[test]
    fn bad_ttl_is_config_error() {
        let mut cfg = Config::default();
        let overrides = ConfigOverrides {
            retention_ttl: Some("soon".to_string()),
            ..ConfigOverrides::default()
        };
        let err = apply_overrides(&mut cfg, overrides, "environment").unwrap_err();
        assert!(matches!(err, TraceTreeError::Config(_)));
        assert!(err.to_string().contains("retention_ttl"));
    }

    #[test]
    fn zero_max_traces_is_rejected() {
        let mut cfg = Config::default();
        let overrides = ConfigOverrides {
            max_traces: Some(0),
            ..ConfigOverrides::default()
        };
        assert!(apply_overrides(&mut cfg, overrides, "config file").is_err());
    }
}
