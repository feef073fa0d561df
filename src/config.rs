//! Runtime configuration.
//!
//! Loaded once at startup (after `.env`) and passed down explicitly. No other
//! module reads the environment.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderName;

use crate::error::ConfigError;

pub const DEFAULT_UPSTREAM: &str = "https://changeclothesai.online";
pub const DEFAULT_TRANSFORM_PATH: &str = "/api/openapi/change-clothes-ai";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Inline,
    Cloudinary,
    Imgur,
    FileIo,
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" | "base64" => Ok(BackendKind::Inline),
            "cloudinary" => Ok(BackendKind::Cloudinary),
            "imgur" => Ok(BackendKind::Imgur),
            "fileio" | "file.io" => Ok(BackendKind::FileIo),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub upstream_base_url: String,
    pub timeout: Duration,
    pub allow_methods: String,
    pub allow_headers: String,
    /// Inbound headers copied to the upstream request, besides Authorization.
    pub forward_headers: Vec<HeaderName>,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub transform_path: String,
}

impl ClientConfig {
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.transform_path)
    }
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub backends: Vec<BackendKind>,
    pub inline_max_bytes: usize,
    pub cloudinary_cloud_name: String,
    pub cloudinary_upload_preset: String,
    pub cloudinary_api_key: Option<String>,
    pub imgur_client_id: Option<String>,
    pub fileio_endpoint: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: IpAddr,
    pub port: u16,
    pub max_body_bytes: usize,
    pub static_dir: Option<PathBuf>,
    /// Only used by the status probe. Submissions always carry their own.
    pub api_key: Option<String>,
    pub relay: RelayConfig,
    pub client: ClientConfig,
    pub upload: UploadConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let upstream_base_url = get("UPSTREAM_BASE_URL")
            .unwrap_or_else(|| DEFAULT_UPSTREAM.to_string())
            .trim_end_matches('/')
            .to_string();

        let backends = match get("UPLOAD_BACKENDS") {
            Some(list) => list
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(BackendKind::from_str)
                .collect::<Result<Vec<_>, _>>()?,
            None => vec![
                BackendKind::Cloudinary,
                BackendKind::Imgur,
                BackendKind::FileIo,
                BackendKind::Inline,
            ],
        };
        if backends.is_empty() {
            return Err(ConfigError::EmptyChain);
        }

        let forward_headers = get("RELAY_FORWARD_HEADERS")
            .unwrap_or_else(|| "content-type, accept".to_string())
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|h| {
                HeaderName::from_str(h).map_err(|e| ConfigError::Invalid {
                    name: "RELAY_FORWARD_HEADERS",
                    value: h.to_string(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Config {
            bind_addr: parse_or(get("BIND_ADDR"), "BIND_ADDR", IpAddr::from([0, 0, 0, 0]))?,
            port: parse_or(get("PORT"), "PORT", 3000)?,
            max_body_bytes: parse_or(get("MAX_BODY_BYTES"), "MAX_BODY_BYTES", 50 * 1024 * 1024)?,
            static_dir: get("STATIC_DIR").map(PathBuf::from),
            api_key: get("TRYON_API_KEY"),
            client: ClientConfig {
                base_url: get("TRANSFORM_BASE_URL").unwrap_or_else(|| upstream_base_url.clone()),
                transform_path: get("TRANSFORM_PATH").unwrap_or_else(|| DEFAULT_TRANSFORM_PATH.to_string()),
            },
            relay: RelayConfig {
                timeout: Duration::from_secs(parse_or(get("RELAY_TIMEOUT_SECS"), "RELAY_TIMEOUT_SECS", 30)?),
                allow_methods: get("CORS_ALLOW_METHODS").unwrap_or_else(|| "GET, POST, OPTIONS".to_string()),
                allow_headers: get("CORS_ALLOW_HEADERS").unwrap_or_else(|| "Content-Type, Authorization".to_string()),
                forward_headers,
                upstream_base_url,
            },
            upload: UploadConfig {
                backends,
                inline_max_bytes: parse_or(get("INLINE_MAX_BYTES"), "INLINE_MAX_BYTES", 5 * 1024 * 1024)?,
                cloudinary_cloud_name: get("CLOUDINARY_CLOUD_NAME").unwrap_or_else(|| "demo".to_string()),
                cloudinary_upload_preset: get("CLOUDINARY_UPLOAD_PRESET").unwrap_or_else(|| "ml_default".to_string()),
                cloudinary_api_key: get("CLOUDINARY_API_KEY"),
                imgur_client_id: get("IMGUR_CLIENT_ID"),
                fileio_endpoint: get("FILEIO_ENDPOINT").unwrap_or_else(|| "https://file.io".to_string()),
            },
        })
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

fn parse_or<T>(value: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|e| ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value: raw,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let config = config_with(&[]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.relay.upstream_base_url, DEFAULT_UPSTREAM);
        assert_eq!(config.relay.timeout, Duration::from_secs(30));
        assert_eq!(config.client.endpoint(), "https://changeclothesai.online/api/openapi/change-clothes-ai");
        assert_eq!(config.upload.backends.first(), Some(&BackendKind::Cloudinary));
        assert_eq!(config.upload.inline_max_bytes, 5 * 1024 * 1024);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn overrides() {
        let config = config_with(&[
            ("PORT", "8088"),
            ("UPSTREAM_BASE_URL", "http://127.0.0.1:9000/"),
            ("UPLOAD_BACKENDS", "inline, fileio"),
            ("RELAY_TIMEOUT_SECS", "5"),
        ])
        .unwrap();
        assert_eq!(config.port, 8088);
        assert_eq!(config.relay.upstream_base_url, "http://127.0.0.1:9000");
        assert_eq!(config.client.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.upload.backends, vec![BackendKind::Inline, BackendKind::FileIo]);
        assert_eq!(config.relay.timeout, Duration::from_secs(5));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(config_with(&[("PORT", "http")]), Err(ConfigError::Invalid { name: "PORT", .. })));
        assert!(matches!(
            config_with(&[("UPLOAD_BACKENDS", "inline,dropbox")]),
            Err(ConfigError::UnknownBackend(_))
        ));
        assert!(matches!(config_with(&[("UPLOAD_BACKENDS", " , ")]), Err(ConfigError::EmptyChain)));
    }
}
