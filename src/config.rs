use std::fs;
use std::path::Path;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::common::{ChatError, Result, UserId};

pub const DEFAULT_CONFIG_PATH: &str = "config/client.json";
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8082";

pub const SERVER_URL_ENV: &str = "CHAT_SERVER_URL";
pub const SOCKET_URL_ENV: &str = "CHAT_SOCKET_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// Base of the real-time socket. Derived from `server_url` when absent.
    #[serde(default)]
    pub socket_url: Option<String>,
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            socket_url: None,
        }
    }
}

impl AppConfig {
    /// Applies `CHAT_SERVER_URL` / `CHAT_SOCKET_URL` on top of the file values.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(
            std::env::var(SERVER_URL_ENV).ok(),
            std::env::var(SOCKET_URL_ENV).ok(),
        )
    }

    pub fn with_overrides(
        mut self,
        server_url: Option<String>,
        socket_url: Option<String>,
    ) -> Self {
        if let Some(url) = server_url.filter(|url| !url.trim().is_empty()) {
            self.server_url = url;
        }
        if let Some(url) = socket_url.filter(|url| !url.trim().is_empty()) {
            self.socket_url = Some(url);
        }
        self
    }

    pub fn endpoints(&self) -> Result<Endpoints> {
        Endpoints::new(&self.server_url, self.socket_url.as_deref())
    }
}

pub fn load_config(path: &str) -> AppConfig {
    let path = Path::new(path);
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Failed to parse config file {}: {err}", path.display());
                AppConfig::default()
            }
        },
        Err(err) => {
            log::info!(
                "Config file {} not found ({err}); using defaults",
                path.display()
            );
            AppConfig::default()
        }
    }
}

/// Fully resolved backend URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    http_base: Url,
    socket_base: Url,
}

impl Endpoints {
    pub fn new(server_url: &str, socket_url: Option<&str>) -> Result<Self> {
        let http_base = parse_base(server_url)?;
        if !matches!(http_base.scheme(), "http" | "https") {
            return Err(ChatError::Config(format!(
                "server url must be http or https, got `{server_url}`"
            )));
        }

        let socket_base = match socket_url {
            Some(url) => parse_base(url)?,
            None => derive_socket_base(&http_base)?,
        };
        if !matches!(socket_base.scheme(), "ws" | "wss") {
            return Err(ChatError::Config(format!(
                "socket url must be ws or wss, got `{socket_base}`"
            )));
        }

        Ok(Self {
            http_base,
            socket_base,
        })
    }

    pub fn register(&self) -> Url {
        join(&self.http_base, "register")
    }

    pub fn login(&self) -> Url {
        join(&self.http_base, "login")
    }

    pub fn users(&self) -> Url {
        join(&self.http_base, "users")
    }

    pub fn messages(&self) -> Url {
        join(&self.http_base, "messages")
    }

    /// `ws://host/ws?userId=<id>`
    pub fn socket(&self, user_id: UserId) -> Url {
        let mut url = join(&self.socket_base, "ws");
        url.query_pairs_mut()
            .append_pair("userId", &user_id.to_string());
        url
    }
}

fn parse_base(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    // Bases always end in '/', so `join` can drop the empty last segment.
    let normalized = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    Url::parse(&normalized).map_err(|err| ChatError::Config(format!("invalid url `{raw}`: {err}")))
}

fn derive_socket_base(http_base: &Url) -> Result<Url> {
    let scheme = if http_base.scheme() == "https" { "wss" } else { "ws" };
    let mut socket_base = http_base.clone();
    socket_base
        .set_scheme(scheme)
        .map_err(|_| ChatError::Config(format!("cannot derive socket url from `{http_base}`")))?;
    Ok(socket_base)
}

fn join(base: &Url, segment: &str) -> Url {
    let mut url = base.clone();
    url.path_segments_mut()
        .map(|mut segments| {
            segments.pop_if_empty().push(segment);
        })
        .ok();
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_endpoints_match_local_backend() {
        let endpoints = AppConfig::default().endpoints().unwrap();

        assert_eq!(endpoints.login().as_str(), "http://localhost:8082/login");
        assert_eq!(endpoints.users().as_str(), "http://localhost:8082/users");
        assert_eq!(
            endpoints.socket(UserId(7)).as_str(),
            "ws://localhost:8082/ws?userId=7"
        );
    }

    #[test]
    fn https_server_derives_wss_socket() {
        let endpoints = Endpoints::new("https://chat.example.com/api", None).unwrap();

        assert_eq!(
            endpoints.messages().as_str(),
            "https://chat.example.com/api/messages"
        );
        assert_eq!(
            endpoints.socket(UserId(1)).as_str(),
            "wss://chat.example.com/api/ws?userId=1"
        );
    }

    #[test]
    fn explicit_socket_url_wins() {
        let endpoints =
            Endpoints::new("http://localhost:8082/", Some("ws://127.0.0.1:9000")).unwrap();

        assert_eq!(
            endpoints.socket(UserId(3)).as_str(),
            "ws://127.0.0.1:9000/ws?userId=3"
        );
    }

    #[test]
    fn rejects_unsupported_schemes() {
        assert!(matches!(
            Endpoints::new("ftp://localhost", None),
            Err(ChatError::Config(_))
        ));
        assert!(matches!(
            Endpoints::new("http://localhost", Some("http://localhost")),
            Err(ChatError::Config(_))
        ));
        assert!(Endpoints::new("not a url", None).is_err());
    }

    #[test]
    fn overrides_skip_blank_values() {
        let config = AppConfig::default().with_overrides(Some("  ".into()), None);
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);

        let config = AppConfig::default().with_overrides(
            Some("http://10.0.0.5:8082".into()),
            Some("ws://10.0.0.5:9000".into()),
        );
        assert_eq!(config.server_url, "http://10.0.0.5:8082");
        assert_eq!(config.socket_url.as_deref(), Some("ws://10.0.0.5:9000"));
    }

    #[test]
    fn load_config_reads_file_and_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"socket_url":"ws://example.org:1234"}}"#).unwrap();

        let config = load_config(file.path().to_str().unwrap());

        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
        assert_eq!(config.socket_url.as_deref(), Some("ws://example.org:1234"));
    }

    #[test]
    fn load_config_falls_back_on_missing_or_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        assert_eq!(load_config(missing.to_str().unwrap()), AppConfig::default());

        let invalid = dir.path().join("invalid.json");
        fs::write(&invalid, "{not json").unwrap();
        assert_eq!(load_config(invalid.to_str().unwrap()), AppConfig::default());
    }
}
