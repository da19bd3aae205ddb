//! Configuration types for tcex

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Name of the per-user directory holding the template cache
pub const CLI_HOME_DIR: &str = ".tcex";

/// Return the tcex home directory (`~/.tcex`)
pub fn cli_home() -> crate::Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(CLI_HOME_DIR))
        .ok_or_else(|| crate::TcexError::Config("Could not determine home directory".to_string()))
}

/// Proxy server settings for outbound requests (GitHub, pip)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxySettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub pass: Option<String>,
}

impl ProxySettings {
    /// Resolve proxy settings from explicit values, falling back to `TC_PROXY_*` env vars
    pub fn resolve(
        host: Option<String>,
        port: Option<u16>,
        user: Option<String>,
        pass: Option<String>,
    ) -> Self {
        Self::resolve_with(host, port, user, pass, |key| std::env::var(key).ok())
    }

    /// Same as [`ProxySettings::resolve`] with an injectable environment lookup
    pub fn resolve_with(
        host: Option<String>,
        port: Option<u16>,
        user: Option<String>,
        pass: Option<String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let first_env = |keys: &[&str]| keys.iter().find_map(|k| non_empty(env(k)));

        let host = non_empty(host).or_else(|| first_env(&["TC_PROXY_HOST"]));
        let port = port.or_else(|| {
            first_env(&["TC_PROXY_PORT"]).and_then(|p| match p.trim().parse::<u16>() {
                Ok(port) => Some(port),
                Err(_) => {
                    tracing::warn!(action = "resolve-proxy", value = %p, "invalid TC_PROXY_PORT");
                    None
                }
            })
        });
        let user = non_empty(user).or_else(|| first_env(&["TC_PROXY_USER", "TC_PROXY_USERNAME"]));
        let pass = non_empty(pass).or_else(|| first_env(&["TC_PROXY_PASS", "TC_PROXY_PASSWORD"]));

        Self {
            host,
            port,
            user,
            pass,
        }
    }

    /// A proxy is only used when both host and port are known
    pub fn is_configured(&self) -> bool {
        self.host.is_some() && self.port.is_some()
    }

    /// Return `host:port` for display
    pub fn server(&self) -> Option<String> {
        match (&self.host, self.port) {
            (Some(host), Some(port)) => Some(format!("{}:{}", host, port)),
            _ => None,
        }
    }

    /// Return the proxy URL (`http://[user:pass@]host:port`) with encoded credentials
    pub fn url(&self) -> Option<String> {
        let server = self.server()?;
        let url = match (&self.user, &self.pass) {
            (Some(user), Some(pass)) => format!(
                "http://{}:{}@{}",
                urlencoding::encode(user),
                urlencoding::encode(pass),
                server
            ),
            _ => format!("http://{}", server),
        };
        Some(url)
    }
}
