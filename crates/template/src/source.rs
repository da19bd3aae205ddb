//! TemplateSource - remote template repository access

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL};
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tcex_shared::{ProxySettings, Result, TcexError};

const DEFAULT_GITHUB_USER: &str = "ThreatConnect-Inc";
const TEMPLATE_REPO: &str = "tcex-app-templates";
const USER_AGENT: &str = concat!("tcex-cli/", env!("CARGO_PKG_VERSION"));

/// Remote repository holding the templates
pub trait TemplateSource {
    /// Committer date (ISO 8601) of the branch head, None when unavailable
    fn latest_commit_date(&self, branch: &str) -> Option<String>;

    /// Download the branch zipball to `dest`
    fn download_zipball(&self, branch: &str, dest: &Path) -> Result<()>;
}

/// GitHub REST API source
pub struct GitHubSource {
    base_url: String,
    client: Client,
    auth: Option<(String, String)>,
}

impl GitHubSource {
    /// Create a source from the environment and proxy settings
    pub fn new(proxy: &ProxySettings) -> Result<Self> {
        let base_url = std::env::var("TCEX_TEMPLATE_API_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| {
                let user = std::env::var("TCEX_TEMPLATE_GITHUB_USER")
                    .ok()
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_GITHUB_USER.to_string());
                format!("https://api.github.com/repos/{}/{}", user, TEMPLATE_REPO)
            });
        let auth = match (std::env::var("GITHUB_USER"), std::env::var("GITHUB_PAT")) {
            (Ok(user), Ok(pat)) if !user.is_empty() && !pat.is_empty() => Some((user, pat)),
            _ => None,
        };
        Self::with_base_url(base_url, proxy, auth)
    }

    /// Create a source for an explicit API base URL
    pub fn with_base_url(
        base_url: impl Into<String>,
        proxy: &ProxySettings,
        auth: Option<(String, String)>,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10));
        if let Some(url) = proxy.url() {
            let proxy = reqwest::Proxy::all(&url)
                .map_err(|e| TcexError::Http(format!("Invalid proxy {}: {}", url, e)))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| TcexError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            auth,
        })
    }

    /// API base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get(&self, url: &str) -> reqwest::blocking::RequestBuilder {
        let request = self.client.get(url);
        match &self.auth {
            Some((user, pat)) => request.basic_auth(user, Some(pat)),
            None => request,
        }
    }
}

impl TemplateSource for GitHubSource {
    fn latest_commit_date(&self, branch: &str) -> Option<String> {
        let url = format!("{}/commits/{}", self.base_url, branch);
        let response = match self.get(&url).timeout(Duration::from_secs(30)).send() {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(action = "remote-commit-date", %url, error = %e, "request failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            tracing::error!(
                action = "remote-commit-date",
                %url,
                status_code = status.as_u16(),
                response = %body,
                "unexpected status"
            );
            return None;
        }

        match response.json::<serde_json::Value>() {
            Ok(body) => body
                .pointer("/commit/committer/date")
                .and_then(|d| d.as_str())
                .map(str::to_string),
            Err(e) => {
                tracing::error!(action = "remote-commit-date", %url, error = %e, "invalid body");
                None
            }
        }
    }

    fn download_zipball(&self, branch: &str, dest: &Path) -> Result<()> {
        let url = format!("{}/zipball/{}", self.base_url, branch);
        tracing::info!(action = "download-zipball", %url, "downloading templates");

        let mut response = self
            .get(&url)
            .timeout(Duration::from_secs(300))
            .send()
            .map_err(|e| TcexError::Http(format!("Failed to download {}: {}", url, e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TcexError::Http(format!(
                "Failed to download {}: status {}",
                url, status
            )));
        }

        let mut file = std::fs::File::create(dest)?;
        response
            .copy_to(&mut file)
            .map_err(|e| TcexError::Http(format!("Failed to read {}: {}", url, e)))?;
        file.flush()?;
        Ok(())
    }
}
