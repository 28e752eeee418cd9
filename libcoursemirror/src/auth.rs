use crate::catalogue::RootTarget;
use crate::errors::{CmError, Result};
use crate::session::CookieSet;
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::PathBuf;
use url::Url;

/// Where a browser login leaves its storage state.
pub const DEFAULT_COOKIE_CACHE: &str = "./cookie_jar.json";

/// Source of the cookies of a signed-in session.
pub trait CookieProvider {
    fn session_cookies(&self, origin: &Url) -> Result<CookieSet>;
}

/// Cookies handed over directly, e.g. from the command line.
#[derive(Debug, Clone, Default)]
pub struct StaticCookies(pub CookieSet);

impl CookieProvider for StaticCookies {
    fn session_cookies(&self, _origin: &Url) -> Result<CookieSet> {
        Ok(self.0.clone())
    }
}

/// A browser storage-state file (`{"cookies": [{"name", "value", "domain", ..}], ..}`).
/// A missing file gives no cookies.
#[derive(Debug, Clone)]
pub struct StorageStateFile {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct StorageState {
    #[serde(default)]
    cookies: Vec<StoredCookie>,
}

#[derive(Debug, Deserialize)]
struct StoredCookie {
    name: String,
    value: String,
    #[serde(default)]
    domain: String,
}

impl StorageStateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CookieProvider for StorageStateFile {
    fn session_cookies(&self, origin: &Url) -> Result<CookieSet> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No cookie cache at {}", self.path.display());
                return Ok(CookieSet::new());
            }
            Err(e) => {
                return Err(CmError::CookieCache {
                    path: self.path.display().to_string(),
                    message: format!("{} | {}", e, e.kind()),
                })
            }
        };
        let state: StorageState =
            serde_json::from_str(&raw).map_err(|e| CmError::CookieCache {
                path: self.path.display().to_string(),
                message: e.to_string(),
            })?;

        let host = origin.host_str().unwrap_or_default();
        Ok(state
            .cookies
            .into_iter()
            .filter(|cookie| domain_matches(&cookie.domain, host))
            .map(|cookie| (cookie.name, cookie.value))
            .collect())
    }
}

fn domain_matches(cookie_domain: &str, host: &str) -> bool {
    let domain = cookie_domain.trim_start_matches('.').to_ascii_lowercase();
    let host = host.to_ascii_lowercase();
    domain.is_empty() || host == domain || host.ends_with(&format!(".{domain}"))
}

/// Cookies for the crawl. Public catalogues get none, a catalogue behind
/// single sign-on must get at least one from `provider`.
pub fn session_cookies_for(target: &RootTarget, provider: &dyn CookieProvider) -> Result<CookieSet> {
    if !target.requires_sso {
        return Ok(CookieSet::new());
    }
    let origin = Url::parse(&target.url).map_err(|_| CmError::InvalidUrl(target.url.clone()))?;
    let cookies = provider.session_cookies(&origin)?;
    let host = origin.host_str().unwrap_or_default();
    if cookies.is_empty() {
        return Err(CmError::AuthenticationRequired(host.to_string()));
    }
    tracing::info!("Loaded {} cookie(s) for {}", cookies.len(), host);
    Ok(cookies)
}
