use crate::errors::{CmError, Result};
use crate::{Message, MirrorRule, Update};
use reqwest::cookie::Jar;
use reqwest::Client;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc::Sender;
use url::Url;

/// Cookie name to value map of a signed-in session for one origin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieSet(BTreeMap<String, String>);

impl CookieSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parses a `NAME=VALUE` pair as given on the command line.
    pub fn parse_pair(pair: &str) -> Result<(String, String)> {
        match pair.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() => {
                Ok((name.trim().to_string(), value.trim().to_string()))
            }
            _ => Err(CmError::InvalidCookie(pair.to_string())),
        }
    }
}

impl FromIterator<(String, String)> for CookieSet {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Everything a single mirror run shares: the http client carrying the
/// origin's cookies, the run's rule and the update channel.
#[derive(Debug)]
pub struct Session {
    pub origin: Url,
    pub rule: MirrorRule,
    client: Client,
    update_tx: Sender<Update>,
}

impl Session {
    pub fn new(
        origin: &Url,
        cookies: &CookieSet,
        rule: MirrorRule,
        update_tx: Sender<Update>,
    ) -> Result<Self> {
        let origin = origin
            .join("/")
            .map_err(|_| CmError::InvalidUrl(origin.to_string()))?;

        // Cookies stay scoped to the catalogue's origin, external file hosts never see them.
        let jar = Arc::new(Jar::default());
        for (name, value) in cookies.iter() {
            jar.add_cookie_str(&format!("{name}={value}; Path=/"), &origin);
        }
        tracing::debug!("{} cookie(s) attached to {}", cookies.len(), origin);

        let client = Client::builder()
            .user_agent(rule.user_agent.as_str())
            .cookie_provider(jar)
            .build()
            .map_err(|e| CmError::HttpClient(e.to_string()))?;

        Ok(Self {
            origin,
            rule,
            client,
            update_tx,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub(crate) async fn send_update(&self, update: Update) {
        // A closed receiver only means nobody is listening for progress.
        if self.update_tx.send(update).await.is_err() {};
    }

    pub(crate) async fn message(&self, content: impl Into<String>, resource_name: &str, is_error: bool) {
        self.send_update(Update::MessageUpdate(Message {
            content: content.into(),
            resource_name: resource_name.to_string(),
            is_error,
        }))
        .await;
    }
}
