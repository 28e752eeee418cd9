use crate::errors::{CmError, Result};
use reqwest::{Client, StatusCode};
use std::borrow::Cow;
use url::Url;

/// A fully read GET response.
#[derive(Debug)]
pub struct PageResponse {
    pub status: StatusCode,
    /// Url after following redirects.
    pub final_url: Url,
    pub body: Vec<u8>,
}

impl PageResponse {
    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::OK
    }

    /// `scheme://host[:port]` of the final url, used to resolve root-relative links.
    pub fn origin(&self) -> String {
        self.final_url.origin().ascii_serialization()
    }

    pub fn html(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Performs a GET with the session's client and reads the whole body.
/// Any transport error, including one while reading the body, is a `NetworkError`.
#[tracing::instrument(skip(client))]
pub async fn fetch_page(client: &Client, url: &str) -> Result<PageResponse> {
    let response = match client.get(url).send().await {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Error fetching {}\nError : {}", url, e);
            return Err(CmError::NetworkError {
                url: url.to_string(),
                message: e.to_string(),
            });
        }
    };

    let status = response.status();
    let final_url = response.url().clone();
    if final_url.as_str() != url {
        tracing::debug!("{} redirected to {}", url, final_url);
    }

    let body = match response.bytes().await {
        Ok(b) => b.to_vec(),
        Err(e) => {
            tracing::error!("Error reading response body from {}\nError : {}", url, e);
            return Err(CmError::NetworkError {
                url: url.to_string(),
                message: e.to_string(),
            });
        }
    };

    Ok(PageResponse {
        status,
        final_url,
        body,
    })
}
