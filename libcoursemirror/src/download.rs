use crate::errors::{CmError, Result};
use crate::fetch::{fetch_page, PageResponse};
use crate::session::Session;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::sleep;
use url::Url;

const MAIL_SCHEME: &str = "mailto:";
/// Changes how the server frames the response, so it is dropped before fetching.
const FORCE_DOWNLOAD_SUFFIX: &str = "?forcedownload=1";
/// Interactive pages and platform backups, never useful offline.
const EXCLUDED_NAME_MARKERS: [&str; 2] = [".aspx", ".moodle"];
const ALLOWED_NAME_PUNCTUATION: [char; 6] = [' ', '.', '_', '-', '(', ')'];
/// Stands in for a label with nothing left after sanitizing.
pub const UNNAMED_DIRECTORY: &str = "unnamed";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("mail link, nothing to download")]
    MailLink,
    #[error("server returned status {0}")]
    Status(u16),
    #[error("redirected to single sign-on, no permission for this file")]
    PermissionDenied,
    #[error("excluded file type {0}")]
    ExcludedType(String),
    #[error("no usable file name")]
    UnusableName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Saved(PathBuf),
    Skipped(SkipReason),
    Failed(String),
}

impl DownloadOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, DownloadOutcome::Saved(_))
    }
}

/// Downloads one file into `destination_dir`. Never fails the caller: every
/// problem becomes a `Skipped` or `Failed` outcome and an update message.
#[tracing::instrument(skip(session))]
pub async fn download_file(session: &Session, link: &str, destination_dir: &Path) -> DownloadOutcome {
    if link.starts_with(MAIL_SCHEME) {
        tracing::debug!("Skipping mail link {}", link);
        return DownloadOutcome::Skipped(SkipReason::MailLink);
    }
    let link = link.strip_suffix(FORCE_DOWNLOAD_SUFFIX).unwrap_or(link);

    let response = match fetch_with_retry(session, link).await {
        Ok(r) => r,
        Err(e) => {
            session
                .message("Error downloading file, skipping", link, true)
                .await;
            return DownloadOutcome::Failed(e.to_string());
        }
    };

    if !response.is_ok() {
        tracing::warn!(
            "Unexpected status code while downloading file : {} |{}|",
            response.status,
            link
        );
        session
            .message(
                format!("Unexpected status {} while downloading file", response.status),
                link,
                true,
            )
            .await;
        return DownloadOutcome::Skipped(SkipReason::Status(response.status.as_u16()));
    }

    if authority(&response.final_url) == session.rule.sso_host {
        tracing::warn!("SSO required, skipping {}", link);
        session
            .message("SSO required, no permission. Skipping", link, true)
            .await;
        return DownloadOutcome::Skipped(SkipReason::PermissionDenied);
    }

    let raw_name = file_name_from_url(response.final_url.as_str());
    if let Some(marker) = EXCLUDED_NAME_MARKERS
        .iter()
        .find(|marker| raw_name.contains(*marker))
    {
        tracing::debug!("Skipping excluded file {} from {}", raw_name, link);
        return DownloadOutcome::Skipped(SkipReason::ExcludedType(marker.to_string()));
    }

    let file_name = sanitize_file_name(raw_name.split('?').next().unwrap_or_default());
    if file_name.is_empty() {
        tracing::warn!("File name can't be determined, skipping. {}", link);
        return DownloadOutcome::Skipped(SkipReason::UnusableName);
    }

    match write_to_unique_file(destination_dir, &file_name, &response.body).await {
        Ok(path) => {
            tracing::debug!("Download completed for {}, file @ {}", link, path.display());
            DownloadOutcome::Saved(path)
        }
        Err(e) => {
            tracing::error!(
                "Error writing file {} into {}\nError : {} | {}",
                file_name,
                destination_dir.display(),
                e,
                e.kind()
            );
            session.message("Error writing to file", link, true).await;
            DownloadOutcome::Failed(
                CmError::FileOperationError {
                    file_name: destination_dir.join(&file_name).display().to_string(),
                    message: format!("{} | {}", e, e.kind()),
                }
                .to_string(),
            )
        }
    }
}

/// Retries transport errors only. A response with any status ends the loop.
async fn fetch_with_retry(session: &Session, link: &str) -> Result<PageResponse> {
    let max_attempts = session.rule.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match fetch_page(session.client(), link).await {
            Ok(response) => return Ok(response),
            Err(e) if attempt >= max_attempts => {
                tracing::error!("Error occurred downloading a file, skipping. {}\n{}", link, e);
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(
                    "Attempt {}/{} for {} failed. {}",
                    attempt,
                    max_attempts,
                    link,
                    e
                );
                attempt += 1;
                sleep(Duration::from_millis(session.rule.retry_delay_ms)).await;
            }
        }
    }
}

/// `host[:port]` of a url, the form the single sign-on host is configured in.
pub(crate) fn authority(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

/// Removes every `http://` and `https://` prefix, wherever the split lands.
pub(crate) fn strip_schema(url: &str) -> &str {
    let url = url.split_once("http://").map_or(url, |(_, rest)| rest);
    url.split_once("https://").map_or(url, |(_, rest)| rest)
}

/// File name candidate for a response url. Urls ending in `/` are rendered
/// pages and get named after the whole host and path.
pub(crate) fn file_name_from_url(final_url: &str) -> String {
    if let Some(page) = final_url.strip_suffix('/') {
        return format!("{}.html", strip_schema(page));
    }
    let last_segment = final_url.rsplit('/').next().unwrap_or(final_url);
    String::from_utf8_lossy(&urlencoding::decode_binary(last_segment.as_bytes())).into_owned()
}

/// Keeps letters, digits, space, `.`, `_`, `-`, `(` and `)`. Everything else
/// is dropped and trailing whitespace is trimmed.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || ALLOWED_NAME_PUNCTUATION.contains(c))
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Directory name for a catalogue or folder label. Leading dots are dropped
/// so the result is never `.`, `..` or hidden, and an empty result becomes
/// `unnamed`. The directory always stays below its parent.
pub fn sanitize_directory_name(label: &str) -> String {
    let name = sanitize_file_name(label);
    let name = name.trim_start_matches(|c: char| c == '.' || c.is_whitespace());
    if name.is_empty() {
        UNNAMED_DIRECTORY.to_string()
    } else {
        name.to_string()
    }
}

/// Splits off the extension only when the name has exactly one dot.
fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.split_once('.') {
        Some((stem, _)) if file_name.matches('.').count() == 1 => {
            (stem, &file_name[stem.len()..])
        }
        _ => (file_name, ""),
    }
}

fn numbered_file_name(stem: &str, extension: &str, n: u32) -> String {
    if n == 0 {
        format!("{stem}{extension}")
    } else {
        format!("{stem} ({n}){extension}")
    }
}

/// Writes `content` under the first free name among `name`, `stem (1).ext`,
/// `stem (2).ext`, ... Files are created exclusively, so an existing file is
/// never truncated.
pub(crate) async fn write_to_unique_file(
    destination_dir: &Path,
    file_name: &str,
    content: &[u8],
) -> std::io::Result<PathBuf> {
    let (stem, extension) = split_extension(file_name);
    let mut n = 0;
    loop {
        let candidate = destination_dir.join(numbered_file_name(stem, extension, n));
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(file) => {
                write_new_file(file, &candidate, content).await?;
                return Ok(candidate);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => n += 1,
            Err(e) => return Err(e),
        }
    }
}

/// Writes into a freshly created file. On failure the partial file is
/// removed, so it doesn't hold on to its name.
async fn write_new_file<W: AsyncWrite + Unpin>(
    mut file: W,
    path: &Path,
    content: &[u8],
) -> std::io::Result<()> {
    let written = match file.write_all(content).await {
        Ok(()) => file.flush().await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        drop(file);
        if let Err(remove_err) = fs::remove_file(path).await {
            tracing::warn!(
                "Failed to remove partial file {}\nError : {}",
                path.display(),
                remove_err
            );
        }
        return Err(e);
    }
    Ok(())
}
