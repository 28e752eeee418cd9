use crate::tree::download_tree;
use crate::walker::walk_catalogue;
use std::ops::AddAssign;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::mpsc::Sender;
use tracing::instrument;
use url::Url;

pub mod auth;
pub mod catalogue;
pub mod course;
pub mod download;
mod errors;
pub mod fetch;
pub mod link;
mod session;
pub mod tree;
pub mod walker;

pub use errors::{CmError, Result};
pub use session::{CookieSet, Session};
pub use walker::CatalogueNode;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/137.0.0.0 Safari/537.36";
/// Identity provider the catalogue redirects to when a file needs more permissions.
pub const DEFAULT_SSO_HOST: &str = "idp.shibboleth.ox.ac.uk";
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

#[derive(Debug, Clone)]
pub struct MirrorRule {
    /// Keep categories labelled "Archive", at any depth. They are crawled either way.
    pub include_archives: bool,
    /// `host[:port]` that marks a file download as "no permission".
    pub sso_host: String,
    /// Attempts per file on transport errors, including the first one.
    pub max_attempts: u32,
    /// Pause between attempts in milliseconds
    pub retry_delay_ms: u64,
    pub user_agent: String,
}

impl Default for MirrorRule {
    fn default() -> Self {
        Self {
            include_archives: true,
            sso_host: DEFAULT_SSO_HOST.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug)]
pub enum Update {
    MessageUpdate(Message),
    CourseUpdate(CourseReport),
}

#[derive(Debug)]
pub struct Message {
    pub content: String,
    pub resource_name: String,
    pub is_error: bool,
}

/// Sent once a course directory is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseReport {
    pub directory: PathBuf,
    pub attempted: usize,
    pub saved: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorSummary {
    pub courses: usize,
    pub attempted: usize,
    pub saved: usize,
}

impl AddAssign for MirrorSummary {
    fn add_assign(&mut self, other: Self) {
        self.courses += other.courses;
        self.attempted += other.attempted;
        self.saved += other.saved;
    }
}

/// Mirrors the catalogue (or single course) at `link` into `dest_dir`.
///
/// `dest_dir` must not exist yet; that is checked before any request is made
/// and is the only way a started run fails. Everything that goes wrong
/// further down is reported on `update_tx` and in the logs, and the run
/// carries on with the rest of the catalogue.
#[instrument(skip(rule, cookies, update_tx))]
pub async fn init_mirror(
    link: &str,
    dest_dir: &str,
    rule: MirrorRule,
    cookies: &CookieSet,
    update_tx: Sender<Update>,
) -> Result<MirrorSummary> {
    let destination = PathBuf::from(dest_dir);
    if destination.exists() {
        tracing::error!("Output directory already exists: {}", dest_dir);
        return Err(CmError::DestinationExists(dest_dir.to_string()));
    }

    let root_url = match Url::parse(link) {
        Ok(u) => u,
        Err(_) => return Err(CmError::InvalidUrl(link.to_string())),
    };

    let session = Session::new(&root_url, cookies, rule, update_tx)?;

    let catalogue = walk_catalogue(&session, root_url.as_str()).await;
    let course_count = catalogue.course_count();
    tracing::info!("Download starting, {} course(s) found", course_count);
    session
        .message(
            format!("Download starting, {course_count} course(s) found"),
            link,
            false,
        )
        .await;

    if let Err(e) = fs::create_dir_all(&destination).await {
        tracing::error!("Failed to create destination directory\nError : {}", e);
        return Err(CmError::ErrorCreatingDirectory {
            path: dest_dir.to_string(),
            message: e.to_string(),
        });
    }

    Ok(download_tree(&session, &catalogue, destination).await)
}
