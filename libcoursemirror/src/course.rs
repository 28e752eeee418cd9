use crate::download::{download_file, sanitize_directory_name, DownloadOutcome};
use crate::fetch::fetch_page;
use crate::link::{get_full_link, get_page_links};
use crate::session::Session;
use std::path::Path;
use tokio::fs;
use url::Url;

/// Raw course page, kept next to the files it links to.
pub const SOURCE_FILE_NAME: &str = "source.html";
const FOLDER_SUFFIX: &str = "Folder";

/// Files handled for one course. `attempted` counts every link a download
/// was started for, `saved` only the ones written to disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileTally {
    pub attempted: usize,
    pub saved: usize,
}

impl FileTally {
    fn record(&mut self, outcome: &DownloadOutcome) {
        self.attempted += 1;
        if outcome.is_saved() {
            self.saved += 1;
        }
    }
}

/// Directory name for a folder activity: the label up to its last "Folder", trimmed and sanitized.
pub fn folder_directory_name(label: &str) -> String {
    let name = label
        .rsplit_once(FOLDER_SUFFIX)
        .map_or(label, |(head, _)| head);
    sanitize_directory_name(name.trim())
}

fn resolve(link: &str, page_url: &Url) -> String {
    get_full_link(link, page_url)
        .map(String::from)
        .unwrap_or_else(|| link.to_string())
}

/// Loads an assignment or folder page and returns the direct file links on it.
/// Those pages are expected to hold files only, anything else is reported.
async fn linked_page_files(session: &Session, link: &str) -> Vec<String> {
    let page = match fetch_page(session.client(), link).await {
        Ok(page) if page.is_ok() => page,
        Ok(page) => {
            tracing::warn!(
                "Unexpected status {} while loading deeper page {}",
                page.status,
                link
            );
            session
                .message(
                    format!("Unexpected status {} while loading page", page.status),
                    link,
                    true,
                )
                .await;
            return Vec::new();
        }
        Err(e) => {
            session.message(e.to_string(), link, true).await;
            return Vec::new();
        }
    };

    let links = get_page_links(&page.html());
    if links.indirect_count() > 0 {
        tracing::info!(
            "Non direct file links found in: {} ({} ignored)",
            link,
            links.indirect_count()
        );
    }
    links
        .others
        .iter()
        .map(|href| resolve(href, &page.final_url))
        .collect()
}

/// Mirrors one course page into `destination_dir`, which must exist.
///
/// The page itself is saved as `source.html`. Resources and direct file links
/// are downloaded next to it, assignment pages are opened to reach their
/// files, and each folder page gets its own subdirectory.
#[tracing::instrument(skip(session))]
pub async fn materialize_course(
    session: &Session,
    course_url: &str,
    destination_dir: &Path,
) -> FileTally {
    let mut tally = FileTally::default();

    let page = match fetch_page(session.client(), course_url).await {
        Ok(page) if page.is_ok() => page,
        Ok(page) => {
            tracing::warn!(
                "Unexpected status {} while loading course page {}",
                page.status,
                course_url
            );
            session
                .message(
                    format!("Unexpected status {} while loading course page", page.status),
                    course_url,
                    true,
                )
                .await;
            return tally;
        }
        Err(e) => {
            session.message(e.to_string(), course_url, true).await;
            return tally;
        }
    };

    let source_path = destination_dir.join(SOURCE_FILE_NAME);
    if let Err(e) = fs::write(&source_path, &page.body).await {
        tracing::error!(
            "Error writing file {}\nError : {} | {}",
            source_path.display(),
            e,
            e.kind()
        );
        session
            .message("Error saving course page", course_url, true)
            .await;
    }

    let links = get_page_links(&page.html());
    tracing::debug!(
        "{} resource(s), {} assignment(s), {} folder(s), {} other file(s) on {}",
        links.resources.len(),
        links.assignments.len(),
        links.folders.len(),
        links.others.len(),
        course_url
    );

    for resource in links.resources.iter() {
        let link = resolve(resource, &page.final_url);
        tally.record(&download_file(session, &link, destination_dir).await);
    }

    for assignment in links.assignments.iter() {
        let link = resolve(assignment, &page.final_url);
        for file in linked_page_files(session, &link).await {
            tally.record(&download_file(session, &file, destination_dir).await);
        }
    }

    for folder in links.folders.iter() {
        let link = resolve(&folder.url, &page.final_url);
        let files = linked_page_files(session, &link).await;
        let folder_dir = destination_dir.join(folder_directory_name(&folder.label));
        if let Err(e) = fs::create_dir_all(&folder_dir).await {
            tracing::error!(
                "Failed to create folder directory {}\nError : {}",
                folder_dir.display(),
                e
            );
            session
                .message("Error creating folder directory", &folder.label, true)
                .await;
            tally.attempted += files.len();
            continue;
        }
        for file in files.iter() {
            tally.record(&download_file(session, file, &folder_dir).await);
        }
    }

    for other in links.others.iter() {
        let link = resolve(other, &page.final_url);
        tally.record(&download_file(session, &link, destination_dir).await);
    }

    tally
}
