use crate::course::materialize_course;
use crate::download::sanitize_directory_name;
use crate::session::Session;
use crate::walker::CatalogueNode;
use crate::{CourseReport, MirrorSummary, Update};
use futures::future::{BoxFuture, FutureExt};
use std::path::PathBuf;
use tokio::fs;

/// Recreates the catalogue as directories under `destination_dir` and
/// mirrors every course into its own directory. A directory that can't be
/// created only costs its own subtree.
pub fn download_tree<'a>(
    session: &'a Session,
    node: &'a CatalogueNode,
    destination_dir: PathBuf,
) -> BoxFuture<'a, MirrorSummary> {
    async move {
        if let Err(e) = fs::create_dir_all(&destination_dir).await {
            tracing::error!(
                "Failed to create directory {}\nError : {}",
                destination_dir.display(),
                e
            );
            session
                .message(
                    format!("Error creating directory. {e}"),
                    &destination_dir.display().to_string(),
                    true,
                )
                .await;
            return MirrorSummary::default();
        }

        match node {
            CatalogueNode::Category { children, .. } => {
                let mut summary = MirrorSummary::default();
                for (label, child) in children.iter() {
                    let child_dir = destination_dir.join(sanitize_directory_name(label));
                    summary += download_tree(session, child, child_dir).await;
                }
                summary
            }
            CatalogueNode::Course { url, .. } => {
                let tally = materialize_course(session, url, &destination_dir).await;
                tracing::info!(
                    "Found {:3} files ({} saved): {}",
                    tally.attempted,
                    tally.saved,
                    destination_dir.display()
                );
                session
                    .send_update(Update::CourseUpdate(CourseReport {
                        directory: destination_dir.clone(),
                        attempted: tally.attempted,
                        saved: tally.saved,
                    }))
                    .await;
                MirrorSummary {
                    courses: 1,
                    attempted: tally.attempted,
                    saved: tally.saved,
                }
            }
        }
    }
    .boxed()
}
