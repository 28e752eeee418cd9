use crate::fetch::fetch_page;
use crate::link::{catalogue_link_kind, get_catalogue_links, CatalogueLinkKind};
use crate::session::Session;
use futures::future::{BoxFuture, FutureExt};
use std::collections::BTreeMap;

pub const ROOT_LABEL: &str = "root";
pub const ARCHIVE_LABEL: &str = "Archive";

/// The catalogue as discovered from its root page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogueNode {
    Category {
        name: String,
        children: BTreeMap<String, CatalogueNode>,
    },
    Course {
        name: String,
        url: String,
    },
}

impl CatalogueNode {
    pub fn name(&self) -> &str {
        match self {
            CatalogueNode::Category { name, .. } | CatalogueNode::Course { name, .. } => name,
        }
    }

    pub fn child(&self, label: &str) -> Option<&CatalogueNode> {
        match self {
            CatalogueNode::Category { children, .. } => children.get(label),
            CatalogueNode::Course { .. } => None,
        }
    }

    pub fn course_count(&self) -> usize {
        match self {
            CatalogueNode::Category { children, .. } => {
                children.values().map(CatalogueNode::course_count).sum()
            }
            CatalogueNode::Course { .. } => 1,
        }
    }
}

/// Discovers the catalogue below `root_url`. A course url is its own single
/// course, anything that is not a category is treated as a course page.
#[tracing::instrument(skip(session))]
pub async fn walk_catalogue(session: &Session, root_url: &str) -> CatalogueNode {
    match catalogue_link_kind(root_url) {
        CatalogueLinkKind::Category => {
            expand_category(
                session,
                ROOT_LABEL.to_string(),
                root_url.to_string(),
                String::new(),
            )
            .await
        }
        kind => {
            if kind == CatalogueLinkKind::Unexpected {
                tracing::warn!("Unexpected link: {}, {}", ROOT_LABEL, root_url);
            }
            CatalogueNode::Course {
                name: ROOT_LABEL.to_string(),
                url: root_url.to_string(),
            }
        }
    }
}

/// Expands one category page depth first. A page that can't be loaded is an
/// empty category. `label_path` is the `/`-joined trail of labels used in logs.
///
/// With archives excluded the `Archive` child is still expanded and only
/// dropped afterwards.
pub fn expand_category<'a>(
    session: &'a Session,
    name: String,
    url: String,
    label_path: String,
) -> BoxFuture<'a, CatalogueNode> {
    async move {
        let links = match fetch_page(session.client(), &url).await {
            Ok(page) if page.is_ok() => get_catalogue_links(&page.html(), &page.origin()),
            Ok(page) => {
                tracing::warn!(
                    "Invalid response code returned ({}), check the url. {}",
                    page.status,
                    url
                );
                session
                    .message(
                        format!("Invalid response code returned ({})", page.status),
                        &url,
                        true,
                    )
                    .await;
                BTreeMap::new()
            }
            Err(e) => {
                session.message(e.to_string(), &url, true).await;
                BTreeMap::new()
            }
        };

        if label_path.is_empty() {
            tracing::info!("{:3} Sub-Categories in: Root - {}", links.len(), url);
        } else {
            tracing::info!("{:3} Sub-Categories in: {}", links.len(), label_path);
        }

        let mut children = BTreeMap::new();
        for (label, href) in links {
            match catalogue_link_kind(&href) {
                CatalogueLinkKind::Course => {
                    children.insert(
                        label.clone(),
                        CatalogueNode::Course {
                            name: label,
                            url: href,
                        },
                    );
                }
                CatalogueLinkKind::Category => {
                    let child_path = format!("{label_path}/{label}");
                    let child = expand_category(session, label.clone(), href, child_path).await;
                    children.insert(label, child);
                }
                CatalogueLinkKind::Unexpected => {
                    tracing::info!("Unexpected link: {}, {}", label, href);
                }
            }
        }

        if !session.rule.include_archives && children.remove(ARCHIVE_LABEL).is_some() {
            tracing::info!("Skipping Archives! ({})", url);
        }

        CatalogueNode::Category { name, children }
    }
    .boxed()
}
