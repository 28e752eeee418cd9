use aho_corasick::AhoCorasick;
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use tracing::{event, instrument, Level};
use url::{ParseError, Url};

pub const CATEGORY_MARKER: &str = "course/index.php?categoryid=";
pub const COURSE_ID_MARKER: &str = "course/view.php?id=";
pub const COURSE_NAME_MARKER: &str = "course/view.php?name=";
pub const RESOURCE_MARKER: &str = "resource/view.php?id=";
pub const ASSIGNMENT_MARKER: &str = "assign/view.php?id=";
pub const FOLDER_MARKER: &str = "folder/view.php?id=";

const ACTIVITY_NAME_CLASS: &str = "activityname";

/// Markers in the last path segment of a link that rule it out as a file:
/// script endpoints, and domain names that look like a `name.ext`.
const NON_FILE_SEGMENT_MARKERS: [&str; 4] = [".php", ".com", ".uk", ".org"];

lazy_static! {
    static ref DIV_SELECTOR: Selector = Selector::parse("div").expect("valid div selector");
    static ref ANCHOR_SELECTOR: Selector = Selector::parse("a").expect("valid anchor selector");
    static ref HREF_ANCHOR_SELECTOR: Selector =
        Selector::parse("a[href]").expect("valid anchor selector");
    static ref CATALOGUE_MARKERS: AhoCorasick =
        AhoCorasick::new([CATEGORY_MARKER, COURSE_ID_MARKER, COURSE_NAME_MARKER]);
    static ref COURSE_MARKERS: AhoCorasick =
        AhoCorasick::new([COURSE_ID_MARKER, COURSE_NAME_MARKER]);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogueLinkKind {
    Category,
    Course,
    Unexpected,
}

/// Decides what a catalogue link points at. Course markers win over the category marker.
pub fn catalogue_link_kind(href: &str) -> CatalogueLinkKind {
    if COURSE_MARKERS.is_match(href) {
        CatalogueLinkKind::Course
    } else if href.contains(CATEGORY_MARKER) {
        CatalogueLinkKind::Category
    } else {
        CatalogueLinkKind::Unexpected
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderLink {
    /// Anchor text, trimmed.
    pub label: String,
    pub url: String,
}

/// Links found on a course (or assignment/folder) page, in page order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedLinks {
    pub resources: Vec<String>,
    pub assignments: Vec<String>,
    pub folders: Vec<FolderLink>,
    /// Direct file links.
    pub others: Vec<String>,
}

impl ClassifiedLinks {
    /// Number of links that would need another page load to reach a file.
    pub fn indirect_count(&self) -> usize {
        self.resources.len() + self.assignments.len() + self.folders.len()
    }

    /// A repeated label keeps its first position but takes the later url.
    fn insert_folder(&mut self, label: String, url: String) {
        match self.folders.iter_mut().find(|f| f.label == label) {
            Some(existing) => existing.url = url,
            None => self.folders.push(FolderLink { label, url }),
        }
    }
}

#[instrument]
/// Get the full link to a file, given the url of the page it was found on.
pub fn get_full_link(link: &str, page_url: &Url) -> Option<Url> {
    if link.is_empty() {
        return None;
    }
    match Url::parse(link) {
        Ok(url) => Some(url),
        Err(e)
            if e == ParseError::EmptyHost
                || e == ParseError::RelativeUrlWithoutBase
                || e == ParseError::RelativeUrlWithCannotBeABaseBase =>
        {
            page_url.join(link).ok()
        }
        Err(e) => {
            event!(Level::ERROR, "Failed to get full link for {}", link);
            event!(Level::ERROR, "{}", e);
            None
        }
    }
}

/// Gets the category and course links of a catalogue page as a map from
/// anchor text to url. Only the first anchor inside each div is considered.
/// Root-relative links are prefixed with `origin` (`scheme://host[:port]`),
/// every other link is kept as found. A repeated anchor text keeps the last url.
pub fn get_catalogue_links(html_string: &str, origin: &str) -> BTreeMap<String, String> {
    let html_document = Html::parse_document(html_string);
    html_document
        .select(&DIV_SELECTOR)
        .filter_map(|div| div.select(&ANCHOR_SELECTOR).next())
        .filter_map(|anchor| {
            anchor
                .value()
                .attr("href")
                .map(|href| (anchor.text().collect::<String>(), href))
        })
        .filter(|(_, href)| CATALOGUE_MARKERS.is_match(href))
        .map(|(label, href)| {
            let full_link = if href.starts_with('/') {
                format!("{origin}{href}")
            } else {
                href.to_string()
            };
            tracing::debug!("Catalogue link {} => {}", label, &full_link);
            (label, full_link)
        })
        .collect()
}

fn is_activity_name(div: &ElementRef) -> bool {
    div.value()
        .attr("class")
        .map(|class| class.split_whitespace().eq([ACTIVITY_NAME_CLASS]))
        .unwrap_or(false)
}

/// A link is taken as a direct file when it is not an activity link and the
/// last path segment has an extension that is not a script or domain name.
fn is_direct_file_link(href: &str, activity_links: &[&str]) -> bool {
    if activity_links.contains(&href) {
        return false;
    }
    let last_segment = href.rsplit('/').next().unwrap_or(href);
    if NON_FILE_SEGMENT_MARKERS
        .iter()
        .any(|marker| last_segment.contains(marker))
    {
        return false;
    }
    last_segment.contains('.')
}

/// Sorts the links of a course page into resources, assignments, folders and
/// direct files. Activity links come from the first anchor of every
/// `div.activityname`, direct files from every anchor on the page.
pub fn get_page_links(html_string: &str) -> ClassifiedLinks {
    let html_document = Html::parse_document(html_string);
    let activity_anchors: Vec<(ElementRef, &str)> = html_document
        .select(&DIV_SELECTOR)
        .filter(is_activity_name)
        .filter_map(|div| div.select(&ANCHOR_SELECTOR).next())
        .filter_map(|anchor| anchor.value().attr("href").map(|href| (anchor, href)))
        .collect();
    let activity_links: Vec<&str> = activity_anchors.iter().map(|(_, href)| *href).collect();

    let mut links = ClassifiedLinks::default();
    for (anchor, href) in activity_anchors.iter() {
        if href.contains(RESOURCE_MARKER) {
            links.resources.push(href.to_string());
        }
        if href.contains(ASSIGNMENT_MARKER) {
            links.assignments.push(href.to_string());
        }
        if href.contains(FOLDER_MARKER) {
            let label = anchor.text().collect::<String>().trim().to_string();
            links.insert_folder(label, href.to_string());
        }
    }

    links.others = html_document
        .select(&HREF_ANCHOR_SELECTOR)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter(|href| is_direct_file_link(href, &activity_links))
        .map(str::to_string)
        .collect();

    links
}
