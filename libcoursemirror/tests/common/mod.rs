#![allow(dead_code)]

use libcoursemirror::{CookieSet, MirrorRule, Session, Update};
use tokio::sync::mpsc::{channel, Receiver};
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Default rule without the pause between retries.
pub fn test_rule() -> MirrorRule {
    MirrorRule {
        retry_delay_ms: 0,
        ..Default::default()
    }
}

pub fn session_for(server: &MockServer, rule: MirrorRule) -> (Session, Receiver<Update>) {
    session_with_cookies(server, rule, &CookieSet::new())
}

pub fn session_with_cookies(
    server: &MockServer,
    rule: MirrorRule,
    cookies: &CookieSet,
) -> (Session, Receiver<Update>) {
    let (tx, rx) = channel(256);
    let origin = Url::parse(&server.uri()).expect("mock server uri");
    let session = Session::new(&origin, cookies, rule, tx).expect("session");
    (session, rx)
}

/// `host:port` of a mock server.
pub fn authority(server: &MockServer) -> String {
    server.uri().trim_start_matches("http://").to_string()
}

pub fn html_response(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("Content-Type", "text/html; charset=utf-8")
        .set_body_string(body.into())
}

pub async fn mount_category(server: &MockServer, id: &str, body: impl Into<String>) {
    Mock::given(method("GET"))
        .and(path("/course/index.php"))
        .and(query_param("categoryid", id))
        .respond_with(html_response(body))
        .mount(server)
        .await;
}

pub async fn mount_file(server: &MockServer, file_path: &str, content: &[u8]) {
    Mock::given(method("GET"))
        .and(path(file_path))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.to_vec()))
        .mount(server)
        .await;
}

/// Catalogue page listing each `(label, href)` in its own div, the way category and course boxes are laid out.
pub fn catalogue_page(links: &[(&str, &str)]) -> String {
    let boxes: String = links
        .iter()
        .map(|(label, href)| {
            format!(r#"<div class="coursebox"><div class="info"><h3 class="coursename"><a href="{href}">{label}</a></h3></div></div>"#)
        })
        .collect();
    format!("<html><body><div id=\"page\">{boxes}</div></body></html>")
}

/// Course page with one `div.activityname` per `(label, href)` plus extra raw html.
pub fn course_page(activities: &[(&str, &str)], extra: &str) -> String {
    let items: String = activities
        .iter()
        .map(|(label, href)| {
            format!(r#"<li class="activity"><div class="activityname"><a href="{href}"><span class="instancename">{label}</span></a></div></li>"#)
        })
        .collect();
    format!("<html><body><ul class=\"section\">{items}</ul>{extra}</body></html>")
}
