mod common;

use common::{catalogue_page, mount_category, session_for, test_rule};
use libcoursemirror::walker::walk_catalogue;
use libcoursemirror::{CatalogueNode, MirrorRule};
use std::collections::BTreeMap;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn root_with_category_and_course_builds_tree() {
    let server = MockServer::start().await;
    mount_category(
        &server,
        "0",
        catalogue_page(&[
            ("Topology", "/course/index.php?categoryid=42"),
            ("Intro", "/course/view.php?id=99"),
        ]),
    )
    .await;
    mount_category(
        &server,
        "42",
        catalogue_page(&[("Knots", "/course/view.php?name=knots_2024")]),
    )
    .await;

    let (session, _rx) = session_for(&server, test_rule());
    let root = format!("{}/course/index.php?categoryid=0", server.uri());
    let tree = walk_catalogue(&session, &root).await;

    let mut topology = BTreeMap::new();
    topology.insert(
        "Knots".to_string(),
        CatalogueNode::Course {
            name: "Knots".to_string(),
            url: format!("{}/course/view.php?name=knots_2024", server.uri()),
        },
    );
    let mut expected = BTreeMap::new();
    expected.insert(
        "Topology".to_string(),
        CatalogueNode::Category {
            name: "Topology".to_string(),
            children: topology,
        },
    );
    expected.insert(
        "Intro".to_string(),
        CatalogueNode::Course {
            name: "Intro".to_string(),
            url: format!("{}/course/view.php?id=99", server.uri()),
        },
    );

    assert_eq!(
        tree,
        CatalogueNode::Category {
            name: "root".to_string(),
            children: expected,
        }
    );
    assert_eq!(tree.course_count(), 2);
}

#[tokio::test]
async fn disabled_archive_is_crawled_but_dropped() {
    let server = MockServer::start().await;
    mount_category(
        &server,
        "0",
        catalogue_page(&[
            ("Archive", "/course/index.php?categoryid=5"),
            ("Current", "/course/index.php?categoryid=6"),
        ]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/course/index.php"))
        .and(query_param("categoryid", "5"))
        .respond_with(common::html_response(catalogue_page(&[(
            "Old Course",
            "/course/view.php?id=1",
        )])))
        .expect(1)
        .mount(&server)
        .await;
    mount_category(
        &server,
        "6",
        catalogue_page(&[("New Course", "/course/view.php?id=2")]),
    )
    .await;

    let rule = MirrorRule {
        include_archives: false,
        ..test_rule()
    };
    let (session, _rx) = session_for(&server, rule);
    let root = format!("{}/course/index.php?categoryid=0", server.uri());
    let tree = walk_catalogue(&session, &root).await;

    assert!(tree.child("Archive").is_none());
    assert!(tree.child("Current").is_some());
    assert_eq!(tree.course_count(), 1);
    server.verify().await;
}

#[tokio::test]
async fn archive_is_kept_by_default() {
    let server = MockServer::start().await;
    mount_category(
        &server,
        "0",
        catalogue_page(&[("Archive", "/course/index.php?categoryid=5")]),
    )
    .await;
    mount_category(
        &server,
        "5",
        catalogue_page(&[("Old Course", "/course/view.php?id=1")]),
    )
    .await;

    let (session, _rx) = session_for(&server, test_rule());
    let root = format!("{}/course/index.php?categoryid=0", server.uri());
    let tree = walk_catalogue(&session, &root).await;

    let archive = tree.child("Archive").expect("archive kept");
    assert!(archive.child("Old Course").is_some());
}

#[tokio::test]
async fn page_without_links_is_an_empty_category() {
    let server = MockServer::start().await;
    mount_category(&server, "0", "<html><body><p>No courses yet</p></body></html>").await;

    let (session, _rx) = session_for(&server, test_rule());
    let root = format!("{}/course/index.php?categoryid=0", server.uri());
    let tree = walk_catalogue(&session, &root).await;

    assert_eq!(
        tree,
        CatalogueNode::Category {
            name: "root".to_string(),
            children: BTreeMap::new(),
        }
    );
    assert_eq!(tree.course_count(), 0);
}

#[tokio::test]
async fn failing_category_does_not_stop_the_walk() {
    let server = MockServer::start().await;
    mount_category(
        &server,
        "0",
        catalogue_page(&[
            ("Broken", "/course/index.php?categoryid=13"),
            ("Working", "/course/index.php?categoryid=14"),
        ]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/course/index.php"))
        .and(query_param("categoryid", "13"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_category(
        &server,
        "14",
        catalogue_page(&[("Algebra", "/course/view.php?id=3")]),
    )
    .await;

    let (session, _rx) = session_for(&server, test_rule());
    let root = format!("{}/course/index.php?categoryid=0", server.uri());
    let tree = walk_catalogue(&session, &root).await;

    assert_eq!(tree.child("Broken").map(CatalogueNode::course_count), Some(0));
    assert!(tree
        .child("Working")
        .and_then(|working| working.child("Algebra"))
        .is_some());
}

#[tokio::test]
async fn course_root_is_a_single_course_without_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (session, _rx) = session_for(&server, test_rule());
    let root = format!("{}/course/view.php?id=5478", server.uri());
    let tree = walk_catalogue(&session, &root).await;

    assert_eq!(
        tree,
        CatalogueNode::Course {
            name: "root".to_string(),
            url: root.clone(),
        }
    );
    server.verify().await;
}

#[tokio::test]
async fn links_are_resolved_against_the_redirected_origin() {
    let catalogue = MockServer::start().await;
    let entry = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/course/index.php"))
        .respond_with(ResponseTemplate::new(302).insert_header(
            "Location",
            format!("{}/course/index.php?categoryid=0", catalogue.uri()),
        ))
        .mount(&entry)
        .await;
    mount_category(
        &catalogue,
        "0",
        catalogue_page(&[("Intro", "/course/view.php?id=99")]),
    )
    .await;

    let (session, _rx) = session_for(&entry, test_rule());
    let root = format!("{}/course/index.php?categoryid=0", entry.uri());
    let tree = walk_catalogue(&session, &root).await;

    assert_eq!(
        tree.child("Intro"),
        Some(&CatalogueNode::Course {
            name: "Intro".to_string(),
            url: format!("{}/course/view.php?id=99", catalogue.uri()),
        })
    );
}
