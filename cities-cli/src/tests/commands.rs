//! End-to-end command tests against a temporary catalogue.

use super::helpers::{Workspace, listed_names};
use super::*;
use rstest::{fixture, rstest};

#[fixture]
fn workspace() -> Workspace {
    Workspace::new()
}

#[rstest]
fn refresh_prints_first_page_and_duration(workspace: Workspace) {
    let output = workspace
        .run(&["refresh", "--page-size", "2"])
        .expect("refresh succeeds");
    assert_eq!(listed_names(&output), ["Praga", "Madrid"]);
    assert!(output["persisted_seconds"].is_number());
    assert!(workspace.db().as_std_path().is_file());
}

#[rstest]
fn list_pages_through_the_catalogue(workspace: Workspace) {
    workspace.run(&["refresh"]).expect("refresh succeeds");
    let output = workspace
        .run(&["list", "--page-size", "2", "--page", "1"])
        .expect("list succeeds");
    assert_eq!(listed_names(&output), ["Malaga", "Montevideo"]);
    assert_eq!(output["total"], 4);
    assert_eq!(output["page"], 1);
}

#[rstest]
fn favorite_toggles_and_filters(workspace: Workspace) {
    workspace.run(&["refresh"]).expect("refresh succeeds");
    let city = workspace.run(&["favorite", "4"]).expect("toggle succeeds");
    assert_eq!(city["is_favorite"], true);
    assert_eq!(city["flag"], "\u{1F1FA}\u{1F1FE}");

    let favorites = workspace
        .run(&["list", "--favorites"])
        .expect("list succeeds");
    assert_eq!(listed_names(&favorites), ["Montevideo"]);

    let city = workspace.run(&["favorite", "4"]).expect("toggle back");
    assert_eq!(city["is_favorite"], false);
}

#[rstest]
fn favorite_reports_unknown_city(workspace: Workspace) {
    workspace.run(&["refresh"]).expect("refresh succeeds");
    let err = workspace.run(&["favorite", "99"]).expect_err("unknown id");
    assert!(matches!(
        err,
        CliError::Store(cities_core::StoreError::MissingCity { id: 99 })
    ));
}

#[rstest]
fn refresh_reports_unreadable_dataset(workspace: Workspace) {
    std::fs::remove_file(workspace.dataset()).expect("remove dataset");
    let err = workspace.run(&["refresh"]).expect_err("missing dataset");
    match err {
        CliError::Refresh { message } => {
            assert!(message.contains("cities.json"), "message: {message}");
        }
        other => panic!("expected Refresh, found {other:?}"),
    }
}
