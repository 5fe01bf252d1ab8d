//! Page resolution on the list endpoint: defaults, fallbacks for garbage
//! parameters, and the total/page relationship.

use axum::Router;
use serde_json::json;

mod common;
use common::{create_user, list_users, setup_app, setup_test_db};

async fn app_with_users(count: usize) -> Router {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let app = setup_app(db);

    for index in 0..count {
        create_user(&app, json!({"Name": format!("user-{index:02}"), "Age": 20})).await;
    }

    app
}

#[tokio::test]
async fn defaults_to_first_page_of_ten() {
    let app = app_with_users(12).await;

    let envelope = list_users(&app, None, "").await;

    assert_eq!(envelope["data"].as_array().unwrap().len(), 10);
    assert_eq!(envelope["page"], json!({"page": 1, "pageSize": 10, "total": 12}));
}

#[tokio::test]
async fn second_page_holds_the_remainder() {
    let app = app_with_users(12).await;

    let envelope = list_users(&app, None, "page=2").await;

    assert_eq!(envelope["data"].as_array().unwrap().len(), 2);
    assert_eq!(envelope["page"]["total"], 12);
}

#[tokio::test]
async fn page_beyond_range_is_empty_but_reports_total() {
    let app = app_with_users(12).await;

    let envelope = list_users(&app, None, "page=5").await;

    assert_eq!(envelope["data"].as_array().unwrap().len(), 0);
    assert_eq!(envelope["page"]["total"], 12);
}

#[tokio::test]
async fn custom_page_size_is_honored() {
    let app = app_with_users(12).await;

    let envelope = list_users(&app, None, "pageSize=5&page=3").await;

    assert_eq!(envelope["data"].as_array().unwrap().len(), 2);
    assert_eq!(envelope["page"]["pageSize"], 5);
}

#[tokio::test]
async fn non_numeric_parameters_fall_back_to_defaults() {
    let app = app_with_users(12).await;

    let envelope = list_users(&app, None, "page=abc&pageSize=lots").await;

    assert_eq!(envelope["data"].as_array().unwrap().len(), 10);
    assert_eq!(envelope["page"]["page"], 1);
}

#[tokio::test]
async fn non_positive_parameters_fall_back_to_defaults() {
    let app = app_with_users(12).await;

    let envelope = list_users(&app, None, "page=0&pageSize=-3").await;

    assert_eq!(envelope["data"].as_array().unwrap().len(), 10);
    assert_eq!(envelope["page"], json!({"page": 1, "pageSize": 10, "total": 12}));
}

#[tokio::test]
async fn huge_page_values_return_an_empty_page() {
    let app = app_with_users(3).await;

    let envelope = list_users(
        &app,
        None,
        "page=9223372036854775807&pageSize=9223372036854775807",
    )
    .await;

    assert_eq!(envelope["data"].as_array().unwrap().len(), 0);
    assert_eq!(envelope["page"]["total"], 3);
}

#[tokio::test]
async fn total_counts_the_filtered_set_not_the_page() {
    let app = app_with_users(12).await;

    let envelope = list_users(
        &app,
        Some(r#"{"conditions":[{"field":"name","operator":"LIKE","value":"user-0"}]}"#),
        "pageSize=3",
    )
    .await;

    assert_eq!(envelope["data"].as_array().unwrap().len(), 3);
    assert_eq!(envelope["page"]["total"], 10);
}
