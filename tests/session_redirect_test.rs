mod common;

use axum::http::{header, Method};
use common::{body_json, TestApp};
use rstest::rstest;

#[rstest]
#[case("/manufacturing/")]
#[case("/manufacturing/bom/")]
#[case("/manufacturing/bom_lines/")]
#[case("/manufacturing/production/")]
#[case("/manufacturing/production_batches/")]
#[case("/manufacturing/settings/")]
#[tokio::test]
async fn anonymous_requests_redirect_to_login(#[case] uri: &str) {
    let app = TestApp::new().await;
    let response = app.send(Method::GET, uri, None, &[], None).await;
    assert_eq!(response.status(), 302, "GET {uri}");

    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.starts_with("/accounts/login/?next=%2Fmanufacturing%2F"));
}

#[tokio::test]
async fn redirect_carries_the_requested_path() {
    let app = TestApp::new().await;
    let response = app
        .send(Method::GET, "/manufacturing/bom/", None, &[], None)
        .await;
    assert_eq!(
        response.headers()[header::LOCATION],
        "/accounts/login/?next=%2Fmanufacturing%2Fbom%2F"
    );

    let posted = app
        .send(
            Method::POST,
            "/manufacturing/bom/add/",
            None,
            &[],
            Some(&[("name", "Sneaky")]),
        )
        .await;
    assert_eq!(posted.status(), 302);
}

#[tokio::test]
async fn session_cookie_is_accepted() {
    let app = TestApp::new().await;
    let cookie = format!("theme=dark; hub_session={}", app.token());
    let response = app
        .send(
            Method::GET,
            "/manufacturing/bom/",
            None,
            &[("cookie", cookie.as_str())],
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn forged_or_foreign_tokens_redirect() {
    let app = TestApp::new().await;
    let response = app
        .send(
            Method::GET,
            "/manufacturing/bom/",
            Some("not.a.token"),
            &[],
            None,
        )
        .await;
    assert_eq!(response.status(), 302);

    let other = TestApp::with_config(|cfg| {
        cfg.session_secret = "a_completely_different_secret_for_another_deployment".into()
    })
    .await;
    let response = app
        .send(
            Method::GET,
            "/manufacturing/bom/",
            Some(other.token()),
            &[],
            None,
        )
        .await;
    assert_eq!(response.status(), 302);
}

#[tokio::test]
async fn health_endpoints_need_no_session() {
    let app = TestApp::new().await;

    let health = app.send(Method::GET, "/health", None, &[], None).await;
    assert_eq!(health.status(), 200);
    assert_eq!(body_json(health).await["status"], "up");

    let ready = app
        .send(Method::GET, "/health/ready", None, &[], None)
        .await;
    assert_eq!(ready.status(), 200);
    let ready = body_json(ready).await;
    assert_eq!(ready["ready"], true);
    assert_eq!(ready["details"]["database"]["status"], "up");

    let live = app.send(Method::GET, "/health/live", None, &[], None).await;
    assert_eq!(body_json(live).await["alive"], true);
}

#[tokio::test]
async fn request_id_is_echoed_or_generated() {
    let app = TestApp::new().await;

    let echoed = app
        .send(
            Method::GET,
            "/health",
            None,
            &[("x-request-id", "trace-me-123")],
            None,
        )
        .await;
    assert_eq!(echoed.headers()["x-request-id"], "trace-me-123");

    let generated = app.get("/manufacturing/bom/").await;
    let id = generated.headers()["x-request-id"].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());
}

#[tokio::test]
async fn settings_describe_the_module() {
    let app = TestApp::new().await;
    let payload = app.get_json("/manufacturing/settings/").await;
    assert_eq!(payload["module"], "manufacturing");
    assert_eq!(payload["view"], "settings");
    assert_eq!(payload["data"]["id"], "manufacturing");
    assert_eq!(payload["data"]["version"], "1.0.0");

    let tabs: Vec<&str> = payload["navigation"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|tab| tab["id"].as_str())
        .collect();
    assert_eq!(tabs, vec!["dashboard", "bom", "production", "settings"]);
}

#[tokio::test]
async fn unknown_record_ids_are_not_found() {
    let app = TestApp::new().await;
    let missing = uuid::Uuid::new_v4();
    let response = app
        .get(&format!("/manufacturing/production/{missing}/"))
        .await;
    assert_eq!(response.status(), 404);
}
