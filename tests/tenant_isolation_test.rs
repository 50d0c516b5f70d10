mod common;

use axum::http::Method;
use common::{body_json, body_text, items, TestApp};
use uuid::Uuid;

#[tokio::test]
async fn records_never_cross_hubs() {
    let app = TestApp::new().await;
    let bom = app.create_bom("Hub A recipe", "HA-1").await;

    let other_hub = Uuid::new_v4();
    let other = app.token_for(other_hub);

    for uri in [
        "/manufacturing/bom/",
        "/manufacturing/bom_lines/",
        "/manufacturing/production/",
        "/manufacturing/production_batches/",
    ] {
        let response = app
            .send(Method::GET, uri, Some(&other), &[], None)
            .await;
        assert_eq!(response.status(), 200, "GET {uri}");
        let payload = body_json(response).await;
        assert_eq!(payload["data"]["pagination"]["total"], 0, "GET {uri}");
    }

    let edit = app
        .send(
            Method::GET,
            &format!("/manufacturing/bom/{bom}/edit/"),
            Some(&other),
            &[],
            None,
        )
        .await;
    assert_eq!(edit.status(), 404);

    let delete = app
        .send(
            Method::POST,
            &format!("/manufacturing/bom/{bom}/delete/"),
            Some(&other),
            &[],
            Some(&[]),
        )
        .await;
    assert_eq!(delete.status(), 404);

    let ids = bom.to_string();
    let bulk = app
        .send(
            Method::POST,
            "/manufacturing/bom/bulk/",
            Some(&other),
            &[],
            Some(&[("ids", ids.as_str()), ("action", "delete")]),
        )
        .await;
    assert_eq!(bulk.status(), 200);

    let still_there = app.get_json("/manufacturing/bom/").await;
    assert_eq!(items(&still_there, "bill_of_materialses").len(), 1);
}

#[tokio::test]
async fn export_is_scoped_to_the_session_hub() {
    let app = TestApp::new().await;
    app.create_bom("Mine", "MINE-1").await;

    let other = app.token_for(Uuid::new_v4());
    let response = app
        .send(
            Method::GET,
            "/manufacturing/bom/?export=csv",
            Some(&other),
            &[],
            None,
        )
        .await;
    assert_eq!(
        body_text(response).await,
        "Code,Name,Is Active,Output Quantity,Notes\n"
    );
}

#[tokio::test]
async fn lines_cannot_reference_another_hubs_bom() {
    let app = TestApp::new().await;
    let bom = app.create_bom("Private", "PR-1").await;

    let other = app.token_for(Uuid::new_v4());
    let bom_id = bom.to_string();
    let response = app
        .send(
            Method::POST,
            "/manufacturing/bom_lines/add/",
            Some(&other),
            &[],
            Some(&[
                ("bom", bom_id.as_str()),
                ("description", "Stolen"),
                ("quantity", "1"),
                ("unit", "kg"),
            ]),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn soft_deleted_records_stay_reachable_administratively() {
    let app = TestApp::new().await;
    let hub = app.hub_id();
    let bom = app.create_bom("Retired", "RT-1").await;
    app.create_bom("Current", "CU-1").await;

    app.post_form(&format!("/manufacturing/bom/{bom}/delete/"), &[])
        .await;

    let service = &app.state.services.bill_of_materials;
    assert_eq!(service.count(hub).await.unwrap(), 1);
    assert!(service.get(hub, bom).await.is_err());

    let everything = service.list_including_deleted(hub).await.unwrap();
    assert_eq!(everything.len(), 2);
    assert!(everything.iter().any(|b| b.id == bom && b.is_deleted));

    // The administrative path still honours the hub.
    assert!(service
        .get_including_deleted(Uuid::new_v4(), bom)
        .await
        .is_err());
    assert!(service
        .list_including_deleted(Uuid::new_v4())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn dashboard_counts_live_records_of_the_hub() {
    let app = TestApp::new().await;
    let bom = app.create_bom("Counted", "CT-1").await;
    let deleted = app.create_bom("Gone", "GN-1").await;
    app.post_form(&format!("/manufacturing/bom/{deleted}/delete/"), &[])
        .await;

    let bom_id = bom.to_string();
    app.post_form(
        "/manufacturing/bom_lines/add/",
        &[
            ("bom", bom_id.as_str()),
            ("description", "Flour"),
            ("quantity", "2"),
            ("unit", "kg"),
        ],
    )
    .await;
    app.post_form(
        "/manufacturing/production/add/",
        &[("order_number", "PO-1"), ("bom", bom_id.as_str())],
    )
    .await;

    let dashboard = app.get_json("/manufacturing/").await;
    assert_eq!(dashboard["view"], "dashboard");
    assert_eq!(dashboard["data"]["total_bill_of_materialses"], 1);
    assert_eq!(dashboard["data"]["total_bom_lines"], 1);
    assert_eq!(dashboard["data"]["total_production_orders"], 1);
    assert_eq!(dashboard["data"]["total_production_batches"], 0);

    let other = app.token_for(Uuid::new_v4());
    let response = app
        .send(Method::GET, "/manufacturing/", Some(&other), &[], None)
        .await;
    let empty = body_json(response).await;
    assert_eq!(empty["data"]["total_bill_of_materialses"], 0);

    let cards = body_text(app.get_hx("/manufacturing/", None).await).await;
    assert!(cards.contains("dashboard-cards"));
}
