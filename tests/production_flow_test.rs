mod common;

use axum::http::header;
use common::{body_bytes, body_json, body_text, items, rows, TestApp};
use uuid::Uuid;

async fn create_order(app: &TestApp, number: &str, bom: Option<Uuid>) -> Uuid {
    let bom = bom.map(|id| id.to_string()).unwrap_or_default();
    let response = app
        .post_form(
            "/manufacturing/production/add/",
            &[
                ("order_number", number),
                ("bom", bom.as_str()),
                ("quantity", "50"),
                ("status", "confirmed"),
                ("start_date", "2024-03-01"),
            ],
        )
        .await;
    assert_eq!(response.status(), 200);
    app.find_id(
        "/manufacturing/production/?per_page=100",
        "production_orders",
        "order_number",
        number,
    )
    .await
}

#[tokio::test]
async fn order_lists_resolve_bom_names_and_export() {
    let app = TestApp::new().await;
    let bom = app.create_bom("Bread", "BR-1").await;
    create_order(&app, "PO-100", Some(bom)).await;
    create_order(&app, "PO-050", None).await;

    let payload = app.get_json("/manufacturing/production/").await;
    assert_eq!(
        rows(&payload),
        vec![
            vec!["PO-050", "", "confirmed", "50.00", "2024-03-01", ""],
            vec!["PO-100", "Bread", "confirmed", "50.00", "2024-03-01", ""],
        ]
    );

    let csv = body_text(
        app.get("/manufacturing/production_orders/?q=PO-100&export=csv")
            .await,
    )
    .await;
    assert_eq!(
        csv,
        "Order Number,BillOfMaterials,Status,Quantity,Start Date,End Date\n\
         PO-100,Bread,confirmed,50.00,2024-03-01,\n"
    );
}

#[tokio::test]
async fn deleted_bom_keeps_its_name_in_order_rows() {
    let app = TestApp::new().await;
    let bom = app.create_bom("Legacy", "LG-1").await;
    create_order(&app, "PO-1", Some(bom)).await;
    app.post_form(&format!("/manufacturing/bom/{bom}/delete/"), &[])
        .await;

    let payload = app.get_json("/manufacturing/production/").await;
    assert_eq!(rows(&payload)[0][1], "Legacy");
}

#[tokio::test]
async fn invalid_status_is_rejected() {
    let app = TestApp::new().await;
    let response = app
        .post_form(
            "/manufacturing/production/add/",
            &[("order_number", "PO-X"), ("status", "shipped")],
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn status_may_move_freely() {
    let app = TestApp::new().await;
    let order = create_order(&app, "PO-7", None).await;

    for status in ["done", "draft", "cancelled", "in_progress"] {
        let response = app
            .post_form(
                &format!("/manufacturing/production/{order}/edit/"),
                &[("order_number", "PO-7"), ("status", status)],
            )
            .await;
        assert_eq!(response.status(), 200, "status {status}");
    }

    let order = app
        .state
        .services
        .production_orders
        .get(app.hub_id(), order)
        .await
        .unwrap();
    assert_eq!(order.status.to_string(), "in_progress");
}

#[tokio::test]
async fn batches_and_ingredients_trace_through_the_order_detail() {
    let app = TestApp::new().await;
    let bom = app.create_bom("Jam", "JM-1").await;
    let order = create_order(&app, "PO-JAM", Some(bom)).await;
    let base = format!("/manufacturing/production/{order}");

    let panel = app.get_json(&format!("{base}/batches/panel/")).await;
    assert_eq!(panel["view"], "form");
    let fields = panel["data"]["fields"].as_array().unwrap();
    let bom_field = fields.iter().find(|f| f["name"] == "bom").unwrap();
    assert_eq!(bom_field["value"], bom.to_string());

    for (number, date) in [("LOT-1", "2024-03-02"), ("LOT-2", "2024-03-05")] {
        let response = app
            .post_form(
                &format!("{base}/batches/add/"),
                &[
                    ("batch_number", number),
                    ("quantity_produced", "20"),
                    ("production_date", date),
                ],
            )
            .await;
        assert_eq!(response.status(), 200);
    }

    let detail = app.get_json(&format!("{base}/")).await;
    assert_eq!(detail["view"], "production_order_detail");
    assert_eq!(detail["data"]["bom"]["name"], "Jam");
    let batches = detail["data"]["batches"].as_array().unwrap();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0]["batch_number"], "LOT-2");
    assert_eq!(batches[0]["bom_id"], bom.to_string());
    assert_eq!(batches[0]["quality_status"], "pending");

    let lot1 = batches[1]["id"].as_str().unwrap().to_string();
    let response = app
        .post_form(
            &format!("{base}/batches/{lot1}/ingredients/add/"),
            &[
                ("description", "Strawberries"),
                ("supplier_lot", "SUP-77"),
                ("quantity_used", "15.5"),
                ("unit", "kg"),
            ],
        )
        .await;
    assert_eq!(response.status(), 200);
    let detail = body_json(response).await;
    let lot1_entry = detail["data"]["batches"]
        .as_array()
        .unwrap()
        .iter()
        .find(|b| b["id"] == lot1.as_str())
        .unwrap()
        .clone();
    let ingredients = lot1_entry["ingredients"].as_array().unwrap();
    assert_eq!(ingredients.len(), 1);
    assert_eq!(ingredients[0]["supplier_lot"], "SUP-77");

    let ingredient = ingredients[0]["id"].as_str().unwrap();
    let response = app
        .post_form(
            &format!("{base}/batches/{lot1}/ingredients/{ingredient}/delete/"),
            &[],
        )
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .post_form(&format!("{base}/batches/{lot1}/delete/"), &[])
        .await;
    assert_eq!(response.status(), 200);
    let detail = body_json(response).await;
    assert_eq!(detail["data"]["batches"].as_array().unwrap().len(), 1);

    let html = body_text(app.get_hx(&format!("{base}/"), None).await).await;
    assert!(html.contains("order-detail"));
    assert!(html.contains("LOT-2"));
    assert!(!html.contains("LOT-1"));
}

#[tokio::test]
async fn batch_of_another_order_cannot_be_deleted_through_this_one() {
    let app = TestApp::new().await;
    let first = create_order(&app, "PO-A", None).await;
    let second = create_order(&app, "PO-B", None).await;

    app.post_form(
        &format!("/manufacturing/production/{first}/batches/add/"),
        &[("batch_number", "LOT-A")],
    )
    .await;
    let batch = app
        .find_id(
            "/manufacturing/production_batches/",
            "production_batches",
            "batch_number",
            "LOT-A",
        )
        .await;

    let response = app
        .post_form(
            &format!("/manufacturing/production/{second}/batches/{batch}/delete/"),
            &[],
        )
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn batch_list_defaults_to_newest_production_first() {
    let app = TestApp::new().await;
    let order = create_order(&app, "PO-B", None).await;
    for (number, date) in [
        ("LOT-OLD", "2024-01-01"),
        ("LOT-NEW", "2024-06-01"),
        ("LOT-MID", "2024-03-01"),
    ] {
        app.post_form(
            &format!("/manufacturing/production/{order}/batches/add/"),
            &[("batch_number", number), ("production_date", date)],
        )
        .await;
    }

    let payload = app.get_json("/manufacturing/production_batches/").await;
    assert_eq!(payload["data"]["params"]["dir"], "desc");
    let numbers: Vec<String> = rows(&payload).into_iter().map(|r| r[0].clone()).collect();
    assert_eq!(numbers, vec!["LOT-NEW", "LOT-MID", "LOT-OLD"]);
    assert_eq!(rows(&payload)[0][1], "PO-B");

    let ascending = app
        .get_json("/manufacturing/production_batches/?sort=batch_number")
        .await;
    let numbers: Vec<String> = rows(&ascending).into_iter().map(|r| r[0].clone()).collect();
    assert_eq!(numbers, vec!["LOT-MID", "LOT-NEW", "LOT-OLD"]);
}

#[tokio::test]
async fn batch_edit_updates_quality_status() {
    let app = TestApp::new().await;
    let order = create_order(&app, "PO-Q", None).await;
    app.post_form(
        &format!("/manufacturing/production/{order}/batches/add/"),
        &[("batch_number", "LOT-Q")],
    )
    .await;
    let batch = app
        .find_id(
            "/manufacturing/production_batches/",
            "production_batches",
            "batch_number",
            "LOT-Q",
        )
        .await;

    let order_id = order.to_string();
    let response = app
        .post_form(
            &format!("/manufacturing/production_batches/{batch}/edit/"),
            &[
                ("batch_number", "LOT-Q"),
                ("production_order", order_id.as_str()),
                ("quality_status", "approved"),
            ],
        )
        .await;
    assert_eq!(response.status(), 200);
    let payload = body_json(response).await;
    assert_eq!(rows(&payload)[0][6], "approved");

    let ids = batch.to_string();
    app.post_form(
        "/manufacturing/production_batches/bulk/",
        &[("ids", ids.as_str()), ("action", "delete")],
    )
    .await;
    let empty = app.get_json("/manufacturing/production_batches/").await;
    assert!(items(&empty, "production_batches").is_empty());
}

#[tokio::test]
async fn bom_lines_list_and_reject_missing_bom() {
    let app = TestApp::new().await;
    let bom = app.create_bom("Cake", "CK-1").await;
    let bom_id = bom.to_string();

    for (description, quantity) in [("Flour", "1.5"), ("Sugar", "0.75")] {
        let response = app
            .post_form(
                "/manufacturing/bom_lines/add/",
                &[
                    ("bom", bom_id.as_str()),
                    ("description", description),
                    ("quantity", quantity),
                    ("unit", "kg"),
                ],
            )
            .await;
        assert_eq!(response.status(), 200);
    }

    let payload = app.get_json("/manufacturing/bom_lines/?q=sug").await;
    assert_eq!(rows(&payload), vec![vec!["Cake", "0.75", "Sugar", "kg"]]);

    let missing = app
        .post_form(
            "/manufacturing/bom_lines/add/",
            &[("description", "Orphan"), ("quantity", "1")],
        )
        .await;
    assert_eq!(missing.status(), 400);

    let form = app.get_json("/manufacturing/bom_lines/add/").await;
    let choices = form["data"]["fields"][0]["choices"].as_array().unwrap();
    assert_eq!(choices[0][0], bom_id);
    assert_eq!(choices[0][1], "Cake");
}

async fn create_line(app: &TestApp, bom: Uuid, description: &str, quantity: &str) -> Uuid {
    let bom_id = bom.to_string();
    let response = app
        .post_form(
            "/manufacturing/bom_lines/add/",
            &[
                ("bom", bom_id.as_str()),
                ("description", description),
                ("quantity", quantity),
                ("unit", "kg"),
            ],
        )
        .await;
    assert_eq!(response.status(), 200);
    app.find_id(
        "/manufacturing/bom_lines/?per_page=100",
        "bom_lines",
        "description",
        description,
    )
    .await
}

#[tokio::test]
async fn bom_lines_edit_delete_and_bulk_delete() {
    let app = TestApp::new().await;
    let cake = app.create_bom("Cake", "CK-1").await;
    let pie = app.create_bom("Pie", "PI-1").await;
    let flour = create_line(&app, cake, "Flour", "1").await;
    let sugar = create_line(&app, cake, "Sugar", "2").await;
    let eggs = create_line(&app, cake, "Eggs", "3").await;
    create_line(&app, cake, "Butter", "4").await;

    let pie_id = pie.to_string();
    let response = app
        .post_form(
            &format!("/manufacturing/bom_lines/{flour}/edit/"),
            &[
                ("bom", pie_id.as_str()),
                ("description", "Wholemeal flour"),
                ("quantity", "1.255"),
                ("unit", "g"),
            ],
        )
        .await;
    assert_eq!(response.status(), 200);
    let payload = app.get_json("/manufacturing/bom_lines/?q=wholemeal").await;
    assert_eq!(rows(&payload), vec![vec!["Pie", "1.26", "Wholemeal flour", "g"]]);

    let response = app
        .post_form(&format!("/manufacturing/bom_lines/{sugar}/delete/"), &[])
        .await;
    assert_eq!(response.status(), 200);
    let listed = body_json(response).await;
    assert_eq!(items(&listed, "bom_lines").len(), 3);

    let (flour_id, eggs_id) = (flour.to_string(), eggs.to_string());
    let response = app
        .post_form(
            "/manufacturing/bom_lines/bulk/",
            &[
                ("ids", flour_id.as_str()),
                ("ids", eggs_id.as_str()),
                ("action", "delete"),
            ],
        )
        .await;
    assert_eq!(response.status(), 200);
    let listed = body_json(response).await;
    let remaining = items(&listed, "bom_lines");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0]["description"], "Butter");

    let gone = app
        .get(&format!("/manufacturing/bom_lines/{sugar}/edit/"))
        .await;
    assert_eq!(gone.status(), 404);
}

#[tokio::test]
async fn production_orders_delete_and_bulk_delete() {
    let app = TestApp::new().await;
    let single = create_order(&app, "PO-1", None).await;
    let second = create_order(&app, "PO-2", None).await;
    let third = create_order(&app, "PO-3", None).await;
    create_order(&app, "PO-4", None).await;

    let response = app
        .post_form(&format!("/manufacturing/production/{single}/delete/"), &[])
        .await;
    assert_eq!(response.status(), 200);
    let listed = body_json(response).await;
    assert_eq!(items(&listed, "production_orders").len(), 3);
    assert_eq!(
        app.get(&format!("/manufacturing/production/{single}/"))
            .await
            .status(),
        404
    );

    let ids = format!("{second},{third}");
    let response = app
        .post_form(
            "/manufacturing/production_orders/bulk/",
            &[("ids", ids.as_str()), ("action", "delete")],
        )
        .await;
    assert_eq!(response.status(), 200);
    let payload = body_json(response).await;
    let remaining = items(&payload, "production_orders");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0]["order_number"], "PO-4");
}

#[tokio::test]
async fn unsupported_bulk_actions_change_nothing() {
    let app = TestApp::new().await;
    let bom = app.create_bom("Soup", "SP-1").await;
    let line = create_line(&app, bom, "Carrots", "2").await;
    let order = create_order(&app, "PO-S", Some(bom)).await;

    for (uri, id, key) in [
        ("/manufacturing/bom_lines/bulk/", line, "bom_lines"),
        ("/manufacturing/production/bulk/", order, "production_orders"),
    ] {
        let ids = id.to_string();
        for action in ["activate", "deactivate", "archive"] {
            let response = app
                .post_form(uri, &[("ids", ids.as_str()), ("action", action)])
                .await;
            assert_eq!(response.status(), 200, "{action} on {uri}");
            let payload = body_json(response).await;
            assert_eq!(items(&payload, key).len(), 1, "{action} on {uri}");
        }
    }

    let hub = app.hub_id();
    assert!(app.state.services.bom_lines.get(hub, line).await.is_ok());
    assert!(app
        .state
        .services
        .production_orders
        .get(hub, order)
        .await
        .is_ok());
}

#[tokio::test]
async fn line_and_batch_exports_resolve_references() {
    let app = TestApp::new().await;
    let bom = app.create_bom("Jam", "JM-1").await;
    create_line(&app, bom, "Strawberries", "0.125").await;
    create_line(&app, bom, "Sugar", "1").await;
    let order = create_order(&app, "PO-JAM", Some(bom)).await;
    app.post_form(
        &format!("/manufacturing/production/{order}/batches/add/"),
        &[
            ("batch_number", "LOT-9"),
            ("quantity_produced", "20"),
            ("production_date", "2024-03-02"),
            ("expiry_date", "2025-03-02"),
        ],
    )
    .await;

    let lines = app
        .get("/manufacturing/bom_lines/?q=straw&export=csv")
        .await;
    assert_eq!(lines.status(), 200);
    assert_eq!(
        lines.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"bom_lines.csv\""
    );
    assert_eq!(
        body_text(lines).await,
        "BillOfMaterials,Quantity,Description,Unit\nJam,0.13,Strawberries,kg\n"
    );

    let batches = app
        .get("/manufacturing/production_batches/?export=csv")
        .await;
    assert_eq!(
        batches.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"production_batches.csv\""
    );
    assert_eq!(
        body_text(batches).await,
        "Batch Number,Production Order,BillOfMaterials,Quantity Produced,\
         Production Date,Expiry Date,Quality Status\n\
         LOT-9,PO-JAM,Jam,20.00,2024-03-02,2025-03-02,pending\n"
    );

    let workbook = app
        .get("/manufacturing/production_batches/?export=excel")
        .await;
    assert_eq!(&body_bytes(workbook).await[..2], b"PK");
}
