use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::{Html, IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::convert::Infallible;

use crate::{
    db::query_builder::Page,
    render::{self, FormPanel, TableView},
    services::listing::{ListDescriptor, ListParams},
};

pub const MODULE_ID: &str = "manufacturing";
pub const MODULE_NAME: &str = "Manufacturing";
pub const MODULE_VERSION: &str = "1.0.0";
pub const MODULE_BASE: &str = "/manufacturing";

/// Target id of the list body; a request aimed at it only wants the rows.
pub const TABLE_BODY_TARGET: &str = "datatable-body";

#[derive(Debug, Clone, Serialize)]
pub struct NavTab {
    pub id: &'static str,
    pub label: &'static str,
    pub url: String,
}

pub fn navigation() -> Vec<NavTab> {
    [
        ("dashboard", "Dashboard", ""),
        ("bom", "Bills of Materials", "bom/"),
        ("production", "Production", "production/"),
        ("settings", "Settings", "settings/"),
    ]
    .into_iter()
    .map(|(id, label, path)| NavTab {
        id,
        label,
        url: format!("{MODULE_BASE}/{path}"),
    })
    .collect()
}

/// Partial-refresh request headers (`HX-Request`, `HX-Target`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HxRequest {
    pub active: bool,
    pub target: Option<String>,
}

impl HxRequest {
    pub fn wants_table_body(&self) -> bool {
        self.active && self.target.as_deref() == Some(TABLE_BODY_TARGET)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for HxRequest
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };
        Ok(Self {
            active: header("hx-request").as_deref() == Some("true"),
            target: header("hx-target"),
        })
    }
}

/// Full-page JSON document: module navigation around a view payload.
pub fn page_response<T: Serialize>(view: &str, payload: T) -> Response {
    Json(json!({
        "module": MODULE_ID,
        "navigation": navigation(),
        "view": view,
        "data": payload,
    }))
    .into_response()
}

pub fn fragment(html: String) -> Response {
    Html(html).into_response()
}

/// Renders one page of a listing, as JSON or as the HTMX table fragment.
pub fn list_response<E>(
    hx: &HxRequest,
    base: &str,
    params: &ListParams,
    page: Page<E::Model>,
    rows: Vec<Vec<String>>,
) -> Response
where
    E: ListDescriptor,
    E::Model: Serialize,
{
    if hx.active {
        let view = TableView {
            base,
            headers: E::EXPORT_HEADERS,
            ids: page.items.iter().map(E::record_id).collect(),
            rows,
            params,
            page: page.page,
            num_pages: page.num_pages,
            total: page.total,
        };
        let html = if hx.wants_table_body() {
            render::table_body(base, &view.ids, &view.rows)
        } else if params.view == "cards" {
            render::card_grid(&view)
        } else {
            render::list_table(&view)
        };
        return fragment(html);
    }

    let mut payload = Map::new();
    payload.insert("params".into(), json!(params));
    payload.insert("headers".into(), json!(E::EXPORT_HEADERS));
    payload.insert("rows".into(), json!(rows));
    payload.insert(
        "pagination".into(),
        json!({
            "page": page.page,
            "per_page": page.per_page,
            "total": page.total,
            "num_pages": page.num_pages,
            "has_previous": page.has_previous(),
            "has_next": page.has_next(),
        }),
    );
    payload.insert(E::ROUTE.into(), json!(page.items));
    page_response(E::ROUTE, Value::Object(payload))
}

pub fn form_response(hx: &HxRequest, panel: FormPanel) -> Response {
    if hx.active {
        fragment(render::form_panel(&panel))
    } else {
        page_response("form", panel)
    }
}
