use axum::{
    extract::{Form, Path, Query, RawForm, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use super::common::{form_response, list_response, HxRequest};
use crate::{
    auth::HubSession,
    entities::bill_of_materials::{self, Entity as BillOfMaterialsEntity},
    errors::ApiError,
    forms::{BillOfMaterialsForm, BulkForm},
    handlers::AppState,
    render::{FormField, FormPanel},
    services::listing::{ListParams, ListQuery},
};

const BASE: &str = "/manufacturing/bom";

/// BOM routes under `prefix`; mounted at both `/bom` and `/bill_of_materialses`.
pub fn routes(prefix: &str) -> Router<AppState> {
    Router::new()
        .route(&format!("{prefix}/"), get(list))
        .route(&format!("{prefix}/add/"), get(add_form).post(add))
        .route(&format!("{prefix}/:id/edit/"), get(edit_form).post(edit))
        .route(&format!("{prefix}/:id/delete/"), post(delete))
        .route(&format!("{prefix}/:id/toggle/"), post(toggle))
        .route(&format!("{prefix}/bulk/"), post(bulk))
}

async fn render_list(
    state: &AppState,
    session: &HubSession,
    hx: &HxRequest,
    params: &ListParams,
) -> Result<Response, ApiError> {
    let service = &state.services.bill_of_materials;
    let page = service.list(session.hub_id, params).await?;
    let rows = service.rows(session.hub_id, &page.items).await?;
    Ok(list_response::<BillOfMaterialsEntity>(
        hx, BASE, params, page, rows,
    ))
}

async fn rerender_first_page(
    state: &AppState,
    session: &HubSession,
    hx: &HxRequest,
) -> Result<Response, ApiError> {
    render_list(
        state,
        session,
        hx,
        &ListParams::first_page::<BillOfMaterialsEntity>(),
    )
    .await
}

/// List, search, sort, paginate; `export=csv|excel` returns a file instead.
async fn list(
    State(state): State<AppState>,
    session: HubSession,
    hx: HxRequest,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let params = ListParams::from_query::<BillOfMaterialsEntity>(&query);
    if let Some(format) = params.export {
        let file = state
            .services
            .bill_of_materials
            .export(session.hub_id, &params, format)
            .await?;
        return Ok(file.into_response());
    }
    render_list(&state, &session, &hx, &params).await
}

fn panel(title: &str, action: String, bom: Option<&bill_of_materials::Model>) -> FormPanel {
    let value = |f: fn(&bill_of_materials::Model) -> String| bom.map(f).unwrap_or_default();
    FormPanel {
        title: title.to_string(),
        action,
        fields: vec![
            FormField::text("name", "Name", value(|b| b.name.clone())),
            FormField::text("code", "Code", value(|b| b.code.clone())),
            FormField::text(
                "output_quantity",
                "Output Quantity",
                value(|b| b.output_quantity.to_string()),
            ),
            FormField::text("notes", "Notes", value(|b| b.notes.clone())),
            FormField::select(
                "is_active",
                "Active",
                if bom.map_or(true, |b| b.is_active) { "on" } else { "" },
                vec![("on".into(), "Yes".into()), (String::new(), "No".into())],
            ),
        ],
    }
}

async fn add_form(_session: HubSession, hx: HxRequest) -> Response {
    form_response(
        &hx,
        panel("Add Bill of Materials", format!("{BASE}/add/"), None),
    )
}

async fn add(
    State(state): State<AppState>,
    session: HubSession,
    hx: HxRequest,
    Form(form): Form<BillOfMaterialsForm>,
) -> Result<Response, ApiError> {
    state
        .services
        .bill_of_materials
        .create(session.hub_id, &form)
        .await?;
    rerender_first_page(&state, &session, &hx).await
}

async fn edit_form(
    State(state): State<AppState>,
    session: HubSession,
    hx: HxRequest,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let bom = state
        .services
        .bill_of_materials
        .get(session.hub_id, id)
        .await?;
    Ok(form_response(
        &hx,
        panel(
            "Edit Bill of Materials",
            format!("{BASE}/{id}/edit/"),
            Some(&bom),
        ),
    ))
}

async fn edit(
    State(state): State<AppState>,
    session: HubSession,
    hx: HxRequest,
    Path(id): Path<Uuid>,
    Form(form): Form<BillOfMaterialsForm>,
) -> Result<Response, ApiError> {
    state
        .services
        .bill_of_materials
        .update(session.hub_id, id, &form)
        .await?;
    rerender_first_page(&state, &session, &hx).await
}

async fn delete(
    State(state): State<AppState>,
    session: HubSession,
    hx: HxRequest,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    state
        .services
        .bill_of_materials
        .delete(session.hub_id, id)
        .await?;
    rerender_first_page(&state, &session, &hx).await
}

async fn toggle(
    State(state): State<AppState>,
    session: HubSession,
    hx: HxRequest,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    state
        .services
        .bill_of_materials
        .toggle_status(session.hub_id, id)
        .await?;
    rerender_first_page(&state, &session, &hx).await
}

async fn bulk(
    State(state): State<AppState>,
    session: HubSession,
    hx: HxRequest,
    RawForm(body): RawForm,
) -> Result<Response, ApiError> {
    let form = BulkForm::from_body(&body);
    state
        .services
        .bill_of_materials
        .bulk_action(session.hub_id, &form.ids, &form.action)
        .await?;
    rerender_first_page(&state, &session, &hx).await
}
