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
    entities::bom_line::{self, Entity as BomLineEntity},
    errors::ApiError,
    forms::{BomLineForm, BulkForm},
    handlers::AppState,
    render::{FormField, FormPanel},
    services::listing::{ListParams, ListQuery},
};

const BASE: &str = "/manufacturing/bom_lines";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(&format!("{BASE}/"), get(list))
        .route(&format!("{BASE}/add/"), get(add_form).post(add))
        .route(&format!("{BASE}/:id/edit/"), get(edit_form).post(edit))
        .route(&format!("{BASE}/:id/delete/"), post(delete))
        .route(&format!("{BASE}/bulk/"), post(bulk))
}

async fn render_list(
    state: &AppState,
    session: &HubSession,
    hx: &HxRequest,
    params: &ListParams,
) -> Result<Response, ApiError> {
    let service = &state.services.bom_lines;
    let page = service.list(session.hub_id, params).await?;
    let rows = service.rows(session.hub_id, &page.items).await?;
    Ok(list_response::<BomLineEntity>(hx, BASE, params, page, rows))
}

async fn rerender_first_page(
    state: &AppState,
    session: &HubSession,
    hx: &HxRequest,
) -> Result<Response, ApiError> {
    render_list(state, session, hx, &ListParams::first_page::<BomLineEntity>()).await
}

async fn list(
    State(state): State<AppState>,
    session: HubSession,
    hx: HxRequest,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let params = ListParams::from_query::<BomLineEntity>(&query);
    if let Some(format) = params.export {
        let file = state
            .services
            .bom_lines
            .export(session.hub_id, &params, format)
            .await?;
        return Ok(file.into_response());
    }
    render_list(&state, &session, &hx, &params).await
}

async fn panel(
    state: &AppState,
    session: &HubSession,
    title: &str,
    action: String,
    line: Option<&bom_line::Model>,
) -> Result<FormPanel, ApiError> {
    let boms = state
        .services
        .bill_of_materials
        .choices(session.hub_id)
        .await?
        .into_iter()
        .map(|(id, name)| (id.to_string(), name))
        .collect();

    Ok(FormPanel {
        title: title.to_string(),
        action,
        fields: vec![
            FormField::select(
                "bom",
                "Bill of Materials",
                line.map(|l| l.bom_id.to_string()).unwrap_or_default(),
                boms,
            ),
            FormField::text(
                "description",
                "Description",
                line.map(|l| l.description.clone()).unwrap_or_default(),
            ),
            FormField::text(
                "quantity",
                "Quantity",
                line.map(|l| l.quantity.to_string()).unwrap_or_default(),
            ),
            FormField::text(
                "unit",
                "Unit",
                line.map(|l| l.unit.clone()).unwrap_or_default(),
            ),
        ],
    })
}

async fn add_form(
    State(state): State<AppState>,
    session: HubSession,
    hx: HxRequest,
) -> Result<Response, ApiError> {
    let panel = panel(&state, &session, "Add BOM Line", format!("{BASE}/add/"), None).await?;
    Ok(form_response(&hx, panel))
}

async fn add(
    State(state): State<AppState>,
    session: HubSession,
    hx: HxRequest,
    Form(form): Form<BomLineForm>,
) -> Result<Response, ApiError> {
    state.services.bom_lines.create(session.hub_id, &form).await?;
    rerender_first_page(&state, &session, &hx).await
}

async fn edit_form(
    State(state): State<AppState>,
    session: HubSession,
    hx: HxRequest,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let line = state.services.bom_lines.get(session.hub_id, id).await?;
    let panel = panel(
        &state,
        &session,
        "Edit BOM Line",
        format!("{BASE}/{id}/edit/"),
        Some(&line),
    )
    .await?;
    Ok(form_response(&hx, panel))
}

async fn edit(
    State(state): State<AppState>,
    session: HubSession,
    hx: HxRequest,
    Path(id): Path<Uuid>,
    Form(form): Form<BomLineForm>,
) -> Result<Response, ApiError> {
    state
        .services
        .bom_lines
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
    state.services.bom_lines.delete(session.hub_id, id).await?;
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
        .bom_lines
        .bulk_action(session.hub_id, &form.ids, &form.action)
        .await?;
    rerender_first_page(&state, &session, &hx).await
}
