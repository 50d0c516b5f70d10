use axum::{
    extract::{Form, Path, Query, RawForm, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use super::common::{form_response, list_response, HxRequest};
use super::production_orders::{optional_choices, quality_choices};
use crate::{
    auth::HubSession,
    entities::production_batch::{self, Entity as ProductionBatchEntity},
    errors::ApiError,
    forms::{BulkForm, ProductionBatchForm},
    handlers::AppState,
    render::{FormField, FormPanel},
    services::listing::{ListParams, ListQuery},
};

const BASE: &str = "/manufacturing/production_batches";

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
    let service = &state.services.production_batches;
    let page = service.list(session.hub_id, params).await?;
    let rows = service.rows(session.hub_id, &page.items).await?;
    Ok(list_response::<ProductionBatchEntity>(
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
        &ListParams::first_page::<ProductionBatchEntity>(),
    )
    .await
}

/// Newest production first unless another sort is asked for.
async fn list(
    State(state): State<AppState>,
    session: HubSession,
    hx: HxRequest,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let params = ListParams::from_query::<ProductionBatchEntity>(&query);
    if let Some(format) = params.export {
        let file = state
            .services
            .production_batches
            .export(session.hub_id, &params, format)
            .await?;
        return Ok(file.into_response());
    }
    render_list(&state, &session, &hx, &params).await
}

async fn batch_panel(
    state: &AppState,
    session: &HubSession,
    title: &str,
    action: String,
    batch: Option<&production_batch::Model>,
) -> Result<FormPanel, ApiError> {
    let orders = state
        .services
        .production_orders
        .choices(session.hub_id)
        .await?;
    let boms = state
        .services
        .bill_of_materials
        .choices(session.hub_id)
        .await?;
    let id = |id: Option<Uuid>| id.map(|id| id.to_string()).unwrap_or_default();
    let date = |d: Option<chrono::NaiveDate>| d.map(|d| d.to_string()).unwrap_or_default();

    Ok(FormPanel {
        title: title.to_string(),
        action,
        fields: vec![
            FormField::text(
                "batch_number",
                "Batch Number",
                batch.map(|b| b.batch_number.clone()).unwrap_or_default(),
            ),
            FormField::select(
                "production_order",
                "Production Order",
                id(batch.and_then(|b| b.production_order_id)),
                optional_choices(orders),
            ),
            FormField::select(
                "bom",
                "Bill of Materials",
                id(batch.and_then(|b| b.bom_id)),
                optional_choices(boms),
            ),
            FormField::text(
                "quantity_produced",
                "Quantity Produced",
                batch
                    .map(|b| b.quantity_produced.to_string())
                    .unwrap_or_default(),
            ),
            FormField::text(
                "production_date",
                "Production Date",
                date(batch.and_then(|b| b.production_date)),
            ),
            FormField::text(
                "expiry_date",
                "Expiry Date",
                date(batch.and_then(|b| b.expiry_date)),
            ),
            FormField::select(
                "quality_status",
                "Quality Status",
                batch
                    .map(|b| b.quality_status)
                    .unwrap_or_default()
                    .to_string(),
                quality_choices(),
            ),
            FormField::text(
                "notes",
                "Notes",
                batch.map(|b| b.notes.clone()).unwrap_or_default(),
            ),
        ],
    })
}

async fn add_form(
    State(state): State<AppState>,
    session: HubSession,
    hx: HxRequest,
) -> Result<Response, ApiError> {
    let panel = batch_panel(
        &state,
        &session,
        "Add Production Batch",
        format!("{BASE}/add/"),
        None,
    )
    .await?;
    Ok(form_response(&hx, panel))
}

async fn add(
    State(state): State<AppState>,
    session: HubSession,
    hx: HxRequest,
    Form(form): Form<ProductionBatchForm>,
) -> Result<Response, ApiError> {
    state
        .services
        .production_batches
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
    let batch = state
        .services
        .production_batches
        .get(session.hub_id, id)
        .await?;
    let panel = batch_panel(
        &state,
        &session,
        "Edit Production Batch",
        format!("{BASE}/{id}/edit/"),
        Some(&batch),
    )
    .await?;
    Ok(form_response(&hx, panel))
}

async fn edit(
    State(state): State<AppState>,
    session: HubSession,
    hx: HxRequest,
    Path(id): Path<Uuid>,
    Form(form): Form<ProductionBatchForm>,
) -> Result<Response, ApiError> {
    state
        .services
        .production_batches
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
        .production_batches
        .delete(session.hub_id, id)
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
        .production_batches
        .bulk_action(session.hub_id, &form.ids, &form.action)
        .await?;
    rerender_first_page(&state, &session, &hx).await
}
