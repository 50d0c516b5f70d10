use axum::{
    extract::{Form, Path, Query, RawForm, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use sea_orm::Iterable;
use uuid::Uuid;

use super::common::{form_response, fragment, list_response, page_response, HxRequest};
use crate::{
    auth::HubSession,
    entities::{
        production_batch::QualityStatus,
        production_order::{self, Entity as ProductionOrderEntity, ProductionStatus},
    },
    errors::ApiError,
    forms::{BatchIngredientForm, BulkForm, ProductionBatchForm, ProductionOrderForm},
    handlers::AppState,
    render::{self, FormField, FormPanel},
    services::listing::{ListParams, ListQuery},
};

const BASE: &str = "/manufacturing/production";

/// Order routes under `prefix`; mounted at both `/production` and
/// `/production_orders`.
pub fn routes(prefix: &str) -> Router<AppState> {
    Router::new()
        .route(&format!("{prefix}/"), get(list))
        .route(&format!("{prefix}/add/"), get(add_form).post(add))
        .route(&format!("{prefix}/bulk/"), post(bulk))
        .route(&format!("{prefix}/:id/"), get(detail))
        .route(&format!("{prefix}/:id/edit/"), get(edit_form).post(edit))
        .route(&format!("{prefix}/:id/delete/"), post(delete))
        .route(&format!("{prefix}/:id/batches/panel/"), get(batch_panel))
        .route(&format!("{prefix}/:id/batches/add/"), post(add_batch))
        .route(
            &format!("{prefix}/:id/batches/:batch_id/delete/"),
            post(delete_batch),
        )
        .route(
            &format!("{prefix}/:id/batches/:batch_id/ingredients/add/"),
            post(add_ingredient),
        )
        .route(
            &format!("{prefix}/:id/batches/:batch_id/ingredients/:ingredient_id/delete/"),
            post(delete_ingredient),
        )
}

pub(crate) fn status_choices() -> Vec<(String, String)> {
    ProductionStatus::iter()
        .map(|status| (status.to_string(), status.label().to_string()))
        .collect()
}

pub(crate) fn quality_choices() -> Vec<(String, String)> {
    QualityStatus::iter()
        .map(|status| (status.to_string(), status.label().to_string()))
        .collect()
}

/// `(id, name)` select options with a leading blank for "none".
pub(crate) fn optional_choices(choices: Vec<(Uuid, String)>) -> Vec<(String, String)> {
    std::iter::once((String::new(), "---------".to_string()))
        .chain(choices.into_iter().map(|(id, name)| (id.to_string(), name)))
        .collect()
}

async fn render_list(
    state: &AppState,
    session: &HubSession,
    hx: &HxRequest,
    params: &ListParams,
) -> Result<Response, ApiError> {
    let service = &state.services.production_orders;
    let page = service.list(session.hub_id, params).await?;
    let rows = service.rows(session.hub_id, &page.items).await?;
    Ok(list_response::<ProductionOrderEntity>(
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
        &ListParams::first_page::<ProductionOrderEntity>(),
    )
    .await
}

async fn render_detail(
    state: &AppState,
    session: &HubSession,
    hx: &HxRequest,
    id: Uuid,
) -> Result<Response, ApiError> {
    let detail = state
        .services
        .production_orders
        .detail(session.hub_id, id)
        .await?;
    if hx.active {
        return Ok(fragment(render::order_detail(BASE, &detail)));
    }
    Ok(page_response("production_order_detail", detail))
}

async fn list(
    State(state): State<AppState>,
    session: HubSession,
    hx: HxRequest,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let params = ListParams::from_query::<ProductionOrderEntity>(&query);
    if let Some(format) = params.export {
        let file = state
            .services
            .production_orders
            .export(session.hub_id, &params, format)
            .await?;
        return Ok(file.into_response());
    }
    render_list(&state, &session, &hx, &params).await
}

async fn order_panel(
    state: &AppState,
    session: &HubSession,
    title: &str,
    action: String,
    order: Option<&production_order::Model>,
) -> Result<FormPanel, ApiError> {
    let boms = state
        .services
        .bill_of_materials
        .choices(session.hub_id)
        .await?;
    let text = |f: fn(&production_order::Model) -> String| order.map(f).unwrap_or_default();
    let date = |d: Option<chrono::NaiveDate>| d.map(|d| d.to_string()).unwrap_or_default();

    Ok(FormPanel {
        title: title.to_string(),
        action,
        fields: vec![
            FormField::text("order_number", "Order Number", text(|o| o.order_number.clone())),
            FormField::select(
                "bom",
                "Bill of Materials",
                order
                    .and_then(|o| o.bom_id)
                    .map(|id| id.to_string())
                    .unwrap_or_default(),
                optional_choices(boms),
            ),
            FormField::text("quantity", "Quantity", text(|o| o.quantity.to_string())),
            FormField::select(
                "status",
                "Status",
                order.map(|o| o.status).unwrap_or_default().to_string(),
                status_choices(),
            ),
            FormField::text(
                "start_date",
                "Start Date",
                date(order.and_then(|o| o.start_date)),
            ),
            FormField::text("end_date", "End Date", date(order.and_then(|o| o.end_date))),
            FormField::text("batch_number", "Batch Number", text(|o| o.batch_number.clone())),
            FormField::text(
                "expiry_date",
                "Expiry Date",
                date(order.and_then(|o| o.expiry_date)),
            ),
            FormField::text("notes", "Notes", text(|o| o.notes.clone())),
        ],
    })
}

async fn add_form(
    State(state): State<AppState>,
    session: HubSession,
    hx: HxRequest,
) -> Result<Response, ApiError> {
    let panel = order_panel(
        &state,
        &session,
        "Add Production Order",
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
    Form(form): Form<ProductionOrderForm>,
) -> Result<Response, ApiError> {
    state
        .services
        .production_orders
        .create(session.hub_id, &form)
        .await?;
    rerender_first_page(&state, &session, &hx).await
}

async fn detail(
    State(state): State<AppState>,
    session: HubSession,
    hx: HxRequest,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    render_detail(&state, &session, &hx, id).await
}

async fn edit_form(
    State(state): State<AppState>,
    session: HubSession,
    hx: HxRequest,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let order = state
        .services
        .production_orders
        .get(session.hub_id, id)
        .await?;
    let panel = order_panel(
        &state,
        &session,
        "Edit Production Order",
        format!("{BASE}/{id}/edit/"),
        Some(&order),
    )
    .await?;
    Ok(form_response(&hx, panel))
}

async fn edit(
    State(state): State<AppState>,
    session: HubSession,
    hx: HxRequest,
    Path(id): Path<Uuid>,
    Form(form): Form<ProductionOrderForm>,
) -> Result<Response, ApiError> {
    state
        .services
        .production_orders
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
        .production_orders
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
        .production_orders
        .bulk_action(session.hub_id, &form.ids, &form.action)
        .await?;
    rerender_first_page(&state, &session, &hx).await
}

/// Add-batch panel, prefilled with the order's BOM.
async fn batch_panel(
    State(state): State<AppState>,
    session: HubSession,
    hx: HxRequest,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let order = state
        .services
        .production_orders
        .get(session.hub_id, id)
        .await?;
    let boms = state
        .services
        .bill_of_materials
        .choices(session.hub_id)
        .await?;

    let panel = FormPanel {
        title: format!("Add batch to {}", order.order_number),
        action: format!("{BASE}/{id}/batches/add/"),
        fields: vec![
            FormField::text("batch_number", "Batch Number", order.batch_number.clone()),
            FormField::select(
                "bom",
                "Bill of Materials",
                order.bom_id.map(|id| id.to_string()).unwrap_or_default(),
                optional_choices(boms),
            ),
            FormField::text("quantity_produced", "Quantity Produced", ""),
            FormField::text("production_date", "Production Date", ""),
            FormField::text(
                "expiry_date",
                "Expiry Date",
                order.expiry_date.map(|d| d.to_string()).unwrap_or_default(),
            ),
            FormField::select(
                "quality_status",
                "Quality Status",
                QualityStatus::default().to_string(),
                quality_choices(),
            ),
            FormField::text("notes", "Notes", ""),
        ],
    };
    Ok(form_response(&hx, panel))
}

async fn add_batch(
    State(state): State<AppState>,
    session: HubSession,
    hx: HxRequest,
    Path(id): Path<Uuid>,
    Form(form): Form<ProductionBatchForm>,
) -> Result<Response, ApiError> {
    state
        .services
        .production_batches
        .create_for_order(session.hub_id, id, &form)
        .await?;
    render_detail(&state, &session, &hx, id).await
}

async fn delete_batch(
    State(state): State<AppState>,
    session: HubSession,
    hx: HxRequest,
    Path((id, batch_id)): Path<(Uuid, Uuid)>,
) -> Result<Response, ApiError> {
    state
        .services
        .production_batches
        .delete_for_order(session.hub_id, id, batch_id)
        .await?;
    render_detail(&state, &session, &hx, id).await
}

async fn add_ingredient(
    State(state): State<AppState>,
    session: HubSession,
    hx: HxRequest,
    Path((id, batch_id)): Path<(Uuid, Uuid)>,
    Form(form): Form<BatchIngredientForm>,
) -> Result<Response, ApiError> {
    state
        .services
        .production_batches
        .add_ingredient(session.hub_id, id, batch_id, &form)
        .await?;
    render_detail(&state, &session, &hx, id).await
}

async fn delete_ingredient(
    State(state): State<AppState>,
    session: HubSession,
    hx: HxRequest,
    Path((id, batch_id, ingredient_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<Response, ApiError> {
    state
        .services
        .production_batches
        .delete_ingredient(session.hub_id, id, batch_id, ingredient_id)
        .await?;
    render_detail(&state, &session, &hx, id).await
}
