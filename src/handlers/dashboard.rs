use axum::{extract::State, response::Response, routing::get, Router};
use serde_json::json;

use super::common::{
    fragment, navigation, page_response, HxRequest, MODULE_BASE, MODULE_ID, MODULE_NAME,
    MODULE_VERSION,
};
use crate::{auth::HubSession, errors::ApiError, handlers::AppState, render};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(MODULE_BASE, get(dashboard))
        .route(&format!("{MODULE_BASE}/"), get(dashboard))
        .route(&format!("{MODULE_BASE}/settings/"), get(settings))
}

/// Live record counts of the session's hub.
async fn dashboard(
    State(state): State<AppState>,
    session: HubSession,
    hx: HxRequest,
) -> Result<Response, ApiError> {
    let counts = state.services.dashboard.counts(session.hub_id).await?;
    if hx.active {
        return Ok(fragment(render::dashboard_cards(&counts)));
    }
    Ok(page_response("dashboard", counts))
}

async fn settings(_session: HubSession, hx: HxRequest) -> Response {
    let descriptor = json!({
        "id": MODULE_ID,
        "name": MODULE_NAME,
        "version": MODULE_VERSION,
        "navigation": navigation(),
    });
    if hx.active {
        return fragment(format!(
            "<div class=\"module-settings\"><h2>{}</h2><p>Version {}</p></div>",
            render::escape(MODULE_NAME),
            MODULE_VERSION
        ));
    }
    page_response("settings", descriptor)
}
