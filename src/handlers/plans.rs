use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::{
    models::CardNode,
    rejections::{AppError, ResultExt},
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/plans/{id}/hierarchy", get(plan_hierarchy))
}

#[derive(Serialize)]
struct HierarchyResponse {
    success: bool,
    data: Vec<CardNode>,
}

/// Full nested read model for a plan. All-or-nothing: any fetch failure
/// surfaces as a single 500, never a partial tree.
async fn plan_hierarchy(
    State(state): State<AppState>,
    Path(plan_id): Path<String>,
) -> Result<Json<HierarchyResponse>, AppError> {
    state
        .db
        .get_plan(&plan_id)
        .await
        .reject("could not look up plan")?
        .ok_or(AppError::NotFound)?;

    let data = state
        .db
        .plan_hierarchy(&plan_id)
        .await
        .reject("could not assemble plan hierarchy")?;

    Ok(Json(HierarchyResponse {
        success: true,
        data,
    }))
}
