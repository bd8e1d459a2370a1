/// Clinician directory endpoints
use crate::{context::AppContext, directory::ClinicianListing, error::ApiResult};
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

/// Build directory routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/doctors", get(list_doctors))
        .route("/doctors/:id", get(get_doctor))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub cursor: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDoctorsResponse {
    pub doctors: Vec<ClinicianListing>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// List approved clinicians with cursor pagination
async fn list_doctors(
    State(ctx): State<AppContext>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ListDoctorsResponse>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 100);

    let doctors = ctx
        .directory
        .list_clinicians(query.cursor.as_deref(), limit)
        .await?;

    let cursor = if doctors.len() as i64 == limit {
        doctors.last().map(|d| d.id.clone())
    } else {
        None
    };

    Ok(Json(ListDoctorsResponse { doctors, cursor }))
}

/// Fetch one approved clinician
async fn get_doctor(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<ClinicianListing>> {
    let doctor = ctx.directory.get_clinician(&id).await?;

    Ok(Json(doctor))
}
