use axum::{Extension, Json, extract::State};
use serde::Serialize;

use crate::{
    error::Result,
    models::account::AccountProfile,
    services::{auth::AuthContext, statistics::StatisticsSnapshot},
    state::AppState,
};

/// Global numbers from the statistics feed next to the user's own stats.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub global: StatisticsSnapshot,
    pub user: AccountProfile,
}

/// The logged-in dashboard view.
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<DashboardResponse>> {
    Ok(Json(DashboardResponse {
        global: state.statistics.snapshot()?,
        user: AccountProfile::from(&ctx.account),
    }))
}

/// The latest global statistics; available to guests.
pub async fn statistics(State(state): State<AppState>) -> Result<Json<StatisticsSnapshot>> {
    Ok(Json(state.statistics.snapshot()?))
}
