//! Statistics API endpoints

use api_types::stats::Statistics;
use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;

use crate::{ServerError, server::ServerState};

/// Handle requests for desk statistics
pub async fn get_stats(
    Path(account): Path<String>,
    State(state): State<ServerState>,
) -> Result<Json<Statistics>, ServerError> {
    let stats = state.engine.statistics(&account, Utc::now()).await?;

    Ok(Json(Statistics {
        profit_today_minor: stats.profit_today.cents(),
        profit_week_minor: stats.profit_week.cents(),
        profit_month_minor: stats.profit_month.cents(),
        total_profit_minor: stats.total_profit.cents(),
        purchases: stats.purchases,
        sales: stats.sales,
        operations: stats.operations,
        average_profit_minor: stats.average_profit.cents(),
        profit_by_weekday_minor: stats.profit_by_weekday.map(|profit| profit.cents()),
        dollars_available_minor: stats.dollars_available.cents(),
    }))
}
