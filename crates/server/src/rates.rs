//! Rate store endpoints

use api_types::rates::{RatesUpdate, RatesView};
use axum::{
    Json,
    extract::{Path, State},
};
use engine::Rates;

use crate::{ServerError, operations::parse_rate, server::ServerState};

fn rates_view(rates: &Rates) -> RatesView {
    RatesView {
        official: rates.official.to_string(),
        buy: rates.buy.to_string(),
        sell: rates.sell.to_string(),
        last_update: rates.last_update,
    }
}

/// Current rates of the account (defaults on first use)
pub async fn get(
    Path(account): Path<String>,
    State(state): State<ServerState>,
) -> Result<Json<RatesView>, ServerError> {
    let rates = state.engine.rates(&account).await?;
    Ok(Json(rates_view(&rates)))
}

/// Replace the buy and sell rates
pub async fn update(
    Path(account): Path<String>,
    State(state): State<ServerState>,
    Json(payload): Json<RatesUpdate>,
) -> Result<Json<RatesView>, ServerError> {
    let buy = parse_rate(&payload.buy)?;
    let sell = parse_rate(&payload.sell)?;
    let rates = state.engine.set_rates(&account, buy, sell).await?;
    Ok(Json(rates_view(&rates)))
}
