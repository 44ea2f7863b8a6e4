//! Lot ledger endpoints

use api_types::ledger::{LedgerView, LotView};
use axum::{
    Json,
    extract::{Path, State},
};
use engine::LotLedger;

use crate::{ServerError, server::ServerState};

fn ledger_view(ledger: &LotLedger) -> LedgerView {
    LedgerView {
        lots: ledger
            .lots()
            .iter()
            .map(|lot| LotView {
                amount_minor: lot.amount.cents(),
                rate: lot.rate.to_string(),
                created_at: lot.created_at,
            })
            .collect(),
        total_minor: ledger.total_available().cents(),
        average_rate: ledger.average_rate().map(|rate| rate.to_string()),
    }
}

/// Open lots, cheapest first
pub async fn get(
    Path(account): Path<String>,
    State(state): State<ServerState>,
) -> Result<Json<LedgerView>, ServerError> {
    let ledger = state.engine.ledger(&account).await?;
    Ok(Json(ledger_view(&ledger)))
}

/// Regenerate the ledger from the history
pub async fn rebuild(
    Path(account): Path<String>,
    State(state): State<ServerState>,
) -> Result<Json<LedgerView>, ServerError> {
    let ledger = state.engine.rebuild_ledger(&account).await?;
    Ok(Json(ledger_view(&ledger)))
}
