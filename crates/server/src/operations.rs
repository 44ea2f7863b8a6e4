//! Trades, quotes and history endpoints

use api_types::operation::{
    BlockUsedView, OperationKind as ApiKind, OperationList, OperationListResponse,
    OperationUpdate, OperationView, PeriodKind, SaleQuoteRequest, SaleQuoteView, TradeNew,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::{BlockUsed, Money, Operation, OperationEdit, OperationFilter, Period, Rate, TradeCmd};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

fn map_kind(kind: engine::OperationKind) -> ApiKind {
    match kind {
        engine::OperationKind::Purchase => ApiKind::Purchase,
        engine::OperationKind::Sale => ApiKind::Sale,
    }
}

fn map_api_kind(kind: ApiKind) -> engine::OperationKind {
    match kind {
        ApiKind::Purchase => engine::OperationKind::Purchase,
        ApiKind::Sale => engine::OperationKind::Sale,
    }
}

pub(crate) fn parse_rate(value: &str) -> Result<Rate, ServerError> {
    Ok(value.parse::<Rate>()?)
}

fn parse_optional_rate(value: Option<&str>) -> Result<Option<Rate>, ServerError> {
    value.map(parse_rate).transpose()
}

fn block_views(blocks: &[BlockUsed]) -> Vec<BlockUsedView> {
    blocks
        .iter()
        .map(|block| BlockUsedView {
            rate: block.rate.to_string(),
            amount_minor: block.amount.cents(),
        })
        .collect()
}

pub(crate) fn operation_view(operation: &Operation) -> OperationView {
    OperationView {
        id: operation.id,
        date: operation.date,
        kind: map_kind(operation.kind),
        usd_minor: operation.usd.cents(),
        pen_minor: operation.pen.cents(),
        rate: operation.rate.to_string(),
        profit_minor: operation.profit.cents(),
        blocks_used: block_views(&operation.blocks_used),
        acquisition_rate: operation.acquisition_rate().map(|rate| rate.to_string()),
        deleted_at: operation.deleted_at,
    }
}

fn trade_cmd(account: String, payload: &TradeNew) -> Result<TradeCmd, ServerError> {
    let occurred_at = payload
        .occurred_at
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);
    let mut cmd = TradeCmd::new(account, Money::new(payload.usd_minor), occurred_at);
    if let Some(rate) = parse_optional_rate(payload.rate.as_deref())? {
        cmd = cmd.rate(rate);
    }
    Ok(cmd)
}

/// Register a purchase of dollars
pub async fn purchase(
    Path(account): Path<String>,
    State(state): State<ServerState>,
    Json(payload): Json<TradeNew>,
) -> Result<(StatusCode, Json<OperationView>), ServerError> {
    let cmd = trade_cmd(account, &payload)?;
    let operation = state.engine.register_purchase(cmd).await?;
    Ok((StatusCode::CREATED, Json(operation_view(&operation))))
}

/// Register a sale of dollars
pub async fn sale(
    Path(account): Path<String>,
    State(state): State<ServerState>,
    Json(payload): Json<TradeNew>,
) -> Result<(StatusCode, Json<OperationView>), ServerError> {
    let cmd = trade_cmd(account, &payload)?;
    let operation = state.engine.register_sale(cmd).await?;
    Ok((StatusCode::CREATED, Json(operation_view(&operation))))
}

/// Price a sale without recording it
pub async fn quote(
    Path(account): Path<String>,
    State(state): State<ServerState>,
    Json(payload): Json<SaleQuoteRequest>,
) -> Result<Json<SaleQuoteView>, ServerError> {
    let rate = parse_optional_rate(payload.rate.as_deref())?;
    let quote = state
        .engine
        .quote_sale(&account, Money::new(payload.usd_minor), rate)
        .await?;

    Ok(Json(SaleQuoteView {
        usd_minor: quote.usd.cents(),
        rate: quote.rate.to_string(),
        pen_minor: quote.pen.cents(),
        cost_minor: quote.cost.cents(),
        profit_minor: quote.profit.cents(),
        shortfall_minor: quote.shortfall.cents(),
        blocks: block_views(&quote.blocks),
    }))
}

fn period(query: &OperationList) -> Result<Period, ServerError> {
    let period = match query.period.unwrap_or_default() {
        PeriodKind::All => Period::All,
        PeriodKind::Day => Period::Day,
        PeriodKind::Week => Period::Week,
        PeriodKind::Month => Period::Month,
        PeriodKind::Year => Period::Year,
        PeriodKind::Date => {
            let date = query
                .date
                .ok_or_else(|| ServerError::Generic("date required".to_string()))?;
            Period::On(date)
        }
    };
    Ok(period)
}

/// List the live history, newest first
pub async fn list(
    Path(account): Path<String>,
    State(state): State<ServerState>,
    Query(query): Query<OperationList>,
) -> Result<Json<OperationListResponse>, ServerError> {
    // A bare `date` is shorthand for `period=date`.
    let period = match (query.period, query.date) {
        (None, Some(date)) => Period::On(date),
        _ => period(&query)?,
    };
    let mut filter = OperationFilter::default().period(period);
    filter.limit = query.limit;
    filter.offset = query.offset;

    let operations = state
        .engine
        .list_operations(&account, &filter, Utc::now())
        .await?;

    Ok(Json(OperationListResponse {
        operations: operations.iter().map(operation_view).collect(),
    }))
}

/// Get one operation, live or trashed
pub async fn get(
    Path((account, id)): Path<(String, Uuid)>,
    State(state): State<ServerState>,
) -> Result<Json<OperationView>, ServerError> {
    let operation = state.engine.operation(&account, id).await?;
    Ok(Json(operation_view(&operation)))
}

/// Edit an operation; the account history is replayed
pub async fn update(
    Path((account, id)): Path<(String, Uuid)>,
    State(state): State<ServerState>,
    Json(payload): Json<OperationUpdate>,
) -> Result<Json<OperationView>, ServerError> {
    let mut edit = OperationEdit::default();
    if let Some(date) = payload.date {
        edit = edit.date(date.with_timezone(&Utc));
    }
    if let Some(kind) = payload.kind {
        edit = edit.kind(map_api_kind(kind));
    }
    if let Some(usd_minor) = payload.usd_minor {
        edit = edit.usd(Money::new(usd_minor));
    }
    if let Some(rate) = parse_optional_rate(payload.rate.as_deref())? {
        edit = edit.rate(rate);
    }

    let operation = state.engine.edit_operation(&account, id, &edit).await?;
    Ok(Json(operation_view(&operation)))
}

/// Printable receipt as plain text
pub async fn receipt(
    Path((account, id)): Path<(String, Uuid)>,
    State(state): State<ServerState>,
) -> Result<String, ServerError> {
    Ok(state.engine.receipt(&account, id).await?)
}
