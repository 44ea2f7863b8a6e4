use axum::{
    Router,
    routing::{get, post},
};

use std::sync::Arc;

use crate::{ledger, operations, rates, statistics, trash};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

/// All routes are scoped to one desk account.
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route(
            "/accounts/{account}/rates",
            get(rates::get).put(rates::update),
        )
        .route("/accounts/{account}/purchases", post(operations::purchase))
        .route("/accounts/{account}/sales", post(operations::sale))
        .route("/accounts/{account}/sales/quote", post(operations::quote))
        .route("/accounts/{account}/operations", get(operations::list))
        .route(
            "/accounts/{account}/operations/{id}",
            get(operations::get)
                .patch(operations::update)
                .delete(trash::trash_operation),
        )
        .route(
            "/accounts/{account}/operations/{id}/receipt",
            get(operations::receipt),
        )
        .route("/accounts/{account}/ledger", get(ledger::get))
        .route("/accounts/{account}/ledger/rebuild", post(ledger::rebuild))
        .route(
            "/accounts/{account}/trash",
            get(trash::list).delete(trash::empty),
        )
        .route(
            "/accounts/{account}/trash/{id}",
            axum::routing::delete(trash::delete),
        )
        .route(
            "/accounts/{account}/trash/{id}/restore",
            post(trash::restore),
        )
        .route("/accounts/{account}/stats", get(statistics::get_stats))
        .with_state(state)
}

pub async fn run_with_listener(
    engine: Arc<Engine>,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState { engine };

    axum::serve(listener, router(state)).await
}
