use std::{sync::Arc, time::Duration};

use chrono::Utc;
use engine::Engine;

/// Periodically purges trashed operations past their retention.
pub async fn sweep_trash(engine: Arc<Engine>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        match engine.purge_expired_trash(Utc::now()).await {
            Ok(0) => {}
            Ok(purged) => tracing::info!("purged {purged} expired operations from trash"),
            Err(err) => tracing::warn!("trash sweep failed: {err}"),
        }
    }
}
