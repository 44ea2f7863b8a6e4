//! Reference rate feed.
//!
//! Polls a public exchange-rate API and broadcasts the official rate to
//! every desk account, only while the update window is open.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use chrono_tz::Tz;
use engine::{Engine, Rate, UpdateWindow};
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, Result};

#[derive(Debug, Deserialize)]
struct FeedResponse {
    #[serde(default)]
    rates: serde_json::Map<String, Value>,
}

/// Extracts `rates.<currency>` from a feed body.
pub fn parse_feed(body: &str, currency: &str) -> Result<Rate> {
    let response: FeedResponse = serde_json::from_str(body)?;
    let value = response
        .rates
        .get(currency)
        .and_then(Value::as_f64)
        .ok_or_else(|| AppError::Feed(format!("no {currency} rate in feed")))?;
    Rate::from_f64_rounded(value)
        .ok_or_else(|| AppError::Feed(format!("invalid {currency} rate {value}")))
}

#[derive(Debug, Clone)]
pub struct RateFeed {
    url: Url,
    currency: String,
    http: reqwest::Client,
}

impl RateFeed {
    pub fn new(url: &str, currency: &str) -> Result<Self> {
        let url =
            Url::parse(url).map_err(|err| AppError::Feed(format!("invalid feed_url: {err}")))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            url,
            currency: currency.to_string(),
            http,
        })
    }

    pub async fn fetch(&self) -> Result<Rate> {
        let body = self
            .http
            .get(self.url.clone())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_feed(&body, &self.currency)
    }
}

/// Runs forever. Failed fetches are logged and retried on the next tick.
pub async fn poll(
    feed: RateFeed,
    engine: Arc<Engine>,
    window: UpdateWindow,
    timezone: Tz,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;

        let now = Utc::now();
        if !window.contains(&now.with_timezone(&timezone)) {
            tracing::debug!("outside update window, skipping rate poll");
            continue;
        }

        let rate = match feed.fetch().await {
            Ok(rate) => rate,
            Err(err) => {
                tracing::warn!("rate feed failed: {err}");
                continue;
            }
        };

        match engine.apply_official_rate(rate, now).await {
            Ok(accounts) => tracing::info!("official rate {rate} applied to {accounts} accounts"),
            Err(err) => tracing::warn!("failed to apply official rate {rate}: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "result": "success",
        "base_code": "USD",
        "rates": { "USD": 1, "PEN": 3.7168, "EUR": 0.92 }
    }"#;

    #[test]
    fn picks_the_configured_currency() {
        assert_eq!(parse_feed(BODY, "PEN").unwrap(), "3.72".parse().unwrap());
        assert_eq!(parse_feed(BODY, "EUR").unwrap(), "0.92".parse().unwrap());
    }

    #[test]
    fn missing_currency_is_a_feed_error() {
        assert!(matches!(parse_feed(BODY, "CLP"), Err(AppError::Feed(_))));
        assert!(matches!(
            parse_feed(r#"{"result":"error"}"#, "PEN"),
            Err(AppError::Feed(_))
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(parse_feed("<html>", "PEN"), Err(AppError::Json(_))));
        assert!(matches!(
            parse_feed(r#"{"rates":{"PEN":-1}}"#, "PEN"),
            Err(AppError::Feed(_))
        ));
    }

    #[test]
    fn feed_url_must_parse() {
        assert!(RateFeed::new("not a url", "PEN").is_err());
        assert!(RateFeed::new("https://open.er-api.com/v6/latest/USD", "PEN").is_ok());
    }
}
