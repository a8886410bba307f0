use reqwest::{
    header::{
        ETAG,
        IF_NONE_MATCH,
        RETRY_AFTER,
    },
    Client,
    StatusCode,
};

use super::client::endpoint;
use crate::{
    core::{
        BoardError,
        SummarySession,
    },
    summary::FetchOutcome,
};

/// Conditional fetch of the aggregate snapshot. Every failure mode maps to
/// a `FetchOutcome`; nothing here is fatal.
pub async fn fetch_summary(
    client: &Client,
    base_url: &str,
    validator: Option<&str>,
) -> FetchOutcome {
    match try_fetch(client, base_url, validator).await {
        Ok(outcome) => outcome,
        Err(e) => FetchOutcome::TransportError(e.to_string()),
    }
}

async fn try_fetch(
    client: &Client,
    base_url: &str,
    validator: Option<&str>,
) -> Result<FetchOutcome, BoardError> {
    let url = endpoint(base_url, "summary/data");

    let mut request = client.get(&url);
    if let Some(tag) = validator {
        request = request.header(IF_NONE_MATCH, tag);
    }
    let response = request.send().await?;

    match response.status() {
        StatusCode::NO_CONTENT => {
            let retry_after_s = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            Ok(FetchOutcome::Pending { retry_after_s })
        }
        StatusCode::NOT_MODIFIED => Ok(FetchOutcome::NotModified),
        StatusCode::OK => {
            let etag = response
                .headers()
                .get(ETAG)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let payload = response.json::<serde_json::Value>().await?;
            let mut snapshot = SummarySession::from_wire(&payload);
            snapshot.etag = etag;
            Ok(FetchOutcome::Snapshot(snapshot))
        }
        status => Ok(FetchOutcome::TransportError(format!("HTTP {} from {}", status, url))),
    }
}

/// Fire-and-forget nudge for the server to materialize a fresh snapshot.
/// Failure only gets a log line; the poll loop is the real driver.
pub async fn prime_summary(client: &Client, base_url: &str) {
    let url = endpoint(base_url, "summary/refresh");
    if let Err(e) = client.get(&url).send().await {
        eprintln!("Summary warmup request failed: {}", e);
    }
}
