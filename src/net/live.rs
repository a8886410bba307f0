use reqwest::Client;
use serde_json::Value;

use super::client::endpoint;
use crate::core::BoardError;

/// One `/live` poll. The payload is returned raw; batch parsing is lenient
/// and happens on the display thread.
pub async fn fetch_live(client: &Client, base_url: &str) -> Result<Value, BoardError> {
    let url = endpoint(base_url, "live");
    let value =
        client.get(&url).send().await?.error_for_status()?.json::<Value>().await?;
    Ok(value)
}

/// Reads the `/live/stream` SSE feed, invoking `on_batch` for every decoded
/// `data:` payload. Returns when the server closes the stream or the
/// connection drops; the caller reconnects.
pub async fn stream_live<F: FnMut(Value)>(
    client: &Client,
    base_url: &str,
    mut on_batch: F,
) -> Result<(), BoardError> {
    let url = endpoint(base_url, "live/stream");
    let mut response = client.get(&url).send().await?.error_for_status()?;

    let mut buffer = String::new();
    while let Some(chunk) = response.chunk().await? {
        buffer.push_str(&String::from_utf8_lossy(&chunk));

        // SSE events are separated by a blank line
        while let Some(boundary) = buffer.find("\n\n") {
            let event: String = buffer[..boundary].to_string();
            buffer.drain(..boundary + 2);

            for line in event.lines() {
                if let Some(data) = line.strip_prefix("data:") {
                    match serde_json::from_str::<Value>(data.trim_start()) {
                        Ok(value) => on_batch(value),
                        Err(e) => eprintln!("Skipping undecodable stream event: {}", e),
                    }
                }
            }
        }
    }
    Ok(())
}
