use reqwest::Client;

use super::client::endpoint;
use crate::core::{
    BoardError,
    SessionStatus,
};

pub async fn fetch_status(client: &Client, base_url: &str) -> Result<SessionStatus, BoardError> {
    let url = endpoint(base_url, "session/status");
    let status =
        client.get(&url).send().await?.error_for_status()?.json::<SessionStatus>().await?;
    Ok(status)
}
