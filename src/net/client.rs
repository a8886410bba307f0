use std::time::Duration;

use reqwest::Client;

use crate::core::BoardError;

/// Client builder shared by every board request. Short timeout; each
/// caller has its own retry path.
pub fn http_client() -> Result<Client, BoardError> {
    Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| BoardError::Custom(format!("HTTP client build failed: {e}")))
}

pub fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::endpoint;

    #[test]
    fn endpoint_joins_without_double_slashes() {
        assert_eq!(endpoint("http://h:5000/", "/live"), "http://h:5000/live");
        assert_eq!(endpoint("http://h:5000", "live"), "http://h:5000/live");
    }
}
