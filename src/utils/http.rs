use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::Client;

/// User agent sent with every subscription request
pub const USER_AGENT: &str = "proxysub/0.1";

/// Accept header sent with every subscription request
pub const ACCEPT_YAML: &str = "application/yaml,text/yaml,text/plain,*/*";

/// Default timeout for HTTP requests in seconds
pub const DEFAULT_TIMEOUT: u64 = 25;

/// Build the client used for subscription downloads.
pub fn build_client(timeout: Duration) -> Result<Client, String> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| format!("Failed to build HTTP client: {}", e))
}

/// Makes a GET request and returns the body as text.
///
/// Invalid UTF-8 in the body is replaced rather than rejected. Any status
/// other than 2xx is an error.
///
/// # Arguments
/// * `client` - Client from [`build_client`], carrying the timeout and user agent
/// * `url` - The URL to request
pub async fn web_get_async(client: &Client, url: &str) -> Result<String, String> {
    let response = client
        .get(url)
        .header(ACCEPT, ACCEPT_YAML)
        .send()
        .await
        .map_err(|e| format!("Failed to send request: {}", e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(format!("HTTP error: {}", status));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| format!("Failed to read response body: {}", e))?;
    Ok(String::from_utf8_lossy(&body).into_owned())
}
