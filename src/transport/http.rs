use std::time::Duration;

use reqwest::Client;

pub const DEFAULT_USER_AGENT: &str = "RequestDesk/1.0";

/// HTTP client for the Bot API, sized for long polling and file transfers.
pub fn create_telegram_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(60))
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(60))
        .tcp_keepalive(Duration::from_secs(30))
        .user_agent(DEFAULT_USER_AGENT)
        .build()
}
