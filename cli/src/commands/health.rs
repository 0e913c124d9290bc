use pollmcp_cli::{CliError, PollingClient};
use serde_json::Value;

pub async fn run(client: &PollingClient) -> Result<Value, CliError> {
    client.health().await
}
