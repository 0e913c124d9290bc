use pollmcp_cli::{CliError, PollingClient};
use serde_json::{Value, json};

pub async fn initialize(client: &PollingClient, client_name: &str) -> Result<Value, CliError> {
    let (result, session_id) = client.initialize(client_name).await?;
    Ok(json!({
        "session_id": session_id,
        "result": result,
    }))
}

pub async fn ping(client: &PollingClient) -> Result<Value, CliError> {
    client.ping().await?;
    Ok(json!({ "status": "accepted" }))
}

/// Show the current level, or set it when `level` is given.
pub async fn log_level(client: &PollingClient, level: Option<&str>) -> Result<Value, CliError> {
    let response = match level {
        Some(level) => client.set_log_level(level).await?,
        None => client.get_log_level().await?,
    };
    Ok(json!(response))
}
