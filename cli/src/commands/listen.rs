use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use pollmcp_cli::{CliError, ClientPoller, DefaultRequestHandler, PollingClient};
use serde_json::{Value, json};

/// Poll until Ctrl-C: print each server notification as one JSON line and
/// answer server requests with the default handler.
pub async fn run(client: PollingClient, poll_interval: Duration) -> Result<Value, CliError> {
    // fail fast on a wrong URL instead of logging warnings forever
    client.ping().await?;

    let handler = Arc::new(DefaultRequestHandler::new(std::io::stdin().is_terminal()));
    let (poller, mut notifications) = ClientPoller::spawn(Arc::new(client), handler, poll_interval);
    let mut received = 0usize;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            next = notifications.recv() => match next {
                Some(notification) => {
                    received += 1;
                    println!("{}", Value::from(notification));
                }
                None => break,
            },
        }
    }

    poller.shutdown().await;
    Ok(json!({ "status": "stopped", "notifications_received": received }))
}
