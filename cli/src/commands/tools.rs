use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use clap::Subcommand;
use pollmcp_cli::util::parse_json_object;
use pollmcp_cli::{CliError, ClientPoller, DefaultRequestHandler, PollingClient};
use pollmcp_core::tools::ToolKind;
use serde_json::{Value, json};

#[derive(Subcommand)]
pub enum ToolCommands {
    /// List tools and their execution kind
    List,
    /// Call a tool and print its result
    Call {
        /// Tool name, e.g. getCurrentWeather
        name: String,
        /// Tool arguments as a JSON object, e.g. '{"location":"Oslo"}'
        #[arg(long)]
        args: Option<String>,
        /// Treat the tool as long-running even if the server lists it as standard
        #[arg(long)]
        long_running: bool,
    },
}

pub async fn run(
    client: PollingClient,
    poll_interval: Duration,
    command: ToolCommands,
) -> Result<Value, CliError> {
    match command {
        ToolCommands::List => Ok(json!(client.list_tools().await?)),
        ToolCommands::Call {
            name,
            args,
            long_running,
        } => {
            let arguments = parse_json_object("--args", args.as_deref())?;
            let long_running = long_running || listed_as_long_running(&client, &name).await?;

            // Long-running tools may ask questions while they run, so the
            // poller has to be answering requests before the call starts.
            let handler = Arc::new(DefaultRequestHandler::new(std::io::stdin().is_terminal()));
            let (poller, mut notifications) =
                ClientPoller::spawn(Arc::new(client), handler, poll_interval);
            let drain = tokio::spawn(async move {
                while let Some(notification) = notifications.recv().await {
                    tracing::info!(method = %notification.method(), "notification while waiting");
                }
            });

            let result = poller.call_tool(&name, arguments, long_running).await;
            poller.shutdown().await;
            drain.abort();
            Ok(json!(result?))
        }
    }
}

async fn listed_as_long_running(client: &PollingClient, name: &str) -> Result<bool, CliError> {
    let listed = client.list_tools().await?;
    Ok(listed
        .tools
        .iter()
        .any(|tool| tool.name == name && tool.kind == ToolKind::LongRunning))
}
