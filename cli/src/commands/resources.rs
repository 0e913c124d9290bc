use clap::Subcommand;
use pollmcp_cli::{CliError, PollingClient};
use serde_json::{Value, json};

#[derive(Subcommand)]
pub enum ResourceCommands {
    /// List known resources
    List,
    /// List resource templates
    Templates,
    /// Read one resource
    Read {
        /// Resource URI, e.g. test://static/resource/1
        uri: String,
    },
    /// Receive update notifications for a resource (see `listen`)
    Subscribe { uri: String },
    /// Stop receiving update notifications for a resource
    Unsubscribe { uri: String },
}

pub async fn run(client: &PollingClient, command: ResourceCommands) -> Result<Value, CliError> {
    match command {
        ResourceCommands::List => Ok(json!(client.list_resources().await?)),
        ResourceCommands::Templates => Ok(json!(client.list_resource_templates().await?)),
        ResourceCommands::Read { uri } => Ok(json!(client.read_resource(&uri).await?)),
        ResourceCommands::Subscribe { uri } => {
            client.subscribe_resource(&uri).await?;
            Ok(json!({ "subscribed": uri }))
        }
        ResourceCommands::Unsubscribe { uri } => {
            client.unsubscribe_resource(&uri).await?;
            Ok(json!({ "unsubscribed": uri }))
        }
    }
}
