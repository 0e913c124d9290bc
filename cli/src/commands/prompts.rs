use clap::Subcommand;
use pollmcp_cli::util::parse_json_object;
use pollmcp_cli::{CliError, PollingClient};
use serde_json::{Value, json};

#[derive(Subcommand)]
pub enum PromptCommands {
    /// List available prompts
    List,
    /// Render a prompt with arguments
    Get {
        /// Prompt name
        name: String,
        /// Prompt arguments as a JSON object, e.g. '{"name":"Ada"}'
        #[arg(long)]
        args: Option<String>,
    },
}

pub async fn run(client: &PollingClient, command: PromptCommands) -> Result<Value, CliError> {
    match command {
        PromptCommands::List => Ok(json!(client.list_prompts().await?)),
        PromptCommands::Get { name, args } => {
            let arguments = parse_json_object("--args", args.as_deref())?;
            Ok(json!(client.get_prompt(&name, &arguments).await?))
        }
    }
}
