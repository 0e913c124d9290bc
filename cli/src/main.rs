mod commands;

use std::time::Duration;

use clap::{Parser, Subcommand};
use pollmcp_cli::PollingClient;
use pollmcp_cli::util::{exit_error, finish};
use tracing_subscriber::EnvFilter;

use commands::prompts::PromptCommands;
use commands::resources::ResourceCommands;
use commands::tools::ToolCommands;

#[derive(Parser)]
#[command(
    name = "pollmcp",
    version,
    about = "Client for MCP servers reachable only through plain HTTP polling"
)]
struct Cli {
    /// Server base URL
    #[arg(long, env = "POLLMCP_SERVER_URL", default_value = "http://localhost:3000")]
    server_url: String,

    /// How often the background poller checks for server traffic
    #[arg(long, env = "POLLMCP_POLL_INTERVAL_MS", default_value_t = 2000)]
    poll_interval_ms: u64,

    /// Log poller activity to stderr
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server health and queue depths
    Health,
    /// Start a session and show server capabilities
    Initialize {
        /// Client name reported to the server
        #[arg(long, default_value = "pollmcp-cli")]
        client_name: String,
    },
    /// Liveness check
    Ping,
    /// Tool operations
    Tools {
        #[command(subcommand)]
        command: ToolCommands,
    },
    /// Resource operations
    Resources {
        #[command(subcommand)]
        command: ResourceCommands,
    },
    /// Prompt operations
    Prompts {
        #[command(subcommand)]
        command: PromptCommands,
    },
    /// Show the server log level, or set it
    LogLevel {
        /// New level, e.g. debug or warning
        level: Option<String>,
    },
    /// Print server notifications and answer server requests until Ctrl-C
    Listen,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.poll_interval_ms == 0 {
        exit_error(
            "--poll-interval-ms must be greater than zero",
            Some("Set --poll-interval-ms or POLLMCP_POLL_INTERVAL_MS, e.g. 2000"),
        );
    }
    let poll_interval = Duration::from_millis(cli.poll_interval_ms);

    let client = match PollingClient::new(&cli.server_url) {
        Ok(client) => client,
        Err(e) => exit_error(
            &e.to_string(),
            Some("Set --server-url or POLLMCP_SERVER_URL, e.g. http://localhost:3000"),
        ),
    };

    let result = match cli.command {
        Commands::Health => commands::health::run(&client).await,
        Commands::Initialize { client_name } => {
            commands::session::initialize(&client, &client_name).await
        }
        Commands::Ping => commands::session::ping(&client).await,
        Commands::Tools { command } => commands::tools::run(client, poll_interval, command).await,
        Commands::Resources { command } => commands::resources::run(&client, command).await,
        Commands::Prompts { command } => commands::prompts::run(&client, command).await,
        Commands::LogLevel { level } => {
            commands::session::log_level(&client, level.as_deref()).await
        }
        Commands::Listen => commands::listen::run(client, poll_interval).await,
    };

    std::process::exit(finish(result));
}
