use analytics_agent_cli::{api_client::ApiClient, completions, interactive, oneshot, DEFAULT_SERVER_URL};
use clap::{CommandFactory, Parser};

#[derive(Parser)]
#[command(name = "analytics")]
#[command(about = "Analytics agent CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Query (one-shot mode)
    query: Option<String>,

    /// Analytics agent server URL
    #[arg(long, env = "ANALYTICS_AGENT_URL", default_value = DEFAULT_SERVER_URL)]
    server_url: String,

    /// User id sent with every query
    #[arg(long)]
    user_id: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG")]
    log_level: Option<String>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    analytics_agent_common::init_tracing_with_level(cli.log_level.as_deref().unwrap_or("warn"))?;

    match cli.command {
        Some(Commands::Completions { shell }) => {
            completions::generate(shell, Cli::command());
        }
        None => {
            let client = ApiClient::new(&cli.server_url);
            if let Some(query) = cli.query {
                oneshot::execute(&client, &query, cli.user_id.as_deref()).await?;
            } else {
                interactive::run(&client, cli.user_id.as_deref()).await?;
            }
        }
    }

    Ok(())
}
