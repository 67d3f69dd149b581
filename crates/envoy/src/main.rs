mod ui;

use anyhow::Result;
use clap::{Parser, Subcommand};
use prismchat_envoy::config::Config;
use prismchat_envoy::{ApiClient, ConversationController};
use prismchat_shared::RouteMode;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "envoy")]
#[command(about = "Terminal client for PrismChat", version)]
struct Cli {
    /// Backend base URL for this run, e.g. http://localhost:8000
    #[arg(long, global = true, value_name = "URL")]
    server: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat (default)
    Chat {
        #[arg(long)]
        route: Option<RouteMode>,
    },

    /// List conversations, newest first
    List,

    /// Print the messages of one conversation
    Show { id: String },

    /// Send a single message and print the reply
    Send {
        text: String,

        /// Image to attach; repeat for several
        #[arg(long = "image", value_name = "PATH")]
        images: Vec<PathBuf>,

        #[arg(long)]
        route: Option<RouteMode>,

        /// Continue an existing conversation instead of starting one
        #[arg(long, value_name = "ID")]
        conversation: Option<String>,
    },

    /// Show or change the stored configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Set {
        #[command(subcommand)]
        key: ConfigKey,
    },
}

#[derive(Subcommand)]
enum ConfigKey {
    /// Backend base URL
    Server { url: String },
    /// Default route for new sessions
    Route { route: RouteMode },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            return Err(e);
        }
    };

    let server_url = cli.server.unwrap_or(config.server_url);
    let client = ApiClient::new(server_url);

    match cli.command.unwrap_or(Commands::Chat { route: None }) {
        Commands::Chat { route } => {
            if !client.health().await {
                eprintln!("PrismChat backend at {} is not reachable.", client.base_url());
                eprintln!("Is prismchat-engine running?");
            }
            let controller =
                ConversationController::with_route(client, route.unwrap_or(config.route));
            ui::interactive_chat(&controller).await?;
        }
        Commands::List => {
            let controller = ConversationController::new(client);
            ui::list_conversations(&controller).await?;
        }
        Commands::Show { id } => {
            let controller = ConversationController::new(client);
            ui::show_conversation(&controller, &id).await?;
        }
        Commands::Send {
            text,
            images,
            route,
            conversation,
        } => {
            let controller =
                ConversationController::with_route(client, route.unwrap_or(config.route));
            ui::single_message(&controller, text, images, conversation).await?;
        }
        Commands::Config { action } => run_config(action)?,
    }

    Ok(())
}

fn run_config(action: Option<ConfigAction>) -> Result<()> {
    let mut config = Config::load_stored()?;

    match action {
        None => {
            println!("Current config:");
            println!("  Server URL: {}", config.server_url);
            println!("  Route: {}", config.route);
        }
        Some(ConfigAction::Set { key }) => match key {
            ConfigKey::Server { url } => {
                config.server_url = url.trim().trim_end_matches('/').to_string();
                config.save()?;
                println!("Server URL updated to: {}", config.server_url);
            }
            ConfigKey::Route { route } => {
                config.route = route;
                config.save()?;
                println!("Default route updated to: {}", config.route);
            }
        },
    }

    Ok(())
}
