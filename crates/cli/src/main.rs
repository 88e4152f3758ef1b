use assistant::bot::{AssistantBot, TurnContext};
use assistant::channels::{ConsoleChannel, Participant, RequestContext, Turn};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "petstore-assistant")]
#[command(about = "Pet Store Assistant CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Write a default configuration file if none exists.
    Init {
        /// Config file path (default: PETSTORE_ASSISTANT_CONFIG_PATH or ~/.petstore-assistant/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Run the gateway (HTTP server and channel connectors).
    Gateway {
        /// Config file path (default: PETSTORE_ASSISTANT_CONFIG_PATH or ~/.petstore-assistant/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP port (default from config or 3978)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Chat with the assistant in this terminal (the bot runs in-process).
    Chat {
        /// Config file path (default: PETSTORE_ASSISTANT_CONFIG_PATH or ~/.petstore-assistant/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("petstore-assistant {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Gateway { config, port }) => {
            if let Err(e) = run_gateway(config, port).await {
                log::error!("gateway failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Chat { config }) => {
            if let Err(e) = run_chat(config).await {
                log::error!("chat failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(assistant::config::default_config_path);
    if assistant::config::write_default_config(&path)? {
        println!("wrote default configuration to {}", path.display());
    } else {
        println!("configuration already exists at {}", path.display());
    }
    Ok(())
}

async fn run_gateway(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, path) = assistant::config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::info!(
        "starting gateway on {}:{} (config {})",
        config.gateway.bind,
        config.gateway.port,
        path.display()
    );
    assistant::gateway::run_gateway(config).await
}

async fn run_chat(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    use std::io::{self, Write};

    let (config, _) = assistant::config::load_config(config_path)?;
    let bot = AssistantBot::from_config(&config);
    let console = ConsoleChannel::new();
    let request = RequestContext::default();
    let user = Participant::new("console-user");
    let me = Participant::new("assistant");
    let session_id = format!("console-{}", std::process::id());
    let new_turn = |text: &str| {
        Turn::new("console", "local", text, user.clone(), me.clone())
            .with_metadata("sessionid", session_id.as_str())
    };

    let joined = new_turn("");
    bot.on_members_added(
        &[me.clone(), user.clone()],
        &TurnContext::new(&joined, &request, &console),
    )
    .await;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("/exit") || input.eq_ignore_ascii_case("/quit") {
            break;
        }

        let turn = new_turn(input);
        if let Err(e) = bot
            .on_message(&TurnContext::new(&turn, &request, &console))
            .await
        {
            eprintln!("chat error: {}", e);
        }
    }

    Ok(())
}
