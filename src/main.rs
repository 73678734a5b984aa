//! TextData client CLI
//!
//! Small command-line front end over the client core: query autocomplete,
//! try mention auto-linking on a piece of text, or hold a realtime session
//! open and print incoming notifications.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use textdata_core::{
    editor::MENTION_HINT,
    error::{Result, TextdataError},
    session::FileTokenStore,
    ClientConfig, HttpSuggestionClient, LinkBuilder, MentionLinker, SessionConfig, SessionSocket,
    SessionTokens, SuggestionPanel, SuggestionSource, WsConnector,
};
use tracing::{debug, info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "textdata")]
#[command(about = "TextData client: autocomplete, mention linking and realtime notifications", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML config file
    #[arg(long, env = "TEXTDATA_CONFIG")]
    config: Option<PathBuf>,

    /// Primary auth token (defaults to the stored `token` cookie)
    #[arg(long, env = "TEXTDATA_TOKEN")]
    token: Option<String>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Query the autocomplete endpoint
    Suggest {
        /// Search terms
        query: String,

        /// Number of suggestions to request
        #[arg(long)]
        topn: Option<usize>,
    },

    /// Run mention auto-linking over a piece of text
    Link {
        /// Editor text containing a [[term]] marker
        #[arg(short, long)]
        text: String,

        /// Apply the suggestion at this index (0-based)
        #[arg(short, long)]
        pick: Option<usize>,
    },

    /// Open a realtime session and print notifications
    Listen {
        /// Stop after this many seconds (runs until Ctrl-C otherwise)
        #[arg(long)]
        seconds: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Keep tungstenite and hyper quiet unless asked for
    let filter = EnvFilter::new(format!(
        "textdata={lvl},textdata_core={lvl},tungstenite=warn,hyper=warn",
        lvl = level.as_str().to_lowercase()
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    debug!("TextData v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::load_from(cli.config.as_deref())?;
    let tokens = Arc::new(SessionTokens::new(FileTokenStore::open(
        config.token_file_path()?,
    )?));

    if let Some(token) = &cli.token {
        tokens.set_primary(token, None)?;
    }
    let primary = tokens.primary();

    match cli.command {
        Commands::Suggest { query, topn } => {
            let client = HttpSuggestionClient::new(&config)?;
            client.set_token(primary);

            let suggestions = client.autocomplete(&query, topn).await?;
            if suggestions.is_empty() {
                println!("No suggestions for {:?}", query);
            }
            for (i, suggestion) in suggestions.iter().enumerate() {
                println!("{:>2}. {} ({})", i, suggestion.label, suggestion.id);
            }
        }

        Commands::Link { text, pick } => {
            let client = HttpSuggestionClient::new(&config)?;
            client.set_token(primary);

            let mut linker = MentionLinker::new(
                LinkBuilder::new(&config.website_url),
                config.autocomplete_topn,
            );

            match linker.on_text_changed(text, &client).await {
                SuggestionPanel::Hint => println!("{}", MENTION_HINT),
                SuggestionPanel::Suggestions(list) => {
                    for (i, suggestion) in list.iter().enumerate() {
                        println!("{:>2}. {} ({})", i, suggestion.label, suggestion.id);
                    }
                }
            }

            if let Some(index) = pick {
                match linker.apply_index(index) {
                    Some(new_text) => println!("\n{}", new_text),
                    None => {
                        return Err(TextdataError::InvalidOperation(format!(
                            "no suggestion at index {}",
                            index
                        )))
                    }
                }
            }
        }

        Commands::Listen { seconds } => {
            let token = primary.ok_or_else(|| {
                TextdataError::InvalidOperation(
                    "no auth token; pass --token or set TEXTDATA_TOKEN".to_string(),
                )
            })?;

            let socket = SessionSocket::spawn(
                SessionConfig::from(&config),
                Arc::new(WsConnector::new()),
                tokens.clone(),
            )
            .await?;
            let mut notifications = socket.subscribe();

            socket.login(token)?;

            let deadline = async {
                match seconds {
                    Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
                    None => std::future::pending::<()>().await,
                }
            };
            tokio::pin!(deadline);

            loop {
                tokio::select! {
                    received = notifications.recv() => match received {
                        Ok(notification) => println!("🔔 {}", notification.notify_msg),
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            debug!("Skipped {} notifications", n);
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    },
                    _ = tokio::signal::ctrl_c() => {
                        info!("Interrupted");
                        break;
                    }
                    _ = &mut deadline => break,
                }
            }

            socket.logout()?;
            socket
                .wait_for(textdata_core::ConnectionState::Closed, Duration::from_secs(2))
                .await?;
            socket.shutdown().await;
        }
    }

    Ok(())
}
