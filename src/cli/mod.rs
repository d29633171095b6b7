//! Command-line interface parsing and dispatch.

use std::error::Error;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::api::client::ChatClient;
use crate::auth::{AuthManager, ENV_API_KEY};
use crate::core::config::{Config, ENV_BASE_URL};
use crate::core::session::{Session, DEFAULT_SYSTEM_PROMPT};
use crate::ui::chat_loop::run_chat;

#[derive(Parser)]
#[command(name = "mmchat")]
#[command(about = "A terminal chat client for multimodal AI endpoints")]
#[command(
    long_about = "mmchat is a terminal chat client for chat-completions endpoints that \
understand text, images, and audio. Attachments are staged per turn and sent \
inline as data URIs; the full reply is awaited before display.\n\n\
Authentication:\n\
  Use 'mmchat auth' to store the API key in your system keyring, or set the \
MMCHAT_API_KEY environment variable.\n\n\
Environment Variables:\n\
  MMCHAT_API_KEY    API key for the endpoint (fallback when no keyring entry)\n\
  MMCHAT_BASE_URL   Endpoint base URL (overrides the config file)\n\n\
Chat commands:\n\
  /attach <path>    Stage a local image or audio file for the next turn\n\
  /fetch <url>      Fetch and stage an image or audio file from a URL\n\
  /system [prompt]  Show or replace the system prompt\n\
  /clear            Clear the conversation"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model identifier to request (optional for pinned deployments)
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Endpoint base URL (overrides config and environment)
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// Store an API key in the system keyring
    Auth,
    /// Remove the stored API key
    Deauth,
    /// Set a configuration value, or show all values
    Set {
        /// Configuration key to set
        key: Option<String>,
        /// Value for the key (can be multiple words)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Option<Vec<String>>,
    },
    /// Unset a configuration value
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Auth => {
            if let Err(e) = AuthManager::new().interactive_auth() {
                eprintln!("❌ Authentication failed: {e}");
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Deauth => {
            if let Err(e) = AuthManager::new().interactive_deauth() {
                eprintln!("❌ Deauthentication failed: {e}");
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Set { key, value } => {
            let mut config = Config::load()?;
            let Some(key) = key else {
                config.print_all();
                return Ok(());
            };
            let value = value.map(|v| v.join(" ")).unwrap_or_default();
            if value.is_empty() {
                config.print_all();
                return Ok(());
            }
            match config.set_value(&key, &value) {
                Ok(()) => {
                    config.save()?;
                    println!("✅ Set {key} to: {value}");
                }
                Err(e) => {
                    eprintln!("❌ {e}");
                    std::process::exit(1);
                }
            }
            Ok(())
        }
        Commands::Unset { key } => {
            let mut config = Config::load()?;
            match config.unset_value(&key) {
                Ok(()) => {
                    config.save()?;
                    println!("✅ Unset {key}");
                }
                Err(e) => {
                    eprintln!("❌ {e}");
                    std::process::exit(1);
                }
            }
            Ok(())
        }
        Commands::Chat => run_chat_command(args.model, args.base_url).await,
    }
}

async fn run_chat_command(
    model: Option<String>,
    base_url_flag: Option<String>,
) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;

    let Some(base_url) = config.resolve_base_url(base_url_flag.as_deref()) else {
        eprintln!("❌ No endpoint configured.");
        eprintln!("💡 Quick fixes:");
        eprintln!("  • mmchat set base-url <URL>");
        eprintln!("  • export {ENV_BASE_URL}=<URL>");
        std::process::exit(2);
    };

    let Some(api_key) = AuthManager::new().resolve_token() else {
        eprintln!("❌ No API key found.");
        eprintln!("💡 Quick fixes:");
        eprintln!("  • mmchat auth");
        eprintln!("  • export {ENV_API_KEY}=<key>");
        std::process::exit(2);
    };

    let http = reqwest::Client::new();
    let client = ChatClient::new(http.clone(), base_url, api_key)
        .with_model(model.or_else(|| config.model.clone()))
        .with_sampling(
            config.temperature.unwrap_or(crate::api::DEFAULT_TEMPERATURE),
            config.top_p.unwrap_or(crate::api::DEFAULT_TOP_P),
            config.max_tokens.unwrap_or(crate::api::DEFAULT_MAX_TOKENS),
        );

    let session = Session::new(
        config
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
    );

    run_chat(client, http, session).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_chat_subcommand() {
        let args = Args::try_parse_from(["mmchat"]).unwrap();
        assert!(args.command.is_none());
        assert!(args.model.is_none());
    }

    #[test]
    fn global_flags_parse_with_and_without_subcommand() {
        let args = Args::try_parse_from(["mmchat", "-m", "phi-4", "--base-url", "https://x/v1"])
            .unwrap();
        assert_eq!(args.model.as_deref(), Some("phi-4"));
        assert_eq!(args.base_url.as_deref(), Some("https://x/v1"));

        let args = Args::try_parse_from(["mmchat", "chat", "-m", "phi-4"]).unwrap();
        assert!(matches!(args.command, Some(Commands::Chat)));
        assert_eq!(args.model.as_deref(), Some("phi-4"));
    }

    #[test]
    fn set_accepts_multi_word_values() {
        let args =
            Args::try_parse_from(["mmchat", "set", "system-prompt", "Be", "terse."]).unwrap();
        match args.command {
            Some(Commands::Set { key, value }) => {
                assert_eq!(key.as_deref(), Some("system-prompt"));
                assert_eq!(value.unwrap().join(" "), "Be terse.");
            }
            _ => panic!("expected set subcommand"),
        }
    }
}
