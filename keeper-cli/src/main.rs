mod client;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use client::{parse_share_target, KeeperClient};
use secrets_keeper_types::CreateSecretRequest;
use std::io::Read;

const DEFAULT_SERVER: &str = "http://localhost:8080";

#[derive(Parser)]
#[command(name = "secrets-keeper-cli")]
#[command(about = "Share one-time secrets through a Secrets Keeper server")]
struct Cli {
    /// Server base URL
    #[arg(long, global = true, env = "SECRETS_KEEPER_SERVER")]
    server: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a secret and print its one-time token
    Create {
        /// Message to store; `-` reads stdin
        #[arg(short, long)]
        message: String,
        /// Hours until expiry; 0 never expires
        #[arg(short, long, default_value_t = 0)]
        ttl: u32,
        #[arg(short, long, conflicts_with = "ask_passphrase")]
        passphrase: Option<String>,
        /// Prompt for the passphrase without echo
        #[arg(long)]
        ask_passphrase: bool,
    },
    /// Reveal a secret; it is destroyed on success
    Retrieve {
        /// Token or share URL
        target: String,
        #[arg(short, long, conflicts_with = "ask_passphrase")]
        passphrase: Option<String>,
        #[arg(long)]
        ask_passphrase: bool,
    },
}

fn read_message(arg: String) -> anyhow::Result<String> {
    if arg != "-" {
        return Ok(arg);
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read message from stdin")?;
    Ok(buf.trim_end_matches(['\r', '\n']).to_string())
}

fn resolve_passphrase(given: Option<String>, ask: bool) -> anyhow::Result<Option<String>> {
    if !ask {
        return Ok(given);
    }
    let pass = rpassword::read_password_from_tty(Some("Passphrase: "))
        .context("Failed to read passphrase")?;
    Ok(Some(pass).filter(|p| !p.is_empty()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Create {
            message,
            ttl,
            passphrase,
            ask_passphrase,
        } => {
            let message = read_message(message)?;
            if message.is_empty() {
                bail!("Message must not be empty");
            }
            let passphrase = resolve_passphrase(passphrase, ask_passphrase)?;
            let client = KeeperClient::new(cli.server.as_deref().unwrap_or(DEFAULT_SERVER));

            let created = client
                .create(&CreateSecretRequest {
                    message,
                    ttl,
                    passphrase,
                })
                .await?;

            println!("Token:      {}", created.token);
            println!("Passphrase: {}", if created.passphrase_required { "required" } else { "none" });
            println!("Share URL:  {}", client.share_url(&created.token));
        }
        Commands::Retrieve {
            target,
            passphrase,
            ask_passphrase,
        } => {
            let (url_server, token) = parse_share_target(&target);
            let server = cli
                .server
                .or(url_server)
                .unwrap_or_else(|| DEFAULT_SERVER.to_string());
            let passphrase = resolve_passphrase(passphrase, ask_passphrase)?;

            let revealed = KeeperClient::new(&server).retrieve(&token, passphrase).await?;
            println!("{}", revealed.message);
        }
    }

    Ok(())
}
