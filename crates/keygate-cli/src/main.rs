//! Keygate CLI - operator command-line interface
//!
//! Usage:
//!   keygate migrate
//!   keygate hash-password <password>
//!   keygate decode-token <token>
//!   keygate show-config

use anyhow::Context;
use clap::{Parser, Subcommand};
use keygate_api::auth::{hash_password, PasswordConfig, TokenCodec};
use keygate_core::config::AppConfig;
use keygate_core::{PgUserDirectory, SystemClock};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "keygate")]
#[command(about = "Keygate authentication service operator CLI")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to $KEYGATE_CONFIG, then environment only)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the users table in the configured PostgreSQL database
    Migrate,
    /// Print an Argon2id hash of a password
    HashPassword {
        /// Plaintext password
        password: String,
    },
    /// Verify a token with the configured keys and print its claims
    DecodeToken {
        /// Encoded token
        token: String,
    },
    /// Print the effective configuration as TOML
    ShowConfig,
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::load()?,
    };
    Ok(config)
}

fn render_config(config: &AppConfig) -> anyhow::Result<String> {
    toml::to_string_pretty(config).context("failed to serialize configuration")
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config)?;

    match cli.command {
        Commands::Migrate => {
            let directory = PgUserDirectory::connect(
                &config.database.postgres_url,
                config.database.pool_size,
            )
            .await?;
            directory.migrate().await?;
            println!("Migration complete");
        }
        Commands::HashPassword { password } => {
            let params = PasswordConfig::from_settings(&config.password)?;
            println!("{}", hash_password(&password, &params)?);
        }
        Commands::DecodeToken { token } => {
            let codec = TokenCodec::from_settings(&config.jwt, Arc::new(SystemClock))?;
            let claims = codec.decode(&token)?;
            println!("{}", serde_json::to_string_pretty(&claims)?);
        }
        Commands::ShowConfig => {
            print!("{}", render_config(&config)?);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keygate_core=info,warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["keygate", "hash-password", "secret"]).unwrap();
        assert!(matches!(cli.command, Commands::HashPassword { password } if password == "secret"));

        let cli =
            Cli::try_parse_from(["keygate", "--config", "keygate.toml", "show-config"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("keygate.toml")));
        assert!(matches!(cli.command, Commands::ShowConfig));

        assert!(Cli::try_parse_from(["keygate", "decode-token"]).is_err());
    }

    #[test]
    fn test_render_config_round_trips() {
        let rendered = render_config(&AppConfig::default()).unwrap();
        assert!(rendered.contains("[jwt]"));
        assert!(rendered.contains("key_prefix = \"user_id:\""));

        let parsed: AppConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.jwt.algorithm, "RS256");
        assert_eq!(parsed.photo.topic, "faces");
    }
}
