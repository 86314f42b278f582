use anyhow::Context;
use atoa_core::AtoaConfig;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::token::TokenKind;

/// Configuration file picked up from the working directory when no
/// `--config` is given.
const DEFAULT_CONFIG_FILE: &str = "atoa.yaml";

#[derive(Parser, Debug)]
#[command(name = "atoa", version, about = "Atoa CLI")]
struct Cli {
    /// Path to the configuration file (defaults to ./atoa.yaml if present)
    #[arg(long, global = true, env = "ATOA_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Key management
    Keys {
        #[command(subcommand)]
        cmd: KeysCommand,
    },

    /// Registration challenges (issue, sign, verify)
    Challenge {
        #[command(subcommand)]
        cmd: ChallengeCommand,
    },

    /// Organization identity cards
    Org {
        #[command(subcommand)]
        cmd: OrgCommand,
    },

    /// Agent identity cards
    Agent {
        #[command(subcommand)]
        cmd: AgentCommand,
    },

    /// Organization and agent tokens
    Token {
        #[command(subcommand)]
        cmd: TokenCommand,
    },
}

#[derive(Subcommand, Debug)]
enum KeysCommand {
    /// Generate a new ECDSA P-256 keypair
    Generate {
        /// Directory to write private.pem and public.pem into (prints to stdout otherwise)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum ChallengeCommand {
    /// Print a fresh random challenge
    New,

    /// Sign a challenge with an organization's private key
    Sign {
        /// The challenge exactly as received
        challenge: String,

        /// Private key: a PEM file path or PEM text
        #[arg(long, env = "ATOA_PRIVATE_KEY", hide_env_values = true)]
        key: Option<String>,
    },

    /// Verify a challenge signature against a public key
    Verify {
        /// The challenge that was issued
        challenge: String,

        /// Base64 DER signature returned by the organization
        signature: String,

        /// Public key: a PEM file path or PEM text
        #[arg(long, env = "ATOA_PUBLIC_KEY")]
        key: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum OrgCommand {
    /// Validate an organization card (YAML or JSON)
    Validate { file: PathBuf },
}

#[derive(Subcommand, Debug)]
enum AgentCommand {
    /// Validate an agent card (YAML or JSON)
    Validate { file: PathBuf },
}

#[derive(Subcommand, Debug)]
enum TokenCommand {
    /// Issue an organization token
    IssueOrg {
        /// Organization id
        org_id: String,

        /// Mark the organization as verified
        #[arg(long, default_value_t = false)]
        verified: bool,

        /// Platform private key: a PEM file path or PEM text
        #[arg(long, env = "ATOA_PRIVATE_KEY", hide_env_values = true)]
        key: Option<String>,

        /// Write the token to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Issue an agent token delegated from an organization token
    IssueAgent {
        /// Agent card file (YAML or JSON)
        card: PathBuf,

        /// Organization token, or a file containing it
        #[arg(long = "org-token")]
        org_token: String,

        /// Platform private key: a PEM file path or PEM text
        #[arg(long, env = "ATOA_PRIVATE_KEY", hide_env_values = true)]
        key: Option<String>,

        /// Write the token to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Verify a token and print its claims
    Verify {
        /// Token, or a file containing it
        token: String,

        /// Expected token kind
        #[arg(long, value_enum, default_value_t = TokenKind::Org)]
        kind: TokenKind,

        /// Platform public key: a PEM file path or PEM text
        #[arg(long, env = "ATOA_PUBLIC_KEY")]
        key: Option<String>,

        /// Verify as of this instant (RFC 3339) instead of now
        #[arg(long)]
        at: Option<String>,
    },

    /// Decode a token without verifying it
    Inspect {
        /// Token, or a file containing it
        token: String,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AtoaConfig> {
    match path {
        Some(path) => AtoaConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            AtoaConfig::from_file(DEFAULT_CONFIG_FILE)
                .with_context(|| format!("Failed to load config from {DEFAULT_CONFIG_FILE}"))
        }
        None => Ok(AtoaConfig::default()),
    }
}

fn init_tracing(config: &AtoaConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config);

    match cli.cmd {
        Command::Keys { cmd } => match cmd {
            KeysCommand::Generate { output } => commands::keys::generate(output)?,
        },

        Command::Challenge { cmd } => match cmd {
            ChallengeCommand::New => commands::challenge::new(),
            ChallengeCommand::Sign { challenge, key } => {
                commands::challenge::sign(&config, key, &challenge)?
            }
            ChallengeCommand::Verify {
                challenge,
                signature,
                key,
            } => commands::challenge::verify(&config, key, &challenge, &signature)?,
        },

        Command::Org { cmd } => match cmd {
            OrgCommand::Validate { file } => commands::identity::validate_org(&file)?,
        },

        Command::Agent { cmd } => match cmd {
            AgentCommand::Validate { file } => commands::identity::validate_agent(&file)?,
        },

        Command::Token { cmd } => match cmd {
            TokenCommand::IssueOrg {
                org_id,
                verified,
                key,
                output,
            } => commands::token::issue_org(&config, key, &org_id, verified, output)?,
            TokenCommand::IssueAgent {
                card,
                org_token,
                key,
                output,
            } => commands::token::issue_agent(&config, key, &card, org_token, output)?,
            TokenCommand::Verify {
                token,
                kind,
                key,
                at,
            } => commands::token::verify(&config, key, token, kind, at.as_deref())?,
            TokenCommand::Inspect { token } => commands::token::inspect(token)?,
        },
    }

    Ok(())
}
