//! `secreta` command line. Business failures are reported per pair ID and do
//! not change the exit status; only unusable settings do.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use secreta::commands::{self, EncryptOptions};
use secreta::config::Settings;
use secreta::keycache::PrivateKeyCache;
use secreta::pair::KeyPairId;

#[derive(Parser)]
#[command(name = "secreta", version, about = "Encrypt configuration secrets for a key pair")]
struct Cli {
    /// JSON or TOML settings file.
    #[arg(long, global = true, env = "SECRETA_SETTINGS")]
    settings: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Seal the marked secrets for one or more key pairs.
    Encrypt {
        #[arg(required = true)]
        ids: Vec<String>,
        /// Directory holding `<id>.pem` (default: home directory).
        #[arg(short = 'k', long = "key")]
        key: Option<PathBuf>,
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,
        #[arg(short = 's', long = "secrets")]
        secrets: Option<PathBuf>,
        /// Artifact directory (default: the key directory).
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
    /// Print the configuration with every secret restored.
    Decrypt {
        #[arg(short = 'c', long = "config")]
        config: PathBuf,
        /// Glob selecting the artifacts (default: `*.<extension>`).
        #[arg(short = 'a', long = "artifacts")]
        artifacts: Option<String>,
    },
    /// Create a key pair, store the private key and save the public key.
    Generate {
        id: String,
        #[arg(short = 'k', long = "key")]
        key: Option<PathBuf>,
        #[arg(long)]
        bits: Option<usize>,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let settings = Settings::load(cli.settings.as_deref()).context("failed to load settings")?;

    match cli.command {
        Command::Encrypt {
            ids,
            key,
            config,
            secrets,
            output,
        } => {
            let options = EncryptOptions {
                key_dir: key,
                config_dir: config,
                secrets_dir: secrets,
                output_dir: output,
            };
            for id in ids {
                let outcome = KeyPairId::new(id)
                    .map_err(secreta::Error::from)
                    .and_then(|id| commands::encrypt(&id, &options, &settings));
                match outcome {
                    Ok(outcome) => println!("{outcome}"),
                    Err(err) => eprintln!("{err}"),
                }
            }
        }
        Command::Decrypt { config, artifacts } => {
            let store = settings.store.open().context("failed to open the parameter store")?;
            let cache = PrivateKeyCache::new();
            match commands::decrypt(&config, artifacts.as_deref(), &settings, &store, &cache).await {
                Ok(tree) => println!("{}", serde_json::to_string_pretty(&tree)?),
                Err(err) => eprintln!("{err}"),
            }
        }
        Command::Generate { id, key, bits } => {
            let mut settings = settings;
            if let Some(bits) = bits {
                settings.key_bits = bits;
            }
            let store = settings.store.open().context("failed to open the parameter store")?;
            let outcome = match KeyPairId::new(id) {
                Ok(id) => commands::generate(&id, key.as_deref(), &settings, &store).await,
                Err(err) => Err(err.into()),
            };
            match outcome {
                Ok(outcome) => {
                    println!("{} bytes saved to {}", outcome.length, outcome.filename.display());
                    println!("fingerprint {}", outcome.fingerprint);
                }
                Err(err) => eprintln!("{err}"),
            }
        }
    }
    Ok(())
}
