mod logging;

use anyhow::Result;
use clap::{Parser, Subcommand};
use novax_config::Config;
use novax_engine::{
    Engine, GenerateRequest, KeyActionResponse, RotateKeyRequest, SaveKeyRequest,
    ValidateKeyRequest,
};
use novax_store::SqliteSecretStore;
use novax_types::SecretStore;
use std::{path::PathBuf, sync::Arc};

#[derive(Parser, Debug)]
#[command(name = "novax", about = "novax: multi-provider theme generation with a key vault")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
    /// SQLite database path (default: ~/.novax/novax.db).
    #[arg(long, value_name = "PATH", global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a theme, falling back across providers.
    Generate {
        /// Theme description sent to the provider.
        #[arg(short = 'P', long)]
        prompt: String,
        /// Theme title.
        #[arg(short, long, default_value = "Untitled")]
        title: String,
        /// Provider to try first (openai / groq / mistral / anthropic / gemini / cohere).
        #[arg(short, long)]
        provider: Option<String>,
        /// Print the full JSON response instead of the output text.
        #[arg(long)]
        json: bool,
    },
    /// Manage stored provider keys.
    #[command(subcommand)]
    Key(KeyCommand),
    /// Show stored key status for every supported provider.
    Status,
}

#[derive(Subcommand, Debug)]
enum KeyCommand {
    /// Validate and store a key.
    Save { provider: String, api_key: String },
    /// Replace a stored key.
    Rotate {
        provider: String,
        new_key: String,
        /// Refuse to overwrite an existing key.
        #[arg(long)]
        no_force: bool,
    },
    /// Check a key's format without storing it.
    Validate { provider: String, api_key: String },
    /// Remove a stored key.
    Delete { provider: String },
    /// Guess which provider issued a key.
    Detect { api_key: String },
    /// Move legacy plaintext keys into the vault.
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("config error: {e}"))?;
    let _guard = logging::init(&config.log);

    let db = cli.db.or_else(|| config.database.clone());
    let store: Arc<dyn SecretStore> = Arc::new(open_store(db).await?);
    let engine = Engine::from_config(&config, store)
        .map_err(|e| anyhow::anyhow!("startup failed: {e}"))?;

    match cli.command {
        Commands::Generate {
            prompt,
            title,
            provider,
            json,
        } => cmd_generate(&engine, title, prompt, provider, json).await,
        Commands::Key(cmd) => cmd_key(&engine, cmd).await,
        Commands::Status => {
            cmd_status(&engine).await;
            Ok(())
        }
    }
}

async fn cmd_generate(
    engine: &Engine,
    title: String,
    prompt: String,
    provider: Option<String>,
    json: bool,
) -> Result<()> {
    let resp = engine
        .generate(&GenerateRequest {
            title,
            prompt,
            provider,
        })
        .await;
    if json {
        println!("{}", serde_json::to_string_pretty(&resp)?);
    } else if let Some(output) = &resp.output {
        println!("{output}");
    }
    if !resp.success {
        let tried = resp.tried.unwrap_or_default().join(", ");
        anyhow::bail!(
            "{} (tried: {tried})",
            resp.message.unwrap_or_else(|| "generation failed".into())
        );
    }
    Ok(())
}

async fn cmd_key(engine: &Engine, cmd: KeyCommand) -> Result<()> {
    let keys = engine.keys();
    let resp = match cmd {
        KeyCommand::Save { provider, api_key } => {
            keys.save(&SaveKeyRequest { provider, api_key }).await
        }
        KeyCommand::Rotate {
            provider,
            new_key,
            no_force,
        } => {
            keys.rotate(&RotateKeyRequest {
                provider,
                new_key,
                force: !no_force,
            })
            .await
        }
        KeyCommand::Validate { provider, api_key } => {
            let v = keys.validate(&ValidateKeyRequest { provider, api_key });
            KeyActionResponse {
                success: v.valid,
                message: format!("[{}] {}", v.status, v.message),
            }
        }
        KeyCommand::Delete { provider } => keys.delete(&provider).await,
        KeyCommand::Detect { api_key } => match keys.detect(&api_key) {
            Some(p) => KeyActionResponse {
                success: true,
                message: format!("{p} ({})", p.label()),
            },
            None => KeyActionResponse {
                success: false,
                message: "no provider format matches this key".into(),
            },
        },
        KeyCommand::Migrate => {
            let migrated = keys
                .migrate()
                .await
                .map_err(|e| anyhow::anyhow!("migration failed: {e}"))?;
            let names: Vec<&str> = migrated.iter().map(|p| p.as_str()).collect();
            KeyActionResponse {
                success: true,
                message: if names.is_empty() {
                    "nothing to migrate".into()
                } else {
                    format!("migrated: {}", names.join(", "))
                },
            }
        }
    };
    if resp.success {
        println!("{}", resp.message);
        Ok(())
    } else {
        anyhow::bail!("{}", resp.message)
    }
}

async fn cmd_status(engine: &Engine) {
    for s in engine.keys().statuses().await {
        let masked = s.masked.unwrap_or_default();
        println!("{:<10} {:<8} {masked}", s.provider.as_str(), s.status.to_string());
    }
}

async fn open_store(db: Option<PathBuf>) -> Result<SqliteSecretStore> {
    let path = db.unwrap_or_else(default_db_path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let url = format!("sqlite://{}", path.display());
    tracing::debug!(path = %path.display(), "opening secret store");
    SqliteSecretStore::new(&url)
        .await
        .map_err(|e| anyhow::anyhow!("database error: {e}"))
}

fn default_db_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".novax").join("novax.db")
}
