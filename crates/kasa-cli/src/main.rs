//! kasa: command-line password vault
//!
//! Commands:
//!   status                    - vault state and storage location
//!   init                      - create a new vault
//!   list [query]              - list records, optionally filtered
//!   show <id> [--reveal]      - print one record
//!   add / edit <id> / rm <id> - record changes (persisted immediately)
//!   generate                  - print a random password
//!   export [path]             - write the encrypted vault document to a file
//!   import <path> [--force]   - replace the vault with an exported document
//!   passwd                    - change the master passphrase
//!   config show               - display current configuration
//!
//! The master passphrase is read from `KASA_PASSPHRASE` when set, otherwise
//! prompted for without echo.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::SecretString;

use kasa_core::config::{expand_tilde, KasaConfig};
use kasa_storage::KeyValueStore;
use kasa_vault::backup::{default_backup_name, read_backup, write_backup};
use kasa_vault::{
    CredentialRecord, CredentialUpdate, GeneratorOptions, NewCredential, SessionOptions,
    VaultSession, VaultStatus,
};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "kasa",
    version,
    about = "Encrypted password vault",
    long_about = "kasa: keep credentials in a single passphrase-protected, AES-GCM encrypted vault"
)]
struct Cli {
    /// Path to kasa.toml configuration file
    #[arg(long, short = 'c', env = "KASA_CONFIG", default_value = "~/.config/kasa/kasa.toml")]
    config: PathBuf,

    /// Log level filter (overrides config; RUST_LOG wins over both)
    #[arg(long, env = "KASA_LOG")]
    log: Option<String>,

    /// Log format (overrides config)
    #[arg(long, env = "KASA_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show vault state and storage location
    Status,

    /// Create a new, empty vault
    Init,

    /// List records, optionally filtered by title or username
    List {
        /// Case-insensitive substring to match
        query: Option<String>,
    },

    /// Show a single record
    Show {
        id: String,
        /// Print the password instead of masking it
        #[arg(long)]
        reveal: bool,
    },

    /// Add a record
    Add {
        #[arg(long, short = 't')]
        title: String,
        #[arg(long, short = 'u')]
        username: Option<String>,
        #[arg(long, short = 'n')]
        notes: Option<String>,
        /// Record password (prompted for when omitted)
        #[arg(long, conflicts_with = "generate")]
        password: Option<String>,
        /// Use a generated password
        #[arg(long, short = 'g')]
        generate: bool,
        #[command(flatten)]
        generator: GeneratorArgs,
    },

    /// Change fields of a record; an empty username or notes clears it
    Edit {
        id: String,
        #[arg(long, short = 't')]
        title: Option<String>,
        #[arg(long, short = 'u')]
        username: Option<String>,
        #[arg(long, short = 'n')]
        notes: Option<String>,
        /// Prompt for a new password
        #[arg(long, short = 'p', conflicts_with = "generate")]
        password: bool,
        /// Replace the password with a generated one
        #[arg(long, short = 'g')]
        generate: bool,
        #[command(flatten)]
        generator: GeneratorArgs,
    },

    /// Delete a record
    #[command(alias = "delete")]
    Rm { id: String },

    /// Print a random password (no vault needed)
    Generate {
        #[command(flatten)]
        generator: GeneratorArgs,
    },

    /// Write the encrypted vault document to a file
    Export {
        /// Destination (default: kasa-backup-YYYY-MM-DD.json in the current directory)
        path: Option<PathBuf>,
    },

    /// Replace the stored vault with an exported document
    Import {
        path: PathBuf,
        /// Overwrite an existing vault
        #[arg(long)]
        force: bool,
    },

    /// Change the master passphrase
    Passwd,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
}

/// Overrides for the `[generator]` config section
#[derive(clap::Args, Debug, Default)]
struct GeneratorArgs {
    /// Password length
    #[arg(long, short = 'l')]
    length: Option<usize>,
    #[arg(long)]
    no_upper: bool,
    #[arg(long)]
    no_numbers: bool,
    #[arg(long)]
    no_symbols: bool,
}

impl GeneratorArgs {
    fn options(&self, config: &KasaConfig) -> GeneratorOptions {
        let defaults = &config.generator;
        GeneratorOptions {
            length: self.length.unwrap_or(defaults.length),
            upper: defaults.upper && !self.no_upper,
            numbers: defaults.numbers && !self.no_numbers,
            symbols: defaults.symbols && !self.no_symbols,
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("kasa: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = expand_tilde(&cli.config);
    let file_config = KasaConfig::read(&config_path)?;
    let found = file_config.is_some();
    let config = file_config.unwrap_or_default();

    let level = cli.log.unwrap_or_else(|| config.log.level.clone());
    let format = cli.log_format.unwrap_or(match config.log.format.as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    });
    init_logging(&level, &format);
    if found {
        tracing::debug!(config = %config_path.display(), "configuration loaded");
    } else {
        tracing::warn!("config file not found: {}  (using defaults)", config_path.display());
    }

    match cli.command {
        Commands::Status => cmd_status(&config).await,
        Commands::Init => cmd_init(&config).await,
        Commands::List { query } => cmd_list(&config, query.as_deref()).await,
        Commands::Show { id, reveal } => cmd_show(&config, &id, reveal).await,
        Commands::Add {
            title,
            username,
            notes,
            password,
            generate,
            generator,
        } => {
            let password = if generate {
                kasa_crypto::generate_password(&generator.options(&config))
            } else {
                match password {
                    Some(p) => p,
                    None => prompt_entry_password()?,
                }
            };
            let input = NewCredential {
                title,
                username,
                password,
                notes,
            };
            cmd_add(&config, input).await
        }
        Commands::Edit {
            id,
            title,
            username,
            notes,
            password,
            generate,
            generator,
        } => {
            let password = if generate {
                Some(kasa_crypto::generate_password(&generator.options(&config)))
            } else if password {
                Some(prompt_entry_password()?)
            } else {
                None
            };
            let update = CredentialUpdate {
                title,
                username,
                password,
                notes,
            };
            cmd_edit(&config, &id, update).await
        }
        Commands::Rm { id } => cmd_rm(&config, &id).await,
        Commands::Generate { generator } => {
            println!("{}", kasa_crypto::generate_password(&generator.options(&config)));
            Ok(())
        }
        Commands::Export { path } => cmd_export(&config, path).await,
        Commands::Import { path, force } => cmd_import(&config, &path, force).await,
        Commands::Passwd => cmd_passwd(&config).await,
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(&config, &config_path),
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // logs go to stderr so passwords printed by `generate`/`show` stay pipeable
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── Session helpers ───────────────────────────────────────────────────────────

fn open_storage(config: &KasaConfig) -> Result<KeyValueStore> {
    let op = kasa_storage::build_operator(&config.storage).context("building storage operator")?;
    Ok(KeyValueStore::new(op))
}

async fn open_session(config: &KasaConfig) -> Result<VaultSession> {
    let storage = open_storage(config)?;
    let session = VaultSession::open(storage, SessionOptions::from_config(config)).await?;
    Ok(session)
}

/// Open the configured vault and log in with the master passphrase.
///
/// Returns the passphrase too, for commands that need it again.
async fn unlock(config: &KasaConfig) -> Result<(VaultSession, SecretString)> {
    let mut session = open_session(config).await?;
    if session.status() == VaultStatus::Uninitialized {
        anyhow::bail!("no vault found; create one with `kasa init`");
    }

    let passphrase = read_passphrase("Master passphrase: ")?;
    with_spinner("unlocking", session.login(&passphrase)).await?;
    Ok((session, passphrase))
}

/// `KASA_PASSPHRASE` if set, otherwise an echo-free prompt.
fn read_passphrase(prompt: &str) -> Result<SecretString> {
    if let Ok(p) = std::env::var("KASA_PASSPHRASE") {
        return Ok(SecretString::from(p));
    }
    let p = rpassword::prompt_password(prompt).context("reading passphrase")?;
    Ok(SecretString::from(p))
}

/// A new passphrase and its confirmation. From the environment variable
/// `env_var` (used for both) or two prompts.
fn read_new_passphrase(env_var: &str, prompt: &str) -> Result<(SecretString, SecretString)> {
    if let Ok(p) = std::env::var(env_var) {
        return Ok((SecretString::from(p.clone()), SecretString::from(p)));
    }
    let passphrase = rpassword::prompt_password(prompt).context("reading passphrase")?;
    let confirm = rpassword::prompt_password("Confirm: ").context("reading passphrase")?;
    Ok((SecretString::from(passphrase), SecretString::from(confirm)))
}

fn prompt_entry_password() -> Result<String> {
    rpassword::prompt_password("Entry password: ").context("reading entry password")
}

// ── Progress helpers ──────────────────────────────────────────────────────────

fn make_spinner(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{prefix:.bold} {spinner} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_prefix(prefix.to_string());
    pb.set_message("deriving key");
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Key derivation takes a noticeable moment; keep the terminal alive meanwhile.
async fn with_spinner<T>(prefix: &str, fut: impl Future<Output = T>) -> T {
    let pb = make_spinner(prefix);
    let out = fut.await;
    pb.finish_and_clear();
    out
}

// ── Commands ──────────────────────────────────────────────────────────────────

async fn cmd_status(config: &KasaConfig) -> Result<()> {
    let storage = open_storage(config)?;
    let reachable = kasa_storage::health::is_healthy(storage.operator()).await;
    let session = VaultSession::open(storage, SessionOptions::from_config(config)).await?;

    println!("vault:   {}", session.status());
    println!(
        "storage: {} {} (key: {})",
        config.storage.backend,
        expand_tilde(&config.storage.root).display(),
        config.storage.key
    );
    println!("backend: {}", if reachable { "reachable" } else { "unreachable" });
    println!("kdf:     PBKDF2-SHA256, {} iterations", config.kdf.iterations);
    Ok(())
}

async fn cmd_init(config: &KasaConfig) -> Result<()> {
    let mut session = open_session(config).await?;
    if session.status() != VaultStatus::Uninitialized {
        anyhow::bail!("a vault already exists (key '{}')", config.storage.key);
    }

    let (passphrase, confirm) = read_new_passphrase("KASA_PASSPHRASE", "New master passphrase: ")?;
    with_spinner("creating", session.create_vault(&passphrase, &confirm)).await?;
    println!("vault created");
    Ok(())
}

async fn cmd_list(config: &KasaConfig, query: Option<&str>) -> Result<()> {
    let (session, _) = unlock(config).await?;
    let hits = session.search(query.unwrap_or(""))?;

    if hits.is_empty() {
        match query {
            Some(q) => println!("no records match '{q}'"),
            None => println!("vault is empty"),
        }
        return Ok(());
    }

    let width = hits.iter().map(|r| r.title.chars().count()).max().unwrap_or(0);
    for record in hits {
        println!(
            "{}  {:<width$}  {}",
            record.id,
            record.title,
            record.username.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

async fn cmd_show(config: &KasaConfig, id: &str, reveal: bool) -> Result<()> {
    let (session, _) = unlock(config).await?;
    let record = session.find(id)?;
    print_record(record, reveal);
    Ok(())
}

fn print_record(record: &CredentialRecord, reveal: bool) {
    println!("id:       {}", record.id);
    println!("title:    {}", record.title);
    println!("username: {}", record.username.as_deref().unwrap_or(""));
    if reveal {
        println!("password: {}", record.password);
    } else {
        println!("password: ******** (use --reveal)");
    }
    if let Some(notes) = &record.notes {
        println!("notes:    {notes}");
    }
    println!("created:  {}", format_millis(record.created_at));
    println!("updated:  {}", format_millis(record.updated_at));
}

fn format_millis(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ms.to_string())
}

async fn cmd_add(config: &KasaConfig, input: NewCredential) -> Result<()> {
    let (mut session, _) = unlock(config).await?;
    let record = session.add(input).await?;
    println!("added {} ({})", record.title, record.id);
    Ok(())
}

async fn cmd_edit(config: &KasaConfig, id: &str, update: CredentialUpdate) -> Result<()> {
    if update.is_empty() {
        anyhow::bail!("nothing to change; pass --title, --username, --notes or --password");
    }
    let (mut session, _) = unlock(config).await?;
    let record = session.update(id, update).await?;
    println!("updated {} ({})", record.title, record.id);
    Ok(())
}

async fn cmd_rm(config: &KasaConfig, id: &str) -> Result<()> {
    let (mut session, _) = unlock(config).await?;
    let title = session.find(id)?.title.clone();
    session.delete(id).await?;
    println!("deleted {title} ({id})");
    Ok(())
}

async fn cmd_export(config: &KasaConfig, path: Option<PathBuf>) -> Result<()> {
    let (session, _) = unlock(config).await?;
    let blob = session.export_blob().await?;

    let path = path
        .unwrap_or_else(|| PathBuf::from(default_backup_name(chrono::Local::now().date_naive())));
    write_backup(&path, &blob).await?;
    println!("exported to {}", path.display());
    Ok(())
}

async fn cmd_import(config: &KasaConfig, path: &Path, force: bool) -> Result<()> {
    let blob = read_backup(path).await?;
    let mut session = open_session(config).await?;
    if session.status() != VaultStatus::Uninitialized && !force {
        anyhow::bail!(
            "a vault already exists (key '{}'); pass --force to replace it",
            config.storage.key
        );
    }

    session.restore_blob(blob).await?;
    println!(
        "imported {}; unlock it with the passphrase of the exported vault",
        path.display()
    );
    Ok(())
}

async fn cmd_passwd(config: &KasaConfig) -> Result<()> {
    let (mut session, current) = unlock(config).await?;
    let (new, confirm) = read_new_passphrase("KASA_NEW_PASSPHRASE", "New master passphrase: ")?;

    with_spinner("re-keying", session.change_passphrase(&current, &new, &confirm)).await?;
    println!("passphrase changed");
    Ok(())
}

fn cmd_config_show(config: &KasaConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}
