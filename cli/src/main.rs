use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use authstore::config::DEFAULT_API_BASE_URL;
use authstore::{AuthStore, ClientConfig, DocumentCookies, HttpClient, MemoryDocument, StoreOptions};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("config: {0}")]
    Config(#[from] authstore::ConfigError),
    #[error("http client: {0}")]
    Request(#[from] authstore::RequestError),
    #[error("login failed: {0}")]
    Auth(#[from] authstore::AuthError),
    #[error("cookie file {path}: {source}")]
    CookieFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "authctl", about = "Log in and out of an /auth API, keeping the session cookie on disk")]
struct Cli {
    #[arg(long, env = "AUTH_API_BASE_URL", default_value = DEFAULT_API_BASE_URL)]
    base_url: String,

    #[arg(long, env = "AUTHCTL_COOKIE_FILE", default_value = ".authctl-cookies")]
    cookie_file: PathBuf,

    #[arg(long, env = "AUTHCTL_OPTIONS", help = "JSON store options; AUTH_COOKIE_* env vars when absent")]
    options: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Post credentials and load the profile.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "AUTHCTL_PASSWORD")]
        password: String,
    },
    /// Restore the session from the cookie file and print it.
    Whoami,
    /// End the session on the server and locally.
    Logout,
    /// Print the token stored in the cookie file.
    Token,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let options = match &cli.options {
        Some(path) => StoreOptions::from_file(path)?,
        None => StoreOptions::from_env(),
    };
    let config = ClientConfig { base_url: cli.base_url.trim_end_matches('/').to_owned(), ..ClientConfig::from_env() };

    let document = Arc::new(MemoryDocument::from_cookie_header(&read_cookie_file(&cli.cookie_file)?));
    let mut store = AuthStore::new(options, HttpClient::new(&config)?).with_document(document.clone());
    tracing::debug!(base_url = %config.base_url, cookie_file = %cli.cookie_file.display(), "store ready");

    let print_token = matches!(cli.command, Command::Token);
    match cli.command {
        Command::Login { email, password } => {
            store.login(&json!({ "email": email, "password": password })).await?;
        }
        Command::Whoami => store.fetch(None).await,
        Command::Logout => {
            store.load_token(None);
            store.logout().await;
        }
        Command::Token => store.load_token(None),
    }

    write_cookie_file(&cli.cookie_file, &document.cookie_header())?;

    if print_token {
        println!("{}", store.token().unwrap_or_default());
        return Ok(());
    }
    print_json(&serde_json::to_value(store.state())?)
}

fn read_cookie_file(path: &Path) -> Result<String, CliError> {
    match std::fs::read_to_string(path) {
        Ok(raw) => Ok(raw.trim().to_owned()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(source) => Err(CliError::CookieFile { path: path.to_owned(), source }),
    }
}

fn write_cookie_file(path: &Path, header: &str) -> Result<(), CliError> {
    std::fs::write(path, header).map_err(|source| CliError::CookieFile { path: path.to_owned(), source })
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
