use anyhow::{Context, Result};
use clap::Parser;
use std::{env, fmt, str::FromStr, time::Duration};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub api_url: String,
    pub api_token: String,
    pub request_timeout: Duration,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Object-storage bucket reconciler")]
pub struct Args {
    /// Host to bind to (overrides RECONCILER_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides RECONCILER_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// State database URL (overrides RECONCILER_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Remote API base URL (overrides LINODE_API_URL)
    #[arg(long)]
    pub api_url: Option<String>,

    /// Remote API token (overrides LINODE_TOKEN)
    #[arg(long)]
    pub api_token: Option<String>,

    /// Per-request timeout in seconds (overrides RECONCILER_REQUEST_TIMEOUT_SECS)
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

/// Read and parse an optional environment variable.
fn env_parsed<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", key)),
    }
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let migrate = args.migrate;
        Ok((Self::merge(args)?, migrate))
    }

    fn merge(args: Args) -> Result<Self> {
        // --- Environment fallback ---
        let env_host = env::var("RECONCILER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = env_parsed("RECONCILER_PORT", 3000u16)?;
        let env_db = env::var("RECONCILER_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/state/reconciler.db".into());
        let env_api = env::var("LINODE_API_URL")
            .unwrap_or_else(|_| "https://api.linode.com/v4".into());
        let env_timeout = env_parsed("RECONCILER_REQUEST_TIMEOUT_SECS", 30u64)?;

        let api_token = match args.api_token {
            Some(token) => token,
            None => env::var("LINODE_TOKEN")
                .context("LINODE_TOKEN must be set (or pass --api-token)")?,
        };

        // --- Merge ---
        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.unwrap_or(env_db),
            api_url: args.api_url.unwrap_or(env_api),
            api_token,
            request_timeout: Duration::from_secs(args.request_timeout_secs.unwrap_or(env_timeout)),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_url", &self.database_url)
            .field("api_url", &self.api_url)
            .field("api_token", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
