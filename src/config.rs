use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::{env, fmt::Display, str::FromStr};

/// Which object store backs the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// SQLite metadata + on-disk payloads.
    Local,
    /// Process memory; contents vanish on exit.
    Memory,
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        <Backend as ValueEnum>::from_str(value, true)
            .map_err(|_| anyhow::anyhow!("expected `local` or `memory`"))
    }
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub bucket: String,
    pub backend: Backend,
    pub storage_dir: String,
    pub database_url: String,
    pub max_upload_bytes: u64,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "PDF document storage gateway")]
pub struct Args {
    /// Host to bind to (overrides DOC_GATEWAY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides DOC_GATEWAY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Bucket documents are stored in (overrides DOC_GATEWAY_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Storage backend (overrides DOC_GATEWAY_BACKEND)
    #[arg(long, value_enum)]
    pub backend: Option<Backend>,

    /// Directory where payloads are stored (overrides DOC_GATEWAY_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides DOC_GATEWAY_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Largest accepted upload in bytes (overrides DOC_GATEWAY_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<u64>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let migrate = args.migrate;
        let cfg = Self::resolve(args, |name| env::var(name).ok())?;
        Ok((cfg, migrate))
    }

    /// Merge CLI args over values from `lookup` (the environment) over
    /// defaults.
    pub fn resolve(args: Args, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let string = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.into());

        Ok(Self {
            host: args
                .host
                .unwrap_or_else(|| string("DOC_GATEWAY_HOST", "0.0.0.0")),
            port: match args.port {
                Some(port) => port,
                None => parsed(&lookup, "DOC_GATEWAY_PORT", 3001)?,
            },
            bucket: args
                .bucket
                .unwrap_or_else(|| string("DOC_GATEWAY_BUCKET", "pdf-documents")),
            backend: match args.backend {
                Some(backend) => backend,
                None => parsed(&lookup, "DOC_GATEWAY_BACKEND", Backend::Local)?,
            },
            storage_dir: args
                .storage_dir
                .unwrap_or_else(|| string("DOC_GATEWAY_STORAGE_DIR", "./data/objects")),
            database_url: args.database_url.unwrap_or_else(|| {
                string(
                    "DOC_GATEWAY_DATABASE_URL",
                    "sqlite://./data/meta/doc_gateway.db",
                )
            }),
            max_upload_bytes: match args.max_upload_bytes {
                Some(max) => max,
                None => parsed(&lookup, "DOC_GATEWAY_MAX_UPLOAD_BYTES", 50 * 1024 * 1024)?,
            },
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(name) {
        Some(value) => value
            .parse::<T>()
            .map_err(|err| anyhow::anyhow!("{}", err))
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        None => Ok(default),
    }
}
