use anyhow::{Context, Result};
use clap::Parser;
use std::{env, str::FromStr};

/// Default ceiling for a single uploaded image (5 MiB).
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5 << 20;

/// Default upper bound on concurrent image uploads per request.
pub const DEFAULT_UPLOAD_WORKERS: usize = 4;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub storage_dir: String,
    /// Prefix for URLs handed out by the local blob store.
    pub public_base_url: String,
    pub max_image_bytes: usize,
    pub upload_workers: usize,
    /// Artwork submissions allowed per caller per minute. Zero disables the limiter.
    pub rate_limit_per_minute: u32,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Artwork marketplace API")]
pub struct Args {
    /// Host to bind to (overrides ARTWORKS_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides ARTWORKS_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides ARTWORKS_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Directory where uploaded images are stored (overrides ARTWORKS_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Base URL for stored images (overrides ARTWORKS_PUBLIC_BASE_URL)
    #[arg(long)]
    pub public_base_url: Option<String>,

    /// Maximum size of one image in bytes (overrides ARTWORKS_MAX_IMAGE_BYTES)
    #[arg(long)]
    pub max_image_bytes: Option<usize>,

    /// Maximum concurrent uploads per request (overrides ARTWORKS_UPLOAD_WORKERS)
    #[arg(long)]
    pub upload_workers: Option<usize>,

    /// Submissions per caller per minute (overrides ARTWORKS_RATE_LIMIT_PER_MINUTE)
    #[arg(long)]
    pub rate_limit_per_minute: Option<u32>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let cfg = Self::merge(&args)?;
        Ok((cfg, args.migrate))
    }

    fn merge(args: &Args) -> Result<Self> {
        // --- Environment fallback ---
        let env_host = env::var("ARTWORKS_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = env_parse("ARTWORKS_PORT", 3000u16)?;
        let env_db = env::var("ARTWORKS_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/artworks.db".into());
        let env_storage =
            env::var("ARTWORKS_STORAGE_DIR").unwrap_or_else(|_| "./data/media".into());
        let env_max_image = env_parse("ARTWORKS_MAX_IMAGE_BYTES", DEFAULT_MAX_IMAGE_BYTES)?;
        let env_workers = env_parse("ARTWORKS_UPLOAD_WORKERS", DEFAULT_UPLOAD_WORKERS)?;
        let env_rate = env_parse("ARTWORKS_RATE_LIMIT_PER_MINUTE", 20u32)?;

        // --- Merge ---
        let host = args.host.clone().unwrap_or(env_host);
        let port = args.port.unwrap_or(env_port);
        let env_public = env::var("ARTWORKS_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://{}:{}/media", host, port));

        Ok(Self {
            public_base_url: args
                .public_base_url
                .clone()
                .unwrap_or(env_public)
                .trim_end_matches('/')
                .to_string(),
            host,
            port,
            database_url: args.database_url.clone().unwrap_or(env_db),
            storage_dir: args.storage_dir.clone().unwrap_or(env_storage),
            max_image_bytes: args.max_image_bytes.unwrap_or(env_max_image),
            upload_workers: args.upload_workers.unwrap_or(env_workers).max(1),
            rate_limit_per_minute: args.rate_limit_per_minute.unwrap_or(env_rate),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Largest request body accepted on the create route.
    ///
    /// Sized for a handful of maximum-size images plus multipart framing.
    pub fn max_body_bytes(&self) -> usize {
        self.max_image_bytes.saturating_mul(16)
    }
}

fn env_parse<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}
