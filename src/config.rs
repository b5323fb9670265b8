use anyhow::{Context, Result};
use clap::Parser;
use std::{env, str::FromStr};

/// Default upload ceiling: 100 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments; built once at startup
/// and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    /// Force `https` in generated file URLs regardless of the detected scheme.
    pub force_https: bool,
    pub max_upload_bytes: u64,
    /// Lowercased MIME essences accepted by `POST /upload`. Empty means any.
    pub allowed_mime_types: Vec<String>,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Minimal HTTP file storage service")]
pub struct Args {
    /// Host to bind to (overrides FILE_STORE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where uploads and their sidecars are stored (overrides FILE_STORE_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Always generate https:// URLs (same as FORCE_HTTPS=true)
    #[arg(long)]
    pub force_https: bool,

    /// Maximum accepted upload size in bytes (overrides FILE_STORE_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<u64>,

    /// Comma-separated MIME allow-list (overrides FILE_STORE_ALLOWED_MIME_TYPES)
    #[arg(long)]
    pub allowed_mime_types: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            storage_dir: "./uploads".into(),
            force_https: false,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_mime_types: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();
        let defaults = Self::default();

        // --- Environment fallback ---
        let env_host = env::var("FILE_STORE_HOST").unwrap_or(defaults.host);
        let env_port = env_parse("PORT", defaults.port)?;
        let env_storage = env::var("FILE_STORE_STORAGE_DIR").unwrap_or(defaults.storage_dir);
        let env_force_https = env::var("FORCE_HTTPS")
            .map(|value| value == "true")
            .unwrap_or(defaults.force_https);
        let env_max_upload = env_parse("FILE_STORE_MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?;
        let env_mime = env::var("FILE_STORE_ALLOWED_MIME_TYPES").unwrap_or_default();

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            force_https: args.force_https || env_force_https,
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_max_upload),
            allowed_mime_types: parse_mime_list(
                args.allowed_mime_types.as_deref().unwrap_or(&env_mime),
            ),
        };

        Ok(cfg)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether a client-declared content type passes the allow-list.
    ///
    /// Parameters such as `; charset=utf-8` are ignored and the comparison is
    /// case-insensitive. An empty allow-list accepts everything.
    pub fn is_mime_allowed(&self, content_type: &str) -> bool {
        if self.allowed_mime_types.is_empty() {
            return true;
        }
        let essence = mime_essence(content_type);
        self.allowed_mime_types.iter().any(|allowed| *allowed == essence)
    }
}

/// Read `name` from the environment and parse it, falling back to `default`
/// when the variable is unset.
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

/// Split a comma-separated MIME list into normalized essences.
pub fn parse_mime_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(mime_essence)
        .filter(|s| !s.is_empty())
        .collect()
}

fn mime_essence(value: &str) -> String {
    value
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}
