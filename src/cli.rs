//! CLI argument parsing, validation, and startup helpers.

use std::time::Duration;

use crate::ServerConfig;
use crate::config::AuthConfig;
use crate::db::Database;
use clap::Parser;
use tracing::{error, info, warn};

const MIN_SECRET_LENGTH: usize = 32;

/// Upper bound for either token lifetime: one year
const MAX_TOKEN_TTL_SECS: u64 = 365 * 24 * 60 * 60;

const ACCESS_SECRET_ENV: &str = "ACCESS_TOKEN_SECRET";
const REFRESH_SECRET_ENV: &str = "REFRESH_TOKEN_SECRET";

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tubeauth",
    about = "Password login with rotating refresh tokens"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "8000")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "tubeauth.db")]
    pub database: String,

    /// Access token lifetime in seconds
    #[arg(long, default_value = "900",
        value_parser = clap::value_parser!(u64).range(1..=MAX_TOKEN_TTL_SECS))]
    pub access_token_ttl_secs: u64,

    /// Refresh token lifetime in seconds, must exceed the access token lifetime
    #[arg(long, default_value = "864000",
        value_parser = clap::value_parser!(u64).range(1..=MAX_TOKEN_TTL_SECS))]
    pub refresh_token_ttl_secs: u64,

    /// Path to file containing the access token secret. Prefer ACCESS_TOKEN_SECRET instead
    #[arg(long)]
    pub access_secret_file: Option<String>,

    /// Path to file containing the refresh token secret. Prefer REFRESH_TOKEN_SECRET instead
    #[arg(long)]
    pub refresh_secret_file: Option<String>,

    /// Send auth cookies without the Secure flag (plain HTTP development only)
    #[arg(long)]
    pub insecure_cookies: bool,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load one signing secret from its environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
fn load_secret(env_var: &str, secret_file: Option<&str>, flag: &str) -> Option<String> {
    if let Ok(secret) = std::env::var(env_var) {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var(env_var) };
        Some(secret)
    } else if let Some(path) = secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => Some(content.trim().to_string()),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read secret file");
                None
            }
        }
    } else {
        error!(
            "{} is required. Set the environment variable (recommended) or use {}",
            env_var, flag
        );
        None
    }
}

/// Check that both secrets are long enough and distinct.
pub fn validate_secrets(access: &str, refresh: &str) -> Result<(), String> {
    for (name, secret) in [(ACCESS_SECRET_ENV, access), (REFRESH_SECRET_ENV, refresh)] {
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(format!(
                "{} is shorter than {} characters. Use a longer secret",
                name, MIN_SECRET_LENGTH
            ));
        }
    }

    if access == refresh {
        return Err(format!(
            "{} and {} must differ",
            ACCESS_SECRET_ENV, REFRESH_SECRET_ENV
        ));
    }

    Ok(())
}

/// Check that the access token expires before the refresh token.
pub fn validate_ttls(args: &Args) -> Result<(), String> {
    if args.access_token_ttl_secs >= args.refresh_token_ttl_secs {
        return Err(format!(
            "Access token lifetime ({}s) must be shorter than refresh token lifetime ({}s)",
            args.access_token_ttl_secs, args.refresh_token_ttl_secs
        ));
    }
    Ok(())
}

/// Load and validate the access and refresh secrets.
/// Returns None and logs an error on failure.
pub fn load_secrets(args: &Args) -> Option<(String, String)> {
    let access = load_secret(
        ACCESS_SECRET_ENV,
        args.access_secret_file.as_deref(),
        "--access-secret-file",
    )?;
    let refresh = load_secret(
        REFRESH_SECRET_ENV,
        args.refresh_secret_file.as_deref(),
        "--refresh-secret-file",
    )?;

    if let Err(msg) = validate_secrets(&access, &refresh) {
        error!("{}", msg);
        return None;
    }

    Some((access, refresh))
}

/// Build ServerConfig from validated arguments.
pub fn build_config(args: &Args, db: Database, access_secret: String, refresh_secret: String) -> ServerConfig {
    if args.insecure_cookies {
        warn!("Auth cookies will be sent without the Secure flag");
    }

    let auth = AuthConfig::new(access_secret.into_bytes(), refresh_secret.into_bytes())
        .with_ttls(
            Duration::from_secs(args.access_token_ttl_secs),
            Duration::from_secs(args.refresh_token_ttl_secs),
        )
        .with_secure_cookies(!args.insecure_cookies);

    ServerConfig { db, auth }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
