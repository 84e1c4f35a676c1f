use std::env;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::envelope::{IV_SIZE, KEY_SIZE};

/// Default lifetime of an issued credential.
const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;
/// Upper bound for `TOKEN_TTL_HOURS` (one year).
const MAX_TOKEN_TTL_HOURS: i64 = 24 * 366;
/// Default upper bound for buffered request bodies (1 MiB).
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// How the cipher envelope picks its IV.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IvSetting {
    /// A fresh random IV per encryption, carried in the envelope.
    Random,
    /// One IV for the whole process, compatible with legacy clients.
    Static(Zeroizing<[u8; IV_SIZE]>),
}

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The URL of the PostgreSQL database. `None` selects the in-memory store.
    pub database_url: Option<String>,
    /// The address the HTTP listener binds to.
    pub bind_addr: SocketAddr,
    /// The AES-256 key used by the cipher envelope.
    pub encryption_key: Zeroizing<[u8; KEY_SIZE]>,
    /// The IV strategy used by the cipher envelope.
    pub iv_setting: IvSetting,
    /// The HS256 secret used to sign session tokens.
    pub jwt_secret: Zeroizing<String>,
    /// The lifetime of an issued credential in hours.
    pub token_ttl_hours: i64,
    /// The maximum size of a buffered request body.
    pub max_body_bytes: usize,
    /// Sustained requests per second allowed on register/login per client IP. 0 disables.
    pub auth_rate_limit_per_second: u64,
    /// Burst size allowed on register/login per client IP.
    pub auth_rate_limit_burst: u32,
    /// Origins allowed by the CORS layer.
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Creates a new `Config` from an arbitrary key lookup.
    ///
    /// Missing or malformed key material is an error: there is no random
    /// fallback, since values encrypted under an ephemeral key become
    /// unreadable after a restart.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut key_hex = lookup("ENCRYPTION_KEY")
            .context("ENCRYPTION_KEY must be set (generate with: openssl rand -hex 32)")?;
        let encryption_key = decode_fixed::<KEY_SIZE>(&key_hex)
            .context("ENCRYPTION_KEY must be exactly 32 bytes (64 hex characters)");
        key_hex.zeroize();
        let encryption_key = encryption_key?;

        let mode = lookup("ENCRYPTION_IV_MODE").unwrap_or_else(|| "random".to_string());
        let iv_setting = match mode.trim().to_ascii_lowercase().as_str() {
            "random" => {
                if lookup("ENCRYPTION_IV").is_some() {
                    tracing::warn!("⚠️ ENCRYPTION_IV is ignored when ENCRYPTION_IV_MODE=random");
                }
                IvSetting::Random
            }
            "static" => {
                let mut iv_hex = lookup("ENCRYPTION_IV")
                    .context("ENCRYPTION_IV must be set when ENCRYPTION_IV_MODE=static")?;
                let iv = decode_fixed::<IV_SIZE>(&iv_hex)
                    .context("ENCRYPTION_IV must be exactly 16 bytes (32 hex characters)");
                iv_hex.zeroize();
                IvSetting::Static(iv?)
            }
            other => anyhow::bail!("Invalid ENCRYPTION_IV_MODE '{}' (expected random or static)", other),
        };

        let jwt_secret = Zeroizing::new(lookup("JWT_SECRET").context("JWT_SECRET must be set")?);
        if jwt_secret.is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }
        if jwt_secret.len() < 32 {
            tracing::warn!("⚠️ JWT_SECRET is shorter than 32 bytes");
        }

        let token_ttl_hours: i64 = parse_or(&lookup, "TOKEN_TTL_HOURS", DEFAULT_TOKEN_TTL_HOURS)?;
        if token_ttl_hours <= 0 || token_ttl_hours > MAX_TOKEN_TTL_HOURS {
            anyhow::bail!(
                "TOKEN_TTL_HOURS must be between 1 and {} (got {})",
                MAX_TOKEN_TTL_HOURS,
                token_ttl_hours
            );
        }

        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port: u16 = parse_or(&lookup, "PORT", 3000)?;
        let bind_addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .context("HOST/PORT do not form a valid socket address")?;

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            bind_addr,
            encryption_key,
            iv_setting,
            jwt_secret,
            token_ttl_hours,
            max_body_bytes: parse_or(&lookup, "MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES)?,
            auth_rate_limit_per_second: parse_or(&lookup, "AUTH_RATE_LIMIT_PER_SECOND", 1)?,
            auth_rate_limit_burst: parse_or(&lookup, "AUTH_RATE_LIMIT_BURST", 10)?,
            cors_allowed_origins,
        })
    }
}

fn decode_fixed<const N: usize>(hex_value: &str) -> Result<Zeroizing<[u8; N]>> {
    let bytes = Zeroizing::new(hex::decode(hex_value.trim()).context("value must be valid hexadecimal")?);
    if bytes.len() != N {
        anyhow::bail!("expected {} bytes, got {}", N, bytes.len());
    }
    let mut out = Zeroizing::new([0u8; N]);
    out.copy_from_slice(&bytes);
    Ok(out)
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}", key)),
        None => Ok(default),
    }
}
