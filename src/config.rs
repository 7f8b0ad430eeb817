use crate::auth::verifier::NoncePolicy;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Clone)]
pub struct Config {
    // Redis (memory store when unset)
    pub redis_url: Option<String>,

    // Server
    pub bind_addr: SocketAddr,
    pub static_dir: PathBuf,

    // Limits
    pub max_body_bytes: usize,

    // TTLs (in seconds)
    pub session_ttl_secs: u64,

    // Rate limiting
    pub rate_limit_auth_per_min: u32,
    pub trusted_proxy_count: usize,

    // Login policy
    pub nonce_policy: NoncePolicy,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("redis_url", &self.redis_url.as_ref().map(|_| "[REDACTED]"))
            .field("bind_addr", &self.bind_addr)
            .field("static_dir", &self.static_dir)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("rate_limit_auth_per_min", &self.rate_limit_auth_per_min)
            .field("trusted_proxy_count", &self.trusted_proxy_count)
            .field("nonce_policy", &self.nonce_policy)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            redis_url: None,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            static_dir: PathBuf::from("static"),
            max_body_bytes: 16_384,
            session_ttl_secs: 3_600,
            rate_limit_auth_per_min: 20,
            trusted_proxy_count: 0,
            nonce_policy: NoncePolicy::RetainOnFailure,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to parse {0}: {1}")]
    ParseError(String, String),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Attempt to load .env file, but don't fail if it doesn't exist
        // (env vars may be set directly in production)
        let _ = dotenvy::dotenv();

        let defaults = Config::default();

        // Redis
        let redis_url = env::var("REDIS_URL").ok().filter(|s| !s.trim().is_empty());

        // Server
        let bind_addr = parse_env_or_default("BIND_ADDR", defaults.bind_addr)?;
        let static_dir = env::var("STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.static_dir);

        // Limits
        let max_body_bytes = parse_env_or_default("MAX_BODY_BYTES", defaults.max_body_bytes)?;

        // TTLs
        let session_ttl_secs =
            parse_env_or_default("SESSION_TTL_SECS", defaults.session_ttl_secs)?;
        if session_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_TTL_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        // Rate limiting
        let rate_limit_auth_per_min =
            parse_env_or_default("RATE_LIMIT_AUTH_PER_MIN", defaults.rate_limit_auth_per_min)?;
        // Number of reverse proxies in front of the server (0 = exposed directly)
        let trusted_proxy_count =
            parse_env_or_default("TRUSTED_PROXY_COUNT", defaults.trusted_proxy_count)?;

        // Login policy
        let nonce_policy = parse_env_or_default("NONCE_POLICY", defaults.nonce_policy)?;

        Ok(Config {
            redis_url,
            bind_addr,
            static_dir,
            max_body_bytes,
            session_ttl_secs,
            rate_limit_auth_per_min,
            trusted_proxy_count,
            nonce_policy,
        })
    }
}

/// Helper function to parse environment variable with a default value
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| ConfigError::ParseError(key.to_string(), format!("{}: {}", e, val))),
        Err(_) => Ok(default),
    }
}
