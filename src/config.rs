use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use tracing::{info, warn};
use uuid::Uuid;

pub struct Config {
    pub port: u16,
    pub data_dir: PathBuf,
    pub token_secret: String,
    pub token_ttl_secs: i64,
    pub admin_username: String,
    pub admin_password: String,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("SCHOLARD_PORT", "8080"),
            data_dir: try_load("SCHOLARD_DATA_DIR", "./data"),
            token_secret: token_secret(),
            token_ttl_secs: try_load("SCHOLARD_TOKEN_TTL_SECS", "86400"),
            admin_username: try_load("SCHOLARD_ADMIN_USERNAME", "admin"),
            admin_password: var("SCHOLARD_ADMIN_PASSWORD").unwrap_or_else(|_| {
                warn!("SCHOLARD_ADMIN_PASSWORD not set, bootstrap admin uses the default password");
                "admin".to_string()
            }),
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}

fn token_secret() -> String {
    var("SCHOLARD_TOKEN_SECRET").unwrap_or_else(|_| {
        warn!("SCHOLARD_TOKEN_SECRET not set, tokens will not survive a restart");
        format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
    })
}
