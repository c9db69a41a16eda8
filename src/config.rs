// Configuration module for polygraph
// Reads from environment variables with sensible defaults

use std::env;
use std::sync::OnceLock;

/// Global configuration instance
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum lines of entity body retained (POLYGRAPH_MAX_BODY_LINES)
    pub max_body_lines: usize,

    /// Heartbeat cadence in files per progress signal (POLYGRAPH_HEARTBEAT_EVERY)
    pub heartbeat_every: usize,

    /// Maximum file size indexed, in megabytes (POLYGRAPH_MAX_FILE_MB)
    pub max_file_mb: u64,

    /// Database connection pool size (POLYGRAPH_POOL_SIZE)
    pub pool_size: u32,

    /// Database connection pool minimum idle connections (POLYGRAPH_POOL_MIN_IDLE)
    pub pool_min_idle: u32,

    /// Rows per bulk upsert transaction (POLYGRAPH_BATCH_SIZE)
    pub batch_size: usize,

    /// External precise-indexer command run per workspace root (POLYGRAPH_SCIP_CMD)
    pub scip_command: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_body_lines: 200,
            heartbeat_every: 50,
            max_file_mb: 10,
            pool_size: 10,
            pool_min_idle: 2,
            batch_size: 500,
            scip_command: None,
        }
    }
}

impl Config {
    fn from_env() -> Self {
        let mut config = Config::default();

        read_env("POLYGRAPH_MAX_BODY_LINES", &mut config.max_body_lines);
        read_env("POLYGRAPH_HEARTBEAT_EVERY", &mut config.heartbeat_every);
        read_env("POLYGRAPH_MAX_FILE_MB", &mut config.max_file_mb);
        read_env("POLYGRAPH_POOL_SIZE", &mut config.pool_size);
        read_env("POLYGRAPH_POOL_MIN_IDLE", &mut config.pool_min_idle);
        read_env("POLYGRAPH_BATCH_SIZE", &mut config.batch_size);

        if let Ok(val) = env::var("POLYGRAPH_SCIP_CMD") {
            if !val.trim().is_empty() {
                config.scip_command = Some(val);
            }
        }

        config
    }

    pub fn get() -> &'static Config {
        CONFIG.get_or_init(Config::from_env)
    }
}

fn read_env<T: std::str::FromStr + std::fmt::Display>(key: &str, slot: &mut T) {
    if let Ok(val) = env::var(key) {
        if let Ok(parsed) = val.parse() {
            *slot = parsed;
        } else {
            eprintln!("polygraph: Warning: Invalid {key} value: {val}, using default: {slot}");
        }
    }
}
