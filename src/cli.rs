use clap::{Parser, ValueEnum};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[arg(long, env = "TASKFLOW_HOST", default_value_t = String::from("0.0.0.0"))]
    pub host: String,

    #[arg(short, long, env = "TASKFLOW_PORT", default_value_t = 8000)]
    pub port: u16,

    /// PostgreSQL connection string. Without it all data lives in memory.
    #[arg(short, long, env = "DATABASE_URL")]
    pub database_uri: Option<String>,

    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 8)]
    pub max_connections: u32,

    /// Key used to sign access tokens.
    #[arg(
        long,
        env = "SECRET_KEY",
        default_value_t = String::from("your-secret-key-change-in-production"),
        hide_env_values = true
    )]
    pub secret_key: String,

    #[arg(long, env = "ACCESS_TOKEN_EXPIRE_MINUTES", default_value_t = 60 * 24 * 7)]
    pub access_token_expire_minutes: i64,

    /// Allowed CORS origins, `*` allows any origin.
    #[arg(
        long,
        env = "CORS_ORIGINS",
        value_delimiter = ',',
        default_value = "*"
    )]
    pub cors_origins: Vec<String>,

    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 10)]
    pub request_timeout_secs: u64,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable lines.
    Pretty,
    /// Bunyan-style JSON records.
    Json,
}

impl Args {
    pub fn service_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
