use anyhow::Result;

/// Application configuration loaded from environment variables.
/// Contains only secrets and env-specific values; pipeline constants
/// (depth limits, context caps) live with the code that uses them.
#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_url: String,

    // Blob storage (object-storage REST endpoint + service key)
    pub storage_url: String,
    pub storage_key: String,
    pub blob_bucket: String,

    // AI / LLM
    pub anthropic_api_key: String,

    // Browser (rendered fetches with cookie injection)
    pub browserless_url: String,
    pub browserless_token: Option<String>,

    // Restate
    pub restate_admin_url: Option<String>,
    pub restate_self_url: Option<String>,
    pub restate_auth_token: Option<String>,

    // Server
    pub server_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DATABASE_URL")?,
            storage_url: std::env::var("STORAGE_URL")?,
            storage_key: std::env::var("STORAGE_KEY")?,
            blob_bucket: std::env::var("BLOB_BUCKET")
                .unwrap_or_else(|_| "scraped-html".to_string()),
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY")?,
            browserless_url: std::env::var("BROWSERLESS_URL")?,
            browserless_token: std::env::var("BROWSERLESS_TOKEN").ok(),
            restate_admin_url: std::env::var("RESTATE_ADMIN_URL").ok(),
            restate_self_url: std::env::var("RESTATE_SELF_URL").ok(),
            restate_auth_token: std::env::var("RESTATE_AUTH_TOKEN").ok(),
            server_port: std::env::var("SERVER_PORT")
                .unwrap_or_else(|_| "9080".to_string())
                .parse()?,
        };

        config.log_keys();
        Ok(config)
    }

    fn log_keys(&self) {
        fn preview(val: &str) -> String {
            let n = val.len().min(5);
            format!("{}...({} chars)", &val[..n], val.len())
        }
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) if !v.is_empty() => preview(v),
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  STORAGE_URL: {}", preview(&self.storage_url));
        tracing::info!("  STORAGE_KEY: {}", preview(&self.storage_key));
        tracing::info!("  BLOB_BUCKET: {}", self.blob_bucket);
        tracing::info!("  ANTHROPIC_API_KEY: {}", preview(&self.anthropic_api_key));
        tracing::info!("  BROWSERLESS_URL: {}", preview(&self.browserless_url));
        tracing::info!("  RESTATE_ADMIN_URL: {}", preview_opt(&self.restate_admin_url));
    }
}
