#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: String,
    /// Base URL the embed snippet points at, e.g. "https://analytics.example.com".
    pub public_url: String,
    pub duckdb_memory_limit: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            port: std::env::var("AISOURCE_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|e| format!("invalid port: {e}"))?,
            data_dir: std::env::var("AISOURCE_DATA_DIR").unwrap_or_else(|_| "./data".to_string()),
            public_url: std::env::var("AISOURCE_PUBLIC_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            duckdb_memory_limit: std::env::var("AISOURCE_DUCKDB_MEMORY")
                .unwrap_or_else(|_| "1GB".to_string()),
        })
    }
}
