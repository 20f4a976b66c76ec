use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Shared HS256 secret of the identity service.
    pub jwt_secret: String,
    pub estimated_prep_minutes: i32,
    pub change_feed_capacity: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let estimated_prep_minutes = env::var("ESTIMATED_PREP_MINUTES")
            .ok()
            .and_then(|m| m.parse::<i32>().ok())
            .filter(|m| *m > 0)
            .unwrap_or(15);
        let change_feed_capacity = env::var("CHANGE_FEED_CAPACITY")
            .ok()
            .and_then(|c| c.parse::<usize>().ok())
            .unwrap_or(256);
        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            estimated_prep_minutes,
            change_feed_capacity,
        })
    }
}
