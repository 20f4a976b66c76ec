use std::sync::Arc;

use crate::{config::AppConfig, db::OrmConn, feed::ChangeFeed};

#[derive(Clone)]
pub struct AppState {
    pub orm: OrmConn,
    pub feed: ChangeFeed,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(orm: OrmConn, config: AppConfig) -> Self {
        Self {
            orm,
            feed: ChangeFeed::new(config.change_feed_capacity),
            config: Arc::new(config),
        }
    }
}
