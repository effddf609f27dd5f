use std::sync::Arc;

use cache::CacheStore;
use config::Config;
use routes::item::ItemStore;

pub mod cache;
pub mod config;
pub mod error;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod utils;

pub use router::build_app;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn CacheStore>,
    pub items: ItemStore,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn CacheStore>) -> Self {
        Self {
            config,
            store,
            items: ItemStore::new(),
        }
    }
}
