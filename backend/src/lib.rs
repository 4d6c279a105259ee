// Library exports for binary tools and tests
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;

use std::{sync::Arc, time::Duration};

use config::Config;
use services::{
    locations::{JitterSource, LocationFeed},
    tracking::TrackingRegistry,
};
use store::Store;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<Config>,
    pub feed: LocationFeed,
    pub tracking: Arc<TrackingRegistry>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Arc<Config>) -> Self {
        let source = Arc::new(JitterSource::new(
            config.reference_point(),
            config.jitter_spread,
        ));
        let feed = LocationFeed::new(store.clone(), source);
        let tracking = Arc::new(TrackingRegistry::new(
            feed.clone(),
            Duration::from_secs(config.tracking_interval_seconds),
        ));

        Self {
            store,
            config,
            feed,
            tracking,
        }
    }
}
