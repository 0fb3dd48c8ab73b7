// src/state.rs
use std::sync::Arc;

use crate::config::Config;
use crate::realtime::ResultsHub;
use crate::store::PollStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PollStore>,
    pub hub: Arc<ResultsHub>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn PollStore>, config: Config) -> Self {
        Self {
            store,
            hub: Arc::new(ResultsHub::new()),
            config: Arc::new(config),
        }
    }
}
