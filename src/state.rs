use std::sync::Arc;

use crate::config::Config;
use crate::database::AdStore;
use crate::message_broker::EventPublisher;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AdStore>,
    pub publisher: Arc<dyn EventPublisher>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn AdStore>,
        publisher: Arc<dyn EventPublisher>,
        config: Config,
    ) -> Self {
        Self {
            store,
            publisher,
            config: Arc::new(config),
        }
    }
}
