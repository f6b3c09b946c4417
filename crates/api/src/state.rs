//! Shared application state

use std::sync::Arc;

use chatdesk_shared::Store;

use crate::config::Config;
use crate::lifecycle::SessionLifecycle;
use crate::ws::{ConnectionRegistry, SessionHub};

/// State shared by every request handler and websocket task
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub registry: Arc<ConnectionRegistry>,
    pub hub: Arc<SessionHub>,
    pub lifecycle: Arc<SessionLifecycle>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn Store>) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let lifecycle = Arc::new(SessionLifecycle::new(Arc::clone(&store)));
        let hub = Arc::new(SessionHub::new(
            Arc::clone(&registry),
            Arc::clone(&store),
            Arc::clone(&lifecycle),
        ));

        Self {
            config: Arc::new(config),
            store,
            registry,
            hub,
            lifecycle,
        }
    }
}
