use std::sync::Arc;

use crate::batch::BatchManager;
use crate::config::ServerConfig;
use crate::scrape::Engine;
use crate::shutdown::Coordinator;
use crate::store::MemoryStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub engine: Arc<Engine>,
    pub batch: Arc<BatchManager>,
    pub store: Arc<MemoryStore>,
    pub shutdown: Arc<Coordinator>,
}
